// Spatial grid rasterization of level geometry.
//
// Vertices above the floor band are binned into square XZ cells anchored at
// the mesh's world-space minimum corner. Cells live in a flat arena and are
// addressed by integer id; the (ix, iz) → id lookup lets the cluster pass find
// neighbours by arithmetic instead of building string keys.

use std::collections::HashMap;

use glam::{IVec2, Mat4, Vec2, Vec3};

use super::mesh::TriMesh;

// ============================================================================
// GRID CELL
// ============================================================================

/// One occupied cell: its integer coordinates and the world-space vertices
/// that landed in it, in mesh storage order.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub coord:  IVec2,  // (ix, iz)
    pub points: Vec<Vec3>,
}

// ============================================================================
// CELL GRID
// ============================================================================

/// Sparse set of occupied cells produced by one build pass.
#[derive(Debug, Clone, Default)]
pub struct CellGrid {
    /// Arena of occupied cells. A cell id is its index here.
    pub cells: Vec<GridCell>,
    lookup: HashMap<IVec2, u32>,
    /// World XZ of cell (0, 0)'s minimum corner.
    pub origin: Vec2,
    pub cell_size: f32,
}

impl CellGrid {
    pub fn new(origin: Vec2, cell_size: f32) -> Self {
        Self {
            cells: Vec::new(),
            lookup: HashMap::new(),
            origin,
            cell_size,
        }
    }

    pub fn len(&self) -> usize { self.cells.len() }

    pub fn is_empty(&self) -> bool { self.cells.is_empty() }

    /// Cell coordinates containing a world-space point.
    pub fn world_to_cell(&self, pos: Vec3) -> IVec2 {
        IVec2::new(
            ((pos.x - self.origin.x) / self.cell_size).floor() as i32,
            ((pos.z - self.origin.y) / self.cell_size).floor() as i32,
        )
    }

    /// Id of the occupied cell at `coord`, if any.
    #[inline]
    pub fn cell_id(&self, coord: IVec2) -> Option<u32> {
        self.lookup.get(&coord).copied()
    }

    pub fn cell(&self, id: u32) -> &GridCell {
        &self.cells[id as usize]
    }

    /// Append a point to the cell containing it, creating the cell on first use.
    pub fn insert(&mut self, pos: Vec3) -> u32 {
        let coord = self.world_to_cell(pos);
        let id = match self.lookup.get(&coord) {
            Some(&id) => id,
            None => {
                let id = self.cells.len() as u32;
                self.cells.push(GridCell { coord, points: Vec::new() });
                self.lookup.insert(coord, id);
                id
            }
        };
        self.cells[id as usize].points.push(pos);
        id
    }

    /// Insert an already-built cell (used to replay cells in a chosen order).
    /// Points merge into an existing cell with the same coordinates.
    pub fn insert_cell(&mut self, cell: GridCell) -> u32 {
        match self.lookup.get(&cell.coord) {
            Some(&id) => {
                self.cells[id as usize].points.extend(cell.points);
                id
            }
            None => {
                let id = self.cells.len() as u32;
                self.lookup.insert(cell.coord, id);
                self.cells.push(cell);
                id
            }
        }
    }
}

// ============================================================================
// GRID BUILD
// ============================================================================

/// Rasterization parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridParams {
    /// Side length of a cell in world units.
    pub cell_size: f32,
    /// Vertices lower than `bounds.min.y + height_above_ground` count as floor.
    pub height_above_ground: f32,
}

/// Rasterize a mesh posed by `world` into a cell grid.
///
/// Malformed input (no positions, non-positive cell size) yields an empty grid.
pub fn build_grid(mesh: &TriMesh, world: &Mat4, params: GridParams) -> CellGrid {
    let Some(bounds) = mesh.world_bounds(world) else {
        log::warn!("grid build skipped: mesh has no position data");
        return CellGrid::new(Vec2::ZERO, params.cell_size);
    };
    let origin = Vec2::new(bounds.min.x, bounds.min.z);
    let mut grid = CellGrid::new(origin, params.cell_size);

    if !(params.cell_size > 0.0) {
        log::warn!("grid build skipped: invalid cell size {}", params.cell_size);
        return grid;
    }

    let floor_limit = bounds.min.y + params.height_above_ground;
    let mut skipped_non_finite = 0usize;

    for pos in mesh.world_positions(world) {
        if !pos.is_finite() {
            skipped_non_finite += 1;
            continue;
        }
        if pos.y < floor_limit {
            continue;
        }
        grid.insert(pos);
    }

    if skipped_non_finite > 0 {
        log::warn!("grid build ignored {skipped_non_finite} non-finite vertices");
    }
    log::debug!(
        "rasterized {} vertices into {} cells (cell size {})",
        mesh.vertex_count(),
        grid.len(),
        params.cell_size
    );
    grid
}
