// Connected-component labeling over a CellGrid.
//
// Cells are graph nodes; two cells are adjacent when their coordinates differ
// by at most 1 on each axis (8-neighbourhood). Each component large enough to
// matter becomes one padded axis-aligned collider. Small components (railings,
// decals, stray fragments) are dropped outright.

use std::collections::VecDeque;

use glam::IVec2;

use super::aabb::Aabb;
use super::grid::CellGrid;

/// Offsets of the eight (cardinal + diagonal) neighbours.
const NEIGHBOR_OFFSETS: [IVec2; 8] = [
    IVec2::new(-1, -1), IVec2::new(0, -1), IVec2::new(1, -1),
    IVec2::new(-1,  0),                    IVec2::new(1,  0),
    IVec2::new(-1,  1), IVec2::new(0,  1), IVec2::new(1,  1),
];

/// Cluster filtering and padding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    /// Components with fewer cells than this produce no collider.
    pub min_cells_per_cluster: usize,
    /// Uniform padding added to each emitted box on every side.
    pub expand_margin: f32,
}

/// Partition the grid into 8-connected components and emit one box per
/// component that meets the size threshold.
///
/// Each cell is enqueued at most once (guarded by `visited`), so the pass is
/// O(cells). Output order follows first-seen cell order and carries no meaning.
pub fn extract_colliders(grid: &CellGrid, params: ClusterParams) -> Vec<Aabb> {
    let mut visited = vec![false; grid.len()];
    let mut queue: VecDeque<u32> = VecDeque::new();
    let mut members: Vec<u32> = Vec::new();
    let mut boxes = Vec::new();
    let mut dropped = 0usize;

    for seed in 0..grid.len() as u32 {
        if visited[seed as usize] {
            continue;
        }
        visited[seed as usize] = true;
        queue.push_back(seed);
        members.clear();

        // BFS: expand outward from the seed through occupied neighbours.
        while let Some(id) = queue.pop_front() {
            members.push(id);
            let coord = grid.cell(id).coord;
            for offset in NEIGHBOR_OFFSETS {
                if let Some(nb) = grid.cell_id(coord + offset) {
                    if !visited[nb as usize] {
                        visited[nb as usize] = true;
                        queue.push_back(nb);
                    }
                }
            }
        }

        if members.len() < params.min_cells_per_cluster {
            dropped += 1;
            continue;
        }

        let points = members.iter().flat_map(|&id| grid.cell(id).points.iter().copied());
        if let Some(bounds) = Aabb::from_points(points) {
            boxes.push(bounds.expanded(params.expand_margin));
        }
    }

    log::debug!(
        "clustered {} cells into {} colliders ({} clusters below {} cells dropped)",
        grid.len(),
        boxes.len(),
        dropped,
        params.min_cells_per_cluster
    );
    boxes
}
