// Procedural demo level, used when no scene file is given.
//
// Layout (top view, +Z up the page):
//
//   +-------------------------------+   walls: 0.5-long blocks, 1.5 tall
//   |   B1  B2  B3  B4  B5  B6      |   boards at z = 10
//   |                               |
//   |          [crate]              |   2x2 block cluster at (6, 6)
//   |             .  bump           |   single-cell bump near the origin
//   |   Man                         |
//   +-------------------------------+
//
// Walls and the crate are built from small blocks so their vertices are dense
// enough to rasterize into connected cells. Pebbles are thin enough to count
// as floor.

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::mesh::{PolyMesh, TriMesh};
use super::scene::{NodeDescription, SceneDescription};

pub const HALF_EXTENT: f32 = 15.0;
const WALL_BLOCK: f32 = 0.5;
/// Below the character's height: boxes only span the wall's top vertices.
const WALL_HEIGHT: f32 = 1.5;
const PEBBLES: usize = 12;

/// Where the character starts, before ground snapping.
pub const SPAWN: Vec3 = Vec3::new(-4.5, 3.0, -6.0);

/// Center of the crate cluster on the floor.
pub const CRATE_CENTER: Vec2 = Vec2::new(6.0, 6.0);

/// Board roots sit on this row.
pub const BOARD_Z: f32 = 10.0;

pub fn board_x(index: usize) -> f32 {
    -10.0 + 4.0 * index as f32
}

/// Build the demo scene. `seed` only moves the pebbles.
pub fn demo_level(seed: u64) -> SceneDescription {
    let mut desc = SceneDescription::default();
    let root = desc.push(NodeDescription::new("Scene"));
    desc.push(NodeDescription::new("Level_1").with_parent(root).with_mesh(&level_mesh(seed)));

    for i in 1..=6 {
        let board = desc.push(
            NodeDescription::new(format!("Board_{i}"))
                .with_parent(root)
                .at(Vec3::new(board_x(i), 0.0, BOARD_Z)),
        );
        desc.push(
            NodeDescription::new(format!("Board_{i}_post"))
                .with_parent(board)
                .with_mesh(&TriMesh::cuboid(Vec3::new(-0.1, 0.0, -0.1), Vec3::new(0.1, 0.5, 0.1))),
        );
        desc.push(
            NodeDescription::new(format!("Board_{i}_panel"))
                .with_parent(board)
                .with_mesh(&TriMesh::cuboid(Vec3::new(-1.0, 0.5, -0.1), Vec3::new(1.0, 2.5, 0.1))),
        );
    }

    desc.push(
        NodeDescription::new("Man")
            .with_parent(root)
            .at(SPAWN)
            .with_mesh(&TriMesh::cuboid(Vec3::new(-0.3, 0.0, -0.25), Vec3::new(0.3, 1.8, 0.25))),
    );
    desc
}

fn level_mesh(seed: u64) -> TriMesh {
    let mut poly = PolyMesh::new();
    let h = HALF_EXTENT;
    poly.add_floor(-h, -h, h, h, 0.0);

    // Perimeter walls, one block at a time. The four walls stop short of the
    // corners: a closed ring would cluster into one box around the whole level.
    let long = ((2.0 * h - 2.0) / WALL_BLOCK) as usize;
    for k in 0..long {
        let a = -h + 1.0 + k as f32 * WALL_BLOCK;
        poly.add_cuboid(Vec3::new(a, 0.0, h - WALL_BLOCK), Vec3::new(a + WALL_BLOCK, WALL_HEIGHT, h));
        poly.add_cuboid(Vec3::new(a, 0.0, -h), Vec3::new(a + WALL_BLOCK, WALL_HEIGHT, -h + WALL_BLOCK));
    }
    let short = ((2.0 * h - 4.0) / WALL_BLOCK) as usize;
    for k in 0..short {
        let a = -h + 2.0 + k as f32 * WALL_BLOCK;
        poly.add_cuboid(Vec3::new(h - WALL_BLOCK, 0.0, a), Vec3::new(h, WALL_HEIGHT, a + WALL_BLOCK));
        poly.add_cuboid(Vec3::new(-h, 0.0, a), Vec3::new(-h + WALL_BLOCK, WALL_HEIGHT, a + WALL_BLOCK));
    }

    // Crate: 2x2 blocks, one unit tall.
    for dx in 0..2 {
        for dz in 0..2 {
            let min = Vec3::new(CRATE_CENTER.x - 0.5 + dx as f32 * 0.5, 0.0, CRATE_CENTER.y - 0.5 + dz as f32 * 0.5);
            poly.add_cuboid(min, min + Vec3::new(0.5, 1.0, 0.5));
        }
    }

    // Bump: fits inside a single grid cell, so it never becomes a collider.
    poly.add_cuboid(Vec3::new(0.15, 0.0, 0.15), Vec3::new(0.35, 0.3, 0.35));

    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..PEBBLES {
        let x = rng.gen_range(-h + 2.0..h - 2.0);
        let z = rng.gen_range(-h + 2.0..h - 2.0);
        let r = rng.gen_range(0.03..0.08);
        poly.add_cuboid(Vec3::new(x - r, 0.0, z - r), Vec3::new(x + r, 0.02, z + r));
    }

    poly.triangulate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_every_role() {
        let desc = demo_level(7);
        let names: Vec<&str> = desc.nodes.iter().map(|n| n.name.as_str()).collect();
        assert!(names.contains(&"Level_1"));
        assert!(names.contains(&"Man"));
        for i in 1..=6 {
            assert!(names.contains(&format!("Board_{i}").as_str()));
        }
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn seed_only_moves_pebbles() {
        let a = demo_level(1);
        let b = demo_level(2);
        assert_eq!(a.nodes.len(), b.nodes.len());
        let mesh = |d: &SceneDescription| d.nodes[1].mesh.clone().unwrap();
        assert_eq!(mesh(&a).indices, mesh(&b).indices);
        assert_ne!(mesh(&a).positions, mesh(&b).positions);
        assert_eq!(demo_level(1).nodes[1].mesh.clone().unwrap().positions, mesh(&a).positions);
    }
}
