// Terrain height queries against the render geometry of the level.
//
// Box colliders are far too coarse to follow slopes and stairs, so ground
// height always comes from a vertical ray against the actual triangles.

use glam::Mat4;

use super::aabb::Ray;
use super::mesh::{raycast_triangles, TriMesh};

/// Default height the downward probe starts from.
pub const DEFAULT_PROBE_HEIGHT: f32 = 1000.0;

/// World-space triangle soup of the level, queried by vertical rays.
#[derive(Debug, Clone)]
pub struct GroundSampler {
    triangles: Vec<[glam::Vec3; 3]>,
    probe_height: f32,
}

impl GroundSampler {
    pub fn new(probe_height: f32) -> Self {
        Self { triangles: Vec::new(), probe_height }
    }

    /// Sampler over a single mesh posed by `world`.
    pub fn from_mesh(mesh: &TriMesh, world: &Mat4, probe_height: f32) -> Self {
        let mut sampler = Self::new(probe_height);
        sampler.add_mesh(mesh, world);
        sampler
    }

    /// Add another mesh of the level (levels may be split across child nodes).
    pub fn add_mesh(&mut self, mesh: &TriMesh, world: &Mat4) {
        self.triangles.extend(mesh.world_triangles(world));
    }

    pub fn triangle_count(&self) -> usize { self.triangles.len() }

    pub fn probe_height(&self) -> f32 { self.probe_height }

    /// Height of the first surface below the probe start at (x, z), or `None`
    /// over holes and outside the level.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        self.height_below(x, z, self.probe_height)
    }

    /// Like `height_at` but casting from a caller-chosen start height.
    pub fn height_below(&self, x: f32, z: f32, start_y: f32) -> Option<f32> {
        let ray = Ray::downward(x, z, start_y);
        raycast_triangles(&ray, &self.triangles).map(|hit| hit.point.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mesh::PolyMesh;
    use glam::Vec3;

    fn stepped_level() -> TriMesh {
        let mut poly = PolyMesh::new();
        poly.add_floor(-10.0, -10.0, 0.0, 10.0, 0.0);
        poly.add_floor(0.0, -10.0, 10.0, 10.0, 0.5);
        poly.triangulate()
    }

    #[test]
    fn height_follows_surface() {
        let sampler = GroundSampler::from_mesh(&stepped_level(), &Mat4::IDENTITY, DEFAULT_PROBE_HEIGHT);
        assert!((sampler.height_at(-3.0, 2.0).unwrap() - 0.0).abs() < 1e-4);
        assert!((sampler.height_at(3.0, 2.0).unwrap() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn off_mesh_is_no_ground() {
        let sampler = GroundSampler::from_mesh(&stepped_level(), &Mat4::IDENTITY, DEFAULT_PROBE_HEIGHT);
        assert_eq!(sampler.height_at(25.0, 0.0), None);
    }

    #[test]
    fn first_hit_from_above_is_used() {
        let mut poly = PolyMesh::new();
        poly.add_floor(-5.0, -5.0, 5.0, 5.0, 0.0);
        poly.add_cuboid(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0));
        let sampler = GroundSampler::from_mesh(&poly.triangulate(), &Mat4::IDENTITY, DEFAULT_PROBE_HEIGHT);
        assert!((sampler.height_at(0.3, 0.2).unwrap() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn surfaces_above_the_probe_are_ignored() {
        let sampler = GroundSampler::from_mesh(&stepped_level(), &Mat4::from_translation(Vec3::Y * 50.0), 10.0);
        assert_eq!(sampler.height_at(-3.0, 0.0), None);
        assert!(sampler.height_below(-3.0, 0.0, 100.0).is_some());
    }

    #[test]
    fn empty_sampler_has_no_ground() {
        let sampler = GroundSampler::new(DEFAULT_PROBE_HEIGHT);
        assert_eq!(sampler.height_at(0.0, 0.0), None);
    }
}
