// Fixed view camera used for pointer picking.
//
// Camera model:
//   - An eye point looking at a fixed target, +Y up
//   - Orthographic (default) or perspective projection
//   - Pointer rays come from unprojecting an NDC point at the near and far
//     planes, so both projections share one code path
//
// The camera does not move; presentation and camera control live outside.

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::Deserialize;

use super::aabb::Ray;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Projection {
    /// Vertical half extent in world units; horizontal is scaled by aspect.
    Orthographic { half_height: f32 },
    /// Vertical field of view in radians.
    Perspective { fov_y: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub projection: Projection,
    pub near: f32,
    pub far: f32,
}

impl Default for ViewCamera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(24.0, 16.0, -50.0),
            target: Vec3::ZERO,
            projection: Projection::Orthographic { half_height: 50.0 },
            near: 1.0,
            far: 1000.0,
        }
    }
}

impl ViewCamera {
    /// View matrix: looks from the eye toward the target.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        match self.projection {
            Projection::Orthographic { half_height } => {
                let half_width = half_height * aspect;
                Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, self.near, self.far)
            }
            Projection::Perspective { fov_y } => Mat4::perspective_rh(fov_y, aspect, self.near, self.far),
        }
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// World-space ray through a pointer at `ndc` (x right, y up, both in
    /// [-1, 1]).
    pub fn ray_from_ndc(&self, ndc: Vec2, aspect: f32) -> Ray {
        let inv = self.view_projection(aspect).inverse();
        let near = unproject(&inv, Vec3::new(ndc.x, ndc.y, 0.0));
        let far = unproject(&inv, Vec3::new(ndc.x, ndc.y, 1.0));
        Ray::new(near, far - near)
    }
}

fn unproject(inv_view_proj: &Mat4, ndc: Vec3) -> Vec3 {
    let p = *inv_view_proj * Vec4::new(ndc.x, ndc.y, ndc.z, 1.0);
    p.truncate() / p.w
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_ray_follows_view_direction() {
        let cam = ViewCamera::default();
        let ray = cam.ray_from_ndc(Vec2::ZERO, 16.0 / 9.0);
        let forward = (cam.target - cam.eye).normalize();
        assert!((ray.dir - forward).length() < 1e-4, "dir {:?}", ray.dir);
        // Passes through the target.
        let to_target = cam.target - ray.origin;
        assert!(to_target.cross(ray.dir).length() < 1e-2);
    }

    #[test]
    fn orthographic_rays_are_parallel() {
        let cam = ViewCamera::default();
        let a = cam.ray_from_ndc(Vec2::new(-0.5, 0.3), 1.0);
        let b = cam.ray_from_ndc(Vec2::new(0.7, -0.8), 1.0);
        assert!((a.dir - b.dir).length() < 1e-4);
        assert!((a.origin - b.origin).length() > 1.0);
    }

    #[test]
    fn orthographic_edge_maps_to_half_extent() {
        let cam = ViewCamera {
            eye: Vec3::new(0.0, 100.0, 0.0),
            target: Vec3::ZERO,
            projection: Projection::Orthographic { half_height: 10.0 },
            near: 1.0,
            far: 1000.0,
        };
        // Straight down needs a non-parallel up; nudge the eye.
        let cam = ViewCamera { eye: Vec3::new(0.0, 100.0, -0.001), ..cam };
        let ray = cam.ray_from_ndc(Vec2::new(0.0, 1.0), 2.0);
        let hit_t = -ray.origin.y / ray.dir.y;
        let hit = ray.at(hit_t);
        assert!((hit.z.abs() - 10.0).abs() < 1e-2, "hit {hit:?}");
    }

    #[test]
    fn perspective_rays_start_at_eye() {
        let cam = ViewCamera {
            projection: Projection::Perspective { fov_y: 45f32.to_radians() },
            ..ViewCamera::default()
        };
        let a = cam.ray_from_ndc(Vec2::new(-0.9, 0.9), 1.5);
        let b = cam.ray_from_ndc(Vec2::new(0.9, -0.9), 1.5);
        // Both rays, traced back, meet at the eye.
        for ray in [a, b] {
            let back = ray.origin - ray.dir * (ray.origin - cam.eye).length();
            assert!((back - cam.eye).length() < 1e-2, "back {back:?}");
        }
    }

    #[test]
    fn degenerate_aspect_falls_back() {
        let cam = ViewCamera::default();
        assert_eq!(cam.projection_matrix(0.0), cam.projection_matrix(1.0));
    }
}
