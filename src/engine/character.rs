// The controllable character: pose, body bounds and tuning.

use glam::{Mat4, Vec3};
use serde::Deserialize;

use super::aabb::Aabb;
use super::ground::GroundSampler;
use super::tween::wrap_angle;

/// Movement tuning. Defaults match the shipped level.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CharacterParams {
    /// Horizontal distance covered by one discrete step.
    pub move_distance: f32,
    /// Peak height of the hop layered over a step.
    pub jump_height: f32,
    /// Seconds for one step transition.
    pub move_duration: f32,
    /// Largest height change a single step may take.
    pub max_step: f32,
    /// Rise of the rejected-move bounce.
    pub bounce_height: f32,
    /// Seconds for the bounce to rise (it takes as long to fall back).
    pub bounce_duration: f32,
    /// How far above the spawn point the initial ground probe starts.
    pub spawn_probe_height: f32,
}

impl Default for CharacterParams {
    fn default() -> Self {
        Self {
            move_distance: 3.0,
            jump_height: 1.0,
            move_duration: 0.2,
            max_step: 1.0,
            bounce_height: 0.25,
            bounce_duration: 0.12,
            spawn_probe_height: 200.0,
        }
    }
}

/// Position and facing, as exposed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    /// Rotation about +Y in radians.
    pub yaw: f32,
}

impl Pose {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(glam::Quat::from_rotation_y(self.yaw), self.position)
    }
}

/// Committed character state. Animation offsets are kept by the movement
/// controllers and never written back here.
#[derive(Debug, Clone)]
pub struct Character {
    pub pose: Pose,
    /// Body vertices relative to the pivot with yaw removed. World bounds are
    /// fitted to these at each pose.
    local_points: Vec<Vec3>,
    /// Tight bounds of `local_points`.
    pub local_bounds: Aabb,
    /// Vertical offset from the pivot to the lowest point of the body,
    /// so `foot_y = position.y + foot_offset`. Measured once at load.
    pub foot_offset: f32,
    pub params: CharacterParams,
}

impl Character {
    /// Build from the body's world-space vertices, measured at `pose`.
    /// `None` when there are no vertices.
    pub fn from_world_points(pose: Pose, points: &[Vec3], params: CharacterParams) -> Option<Self> {
        let to_local = pose.matrix().inverse();
        let local_points: Vec<Vec3> = points.iter().map(|&p| to_local.transform_point3(p)).collect();
        let local_bounds = Aabb::from_points(local_points.iter().copied())?;
        Some(Self {
            pose,
            local_points,
            local_bounds,
            // Yaw leaves heights alone, so the local minimum is the foot.
            foot_offset: local_bounds.min.y,
            params,
        })
    }

    /// Drop the character onto the ground below its spawn point. Falls back to
    /// putting the feet at y = 0 when nothing is below.
    pub fn snap_to_ground(&mut self, ground: Option<&GroundSampler>) -> Option<f32> {
        let start_y = self.pose.position.y + self.params.spawn_probe_height;
        let hit = ground.and_then(|g| {
            g.height_below(self.pose.position.x, self.pose.position.z, start_y)
        });
        self.pose.position.y = match hit {
            Some(ground_y) => ground_y - self.foot_offset,
            None => -self.foot_offset,
        };
        hit
    }

    /// World bounds at the committed pose.
    pub fn world_bounds(&self) -> Aabb {
        self.bounds_at(self.pose)
    }

    /// Tight world bounds of the body if it stood at `pose`.
    pub fn bounds_at(&self, pose: Pose) -> Aabb {
        let to_world = pose.matrix();
        Aabb::from_points(self.local_points.iter().map(|&p| to_world.transform_point3(p)))
            .unwrap_or(Aabb::new(pose.position, pose.position))
    }

    /// Pivot height that puts the feet on a surface at `ground_y`.
    pub fn standing_height(&self, ground_y: f32) -> f32 {
        ground_y - self.foot_offset
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        self.pose.yaw = wrap_angle(yaw);
    }
}
