// Continuous physics-integrated movement.
//
// Each fixed step: gravity (when airborne) → integrate → resolve one capsule
// contact against the static world → push out along the contact normal.
// A contact whose normal points up grounds the character, kills horizontal
// velocity and ends the current hop. A key press with no hop in flight
// launches one: a horizontal impulse plus a vertical one.
//
// The swept-capsule query is a capability of whatever broad phase the host
// provides (`CapsuleWorld`). `StaticWorld` implements it over the synthesized
// colliders and the ground sampler.

use glam::Vec3;
use serde::Deserialize;

use super::aabb::Aabb;
use super::character::Character;
use super::colliders::ColliderRegistry;
use super::ground::GroundSampler;
use super::movement::Direction;
use super::tween::{shortest_angle_delta, wrap_angle};

/// Ground contacts this close count as touching, which keeps a resting
/// character grounded instead of flickering between steps.
const CONTACT_SKIN: f32 = 1e-3;

// ============================================================================
// PARAMETERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsParams {
    /// Downward acceleration, units/s².
    pub gravity: f32,
    /// Simulation step in seconds.
    pub fixed_step: f32,
    /// Cap on steps per tick; backlog beyond it is dropped.
    pub max_substeps: u32,
    /// Horizontal speed added by a key press.
    pub move_impulse: f32,
    /// Vertical speed added by a key press.
    pub jump_impulse: f32,
    /// Fraction of the remaining yaw error closed each step.
    pub yaw_smoothing: f32,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            gravity: 30.0,
            fixed_step: 1.0 / 120.0,
            max_substeps: 8,
            move_impulse: 5.0,
            jump_impulse: 7.5,
            yaw_smoothing: 0.25,
        }
    }
}

// ============================================================================
// CAPSULE QUERY
// ============================================================================

/// Vertical capsule: segment `start..end` (sphere centres) swept by `radius`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    pub start:  Vec3,
    pub end:    Vec3,
    pub radius: f32,
}

impl Capsule {
    pub fn translated(&self, offset: Vec3) -> Capsule {
        Capsule { start: self.start + offset, end: self.end + offset, radius: self.radius }
    }

    pub fn bottom(&self) -> f32 {
        self.start.y - self.radius
    }

    pub fn top(&self) -> f32 {
        self.end.y + self.radius
    }

    /// Capsule fitted inside the character's body bounds at its current pose.
    pub fn for_character(character: &Character) -> Capsule {
        let b = character.local_bounds;
        let size = b.size();
        let radius = (size.x.min(size.z) * 0.5).max(1e-3);
        let pivot = character.pose.position;
        let start = pivot + Vec3::new(0.0, b.min.y + radius, 0.0);
        let end_y = (b.max.y - radius).max(b.min.y + radius);
        Capsule { start, end: pivot + Vec3::new(0.0, end_y, 0.0), radius }
    }
}

/// Total push-out needed to separate a capsule from the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit push-out direction.
    pub normal: Vec3,
    /// Push-out distance along `normal`.
    pub depth: f32,
}

/// Broad-phase capability: resolve a capsule against static geometry.
pub trait CapsuleWorld {
    fn capsule_contact(&self, capsule: &Capsule) -> Option<Contact>;
}

/// Collider boxes plus the ground surface.
pub struct StaticWorld<'a> {
    pub colliders: &'a ColliderRegistry,
    pub ground: Option<&'a GroundSampler>,
}

impl CapsuleWorld for StaticWorld<'_> {
    fn capsule_contact(&self, capsule: &Capsule) -> Option<Contact> {
        // Push out of each overlapping volume in turn, accumulating the
        // displacement, then report it as one contact.
        let mut moved = *capsule;
        let mut hit = false;

        if let Some(ground) = self.ground {
            let probe_x = moved.start.x;
            let probe_z = moved.start.z;
            if let Some(ground_y) = ground.height_below(probe_x, probe_z, moved.top()) {
                let depth = ground_y - moved.bottom();
                if depth > -CONTACT_SKIN {
                    moved = moved.translated(Vec3::Y * depth.max(0.0));
                    hit = true;
                }
            }
        }

        for collider in self.colliders.iter() {
            if let Some((normal, depth)) = capsule_box_penetration(&moved, &collider.bounds) {
                moved = moved.translated(normal * depth);
                hit = true;
            }
        }

        if !hit {
            return None;
        }
        let displacement = moved.start - capsule.start;
        let depth = displacement.length();
        let normal = if depth > 0.0 { displacement / depth } else { Vec3::Y };
        Some(Contact { normal, depth })
    }
}

/// Penetration of a vertical capsule into an axis-aligned box.
fn capsule_box_penetration(capsule: &Capsule, bounds: &Aabb) -> Option<(Vec3, f32)> {
    // Point on the segment nearest the box: for a vertical segment only its
    // height varies, so clamp the box's vertical extent into the segment.
    let lo = capsule.start.y.min(capsule.end.y);
    let hi = capsule.start.y.max(capsule.end.y);
    let overlap_lo = bounds.min.y.max(lo);
    let overlap_hi = bounds.max.y.min(hi);
    let seg_y = if overlap_lo <= overlap_hi {
        (overlap_lo + overlap_hi) * 0.5
    } else if bounds.max.y < lo {
        lo
    } else {
        hi
    };
    let p = Vec3::new(capsule.start.x, seg_y, capsule.start.z);
    let q = bounds.closest_point(p);
    let d = p - q;
    let dist = d.length();

    if dist > 1e-6 {
        if dist >= capsule.radius {
            return None;
        }
        return Some((d / dist, capsule.radius - dist));
    }

    // Segment point inside the box: leave through the nearest face.
    let to_min = p - bounds.min;
    let to_max = bounds.max - p;
    let candidates = [
        (Vec3::NEG_X, to_min.x),
        (Vec3::X, to_max.x),
        (Vec3::NEG_Y, hi - bounds.min.y),
        (Vec3::Y, bounds.max.y - lo),
        (Vec3::NEG_Z, to_min.z),
        (Vec3::Z, to_max.z),
    ];
    candidates
        .into_iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(n, pen)| (n, pen + capsule.radius))
}

// ============================================================================
// PHYSICS CONTROLLER
// ============================================================================

/// Mode B movement state for one character.
#[derive(Debug, Clone, Default)]
pub struct PhysicsController {
    pub velocity: Vec3,
    on_floor: bool,
    /// Set by a hop, cleared on landing.
    moving: bool,
    target_yaw: f32,
    accumulator: f32,
}

impl PhysicsController {
    pub fn new(initial_yaw: f32) -> Self {
        Self { target_yaw: initial_yaw, ..Self::default() }
    }

    pub fn is_moving(&self) -> bool { self.moving }

    pub fn on_floor(&self) -> bool { self.on_floor }

    /// Launch a hop. Ignored (returns false) while a hop is in flight.
    pub fn request(&mut self, direction: Direction, params: &PhysicsParams) -> bool {
        if self.moving {
            return false;
        }
        let step = direction.step();
        self.velocity.x += step.x * params.move_impulse;
        self.velocity.z += step.y * params.move_impulse;
        self.velocity.y += params.jump_impulse;
        self.target_yaw = direction.yaw();
        self.moving = true;
        log::debug!("hop {:?}: velocity {:?}", direction, self.velocity);
        true
    }

    /// Run as many fixed steps as `dt` covers.
    pub fn tick(&mut self, character: &mut Character, world: &impl CapsuleWorld, params: &PhysicsParams, dt: f32) {
        if params.fixed_step <= 0.0 {
            return;
        }
        self.accumulator += dt.max(0.0);
        let mut steps = 0;
        while self.accumulator >= params.fixed_step {
            if steps == params.max_substeps {
                self.accumulator = 0.0;
                break;
            }
            self.step(character, world, params);
            self.accumulator -= params.fixed_step;
            steps += 1;
        }
    }

    /// One fixed simulation step.
    pub fn step(&mut self, character: &mut Character, world: &impl CapsuleWorld, params: &PhysicsParams) {
        let h = params.fixed_step;
        if !self.on_floor {
            self.velocity.y -= params.gravity * h;
        }
        character.pose.position += self.velocity * h;

        self.on_floor = false;
        if let Some(contact) = world.capsule_contact(&Capsule::for_character(character)) {
            if contact.normal.y > 0.0 {
                self.on_floor = true;
                self.velocity.x = 0.0;
                self.velocity.z = 0.0;
                self.velocity.y = self.velocity.y.max(0.0);
                self.moving = false;
            } else {
                // Slide along walls and ceilings.
                self.velocity -= contact.normal * contact.normal.dot(self.velocity);
            }
            character.pose.position += contact.normal * contact.depth;
        }

        let yaw = character.pose.yaw;
        character.pose.yaw = wrap_angle(yaw + shortest_angle_delta(yaw, self.target_yaw) * params.yaw_smoothing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::character::{CharacterParams, Pose};
    use crate::engine::mesh::{PolyMesh, TriMesh};
    use glam::Mat4;

    fn flat_ground() -> GroundSampler {
        let mut poly = PolyMesh::new();
        poly.add_floor(-20.0, -20.0, 20.0, 20.0, 0.0);
        GroundSampler::from_mesh(&poly.triangulate(), &Mat4::IDENTITY, 1000.0)
    }

    fn character_at(position: Vec3) -> Character {
        let body = TriMesh::cuboid(Vec3::new(-0.4, 0.0, -0.4), Vec3::new(0.4, 1.8, 0.4));
        let points: Vec<Vec3> = body.positions.iter().map(|&p| p + position).collect();
        Character::from_world_points(Pose { position, yaw: 0.0 }, &points, CharacterParams::default()).unwrap()
    }

    fn simulate(ctl: &mut PhysicsController, c: &mut Character, world: &StaticWorld, seconds: f32) {
        let params = PhysicsParams::default();
        let mut t = 0.0;
        while t < seconds {
            ctl.tick(c, world, &params, 1.0 / 60.0);
            t += 1.0 / 60.0;
        }
    }

    #[test]
    fn falls_and_lands_on_ground() {
        let ground = flat_ground();
        let colliders = ColliderRegistry::new();
        let world = StaticWorld { colliders: &colliders, ground: Some(&ground) };
        let mut c = character_at(Vec3::new(0.3, 3.0, 0.2));
        let mut ctl = PhysicsController::new(0.0);

        simulate(&mut ctl, &mut c, &world, 2.0);
        assert!(ctl.on_floor());
        assert!(c.pose.position.y.abs() < 0.05, "y={}", c.pose.position.y);
    }

    #[test]
    fn hop_moves_forward_and_lands() {
        let ground = flat_ground();
        let colliders = ColliderRegistry::new();
        let world = StaticWorld { colliders: &colliders, ground: Some(&ground) };
        let mut c = character_at(Vec3::new(0.3, 0.0, 0.2));
        let mut ctl = PhysicsController::new(0.0);
        simulate(&mut ctl, &mut c, &world, 0.2);

        assert!(ctl.request(Direction::Up, &PhysicsParams::default()));
        assert!(!ctl.request(Direction::Left, &PhysicsParams::default()), "second press mid-hop");
        simulate(&mut ctl, &mut c, &world, 1.5);

        assert!(!ctl.is_moving());
        assert!(c.pose.position.z > 2.0, "z={}", c.pose.position.z);
        assert!(c.pose.position.x > 0.29 && c.pose.position.x < 0.31);
        assert_eq!(ctl.velocity.x, 0.0);
        assert_eq!(ctl.velocity.z, 0.0);
    }

    #[test]
    fn yaw_is_smoothed_not_snapped() {
        let ground = flat_ground();
        let colliders = ColliderRegistry::new();
        let world = StaticWorld { colliders: &colliders, ground: Some(&ground) };
        let params = PhysicsParams::default();
        let mut c = character_at(Vec3::new(0.3, 0.0, 0.2));
        let mut ctl = PhysicsController::new(0.0);

        ctl.request(Direction::Right, &params);
        ctl.step(&mut c, &world, &params);
        assert!(c.pose.yaw > 0.0 && c.pose.yaw < std::f32::consts::FRAC_PI_2);
        simulate(&mut ctl, &mut c, &world, 1.0);
        assert!((c.pose.yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-3);
    }

    #[test]
    fn wall_stops_horizontal_travel() {
        let ground = flat_ground();
        let mut colliders = ColliderRegistry::new();
        colliders.add_terrain([Aabb::new(Vec3::new(-5.0, 0.0, 1.5), Vec3::new(5.0, 4.0, 2.0))]);
        let world = StaticWorld { colliders: &colliders, ground: Some(&ground) };
        let mut c = character_at(Vec3::new(0.3, 0.0, 0.2));
        let mut ctl = PhysicsController::new(0.0);
        simulate(&mut ctl, &mut c, &world, 0.2);

        ctl.request(Direction::Up, &PhysicsParams::default());
        simulate(&mut ctl, &mut c, &world, 1.5);
        assert!(c.pose.position.z < 1.5, "passed through wall: z={}", c.pose.position.z);
    }

    #[test]
    fn box_penetration_pushes_out_sideways() {
        let capsule = Capsule { start: Vec3::new(0.8, 0.4, 0.0), end: Vec3::new(0.8, 1.4, 0.0), radius: 0.4 };
        let bounds = Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(0.5, 2.0, 1.0));
        let (n, depth) = capsule_box_penetration(&capsule, &bounds).unwrap();
        assert!((n - Vec3::X).length() < 1e-5);
        assert!((depth - 0.1).abs() < 1e-5);

        let clear = capsule.translated(Vec3::X);
        assert!(capsule_box_penetration(&clear, &bounds).is_none());
    }
}
