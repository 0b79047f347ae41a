// Discrete step-validated movement.
//
// State machine per character:
//   Idle --(direction, validated)--> Transitioning --(timeline done)--> Idle
//   Idle --(direction, rejected)---> Idle + bounce feedback
//
// A step is validated against, in order: ground presence at the target,
// height change (max_step), and the collider registry. All three rejections
// look identical to the player: one short vertical bounce.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Vec2, Vec3};

use super::character::{Character, Pose};
use super::colliders::ColliderRegistry;
use super::ground::GroundSampler;
use super::tween::{shortest_angle_delta, Channel, Ease, Segment, Timeline};

// ============================================================================
// INPUT MAPPING
// ============================================================================

/// A single discrete directional input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Unit step on the XZ plane (x, z).
    pub fn step(self) -> Vec2 {
        match self {
            Direction::Up    => Vec2::new(0.0, 1.0),
            Direction::Down  => Vec2::new(0.0, -1.0),
            Direction::Left  => Vec2::new(1.0, 0.0),
            Direction::Right => Vec2::new(-1.0, 0.0),
        }
    }

    /// Facing after moving this way.
    pub fn yaw(self) -> f32 {
        match self {
            Direction::Up    => 0.0,
            Direction::Down  => PI,
            Direction::Left  => -FRAC_PI_2,
            Direction::Right => FRAC_PI_2,
        }
    }

    /// Case-insensitive key name mapping (`w`/`ArrowUp`, ...). Anything else
    /// is not a direction.
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "w" | "arrowup"    => Some(Direction::Up),
            "s" | "arrowdown"  => Some(Direction::Down),
            "a" | "arrowleft"  => Some(Direction::Left),
            "d" | "arrowright" => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Target of one step: horizontal position and facing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    pub target_xz: Vec2,
    pub yaw: f32,
}

impl MoveRequest {
    pub fn from_direction(pose: &Pose, direction: Direction, distance: f32) -> Self {
        let here = Vec2::new(pose.position.x, pose.position.z);
        Self {
            target_xz: here + direction.step() * distance,
            yaw: direction.yaw(),
        }
    }
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// Why a step was refused. Only logged; the player sees the same bounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NoGround,
    TooSteep,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    /// Transition committed toward `target`.
    Started { target: Pose },
    Rejected(RejectReason),
    /// Physics mode: hop impulse applied; the outcome is decided by simulation.
    Launched,
    /// A transition is already running; input dropped.
    Busy,
}

// ============================================================================
// STEP CONTROLLER
// ============================================================================

#[derive(Debug, Clone, Default)]
enum StepState {
    #[default]
    Idle,
    Transitioning { timeline: Timeline, target: Pose },
}

/// Mode A movement: one validated, animated step at a time.
#[derive(Debug, Clone, Default)]
pub struct StepController {
    state: StepState,
    /// Rejection bounce. Runs independently of the step state.
    feedback: Option<Timeline>,
}

impl StepController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.state, StepState::Transitioning { .. })
    }

    pub fn is_bouncing(&self) -> bool {
        self.feedback.is_some()
    }

    /// Validate a step and either start its transition or play the bounce.
    pub fn request(
        &mut self,
        character: &mut Character,
        direction: Direction,
        ground: Option<&GroundSampler>,
        colliders: &ColliderRegistry,
    ) -> MoveOutcome {
        if self.is_moving() {
            return MoveOutcome::Busy;
        }
        let request = MoveRequest::from_direction(&character.pose, direction, character.params.move_distance);

        match validate(character, &request, ground, colliders) {
            Ok(target) => {
                log::debug!(
                    "step {:?} accepted: ({:.2}, {:.2}, {:.2}) -> ({:.2}, {:.2}, {:.2})",
                    direction,
                    character.pose.position.x, character.pose.position.y, character.pose.position.z,
                    target.position.x, target.position.y, target.position.z,
                );
                self.state = StepState::Transitioning {
                    timeline: step_timeline(character, target),
                    target,
                };
                MoveOutcome::Started { target }
            }
            Err(reason) => {
                log::debug!("step {:?} rejected: {:?}", direction, reason);
                self.feedback = Some(bounce_timeline(character));
                MoveOutcome::Rejected(reason)
            }
        }
    }

    /// Advance animations by `dt` seconds, writing the base pose back to the
    /// character. The step snaps to its exact target when it completes.
    pub fn tick(&mut self, character: &mut Character, dt: f32) {
        if let StepState::Transitioning { timeline, target } = &mut self.state {
            timeline.advance(dt);
            if timeline.is_finished() {
                character.pose.position = target.position;
                character.set_yaw(target.yaw);
                self.state = StepState::Idle;
            } else {
                let p = &mut character.pose.position;
                p.x = timeline.sample(Channel::PositionX).unwrap_or(p.x);
                p.y = timeline.sample(Channel::PositionY).unwrap_or(p.y);
                p.z = timeline.sample(Channel::PositionZ).unwrap_or(p.z);
                character.pose.yaw = timeline.sample(Channel::Yaw).unwrap_or(character.pose.yaw);
            }
        }

        if let Some(bounce) = &mut self.feedback {
            bounce.advance(dt);
            if bounce.is_finished() {
                self.feedback = None;
            }
        }
    }

    /// Vertical animation offset (hop plus bounce) on top of the base pose.
    pub fn vertical_offset(&self) -> f32 {
        let hop = match &self.state {
            StepState::Transitioning { timeline, .. } => timeline.sample_additive(Channel::OffsetY),
            StepState::Idle => 0.0,
        };
        let bounce = self.feedback.as_ref().map_or(0.0, |b| b.sample_additive(Channel::OffsetY));
        hop + bounce
    }
}

/// Check a request against ground and colliders; returns the target pose.
pub fn validate(
    character: &Character,
    request: &MoveRequest,
    ground: Option<&GroundSampler>,
    colliders: &ColliderRegistry,
) -> Result<Pose, RejectReason> {
    let ground_y = ground
        .and_then(|g| g.height_at(request.target_xz.x, request.target_xz.y))
        .ok_or(RejectReason::NoGround)?;

    let target_y = character.standing_height(ground_y);
    if (target_y - character.pose.position.y).abs() > character.params.max_step {
        return Err(RejectReason::TooSteep);
    }

    let target_pos = Vec3::new(request.target_xz.x, target_y, request.target_xz.y);
    let future = character.world_bounds().translated(target_pos - character.pose.position);
    if colliders.overlaps(&future) {
        return Err(RejectReason::Blocked);
    }

    Ok(Pose { position: target_pos, yaw: request.yaw })
}

fn step_timeline(character: &Character, target: Pose) -> Timeline {
    let from = character.pose;
    let duration = character.params.move_duration;
    let final_yaw = from.yaw + shortest_angle_delta(from.yaw, target.yaw);

    let mut tl = Timeline::new();
    tl.push(Segment::new(Channel::PositionX, from.position.x, target.position.x, 0.0, duration))
        .push(Segment::new(Channel::PositionY, from.position.y, target.position.y, 0.0, duration))
        .push(Segment::new(Channel::PositionZ, from.position.z, target.position.z, 0.0, duration))
        .push(Segment::new(Channel::Yaw, from.yaw, final_yaw, 0.0, duration))
        .push(Segment::new(Channel::OffsetY, 0.0, character.params.jump_height, 0.0, duration / 2.0).yoyo());
    tl
}

fn bounce_timeline(character: &Character) -> Timeline {
    let mut tl = Timeline::new();
    tl.push(
        Segment::new(Channel::OffsetY, 0.0, character.params.bounce_height, 0.0, character.params.bounce_duration)
            .with_ease(Ease::QuadOut)
            .yoyo(),
    );
    tl
}
