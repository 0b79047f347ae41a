// Engine module - level collision, character movement and picking
//
// Geometry:    aabb, mesh, grid, cluster, colliders, ground
// Movement:    tween, character, movement (stepped), physics (capsule)
// Scene graph: components, systems, scene (bevy_ecs world)
// Frame loop:  camera, input, picker, config, session

pub mod aabb;
pub mod camera;
pub mod character;
pub mod cluster;
pub mod colliders;
pub mod components;
pub mod config;
pub mod demo;
pub mod grid;
pub mod ground;
pub mod input;
pub mod mesh;
pub mod movement;
pub mod physics;
pub mod picker;
pub mod scene;
pub mod session;
pub mod systems;
pub mod tween;

// Re-export commonly used items
pub use aabb::{Aabb, Ray};
pub use camera::{Projection, ViewCamera};
pub use character::{Character, CharacterParams, Pose};
pub use colliders::ColliderRegistry;
pub use components::*;
pub use config::{ConfigError, MovementMode, SessionConfig};
pub use input::InputState;
pub use mesh::TriMesh;
pub use movement::{Direction, MoveOutcome, RejectReason};
pub use picker::{CursorHint, InteractionPicker};
pub use scene::{SceneBindings, SceneDescription, SceneError, SceneNames};
pub use session::Session;
