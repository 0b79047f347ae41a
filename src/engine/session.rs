// One play session over a loaded level.
//
// Owns the ECS world and everything derived from it at load time (colliders,
// ground sampler, character, picker) and routes input and frame ticks to the
// active movement controller. Until `load_scene` succeeds every input and
// query is a no-op.
//
// Load order matters: colliders and ground must exist before the character
// is placed, and the character before any movement is validated.

use bevy_ecs::prelude::*;
use glam::{EulerRot, Mat4, Quat, Vec3};

use super::aabb::Ray;
use super::camera::ViewCamera;
use super::character::{Character, Pose};
use super::cluster::extract_colliders;
use super::colliders::ColliderRegistry;
use super::components::{SceneParent, WorldTransform};
use super::config::{MovementMode, SessionConfig};
use super::grid::build_grid;
use super::ground::GroundSampler;
use super::input::InputState;
use super::movement::{Direction, MoveOutcome, StepController};
use super::physics::{PhysicsController, StaticWorld};
use super::picker::{CursorHint, InteractionPicker};
use super::scene::{spawn_scene, SceneBindings, SceneDescription, SceneError};
use super::systems::{set_local_transform, subtree_bounds, subtree_world_mesh};

/// The controller chosen by `movement_mode`.
#[derive(Debug, Clone)]
pub enum MovementController {
    Stepped(StepController),
    Physics(PhysicsController),
}

impl MovementController {
    fn for_mode(mode: MovementMode, initial_yaw: f32) -> Self {
        match mode {
            MovementMode::Stepped => MovementController::Stepped(StepController::new()),
            MovementMode::Physics => MovementController::Physics(PhysicsController::new(initial_yaw)),
        }
    }

    pub fn is_moving(&self) -> bool {
        match self {
            MovementController::Stepped(c) => c.is_moving(),
            MovementController::Physics(c) => c.is_moving(),
        }
    }
}

/// The character's scene node and the scale to preserve when re-posing it.
#[derive(Debug, Clone, Copy)]
struct CharacterNode {
    entity: Entity,
    scale: Vec3,
}

pub struct Session {
    config: SessionConfig,
    world: World,
    bindings: SceneBindings,
    colliders: ColliderRegistry,
    ground: Option<GroundSampler>,
    character: Option<Character>,
    character_node: Option<CharacterNode>,
    picker: InteractionPicker,
    controller: MovementController,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let controller = MovementController::for_mode(config.movement_mode, 0.0);
        Self {
            config,
            world: World::new(),
            bindings: SceneBindings::default(),
            colliders: ColliderRegistry::new(),
            ground: None,
            character: None,
            character_node: None,
            picker: InteractionPicker::new(),
            controller,
        }
    }

    // ========================================================================
    // LOADING
    // ========================================================================

    /// Replace the current scene. On error the session is left empty.
    pub fn load_scene(&mut self, desc: &SceneDescription) -> Result<(), SceneError> {
        self.world = World::new();
        self.bindings = SceneBindings::default();
        self.colliders = ColliderRegistry::new();
        self.ground = None;
        self.character = None;
        self.character_node = None;
        self.picker = InteractionPicker::new();
        self.controller = MovementController::for_mode(self.config.movement_mode, 0.0);

        self.bindings = spawn_scene(&mut self.world, desc, &self.config.names)?;
        self.build_level();
        self.build_interactive_colliders();
        self.place_character();
        self.picker = InteractionPicker::from_world(&mut self.world);

        let yaw = self.character.as_ref().map_or(0.0, |c| c.pose.yaw);
        self.controller = MovementController::for_mode(self.config.movement_mode, yaw);
        self.write_back_pose();
        Ok(())
    }

    fn build_level(&mut self) {
        let Some(level) = self.bindings.level else {
            return;
        };
        let mesh = subtree_world_mesh(&mut self.world, level);
        if mesh.is_empty() {
            log::warn!("level node {:?} has no geometry; no terrain colliders, no ground", self.config.names.level);
            return;
        }

        let grid = build_grid(&mesh, &Mat4::IDENTITY, self.config.colliders.grid_params());
        let boxes = extract_colliders(&grid, self.config.colliders.cluster_params());
        self.colliders.add_terrain(boxes);
        log::info!("level: {} cells -> {} terrain colliders", grid.len(), self.colliders.terrain_count());

        let ground = GroundSampler::from_mesh(&mesh, &Mat4::IDENTITY, self.config.ground.probe_height);
        log::info!("ground sampler: {} triangles", ground.triangle_count());
        self.ground = Some(ground);
    }

    fn build_interactive_colliders(&mut self) {
        for &entity in &self.bindings.interactive {
            match subtree_bounds(&mut self.world, entity) {
                Some(bounds) => self.colliders.add_interactive(entity, bounds),
                None => log::warn!("interactive node {entity:?} has no geometry; not solid"),
            }
        }
    }

    fn place_character(&mut self) {
        let Some(entity) = self.bindings.character else {
            return;
        };
        let Some(world_matrix) = self.world.get::<WorldTransform>(entity).map(|w| w.0) else {
            return;
        };
        let (scale, rotation, position) = world_matrix.to_scale_rotation_translation();
        let (yaw, _, _) = rotation.to_euler(EulerRot::YXZ);
        let body = subtree_world_mesh(&mut self.world, entity);
        let Some(mut character) =
            Character::from_world_points(Pose { position, yaw }, &body.positions, self.config.character)
        else {
            log::warn!("character node {:?} has no geometry; movement disabled", self.config.names.character);
            return;
        };

        match character.snap_to_ground(self.ground.as_ref()) {
            Some(ground_y) => log::info!(
                "character spawned on ground y={ground_y:.3} at ({:.2}, {:.2}, {:.2})",
                character.pose.position.x, character.pose.position.y, character.pose.position.z,
            ),
            None => log::warn!("no ground below character spawn; feet placed at y=0"),
        }
        self.character = Some(character);
        self.character_node = Some(CharacterNode { entity, scale });
    }

    pub fn is_ready(&self) -> bool {
        self.character.is_some()
    }

    // ========================================================================
    // INPUT
    // ========================================================================

    /// One directional press. `None` while no character is loaded.
    pub fn handle_direction(&mut self, direction: Direction) -> Option<MoveOutcome> {
        let character = self.character.as_mut()?;
        let outcome = match &mut self.controller {
            MovementController::Stepped(ctl) => {
                ctl.request(character, direction, self.ground.as_ref(), &self.colliders)
            }
            MovementController::Physics(ctl) => {
                if ctl.request(direction, &self.config.physics) {
                    MoveOutcome::Launched
                } else {
                    MoveOutcome::Busy
                }
            }
        };
        Some(outcome)
    }

    /// Key name form (`"w"`, `"ArrowUp"`, ...). Unknown keys are ignored.
    pub fn handle_key(&mut self, key: &str) -> Option<MoveOutcome> {
        let direction = Direction::from_key_name(key)?;
        self.handle_direction(direction)
    }

    /// Consume one frame of input: queued presses, pointer and click.
    /// Returns the name of a clicked interactive object.
    pub fn handle_input(&mut self, input: &mut InputState) -> Option<String> {
        let directions: Vec<Direction> = input.drain_directions().collect();
        for direction in directions {
            self.handle_direction(direction);
        }

        match input.pointer_ndc() {
            Some(ndc) => {
                let ray = self.config.camera.ray_from_ndc(ndc, input.aspect());
                self.update_pointer(&ray);
            }
            None => self.picker.clear(),
        }

        if input.clicked() { self.click() } else { None }
    }

    /// Per-frame pointer ray in world space.
    pub fn update_pointer(&mut self, ray: &Ray) -> Option<&str> {
        self.picker.update(ray)
    }

    pub fn click(&self) -> Option<String> {
        self.picker.click().map(str::to_owned)
    }

    // ========================================================================
    // FRAME
    // ========================================================================

    /// Advance movement by `dt` seconds and pose the character node.
    pub fn tick(&mut self, dt: f32) {
        let Some(character) = self.character.as_mut() else {
            return;
        };
        match &mut self.controller {
            MovementController::Stepped(ctl) => ctl.tick(character, dt),
            MovementController::Physics(ctl) => {
                let world = StaticWorld { colliders: &self.colliders, ground: self.ground.as_ref() };
                ctl.tick(character, &world, &self.config.physics, dt);
            }
        }
        self.write_back_pose();
    }

    fn write_back_pose(&mut self) {
        let (Some(pose), Some(node)) = (self.rendered_pose(), self.character_node) else {
            return;
        };
        let world_matrix =
            Mat4::from_scale_rotation_translation(node.scale, Quat::from_rotation_y(pose.yaw), pose.position);
        let parent_world = self
            .world
            .get::<SceneParent>(node.entity)
            .and_then(|p| self.world.get::<WorldTransform>(p.0))
            .map_or(Mat4::IDENTITY, |w| w.0);
        set_local_transform(&mut self.world, node.entity, parent_world.inverse() * world_matrix);
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Committed pose (no hop or bounce).
    pub fn character_pose(&self) -> Option<Pose> {
        self.character.as_ref().map(|c| c.pose)
    }

    /// Pose as drawn: committed pose plus animation offsets.
    pub fn rendered_pose(&self) -> Option<Pose> {
        let mut pose = self.character_pose()?;
        if let MovementController::Stepped(ctl) = &self.controller {
            pose.position.y += ctl.vertical_offset();
        }
        Some(pose)
    }

    pub fn is_moving(&self) -> bool {
        self.controller.is_moving()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.picker.hovered()
    }

    pub fn cursor_hint(&self) -> CursorHint {
        self.picker.cursor_hint()
    }

    pub fn colliders(&self) -> &ColliderRegistry {
        &self.colliders
    }

    pub fn ground(&self) -> Option<&GroundSampler> {
        self.ground.as_ref()
    }

    pub fn character(&self) -> Option<&Character> {
        self.character.as_ref()
    }

    pub fn bindings(&self) -> &SceneBindings {
        &self.bindings
    }

    pub fn camera(&self) -> &ViewCamera {
        &self.config.camera
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mesh::TriMesh;
    use crate::engine::scene::NodeDescription;
    use glam::Vec2;
    use std::f32::consts::FRAC_PI_4;

    fn flat_level() -> SceneDescription {
        let mut desc = SceneDescription::default();
        let root = desc.push(NodeDescription::new("Scene"));
        desc.push(
            NodeDescription::new("Level_1")
                .with_parent(root)
                .with_mesh(&TriMesh::plane(Vec2::splat(-30.0), Vec2::splat(30.0), 0.0)),
        );
        desc.push(
            NodeDescription::new("Man")
                .with_parent(root)
                .at(Vec3::new(0.3, 5.0, 0.2))
                .with_mesh(&TriMesh::cuboid(Vec3::new(-0.3, 0.0, -0.2), Vec3::new(0.3, 1.8, 0.2))),
        );
        desc
    }

    #[test]
    fn inputs_are_noops_before_load() {
        let mut s = Session::new(SessionConfig::default());
        assert!(!s.is_ready());
        assert_eq!(s.handle_direction(Direction::Up), None);
        s.tick(0.1);
        assert_eq!(s.character_pose(), None);
        assert_eq!(s.update_pointer(&Ray::new(Vec3::ZERO, Vec3::Z)), None);
        assert!(s.colliders().is_empty());
    }

    #[test]
    fn load_snaps_character_to_ground() {
        let mut s = Session::new(SessionConfig::default());
        s.load_scene(&flat_level()).unwrap();
        let pose = s.character_pose().unwrap();
        assert!(pose.position.y.abs() < 1e-4, "y={}", pose.position.y);
        assert!(s.ground().is_some());
        // A flat floor yields no terrain colliders.
        assert_eq!(s.colliders().terrain_count(), 0);
    }

    #[test]
    fn step_writes_pose_to_character_node() {
        let mut s = Session::new(SessionConfig::default());
        s.load_scene(&flat_level()).unwrap();
        assert!(matches!(s.handle_direction(Direction::Up), Some(MoveOutcome::Started { .. })));
        assert!(s.is_moving());
        for _ in 0..30 {
            s.tick(1.0 / 60.0);
        }
        assert!(!s.is_moving());
        let pose = s.character_pose().unwrap();
        assert!((pose.position.z - 3.2).abs() < 1e-4);

        let entity = s.bindings().character.unwrap();
        let world = s.world().get::<WorldTransform>(entity).unwrap().0;
        assert!((world.transform_point3(Vec3::ZERO) - pose.position).length() < 1e-4);
    }

    #[test]
    fn physics_mode_launches_instead_of_stepping() {
        let config = SessionConfig { movement_mode: MovementMode::Physics, ..SessionConfig::default() };
        let mut s = Session::new(config);
        s.load_scene(&flat_level()).unwrap();
        assert_eq!(s.handle_direction(Direction::Left), Some(MoveOutcome::Launched));
        assert_eq!(s.handle_direction(Direction::Left), Some(MoveOutcome::Busy));
        for _ in 0..120 {
            s.tick(1.0 / 60.0);
        }
        assert!(!s.is_moving());
        assert!(s.character_pose().unwrap().position.x > 1.0);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut s = Session::new(SessionConfig::default());
        s.load_scene(&flat_level()).unwrap();
        assert_eq!(s.handle_key("q"), None);
        assert!(!s.is_moving());
        assert!(s.handle_key("ArrowUp").is_some());
    }

    #[test]
    fn failed_load_leaves_session_empty() {
        let mut s = Session::new(SessionConfig::default());
        s.load_scene(&flat_level()).unwrap();
        let mut bad = SceneDescription::default();
        bad.push(NodeDescription::new("Man").with_parent(3));
        assert!(s.load_scene(&bad).is_err());
        assert!(!s.is_ready());
    }

    #[test]
    fn failed_load_drops_step_in_flight() {
        let mut s = Session::new(SessionConfig::default());
        s.load_scene(&flat_level()).unwrap();
        assert!(matches!(s.handle_direction(Direction::Up), Some(MoveOutcome::Started { .. })));
        s.tick(1.0 / 60.0);
        assert!(s.is_moving());

        let mut bad = SceneDescription::default();
        bad.push(NodeDescription::new("Man").with_parent(3));
        assert!(s.load_scene(&bad).is_err());
        assert!(!s.is_moving());
        assert_eq!(s.rendered_pose(), None);
    }

    #[test]
    fn diagonal_spawn_body_stays_tight_after_turning() {
        let mut desc = flat_level();
        desc.nodes[2].rotation_y = FRAC_PI_4;
        let mut s = Session::new(SessionConfig::default());
        s.load_scene(&desc).unwrap();

        let spawn = s.character().unwrap().world_bounds().size();
        let diagonal = (0.3 + 0.2) * FRAC_PI_4.cos() * 2.0;
        assert!((spawn.x - diagonal).abs() < 1e-4, "{spawn:?}");

        assert!(matches!(s.handle_direction(Direction::Up), Some(MoveOutcome::Started { .. })));
        for _ in 0..30 {
            s.tick(1.0 / 60.0);
        }
        let character = s.character().unwrap();
        assert!(character.pose.yaw.abs() < 1e-4);
        let size = character.world_bounds().size();
        assert!((size - Vec3::new(0.6, 1.8, 0.4)).length() < 1e-4, "{size:?}");
    }
}
