// Scene graph loading.
//
// The asset loader hands over a flat node list (JSON). Each node becomes one
// ECS entity; names are resolved here, once, into SceneBindings and
// capability components, so nothing downstream matches on strings per frame.

use std::path::Path;

use bevy_ecs::prelude::*;
use glam::{Mat4, Quat, Vec3};
use serde::Deserialize;
use thiserror::Error;

use super::components::*;
use super::mesh::TriMesh;
use super::systems::{is_in_subtree, propagate_world_transforms, subtree_meshes};

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read scene file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scene: {0}")]
    Json(#[from] serde_json::Error),
    #[error("node {node} ({name:?}) has parent {parent}, which is not an earlier node")]
    InvalidParent { node: usize, name: String, parent: usize },
    #[error("node {node} ({name:?}) has triangle index {index} but only {vertices} vertices")]
    IndexOutOfRange { node: usize, name: String, index: u32, vertices: usize },
}

// ============================================================================
// DESCRIPTION (loader output)
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneDescription {
    pub nodes: Vec<NodeDescription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeDescription {
    pub name: String,
    /// Index of the parent in `nodes`; must precede this node.
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub translation: [f32; 3],
    /// Rotation about +Y in radians.
    #[serde(default)]
    pub rotation_y: f32,
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub mesh: Option<MeshDescription>,
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeshDescription {
    #[serde(default)]
    pub positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub indices: Vec<u32>,
}

impl NodeDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            translation: [0.0; 3],
            rotation_y: 0.0,
            scale: unit_scale(),
            mesh: None,
        }
    }

    pub fn with_parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn at(mut self, translation: Vec3) -> Self {
        self.translation = translation.to_array();
        self
    }

    pub fn with_mesh(mut self, mesh: &TriMesh) -> Self {
        self.mesh = Some(MeshDescription {
            positions: mesh.positions.iter().map(|p| p.to_array()).collect(),
            indices: mesh.indices.clone(),
        });
        self
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::from_array(self.scale),
            Quat::from_rotation_y(self.rotation_y),
            Vec3::from_array(self.translation),
        )
    }
}

impl SceneDescription {
    pub fn from_json_str(json: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Append a node and return its index.
    pub fn push(&mut self, node: NodeDescription) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Check parent ordering and triangle indices before anything is spawned.
    pub fn validate(&self) -> Result<(), SceneError> {
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                if parent >= i {
                    return Err(SceneError::InvalidParent { node: i, name: node.name.clone(), parent });
                }
            }
            if let Some(mesh) = &node.mesh {
                let vertices = mesh.positions.len();
                if let Some(&index) = mesh.indices.iter().find(|&&ix| ix as usize >= vertices) {
                    return Err(SceneError::IndexOutOfRange { node: i, name: node.name.clone(), index, vertices });
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// NAME CONTRACT
// ============================================================================

/// Node names that carry meaning for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SceneNames {
    pub character: String,
    pub level: String,
    pub interactive: Vec<String>,
}

impl Default for SceneNames {
    fn default() -> Self {
        Self {
            character: "Man".into(),
            level: "Level_1".into(),
            interactive: (1..=6).map(|i| format!("Board_{i}")).collect(),
        }
    }
}

/// Entities resolved from the name contract at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneBindings {
    pub character: Option<Entity>,
    pub level: Option<Entity>,
    pub interactive: Vec<Entity>,
    /// All spawned node entities, in description order.
    pub nodes: Vec<Entity>,
}

// ============================================================================
// SPAWNING
// ============================================================================

/// Spawn every node, compute world matrices and resolve the name contract.
pub fn spawn_scene(world: &mut World, desc: &SceneDescription, names: &SceneNames) -> Result<SceneBindings, SceneError> {
    desc.validate()?;

    let mut bindings = SceneBindings::default();
    let mut depths: Vec<u32> = Vec::with_capacity(desc.nodes.len());

    for node in &desc.nodes {
        let depth = node.parent.map_or(0, |p| depths[p] + 1);
        depths.push(depth);

        let mut entity = world.spawn((
            NodeName(node.name.clone()),
            LocalTransform(node.local_matrix()),
            WorldTransform::default(),
            HierarchyDepth(depth),
        ));
        if let Some(parent) = node.parent {
            entity.insert(SceneParent(bindings.nodes[parent]));
        }
        if let Some(mesh) = &node.mesh {
            let positions = mesh.positions.iter().map(|p| Vec3::from_array(*p)).collect();
            entity.insert(MeshGeometry(TriMesh::new(positions, mesh.indices.clone())));
        }
        let id = entity.id();

        // First match wins for the singular roles.
        if node.name == names.character && bindings.character.is_none() {
            world.entity_mut(id).insert(CharacterRoot);
            bindings.character = Some(id);
        }
        if node.name == names.level && bindings.level.is_none() {
            world.entity_mut(id).insert(LevelRoot);
            bindings.level = Some(id);
        }
        if names.interactive.iter().any(|n| *n == node.name) {
            world.entity_mut(id).insert(Interactive { name: node.name.clone() });
            bindings.interactive.push(id);
        }
        bindings.nodes.push(id);
    }

    propagate_world_transforms(world);
    tag_pick_targets(world, &bindings.interactive);

    if bindings.character.is_none() {
        log::warn!("scene has no character node named {:?}", names.character);
    }
    if bindings.level.is_none() {
        log::warn!("scene has no level node named {:?}", names.level);
    }
    log::info!(
        "spawned {} nodes ({} interactive)",
        bindings.nodes.len(),
        bindings.interactive.len()
    );
    Ok(bindings)
}

/// Attach `PickTarget` to every mesh under an interactive node, pointing at
/// the nearest interactive ancestor.
fn tag_pick_targets(world: &mut World, interactive: &[Entity]) {
    for &owner in interactive {
        for mesh in subtree_meshes(world, owner) {
            let nearest = world
                .get::<PickTarget>(mesh)
                .map(|t| t.owner)
                .filter(|&current| is_in_subtree(world, current, owner));
            // Keep an existing owner that is itself nested inside `owner`.
            if nearest.is_none() {
                world.entity_mut(mesh).insert(PickTarget { owner });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::systems::subtree_bounds;

    fn board_scene() -> SceneDescription {
        let mut desc = SceneDescription::default();
        let root = desc.push(NodeDescription::new("Scene"));
        let board = desc.push(NodeDescription::new("Board_2").with_parent(root).at(Vec3::new(5.0, 0.0, 0.0)));
        desc.push(
            NodeDescription::new("Board_2_frame")
                .with_parent(board)
                .with_mesh(&TriMesh::cuboid(Vec3::ZERO, Vec3::ONE)),
        );
        desc.push(NodeDescription::new("Man").with_parent(root).with_mesh(&TriMesh::cuboid(Vec3::ZERO, Vec3::ONE)));
        desc
    }

    #[test]
    fn names_resolve_once_into_bindings() {
        let mut world = World::new();
        let bindings = spawn_scene(&mut world, &board_scene(), &SceneNames::default()).unwrap();
        assert_eq!(bindings.nodes.len(), 4);
        assert_eq!(bindings.interactive, vec![bindings.nodes[1]]);
        assert_eq!(bindings.character, Some(bindings.nodes[3]));
        assert_eq!(bindings.level, None);
        assert!(world.get::<CharacterRoot>(bindings.nodes[3]).is_some());
    }

    #[test]
    fn child_mesh_points_at_named_ancestor() {
        let mut world = World::new();
        let bindings = spawn_scene(&mut world, &board_scene(), &SceneNames::default()).unwrap();
        let frame = bindings.nodes[2];
        assert_eq!(world.get::<PickTarget>(frame).map(|t| t.owner), Some(bindings.nodes[1]));
        assert!(world.get::<PickTarget>(bindings.nodes[3]).is_none());
    }

    #[test]
    fn nested_board_owns_its_own_meshes() {
        let mut desc = board_scene();
        let outer = 1;
        let inner = desc.push(NodeDescription::new("Board_1").with_parent(outer).at(Vec3::new(0.0, 2.0, 0.0)));
        desc.push(
            NodeDescription::new("Board_1_sign")
                .with_parent(inner)
                .with_mesh(&TriMesh::cuboid(Vec3::ZERO, Vec3::ONE)),
        );
        let mut world = World::new();
        let bindings = spawn_scene(&mut world, &desc, &SceneNames::default()).unwrap();
        let owner = |node: usize| world.get::<PickTarget>(bindings.nodes[node]).map(|t| t.owner);

        assert_eq!(owner(5), Some(bindings.nodes[inner]));
        assert_eq!(owner(2), Some(bindings.nodes[outer]));
    }

    #[test]
    fn world_matrices_compose_parent_chain() {
        let mut world = World::new();
        let bindings = spawn_scene(&mut world, &board_scene(), &SceneNames::default()).unwrap();
        let b = subtree_bounds(&mut world, bindings.nodes[1]).unwrap();
        assert_eq!(b.min, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(b.max, Vec3::new(6.0, 1.0, 1.0));
    }

    #[test]
    fn forward_parent_is_rejected() {
        let mut desc = SceneDescription::default();
        desc.push(NodeDescription::new("a").with_parent(1));
        desc.push(NodeDescription::new("b"));
        let err = spawn_scene(&mut World::new(), &desc, &SceneNames::default()).unwrap_err();
        assert!(matches!(err, SceneError::InvalidParent { node: 0, parent: 1, .. }));
    }

    #[test]
    fn bad_triangle_index_is_rejected() {
        let mut desc = SceneDescription::default();
        let mut node = NodeDescription::new("Level_1");
        node.mesh = Some(MeshDescription { positions: vec![[0.0; 3]; 3], indices: vec![0, 1, 3] });
        desc.push(node);
        assert!(matches!(desc.validate(), Err(SceneError::IndexOutOfRange { index: 3, .. })));
    }

    #[test]
    fn parses_json_with_defaults() {
        let json = r#"{ "nodes": [
            { "name": "Level_1", "mesh": { "positions": [[0,0,0],[1,0,0],[0,0,1]], "indices": [0,1,2] } },
            { "name": "Man", "parent": 0, "translation": [1, 2, 3] }
        ] }"#;
        let desc = SceneDescription::from_json_str(json).unwrap();
        assert_eq!(desc.nodes.len(), 2);
        assert_eq!(desc.nodes[1].scale, [1.0, 1.0, 1.0]);
        assert_eq!(desc.nodes[1].parent, Some(0));
        assert_eq!(desc.nodes[0].mesh.as_ref().unwrap().indices, vec![0, 1, 2]);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(SceneDescription::from_json_str("{ nodes: "), Err(SceneError::Json(_))));
    }
}
