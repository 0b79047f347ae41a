// ECS components for scene nodes.
// One entity per node of the loaded scene graph.

use bevy_ecs::prelude::*;
use glam::Mat4;

use super::mesh::TriMesh;

/// Node name as authored in the scene file.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct NodeName(pub String);

/// Transform relative to the parent node.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform(pub Mat4);

impl Default for LocalTransform {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

/// Resolved world matrix. Recomputed by `propagate_world_transforms`.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform(pub Mat4);

impl Default for WorldTransform {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

/// Parent link in the scene graph. Roots have none.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneParent(pub Entity);

/// Depth below the root (roots are 0); lets propagation run parents first.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyDepth(pub u32);

/// Render geometry attached to a node, in local space.
#[derive(Component, Debug, Clone)]
pub struct MeshGeometry(pub TriMesh);

/// Capability tag: the node is a named interactive object.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct Interactive {
    pub name: String,
}

/// A pickable mesh and the interactive object it belongs to. Attached at
/// load time to every mesh inside an interactive subtree.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickTarget {
    pub owner: Entity,
}

/// Marks the controllable character's root node.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct CharacterRoot;

/// Marks the level geometry node.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct LevelRoot;
