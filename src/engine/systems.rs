// ECS systems over the scene graph.
// Run after spawning the scene and whenever a node's LocalTransform changes.

use bevy_ecs::prelude::*;
use glam::Mat4;

use super::aabb::Aabb;
use super::components::*;
use super::mesh::TriMesh;

/// Recompute every WorldTransform from LocalTransform and the parent chain.
/// Parents are processed before children by sorting on HierarchyDepth.
pub fn propagate_world_transforms(world: &mut World) {
    let mut query = world.query::<(Entity, &HierarchyDepth)>();
    let mut order: Vec<(u32, Entity)> = query.iter(world).map(|(e, d)| (d.0, e)).collect();
    order.sort_by_key(|(depth, e)| (*depth, e.index()));

    for (_, entity) in order {
        let local = world.get::<LocalTransform>(entity).copied().unwrap_or_default().0;
        let parent_world = world
            .get::<SceneParent>(entity)
            .and_then(|p| world.get::<WorldTransform>(p.0))
            .map(|w| w.0)
            .unwrap_or(Mat4::IDENTITY);
        if let Some(mut wt) = world.get_mut::<WorldTransform>(entity) {
            wt.0 = parent_world * local;
        }
    }
}

/// True if `ancestor` is `entity` or one of its parents.
pub fn is_in_subtree(world: &World, entity: Entity, ancestor: Entity) -> bool {
    let mut current = Some(entity);
    while let Some(e) = current {
        if e == ancestor {
            return true;
        }
        current = world.get::<SceneParent>(e).map(|p| p.0);
    }
    false
}

/// Every mesh-bearing entity under `root` (inclusive).
pub fn subtree_meshes(world: &mut World, root: Entity) -> Vec<Entity> {
    let mut query = world.query_filtered::<Entity, With<MeshGeometry>>();
    let candidates: Vec<Entity> = query.iter(world).collect();
    candidates
        .into_iter()
        .filter(|&e| is_in_subtree(world, e, root))
        .collect()
}

/// World bounds of all geometry under `root`. `None` if it holds no vertices.
pub fn subtree_bounds(world: &mut World, root: Entity) -> Option<Aabb> {
    subtree_meshes(world, root)
        .into_iter()
        .filter_map(|e| {
            let mesh = world.get::<MeshGeometry>(e)?;
            let wt = world.get::<WorldTransform>(e)?;
            mesh.0.world_bounds(&wt.0)
        })
        .reduce(|a, b| a.union(&b))
}

/// Write a new local matrix for a node and refresh world matrices.
pub fn set_local_transform(world: &mut World, entity: Entity, local: Mat4) {
    if let Some(mut lt) = world.get_mut::<LocalTransform>(entity) {
        lt.0 = local;
    }
    propagate_world_transforms(world);
}

/// All geometry under `root` merged into one world-space mesh.
pub fn subtree_world_mesh(world: &mut World, root: Entity) -> TriMesh {
    let mut merged = TriMesh::default();
    for e in subtree_meshes(world, root) {
        let (Some(mesh), Some(wt)) = (world.get::<MeshGeometry>(e), world.get::<WorldTransform>(e)) else {
            continue;
        };
        let base = merged.positions.len() as u32;
        merged.positions.extend(mesh.0.world_positions(&wt.0));
        merged.indices.extend(mesh.0.indices.iter().map(|i| i + base));
    }
    merged
}
