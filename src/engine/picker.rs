// Pointer picking against interactive objects.
//
// At load time every PickTarget mesh is flattened into world-space triangles
// tagged with its owning interactive node. Each frame the pointer ray is
// tested against those (box first, then triangles); the nearest hit names
// the hovered object. A frame with no hit clears the hover.

use bevy_ecs::prelude::*;
use glam::Vec3;

use super::aabb::{Aabb, Ray};
use super::components::{Interactive, MeshGeometry, PickTarget, WorldTransform};
use super::mesh::raycast_triangles;

/// Cursor feedback while hovering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorHint {
    Pointer,
    #[default]
    Default,
}

#[derive(Debug, Clone)]
struct Pickable {
    owner: Entity,
    bounds: Aabb,
    triangles: Vec<[Vec3; 3]>,
}

/// Resolved hover target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hover {
    pub entity: Entity,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct InteractionPicker {
    pickables: Vec<Pickable>,
    names: Vec<(Entity, String)>,
    hovered: Option<Hover>,
}

impl InteractionPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every pickable mesh from the world. World matrices must be
    /// up to date.
    pub fn from_world(world: &mut World) -> Self {
        let mut named = world.query::<(Entity, &Interactive)>();
        let names: Vec<(Entity, String)> = named.iter(world).map(|(e, i)| (e, i.name.clone())).collect();

        let mut query = world.query::<(&MeshGeometry, &WorldTransform, &PickTarget)>();
        let pickables: Vec<Pickable> = query
            .iter(world)
            .filter_map(|(mesh, wt, target)| {
                let bounds = mesh.0.world_bounds(&wt.0)?;
                let triangles = mesh.0.world_triangles(&wt.0);
                if triangles.is_empty() {
                    return None;
                }
                Some(Pickable { owner: target.owner, bounds, triangles })
            })
            .collect();

        log::info!("picker: {} meshes across {} interactive objects", pickables.len(), names.len());
        Self { pickables, names, hovered: None }
    }

    pub fn len(&self) -> usize { self.pickables.len() }

    pub fn is_empty(&self) -> bool { self.pickables.is_empty() }

    /// Per-frame update. Returns the hovered name, if any.
    pub fn update(&mut self, ray: &Ray) -> Option<&str> {
        let next = self.pick(ray);
        if next != self.hovered {
            match &next {
                Some(h) => log::trace!("hover -> {}", h.name),
                None => log::trace!("hover cleared"),
            }
        }
        self.hovered = next;
        self.hovered()
    }

    /// Forget the hover, e.g. when the pointer leaves the window.
    pub fn clear(&mut self) {
        self.hovered = None;
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_ref().map(|h| h.name.as_str())
    }

    pub fn cursor_hint(&self) -> CursorHint {
        if self.hovered.is_some() { CursorHint::Pointer } else { CursorHint::Default }
    }

    /// Name to dispatch for a click this frame, if something is hovered.
    pub fn click(&self) -> Option<&str> {
        let name = self.hovered()?;
        log::info!("clicked {name}");
        Some(name)
    }

    fn pick(&self, ray: &Ray) -> Option<Hover> {
        let mut best: Option<(f32, Entity)> = None;
        for p in &self.pickables {
            let Some(box_hit) = ray.intersect_aabb(&p.bounds) else { continue };
            // From inside the box any triangle may be the nearest hit.
            let enter = if p.bounds.contains_point(ray.origin) { 0.0 } else { box_hit };
            if best.is_some_and(|(d, _)| enter > d) {
                continue;
            }
            if let Some(hit) = raycast_triangles(ray, &p.triangles) {
                if best.is_none_or(|(d, _)| hit.distance < d) {
                    best = Some((hit.distance, p.owner));
                }
            }
        }
        let (_, owner) = best?;
        let name = self.names.iter().find(|(e, _)| *e == owner)?.1.clone();
        Some(Hover { entity: owner, name })
    }
}
