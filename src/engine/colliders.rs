// Static collision volumes consulted by movement resolution.
// Filled once at load time; never edited while the level is alive.

use bevy_ecs::entity::Entity;

use super::aabb::Aabb;

/// Where a collision volume came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColliderSource {
    /// Synthesized from a level geometry cluster.
    Terrain,
    /// Bounds of a named interactive object.
    Interactive(Entity),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub bounds: Aabb,
    pub source: ColliderSource,
}

/// Flat, immutable-after-load set of blocking volumes.
#[derive(Debug, Clone, Default)]
pub struct ColliderRegistry {
    volumes: Vec<Collider>,
}

impl ColliderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_terrain(&mut self, boxes: impl IntoIterator<Item = Aabb>) {
        self.volumes.extend(
            boxes.into_iter().map(|bounds| Collider { bounds, source: ColliderSource::Terrain }),
        );
    }

    pub fn add_interactive(&mut self, entity: Entity, bounds: Aabb) {
        self.volumes.push(Collider { bounds, source: ColliderSource::Interactive(entity) });
    }

    /// True iff `bounds` intersects any registered volume.
    pub fn overlaps(&self, bounds: &Aabb) -> bool {
        self.volumes.iter().any(|c| c.bounds.intersects(bounds))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collider> {
        self.volumes.iter()
    }

    pub fn len(&self) -> usize { self.volumes.len() }

    pub fn is_empty(&self) -> bool { self.volumes.is_empty() }

    pub fn terrain_count(&self) -> usize {
        self.volumes.iter().filter(|c| c.source == ColliderSource::Terrain).count()
    }
}
