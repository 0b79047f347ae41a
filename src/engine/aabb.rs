// Axis-aligned bounding boxes and rays.
// Shared by collider synthesis, movement validation and pointer picking.

use glam::Vec3;

/// Closed axis-aligned box in world coordinates.
///
/// Boxes that merely touch count as intersecting, so a character flush
/// against a wall is already blocked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point. `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(first, first);
        for p in iter {
            bounds.include_point(p);
        }
        Some(bounds)
    }

    pub fn include_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Grow uniformly by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> Aabb {
        Aabb::new(self.min - Vec3::splat(margin), self.max + Vec3::splat(margin))
    }

    pub fn translated(&self, offset: Vec3) -> Aabb {
        Aabb::new(self.min + offset, self.max + offset)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        !(other.max.x < self.min.x
            || other.min.x > self.max.x
            || other.max.y < self.min.y
            || other.min.y > self.max.y
            || other.max.z < self.min.z
            || other.min.z > self.max.z)
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        p.clamp(self.min, self.max)
    }
}

/// A half-line used for ground probes and pointer picking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub dir: Vec3,
}

impl Ray {
    /// Normalizes `dir`. A zero direction yields a ray that hits nothing.
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir: dir.normalize_or_zero() }
    }

    /// Straight down from `height` above the XZ point.
    pub fn downward(x: f32, z: f32, height: f32) -> Self {
        Self { origin: Vec3::new(x, height, z), dir: Vec3::NEG_Y }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Slab test. Returns the entry distance, or the exit distance when the
    /// origin is inside the box.
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        if self.dir == Vec3::ZERO {
            return None;
        }
        let inv = Vec3::new(
            if self.dir.x.abs() < 1e-6 { f32::MAX } else { 1.0 / self.dir.x },
            if self.dir.y.abs() < 1e-6 { f32::MAX } else { 1.0 / self.dir.y },
            if self.dir.z.abs() < 1e-6 { f32::MAX } else { 1.0 / self.dir.z },
        );

        let t1 = (aabb.min - self.origin) * inv;
        let t2 = (aabb.max - self.origin) * inv;
        let tmin = t1.min(t2).max_element();
        let tmax = t1.max(t2).min_element();

        if tmax >= tmin && tmax >= 0.0 {
            Some(if tmin >= 0.0 { tmin } else { tmax })
        } else {
            None
        }
    }
}
