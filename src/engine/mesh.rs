// Triangle meshes for level, character and prop geometry.
//
// Two-layer construction:
//   PolyMesh (n-gon faces, procedural) → triangulate() → TriMesh (triangles, queried)
//
// TriMesh positions are local-space; callers pass the node's world matrix
// to every query so the same geometry can be re-posed without copying.

use glam::{Mat4, Vec2, Vec3};

use super::aabb::{Aabb, Ray};

const RAY_EPSILON: f32 = 1e-7;
/// Barycentric slack so rays through a shared edge hit at least one triangle.
const EDGE_EPSILON: f32 = 1e-5;

// ============================================================================
// POLY MESH
// ============================================================================

/// Intermediate polygon mesh for procedural level pieces.
/// Supports n-gon faces (arbitrary vertex count per face), CCW from outside.
/// Only used at load time; heap allocation per face is acceptable.
#[derive(Debug, Clone, Default)]
pub struct PolyMesh {
    pub positions: Vec<Vec3>,
    pub faces:     Vec<Vec<usize>>,  // each face = CCW-ordered vertex index list
}

impl PolyMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, pos: Vec3) -> usize {
        let idx = self.positions.len();
        self.positions.push(pos);
        idx
    }

    /// Add a face by vertex indices (CCW order).
    pub fn add_face(&mut self, indices: Vec<usize>) {
        debug_assert!(indices.len() >= 3, "Face must have at least 3 vertices");
        self.faces.push(indices);
    }

    pub fn vertex_count(&self) -> usize { self.positions.len() }

    /// Append an axis-aligned box spanning `min..max`.
    ///
    /// Vertex layout:
    ///   0: (min.x, min.y, max.z)  front-bottom-left
    ///   1: (max.x, min.y, max.z)  front-bottom-right
    ///   2: (max.x, max.y, max.z)  front-top-right
    ///   3: (min.x, max.y, max.z)  front-top-left
    ///   4: (max.x, min.y, min.z)  back-bottom-right
    ///   5: (min.x, min.y, min.z)  back-bottom-left
    ///   6: (min.x, max.y, min.z)  back-top-left
    ///   7: (max.x, max.y, min.z)  back-top-right
    pub fn add_cuboid(&mut self, min: Vec3, max: Vec3) {
        let base = self.vertex_count();
        self.add_vertex(Vec3::new(min.x, min.y, max.z));
        self.add_vertex(Vec3::new(max.x, min.y, max.z));
        self.add_vertex(Vec3::new(max.x, max.y, max.z));
        self.add_vertex(Vec3::new(min.x, max.y, max.z));
        self.add_vertex(Vec3::new(max.x, min.y, min.z));
        self.add_vertex(Vec3::new(min.x, min.y, min.z));
        self.add_vertex(Vec3::new(min.x, max.y, min.z));
        self.add_vertex(Vec3::new(max.x, max.y, min.z));

        let v = |i: usize| base + i;
        self.add_face(vec![v(0), v(1), v(2), v(3)]); // front  (+Z)
        self.add_face(vec![v(4), v(5), v(6), v(7)]); // back   (-Z)
        self.add_face(vec![v(5), v(0), v(3), v(6)]); // left   (-X)
        self.add_face(vec![v(1), v(4), v(7), v(2)]); // right  (+X)
        self.add_face(vec![v(3), v(2), v(7), v(6)]); // top    (+Y)
        self.add_face(vec![v(5), v(4), v(1), v(0)]); // bottom (-Y)
    }

    /// Append a horizontal quad at height `y`, facing +Y.
    pub fn add_floor(&mut self, min_x: f32, min_z: f32, max_x: f32, max_z: f32, y: f32) {
        let a = self.add_vertex(Vec3::new(min_x, y, max_z));
        let b = self.add_vertex(Vec3::new(max_x, y, max_z));
        let c = self.add_vertex(Vec3::new(max_x, y, min_z));
        let d = self.add_vertex(Vec3::new(min_x, y, min_z));
        self.add_face(vec![a, b, c, d]);
    }

    /// Fan-triangulate every face (from vertex 0) into a TriMesh.
    pub fn triangulate(&self) -> TriMesh {
        let mut indices: Vec<u32> = Vec::new();
        for face in &self.faces {
            let n = face.len();
            for i in 1..(n - 1) {
                indices.push(face[0]     as u32);
                indices.push(face[i]     as u32);
                indices.push(face[i + 1] as u32);
            }
        }
        TriMesh { positions: self.positions.clone(), indices }
    }
}

// ============================================================================
// TRIANGLE MESH
// ============================================================================

/// Indexed triangle mesh in local space.
///
/// An empty `positions` list is legal and means "no position data": every
/// query on it returns nothing instead of failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    pub positions: Vec<Vec3>,
    pub indices:   Vec<u32>,
}

/// Nearest ray hit against a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub point:    Vec3,
}

impl TriMesh {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    pub fn cuboid(min: Vec3, max: Vec3) -> Self {
        let mut poly = PolyMesh::new();
        poly.add_cuboid(min, max);
        poly.triangulate()
    }

    /// Horizontal quad at height `y` spanning `min..max` on X/Z.
    pub fn plane(min: Vec2, max: Vec2, y: f32) -> Self {
        let mut poly = PolyMesh::new();
        poly.add_floor(min.x, min.y, max.x, max.y, y);
        poly.triangulate()
    }

    pub fn is_empty(&self) -> bool { self.positions.is_empty() }

    pub fn vertex_count(&self) -> usize { self.positions.len() }

    pub fn triangle_count(&self) -> usize { self.indices.len() / 3 }

    /// Vertices transformed to world space, in storage order.
    pub fn world_positions<'a>(&'a self, world: &'a Mat4) -> impl Iterator<Item = Vec3> + 'a {
        self.positions.iter().map(move |p| world.transform_point3(*p))
    }

    /// Exact world-space bounds of the vertices (not a re-fit local box).
    pub fn world_bounds(&self, world: &Mat4) -> Option<Aabb> {
        Aabb::from_points(self.world_positions(world).filter(|p| p.is_finite()))
    }

    /// World-space triangles. Index triples that point past the vertex list
    /// are skipped.
    pub fn world_triangles(&self, world: &Mat4) -> Vec<[Vec3; 3]> {
        let world_pos: Vec<Vec3> = self.world_positions(world).collect();
        self.indices
            .chunks_exact(3)
            .filter_map(|tri| {
                let a = *world_pos.get(tri[0] as usize)?;
                let b = *world_pos.get(tri[1] as usize)?;
                let c = *world_pos.get(tri[2] as usize)?;
                Some([a, b, c])
            })
            .collect()
    }

    /// Nearest hit of `ray` (world space) against this mesh posed by `world`.
    pub fn raycast(&self, ray: &Ray, world: &Mat4) -> Option<RayHit> {
        raycast_triangles(ray, &self.world_triangles(world))
    }
}

/// Nearest hit among pre-transformed triangles.
pub fn raycast_triangles(ray: &Ray, triangles: &[[Vec3; 3]]) -> Option<RayHit> {
    let mut best: Option<f32> = None;
    for tri in triangles {
        if let Some(t) = ray_triangle(ray, tri) {
            if best.is_none_or(|b| t < b) {
                best = Some(t);
            }
        }
    }
    best.map(|distance| RayHit { distance, point: ray.at(distance) })
}

/// Möller–Trumbore, double-sided. Returns the hit distance along the ray.
pub fn ray_triangle(ray: &Ray, tri: &[Vec3; 3]) -> Option<f32> {
    let edge1 = tri[1] - tri[0];
    let edge2 = tri[2] - tri[0];
    let pvec = ray.dir.cross(edge2);
    let det = edge1.dot(pvec);
    if det.abs() < RAY_EPSILON {
        // Ray parallel to the triangle plane (or degenerate triangle).
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = ray.origin - tri[0];
    let u = tvec.dot(pvec) * inv_det;
    if !(-EDGE_EPSILON..=1.0 + EDGE_EPSILON).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = ray.dir.dot(qvec) * inv_det;
    if v < -EDGE_EPSILON || u + v > 1.0 + EDGE_EPSILON {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    (t >= 0.0).then_some(t)
}
