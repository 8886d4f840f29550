//! Triangle mesh geometry.
//!
//! Meshes carry optional per-vertex shading attributes (normals, tangents,
//! uvs) that surface construction interpolates at hit points. Barycentric
//! coordinates follow the `(1 - u - v, u, v)` convention of the intersector.

use vesper_math::{Aabb, Vec2, Vec3, Vec4};

/// A mesh consisting of vertex positions, optional shading attributes and
/// triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional)
    pub normals: Option<Vec<Vec3>>,

    /// Vertex tangents; w holds the bitangent sign
    pub tangents: Option<Vec<Vec4>>,

    /// UV coordinates (optional - one per vertex)
    pub uvs: Option<Vec<Vec2>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        let bounds = Self::compute_bounds(&positions);
        Self {
            positions,
            normals,
            tangents: None,
            uvs: None,
            indices,
            bounds,
        }
    }

    /// Builder method to attach UV coordinates.
    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// Builder method to attach tangents.
    pub fn with_tangents(mut self, tangents: Vec<Vec4>) -> Self {
        self.tangents = Some(tangents);
        self
    }

    /// Compute axis-aligned bounding box from positions.
    fn compute_bounds(positions: &[Vec3]) -> Aabb {
        positions
            .iter()
            .fold(Aabb::EMPTY, |bounds, p| bounds.include_point(*p))
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// Faces are counter-clockwise; each vertex normal is the normalized
    /// area-weighted average of the faces sharing it.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (face[0] as usize, face[1] as usize, face[2] as usize);
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let face_normal = (self.positions[i1] - p0).cross(self.positions[i2] - p0);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            let len = normal.length();
            if len > 0.0 {
                *normal /= len;
            } else {
                *normal = Vec3::Y; // Default up normal for degenerate cases
            }
        }

        self.normals = Some(normals);
    }

    /// Check if the mesh has normals.
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Check if the mesh has UV coordinates.
    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Vertex indices of a triangle, or `None` when the primitive id is out
    /// of range or references a missing vertex.
    pub fn triangle(&self, primitive_id: u32) -> Option<[usize; 3]> {
        let base = primitive_id as usize * 3;
        let face = self.indices.get(base..base + 3)?;
        let tri = [face[0] as usize, face[1] as usize, face[2] as usize];
        if tri.iter().any(|&i| i >= self.positions.len()) {
            return None;
        }
        Some(tri)
    }

    /// Interpolated vertex normal (not normalized).
    pub fn interpolate_normal(&self, primitive_id: u32, bary: Vec2) -> Option<Vec3> {
        let normals = self.normals.as_ref()?;
        let [i0, i1, i2] = self.triangle(primitive_id)?;
        let (w0, w1, w2) = barycentric_weights(bary);
        Some(*normals.get(i0)? * w0 + *normals.get(i1)? * w1 + *normals.get(i2)? * w2)
    }

    /// Interpolated vertex tangent; w carries the sign of the first vertex.
    pub fn interpolate_tangent(&self, primitive_id: u32, bary: Vec2) -> Option<Vec4> {
        let tangents = self.tangents.as_ref()?;
        let [i0, i1, i2] = self.triangle(primitive_id)?;
        let (w0, w1, w2) = barycentric_weights(bary);
        let (t0, t1, t2) = (*tangents.get(i0)?, *tangents.get(i1)?, *tangents.get(i2)?);
        let xyz = t0.truncate() * w0 + t1.truncate() * w1 + t2.truncate() * w2;
        Some(xyz.extend(t0.w))
    }

    pub fn interpolate_uv(&self, primitive_id: u32, bary: Vec2) -> Option<Vec2> {
        let uvs = self.uvs.as_ref()?;
        let [i0, i1, i2] = self.triangle(primitive_id)?;
        let (w0, w1, w2) = barycentric_weights(bary);
        Some(*uvs.get(i0)? * w0 + *uvs.get(i1)? * w1 + *uvs.get(i2)? * w2)
    }

    /// Extract triangle vertices as `[v0, v1, v2]` triplets.
    ///
    /// Triangles with out-of-range indices are skipped with a warning; the
    /// returned list pairs each triangle with its primitive id.
    pub fn extract_triangle_vertices(&self) -> Vec<(u32, [Vec3; 3])> {
        let mut triangles = Vec::with_capacity(self.triangle_count());

        for primitive_id in 0..self.triangle_count() as u32 {
            match self.triangle(primitive_id) {
                Some([i0, i1, i2]) => triangles.push((
                    primitive_id,
                    [self.positions[i0], self.positions[i1], self.positions[i2]],
                )),
                None => log::warn!(
                    "Invalid triangle indices for primitive {}, vertex count: {}",
                    primitive_id,
                    self.positions.len()
                ),
            }
        }

        triangles
    }
}

#[inline]
fn barycentric_weights(bary: Vec2) -> (f32, f32, f32) {
    (1.0 - bary.x - bary.y, bary.x, bary.y)
}
