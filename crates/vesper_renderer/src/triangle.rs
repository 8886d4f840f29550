//! World-space triangle primitive.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use vesper_math::{Aabb, Interval, Ray, Vec3};

/// A triangle tagged with the scene ids of the surface it came from.
#[derive(Clone, Debug)]
pub struct Triangle {
    /// Vertices
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    pub instance_id: u32,
    pub geometry_id: u32,
    pub primitive_id: u32,
    /// Bounding box
    bbox: Aabb,
}

/// Parametric result of a triangle test.
#[derive(Clone, Copy, Debug)]
pub struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    pub fn new(vertices: [Vec3; 3], instance_id: u32, geometry_id: u32, primitive_id: u32) -> Self {
        let [v0, v1, v2] = vertices;

        // Pad thin dimensions to avoid degenerate AABBs
        let delta = Vec3::splat(0.0001);
        let min = v0.min(v1).min(v2) - delta;
        let max = v0.max(v1).max(v2) + delta;

        Self {
            v0,
            v1,
            v2,
            instance_id,
            geometry_id,
            primitive_id,
            bbox: Aabb::from_points(min, max),
        }
    }

    /// Unit face normal; counter-clockwise vertices face the viewer.
    pub fn normal(&self) -> Vec3 {
        (self.v1 - self.v0).cross(self.v2 - self.v0).normalize_or_zero()
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    /// Möller-Trumbore ray-triangle intersection algorithm.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<TriangleHit> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-12 {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        if !ray_t.surrounds(t) {
            return None;
        }

        Some(TriangleHit { t, u, v })
    }
}
