//! Ray intersection service and the hit records it produces.

use vesper_math::{Interval, Ray, Vec2, Vec3};

/// Record of a ray-surface intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitRecord {
    /// Point of intersection
    pub position: Vec3,
    /// Geometric normal in world space (unit, facing the triangle's front side)
    pub normal: Vec3,
    /// Unit direction back towards the ray origin
    pub view: Vec3,
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Bound on the floating point error of `position`
    pub error: f32,
    /// Barycentric coordinates of the hit within the primitive
    pub bary: Vec2,
    pub instance_id: u32,
    pub geometry_id: u32,
    pub primitive_id: u32,
}

/// Conservative absolute error of an intersection point.
#[inline]
pub fn hit_error_bound(position: Vec3, t: f32) -> f32 {
    const K_ERR: f32 = 32.0 * f32::EPSILON;
    K_ERR * position.abs().max_element().max(t)
}

/// Trait for scenes that can be queried with rays.
pub trait RayCaster: Send + Sync {
    /// Closest hit within `ray_t`, if any.
    fn cast_ray(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord>;

    /// True when anything blocks the ray within `ray_t`.
    fn occluded(&self, ray: &Ray, ray_t: Interval) -> bool {
        self.cast_ray(ray, ray_t).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_error_bound_scales_with_magnitude() {
        let near = hit_error_bound(Vec3::new(0.1, 0.2, 0.3), 0.5);
        let far = hit_error_bound(Vec3::new(100.0, -2000.0, 3.0), 10.0);

        assert!((near - 32.0 * f32::EPSILON * 0.5).abs() < 1e-9);
        assert!((far - 32.0 * f32::EPSILON * 2000.0).abs() < 1e-6);
    }
}
