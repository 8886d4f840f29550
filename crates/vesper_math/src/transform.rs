// Transform utilities for Mat4
//
// glam::Mat4 already provides transform_point3(), transform_vector3() and inverse().

use glam::{Mat3, Mat4, Vec3};
use crate::Aabb;

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform a surface normal (inverse-transpose of the upper 3x3).
    /// The result is normalized.
    fn transform_normal3(&self, normal: Vec3) -> Vec3;

    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;
}

impl Mat4Ext for Mat4 {
    fn transform_normal3(&self, normal: Vec3) -> Vec3 {
        let normal_matrix = Mat3::from_mat4(*self).inverse().transpose();
        (normal_matrix * normal).normalize_or_zero()
    }

    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        let lo = aabb.min();
        let hi = aabb.max();

        let mut result = Aabb::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            );
            result = result.include_point(self.transform_point3(corner));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_normal3_non_uniform_scale() {
        let mat = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let n = Vec3::new(1.0, 1.0, 0.0).normalize();
        let transformed = mat.transform_normal3(n);

        // Stays perpendicular to the scaled tangent
        let tangent = mat.transform_vector3(Vec3::new(1.0, -1.0, 0.0));
        assert!(transformed.dot(tangent).abs() < 0.001);
        assert!((transformed.length() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_transform_aabb_translation() {
        let mat = Mat4::from_translation(Vec3::new(5.0, 5.0, 5.0));
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let transformed = mat.transform_aabb(&aabb);

        assert!((transformed.min() - Vec3::new(5.0, 5.0, 5.0)).length() < 0.001);
        assert!((transformed.max() - Vec3::new(6.0, 6.0, 6.0)).length() < 0.001);
    }

    #[test]
    fn test_transform_aabb_rotation() {
        use std::f32::consts::PI;

        let mat = Mat4::from_rotation_y(PI / 4.0);
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let transformed = mat.transform_aabb(&aabb);

        assert!((transformed.max().x - 2.0_f32.sqrt()).abs() < 0.001);
        assert!((transformed.max().y - 1.0).abs() < 0.001);
    }
}
