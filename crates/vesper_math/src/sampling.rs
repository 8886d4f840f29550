//! Sample warps from the unit square.
//!
//! Hemisphere warps are in the Y-up tangent space used by the shading code.

use std::f32::consts::PI;

use crate::{Vec2, Vec3};

/// Cosine-weighted direction on the +Y hemisphere.
pub fn cosine_hemisphere(u0: f32, u1: f32) -> Vec3 {
    let r = u0.sqrt();
    let phi = 2.0 * PI * u1;
    Vec3::new(r * phi.cos(), (1.0 - u0).max(0.0).sqrt(), r * phi.sin())
}

/// Solid angle pdf of [`cosine_hemisphere`].
#[inline]
pub fn cosine_hemisphere_pdf(cos_theta: f32) -> f32 {
    cos_theta.abs() / PI
}

/// Uniformly distributed unit vector.
pub fn uniform_sphere(u0: f32, u1: f32) -> Vec3 {
    let y = 1.0 - 2.0 * u0;
    let r = (1.0 - y * y).max(0.0).sqrt();
    let phi = 2.0 * PI * u1;
    Vec3::new(r * phi.cos(), y, r * phi.sin())
}

pub const UNIFORM_SPHERE_PDF: f32 = 1.0 / (4.0 * PI);

/// Shirley-Chiu concentric map onto the unit disk.
pub fn concentric_disk(u0: f32, u1: f32) -> Vec2 {
    let a = 2.0 * u0 - 1.0;
    let b = 2.0 * u1 - 1.0;
    if a == 0.0 && b == 0.0 {
        return Vec2::ZERO;
    }

    let (r, phi) = if a * a > b * b {
        (a, (PI / 4.0) * (b / a))
    } else {
        (b, PI / 2.0 - (PI / 4.0) * (a / b))
    };
    Vec2::new(r * phi.cos(), r * phi.sin())
}

pub const CONCENTRIC_DISK_PDF: f32 = 1.0 / PI;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_hemisphere_is_unit_and_upper() {
        for i in 0..16 {
            for j in 0..16 {
                let d = cosine_hemisphere((i as f32 + 0.5) / 16.0, (j as f32 + 0.5) / 16.0);
                assert!((d.length() - 1.0).abs() < 0.001);
                assert!(d.y >= 0.0);
            }
        }
    }

    #[test]
    fn test_uniform_sphere_covers_both_poles() {
        assert!((uniform_sphere(0.0, 0.0) - Vec3::Y).length() < 0.001);
        assert!((uniform_sphere(1.0, 0.0) + Vec3::Y).length() < 0.001);
        let d = uniform_sphere(0.3, 0.8);
        assert!((d.length() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_concentric_disk_inside_unit_circle() {
        assert_eq!(concentric_disk(0.5, 0.5), Vec2::ZERO);
        for i in 0..10 {
            let p = concentric_disk(i as f32 / 9.0, 1.0 - i as f32 / 13.0);
            assert!(p.length() <= 1.0 + 1e-5);
        }
        assert!((concentric_disk(1.0, 0.5).length() - 1.0).abs() < 0.001);
    }
}
