//! Anisotropic GGX (Trowbridge-Reitz) microfacet distribution.
//!
//! Directions are in the Y-up tangent space: x along the tangent, z along
//! the bitangent. Masking uses the separable Smith form.

use std::f32::consts::PI;

use vesper_math::{saturate, Vec3};

/// Smallest alpha used, keeps the distribution finite for mirror-like
/// surfaces.
pub const MIN_ALPHA: f32 = 0.001;

/// Tangent and bitangent alphas from roughness and anisotropy.
pub fn anisotropic_params(roughness: f32, anisotropic: f32) -> (f32, f32) {
    let aspect = (1.0 - 0.9 * saturate(anisotropic)).sqrt();
    let r2 = roughness * roughness;
    ((r2 / aspect).max(MIN_ALPHA), (r2 * aspect).max(MIN_ALPHA))
}

/// Distribution of normals `D(wm)`.
pub fn anisotropic_d(wm: Vec3, ax: f32, ay: f32) -> f32 {
    let x = wm.x / ax;
    let z = wm.z / ay;
    let t = x * x + z * z + wm.y * wm.y;
    1.0 / (PI * ax * ay * t * t)
}

/// Smith masking of one direction.
pub fn separable_smith_g1(w: Vec3, ax: f32, ay: f32) -> f32 {
    let cos2 = w.y * w.y;
    if cos2 <= 0.0 {
        return 0.0;
    }
    let a2_tan2 = (w.x * w.x * ax * ax + w.z * w.z * ay * ay) / cos2;
    2.0 / (1.0 + (1.0 + a2_tan2).sqrt())
}

/// Isotropic Smith masking.
#[inline]
pub fn smith_g1(w: Vec3, alpha: f32) -> f32 {
    separable_smith_g1(w, alpha, alpha)
}

/// Sample a microfacet normal visible from `wo` (Heitz 2018).
///
/// `wo` must be in the upper hemisphere; the result is too.
pub fn sample_vndf(wo: Vec3, ax: f32, ay: f32, u0: f32, u1: f32) -> Vec3 {
    // Stretch into the hemisphere configuration
    let v = Vec3::new(ax * wo.x, wo.y, ay * wo.z).normalize();

    let len_sq = v.x * v.x + v.z * v.z;
    let t1 = if len_sq > 0.0 {
        Vec3::new(-v.z, 0.0, v.x) / len_sq.sqrt()
    } else {
        Vec3::X
    };
    let t2 = t1.cross(v);

    // Point on the projected disk, squeezed towards the visible half
    let r = u0.sqrt();
    let phi = 2.0 * PI * u1;
    let p1 = r * phi.cos();
    let p2 = r * phi.sin();
    let s = 0.5 * (1.0 + v.y);
    let p2 = (1.0 - s) * (1.0 - p1 * p1).max(0.0).sqrt() + s * p2;

    let n = t1 * p1 + t2 * p2 + v * (1.0 - p1 * p1 - p2 * p2).max(0.0).sqrt();

    // Unstretch
    Vec3::new(ax * n.x, n.y.max(0.0), ay * n.z).normalize()
}

/// Density of [`sample_vndf`] over microfacet normals.
pub fn vndf_pdf(w: Vec3, wm: Vec3, ax: f32, ay: f32) -> f32 {
    let cos = w.y.abs();
    if cos <= 0.0 {
        return 0.0;
    }
    separable_smith_g1(w, ax, ay) * w.dot(wm).abs() * anisotropic_d(wm, ax, ay) / cos
}
