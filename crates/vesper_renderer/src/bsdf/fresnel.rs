//! Fresnel reflectance.

use crate::Color;

/// Schlick weight `(1 - cos)^5`.
#[inline]
pub fn schlick_weight(cos_theta: f32) -> f32 {
    let x = (1.0 - cos_theta).clamp(0.0, 1.0);
    let x2 = x * x;
    x2 * x2 * x
}

/// Schlick approximation with a scalar `r0`.
#[inline]
pub fn schlick(r0: f32, cos_theta: f32) -> f32 {
    r0 + (1.0 - r0) * schlick_weight(cos_theta)
}

/// Schlick approximation with a colored `r0`.
#[inline]
pub fn schlick_color(r0: Color, cos_theta: f32) -> Color {
    r0 + (Color::ONE - r0) * schlick_weight(cos_theta)
}

/// Normal incidence reflectance of an interface with relative index `eta`.
#[inline]
pub fn schlick_r0_from_relative_ior(eta: f32) -> f32 {
    let r = (eta - 1.0) / (eta + 1.0);
    r * r
}

/// Unpolarized Fresnel reflectance of a dielectric interface.
///
/// `cos_theta_i` is measured on the `eta_i` side; a negative cosine means the
/// light arrives from the `eta_t` side and the indices are swapped.
pub fn dielectric(cos_theta_i: f32, eta_i: f32, eta_t: f32) -> f32 {
    let mut cos_theta_i = cos_theta_i.clamp(-1.0, 1.0);
    let (mut eta_i, mut eta_t) = (eta_i, eta_t);
    if cos_theta_i < 0.0 {
        std::mem::swap(&mut eta_i, &mut eta_t);
        cos_theta_i = -cos_theta_i;
    }

    let sin_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0).sqrt();
    let sin_theta_t = eta_i / eta_t * sin_theta_i;
    if sin_theta_t >= 1.0 {
        return 1.0;
    }
    let cos_theta_t = (1.0 - sin_theta_t * sin_theta_t).max(0.0).sqrt();

    let r_parallel = (eta_t * cos_theta_i - eta_i * cos_theta_t) / (eta_t * cos_theta_i + eta_i * cos_theta_t);
    let r_perpendicular = (eta_i * cos_theta_i - eta_t * cos_theta_t) / (eta_i * cos_theta_i + eta_t * cos_theta_t);
    0.5 * (r_parallel * r_parallel + r_perpendicular * r_perpendicular)
}
