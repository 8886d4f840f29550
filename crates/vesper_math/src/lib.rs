//! Math primitives shared by the Vesper crates.
//!
//! Re-exports glam and adds the ray tracing types (rays, intervals, boxes),
//! the tangent frame convention used by the shading code, and the sample
//! warps used by the integrator.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod frame;
mod interval;
mod ray;
pub mod sampling;
mod transform;

pub use aabb::Aabb;
pub use frame::{make_orthogonal_basis, TangentFrame};
pub use interval::Interval;
pub use ray::Ray;
pub use transform::Mat4Ext;

/// Clamp to [0, 1].
#[inline]
pub fn saturate(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Linear interpolation between two scalars.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
