//! Local shading frames.
//!
//! Shading happens in a Y-up tangent space: x is the tangent, y the normal
//! and z the bitangent, so `cos(theta)` of a local direction is its `y`.

use crate::{Mat3, Vec3};

/// Build two unit vectors orthogonal to `n` (and to each other).
///
/// Branchless construction from Duff et al. 2017, "Building an Orthonormal
/// Basis, Revisited".
pub fn make_orthogonal_basis(n: Vec3) -> (Vec3, Vec3) {
    let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;

    let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);

    (tangent, bitangent)
}

/// Orthonormal tangent/normal/bitangent triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangentFrame {
    pub tangent: Vec3,
    pub normal: Vec3,
    pub bitangent: Vec3,
}

impl TangentFrame {
    /// Frame around `normal` with an arbitrary tangent.
    pub fn from_normal(normal: Vec3) -> Self {
        let (tangent, _) = make_orthogonal_basis(normal);
        Self {
            tangent,
            normal,
            bitangent: normal.cross(tangent),
        }
    }

    /// Frame from a normal and an authored tangent.
    ///
    /// The tangent is re-orthogonalized against the normal; `handedness` is the
    /// sign stored in the tangent's w component. Falls back to
    /// [`TangentFrame::from_normal`] when the tangent is parallel to the normal.
    pub fn from_normal_tangent(normal: Vec3, tangent: Vec3, handedness: f32) -> Self {
        let t = tangent - normal * normal.dot(tangent);
        if t.length_squared() < 1e-12 {
            return Self::from_normal(normal);
        }
        let t = t.normalize();
        let sign = if handedness < 0.0 { -1.0 } else { 1.0 };
        Self {
            tangent: t,
            normal,
            bitangent: normal.cross(t) * sign,
        }
    }

    /// Columns are (tangent, normal, bitangent).
    pub fn tangent_to_world(&self) -> Mat3 {
        Mat3::from_cols(self.tangent, self.normal, self.bitangent)
    }

    /// Inverse of [`TangentFrame::tangent_to_world`]; rows are (tangent, normal, bitangent).
    pub fn world_to_tangent(&self) -> Mat3 {
        self.tangent_to_world().transpose()
    }

    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.tangent), v.dot(self.normal), v.dot(self.bitangent))
    }

    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.tangent * v.x + self.normal * v.y + self.bitangent * v.z
    }
}
