use crate::Vec3;

/// A ray with an origin and a direction.
///
/// Directions produced by the camera, the lights and the BSDF are unit
/// length; the intersector does not rely on it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Unit ray from `from` towards `to`, with the distance between them.
    ///
    /// `None` when the points coincide.
    pub fn segment(from: Vec3, to: Vec3) -> Option<(Ray, f32)> {
        let delta = to - from;
        let distance = delta.length();
        if !(distance > 0.0 && distance.is_finite()) {
            return None;
        }
        Some((Ray::new(from, delta / distance), distance))
    }

    /// Point at parameter `t`.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}
