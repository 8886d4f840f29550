//! Parameter ranges along rays.

/// Range of ray parameters (or coordinates along one axis).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Everything in front of an already offset ray origin.
    pub const FORWARD: Interval = Interval {
        min: 0.0,
        max: f32::INFINITY,
    };

    /// Parameters up to `distance`, pulled in by the relative `margin` so
    /// the surface at the far end is not reported.
    pub fn up_to(distance: f32, margin: f32) -> Self {
        Self::new(0.0, distance * (1.0 - margin))
    }

    /// Same range with the far end moved to `max`.
    pub fn with_max(self, max: f32) -> Self {
        Self::new(self.min, max)
    }

    /// True if `x` lies strictly inside `(min, max)`.
    pub fn surrounds(&self, x: f32) -> bool {
        self.min < x && x < self.max
    }

    pub const UNIVERSE: Interval = Interval {
        min: f32::NEG_INFINITY,
        max: f32::INFINITY,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surrounds_is_exclusive() {
        let interval = Interval::new(0.0, 10.0);
        assert!(!interval.surrounds(0.0));
        assert!(!interval.surrounds(10.0));
        assert!(interval.surrounds(5.0));
        assert!(Interval::FORWARD.surrounds(1e30));
        assert!(!Interval::FORWARD.surrounds(-1e-6));
    }

    #[test]
    fn test_up_to_excludes_endpoint() {
        let segment = Interval::up_to(10.0, 1e-3);
        assert!(segment.surrounds(9.98));
        assert!(!segment.surrounds(9.995));
        assert_eq!(Interval::FORWARD.with_max(3.0), Interval::new(0.0, 3.0));
    }

    #[test]
    fn test_universe_contains_everything_finite() {
        assert!(Interval::UNIVERSE.surrounds(-1e10));
        assert!(Interval::UNIVERSE.surrounds(0.0));
        assert!(!Interval::UNIVERSE.surrounds(f32::INFINITY));
    }
}
