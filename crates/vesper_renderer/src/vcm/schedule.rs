//! Per-iteration constants shared by every path of an iteration.

use std::f32::consts::PI;

use crate::error::ConfigError;

/// Merge radius for a 1-based iteration.
///
/// `radius = base / iteration^(0.5 * (1 - alpha))`, so the radius never
/// grows between iterations.
pub fn search_radius(base_radius: f32, radius_alpha: f32, iteration: u32) -> Result<f32, ConfigError> {
    if iteration < 1 {
        return Err(ConfigError::InvalidIteration(iteration));
    }
    if !(base_radius.is_finite() && base_radius > 0.0) {
        return Err(ConfigError::InvalidRadius(base_radius));
    }
    if !(radius_alpha > 0.0 && radius_alpha < 1.0) {
        return Err(ConfigError::InvalidRadiusAlpha(radius_alpha));
    }

    let exponent = 0.5 * (1.0 - radius_alpha);
    Ok(base_radius / (iteration as f32).powf(exponent))
}

/// Technique weights and merge normalization for one iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VcmIterationConstants {
    /// Number of light vertices merged against (photon count)
    pub vm_count: f32,
    /// Number of light paths each camera vertex connects to
    pub vc_count: f32,
    pub vm_search_radius: f32,
    pub vm_search_radius_sqr: f32,
    /// `1 / (pi r^2 vm_count)`
    pub vm_normalization: f32,
    /// `pi r^2 vm_count / vc_count`
    pub vm_weight: f32,
    /// `vc_count / (pi r^2 vm_count)`
    pub vc_weight: f32,
}

impl VcmIterationConstants {
    pub fn calculate(
        vm_count: usize,
        vc_count: usize,
        base_radius: f32,
        radius_alpha: f32,
        iteration: u32,
    ) -> Result<Self, ConfigError> {
        if vm_count == 0 {
            return Err(ConfigError::ZeroPhotonCount);
        }
        if vc_count == 0 {
            return Err(ConfigError::ZeroConnectionCount);
        }

        let radius = search_radius(base_radius, radius_alpha, iteration)?;
        let radius_sqr = radius * radius;
        let vm_count = vm_count as f32;
        let vc_count = vc_count as f32;

        let eta_vcm = PI * radius_sqr * vm_count / vc_count;

        Ok(Self {
            vm_count,
            vc_count,
            vm_search_radius: radius,
            vm_search_radius_sqr: radius_sqr,
            vm_normalization: 1.0 / (PI * radius_sqr * vm_count),
            vm_weight: eta_vcm,
            vc_weight: 1.0 / eta_vcm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_is_monotone() {
        let mut previous = f32::INFINITY;
        for i in 1..200 {
            let r = search_radius(0.1, 0.75, i).unwrap();
            assert!(r <= previous);
            previous = r;
        }
        assert!((search_radius(0.1, 0.75, 1).unwrap() - 0.1).abs() < 1e-7);
    }

    #[test]
    fn test_radius_shrink_rate() {
        // alpha = 0.5 -> exponent 0.25, so iteration 16 halves the radius
        let r = search_radius(1.0, 0.5, 16).unwrap();
        assert!((r - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_radius_rejects_bad_input() {
        assert!(matches!(search_radius(1.0, 0.75, 0), Err(ConfigError::InvalidIteration(0))));
        assert!(matches!(search_radius(0.0, 0.75, 1), Err(ConfigError::InvalidRadius(_))));
        assert!(matches!(search_radius(1.0, 1.0, 1), Err(ConfigError::InvalidRadiusAlpha(_))));
    }

    #[test]
    fn test_weights_are_reciprocal() {
        for &(vm, vc, r, i) in &[(1usize, 1usize, 0.01f32, 1u32), (640 * 480, 1, 0.05, 7), (10, 3, 2.0, 100)] {
            let c = VcmIterationConstants::calculate(vm, vc, r, 0.75, i).unwrap();
            assert!((c.vm_weight * c.vc_weight - 1.0).abs() < 1e-4);
            assert!((c.vm_search_radius_sqr - c.vm_search_radius * c.vm_search_radius).abs() < 1e-9);
        }
    }

    #[test]
    fn test_normalization() {
        let c = VcmIterationConstants::calculate(100, 1, 0.1, 0.75, 1).unwrap();
        let expected = 1.0 / (PI * 0.01 * 100.0);
        assert!((c.vm_normalization - expected).abs() < 1e-5);
        assert!((c.vm_weight - PI).abs() < 1e-5);
    }

    #[test]
    fn test_zero_counts_are_errors() {
        assert!(matches!(
            VcmIterationConstants::calculate(0, 1, 0.1, 0.75, 1),
            Err(ConfigError::ZeroPhotonCount)
        ));
        assert!(matches!(
            VcmIterationConstants::calculate(1, 0, 0.1, 0.75, 1),
            Err(ConfigError::ZeroConnectionCount)
        ));
    }
}
