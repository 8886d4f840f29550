//! State carried along a light or camera subpath.

use vesper_math::Vec3;

use crate::error::ConfigError;
use crate::Color;

/// Bit width of a path's owner index (pixel or light path).
pub const INDEX_BITS: u32 = 26;

/// Largest owner index a path can carry.
pub const MAX_PATH_INDEX: usize = (1 << INDEX_BITS) - 1;

/// Check that `index` fits the owner index width.
pub fn checked_path_index(index: usize) -> Result<u32, ConfigError> {
    if index > MAX_PATH_INDEX {
        return Err(ConfigError::IndexOutOfRange {
            index,
            bits: INDEX_BITS,
        });
    }
    Ok(index as u32)
}

/// A subpath being extended by the integrator.
///
/// `d_vcm`, `d_vc` and `d_vm` are the running reciprocal pdf ratios of the
/// recursive MIS formulation; they stay non-negative.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathState {
    pub position: Vec3,
    pub direction: Vec3,
    pub throughput: Color,
    pub d_vcm: f32,
    pub d_vc: f32,
    pub d_vm: f32,
    /// Number of segments traced so far
    pub path_length: u32,
    /// False only for paths leaving an infinitely distant light
    pub is_area_measure: bool,
    /// Last scattering event was specular (a Dirac delta)
    pub specular_path: bool,
    index: u32,
}

impl PathState {
    /// Create a fresh path owned by pixel or light path `index`.
    pub fn new(index: u32, position: Vec3, direction: Vec3) -> Self {
        debug_assert!(
            index as usize <= MAX_PATH_INDEX,
            "path index {} exceeds {} bits",
            index,
            INDEX_BITS
        );
        Self {
            position,
            direction,
            throughput: Color::ONE,
            d_vcm: 0.0,
            d_vc: 0.0,
            d_vm: 0.0,
            path_length: 1,
            is_area_measure: true,
            specular_path: true,
            index: index & MAX_PATH_INDEX as u32,
        }
    }

    /// Pixel (camera paths) or light path (light paths) this state belongs to.
    pub fn index(&self) -> u32 {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_index_width() {
        assert_eq!(checked_path_index(0).unwrap(), 0);
        assert_eq!(checked_path_index(MAX_PATH_INDEX).unwrap(), MAX_PATH_INDEX as u32);
        assert!(matches!(
            checked_path_index(MAX_PATH_INDEX + 1),
            Err(ConfigError::IndexOutOfRange { bits: 26, .. })
        ));
    }

    #[test]
    fn test_new_state() {
        let state = PathState::new(12345, Vec3::ZERO, Vec3::Z);
        assert_eq!(state.index(), 12345);
        assert_eq!(state.path_length, 1);
        assert_eq!(state.throughput, Color::ONE);
        assert_eq!((state.d_vcm, state.d_vc, state.d_vm), (0.0, 0.0, 0.0));
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn test_index_overflow_asserts() {
        PathState::new(1 << INDEX_BITS, Vec3::ZERO, Vec3::Z);
    }
}
