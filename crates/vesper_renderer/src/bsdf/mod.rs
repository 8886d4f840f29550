//! Surface scattering.
//!
//! Directions passed in and out of this module are world space unit
//! vectors pointing away from the surface: `v` towards the viewer (or the
//! previous path vertex) and `l` towards the light (or the next vertex).
//! Evaluated reflectance already includes `|cos(theta_l)|`.

pub(crate) mod disney;
pub mod fresnel;
pub mod ggx;

use vesper_core::ShaderType;
use vesper_math::Vec3;

use crate::sampler::Sampler;
use crate::surface::SurfaceParameters;
use crate::Color;

pub use disney::{
    calculate_extinction, calculate_lobe_pdfs, evaluate_disney, sample_disney,
    thin_transmission_roughness, LobePdfs,
};

bitflags::bitflags! {
    /// What kind of event a sampled direction represents.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SurfaceEventFlags: u8 {
        /// Light stays on the side it arrived from (or passes a thin sheet)
        const SCATTER = 1 << 0;
        /// Light enters or leaves a volume
        const TRANSMISSION = 1 << 1;
        /// Direction drawn from a delta distribution
        const DIRAC = 1 << 2;
    }
}

/// Phase function of the medium behind a transmission event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MediumPhaseFunction {
    #[default]
    Vacuum,
    Isotropic,
}

/// Homogeneous medium entered by a transmission event.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MediumParameters {
    pub phase: MediumPhaseFunction,
    pub extinction: Color,
}

/// A sampled scattering direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BsdfSample {
    /// Sampled direction (world space once returned from [`sample_bsdf`])
    pub wi: Vec3,
    /// Sample weight: `f * |cos(theta_i)| / pdf`
    pub reflectance: Color,
    pub forward_pdf_w: f32,
    pub reverse_pdf_w: f32,
    pub flags: SurfaceEventFlags,
    /// Only meaningful for transmission events
    pub medium: MediumParameters,
}

impl BsdfSample {
    pub fn is_dirac(&self) -> bool {
        self.flags.contains(SurfaceEventFlags::DIRAC)
    }

    pub fn is_transmission(&self) -> bool {
        self.flags.contains(SurfaceEventFlags::TRANSMISSION)
    }
}

/// Reflectance and solid angle pdfs for a fixed pair of directions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BsdfEval {
    pub reflectance: Color,
    /// Pdf of sampling `l` given `v`
    pub forward_pdf_w: f32,
    /// Pdf of sampling `v` given `l`
    pub reverse_pdf_w: f32,
}

impl BsdfEval {
    pub const ZERO: Self = Self {
        reflectance: Color::ZERO,
        forward_pdf_w: 0.0,
        reverse_pdf_w: 0.0,
    };

    pub fn is_black(&self) -> bool {
        self.reflectance.max_element() <= 0.0
    }
}

/// Evaluate the surface's BSDF for the direction pair `(v, l)`.
pub fn evaluate_bsdf(surface: &SurfaceParameters, v: Vec3, l: Vec3) -> BsdfEval {
    match surface.shader {
        ShaderType::DisneySolid => evaluate_disney(surface, v, l, false),
        ShaderType::DisneyThin => evaluate_disney(surface, v, l, true),
    }
}

/// Sample a direction leaving the surface given the view direction `v`.
///
/// `None` means the sampled path segment carries no energy.
pub fn sample_bsdf(
    sampler: &mut dyn Sampler,
    surface: &SurfaceParameters,
    v: Vec3,
) -> Option<BsdfSample> {
    match surface.shader {
        ShaderType::DisneySolid => sample_disney(sampler, surface, v, false),
        ShaderType::DisneyThin => sample_disney(sampler, surface, v, true),
    }
}

// =============================================================================
// Helper functions
// =============================================================================

/// Mirror `wo` about the microfacet normal `wm`.
#[inline]
pub(crate) fn reflect(wo: Vec3, wm: Vec3) -> Vec3 {
    2.0 * wo.dot(wm) * wm - wo
}

/// Refract `wo` through the microfacet normal `wm`.
///
/// `eta` is the ratio of the index on `wo`'s side over the index on the far
/// side. Returns `None` on total internal reflection.
#[inline]
pub(crate) fn refract(wo: Vec3, wm: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = wo.dot(wm);
    let sin2_i = (1.0 - cos_i * cos_i).max(0.0);
    let sin2_t = eta * eta * sin2_i;
    if sin2_t >= 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some(-wo * eta + wm * (eta * cos_i - cos_t))
}
