//! Disney BSDF.
//!
//! Based on Burley 2012, "Physically Based Shading at Disney" and the 2015
//! extension to transmission. Four lobes share one material description:
//!
//! - **Specular**: anisotropic GGX reflection blending dielectric and metallic Fresnel
//! - **Clearcoat**: GTR1 reflection with a fixed 0.04 normal incidence reflectance
//! - **Diffuse**: retro-reflective diffuse with sheen, thin flatness and diffuse transmission
//! - **Specular transmission**: rough dielectric reflection and refraction
//!
//! Sampling picks one lobe per call and returns its one-sample estimate;
//! evaluation sums every active lobe.

use std::f32::consts::PI;

use vesper_math::sampling::{cosine_hemisphere, cosine_hemisphere_pdf};
use vesper_math::{lerp, saturate, Vec3};

use super::fresnel;
use super::ggx;
use super::{
    reflect, refract, BsdfEval, BsdfSample, MediumParameters, MediumPhaseFunction,
    SurfaceEventFlags,
};
use crate::sampler::Sampler;
use crate::surface::{SurfaceParameters, DIRAC_ROUGHNESS};
use crate::Color;

/// Roughness used for clearcoat masking.
const CLEARCOAT_MASKING_ALPHA: f32 = 0.25;

/// Normal incidence reflectance of the clearcoat layer.
const CLEARCOAT_R0: f32 = 0.04;

/// Probability of choosing each lobe when sampling.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LobePdfs {
    pub specular: f32,
    pub diffuse: f32,
    pub clearcoat: f32,
    pub spec_trans: f32,
}

impl LobePdfs {
    pub fn sum(&self) -> f32 {
        self.specular + self.diffuse + self.clearcoat + self.spec_trans
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lobe {
    Specular,
    Clearcoat,
    Diffuse,
    SpecTrans,
}

/// Lobe selection probabilities for a surface; they sum to one.
///
/// Returns all zeros when the material weights are not finite.
pub fn calculate_lobe_pdfs(surface: &SurfaceParameters) -> LobePdfs {
    let metallic_brdf = surface.metallic;
    let specular_bsdf = (1.0 - surface.metallic) * surface.spec_trans;
    let dielectric_brdf = (1.0 - surface.spec_trans) * (1.0 - surface.metallic);

    let specular_weight = metallic_brdf + dielectric_brdf;
    let transmission_weight = specular_bsdf;
    let diffuse_weight = dielectric_brdf;
    let clearcoat_weight = saturate(surface.clearcoat);

    let total = specular_weight + transmission_weight + diffuse_weight + clearcoat_weight;
    if !(total > 0.0) || !total.is_finite() {
        return LobePdfs::default();
    }

    let norm = 1.0 / total;
    LobePdfs {
        specular: specular_weight * norm,
        diffuse: diffuse_weight * norm,
        clearcoat: clearcoat_weight * norm,
        spec_trans: transmission_weight * norm,
    }
}

/// Effective roughness of a thin slab's transmission (Burley 2015, figure 15).
pub fn thin_transmission_roughness(ior: f32, roughness: f32) -> f32 {
    saturate((0.65 * ior - 0.35) * roughness)
}

/// Extinction coefficients that produce roughly `apparent_color` after
/// multiple scattering over `scatter_distance`.
pub fn calculate_extinction(apparent_color: Color, scatter_distance: f32) -> Color {
    let a = apparent_color;
    let d = a - Color::splat(0.8);
    let s = Color::splat(1.9) - a + 3.5 * d * d;
    Color::ONE / (s * scatter_distance)
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluate the BSDF for world directions `v` (towards the viewer) and `l`
/// (towards the light).
///
/// The reflectance includes `|cos(theta_l)|`. The pdfs are the lobe pdfs
/// weighted by the lobe selection probabilities.
pub fn evaluate_disney(surface: &SurfaceParameters, v: Vec3, l: Vec3, thin: bool) -> BsdfEval {
    let wo = surface.to_local(v).normalize_or_zero();
    let wi = surface.to_local(l).normalize_or_zero();
    let wm = (wo + wi).normalize_or_zero();

    let pdfs = calculate_lobe_pdfs(surface);
    let diffuse_weight = (1.0 - surface.metallic) * (1.0 - surface.spec_trans);
    let trans_weight = (1.0 - surface.metallic) * surface.spec_trans;

    let mut result = BsdfEval::ZERO;
    let upper_hemisphere = wo.y > 0.0 && wi.y > 0.0;

    if upper_hemisphere && surface.clearcoat > 0.0 {
        let clearcoat = evaluate_clearcoat(surface, wo, wm, wi);
        accumulate(&mut result, &clearcoat, pdfs.clearcoat, 1.0);
    }

    if diffuse_weight > 0.0 {
        let diffuse = evaluate_diffuse_lobe(surface, wo, wi, thin);
        accumulate(&mut result, &diffuse, pdfs.diffuse, diffuse_weight);
    }

    if trans_weight > 0.0 {
        let transmission = evaluate_spec_transmission(surface, wo, wi, thin);
        accumulate(&mut result, &transmission, pdfs.spec_trans, trans_weight);
    }

    if upper_hemisphere && pdfs.specular > 0.0 {
        let specular = evaluate_brdf(surface, wo, wm, wi);
        accumulate(&mut result, &specular, pdfs.specular, 1.0);
    }

    result.reflectance *= wi.y.abs();
    result
}

#[inline]
fn accumulate(total: &mut BsdfEval, lobe: &BsdfEval, probability: f32, weight: f32) {
    total.reflectance += lobe.reflectance * weight;
    total.forward_pdf_w += probability * lobe.forward_pdf_w;
    total.reverse_pdf_w += probability * lobe.reverse_pdf_w;
}

/// Fresnel of the specular lobe, blending the dielectric and metallic responses.
fn disney_fresnel(surface: &SurfaceParameters, wo: Vec3, wm: Vec3, wi: Vec3) -> Color {
    let dot_hv = wm.dot(wo);
    let tint = calculate_tint(surface.base_color);

    let r0 = fresnel::schlick_r0_from_relative_ior(surface.relative_ior)
        * lerp3(Color::ONE, tint, surface.specular_tint);
    let r0 = lerp3(r0, surface.base_color, surface.metallic);

    let dielectric = fresnel::dielectric(dot_hv, 1.0, surface.ior);
    let metallic = fresnel::schlick_color(r0, wi.dot(wm));

    lerp3(Color::splat(dielectric), metallic, surface.metallic)
}

fn evaluate_brdf(surface: &SurfaceParameters, wo: Vec3, wm: Vec3, wi: Vec3) -> BsdfEval {
    let cos_v = wo.y;
    let cos_l = wi.y;
    if cos_l <= 0.0 || cos_v <= 0.0 {
        return BsdfEval::ZERO;
    }

    let (ax, ay) = ggx::anisotropic_params(surface.roughness, surface.anisotropic);
    let d = ggx::anisotropic_d(wm, ax, ay);
    let gl = ggx::separable_smith_g1(wi, ax, ay);
    let gv = ggx::separable_smith_g1(wo, ax, ay);
    let f = disney_fresnel(surface, wo, wm, wi);

    BsdfEval {
        reflectance: f * (d * gl * gv / (4.0 * cos_l * cos_v)),
        forward_pdf_w: ggx::vndf_pdf(wo, wm, ax, ay) / (4.0 * wo.dot(wm).abs()),
        reverse_pdf_w: ggx::vndf_pdf(wi, wm, ax, ay) / (4.0 * wi.dot(wm).abs()),
    }
}

/// Generalized Trowbridge-Reitz distribution with exponent 1.
fn gtr1(abs_cos_theta_m: f32, a: f32) -> f32 {
    if a >= 1.0 {
        return 1.0 / PI;
    }
    let a2 = a * a;
    (a2 - 1.0) / (PI * a2.ln() * (1.0 + (a2 - 1.0) * abs_cos_theta_m * abs_cos_theta_m))
}

#[inline]
fn clearcoat_alpha(gloss: f32) -> f32 {
    lerp(0.1, 0.001, gloss)
}

fn evaluate_clearcoat(surface: &SurfaceParameters, wo: Vec3, wm: Vec3, wi: Vec3) -> BsdfEval {
    if surface.clearcoat <= 0.0 {
        return BsdfEval::ZERO;
    }

    let abs_cos_m = wm.y.abs();
    let cos_l = wi.y.abs();
    let cos_v = wo.y.abs();
    if cos_l <= 0.0 || cos_v <= 0.0 {
        return BsdfEval::ZERO;
    }

    let d = gtr1(abs_cos_m, clearcoat_alpha(surface.clearcoat_gloss));
    let f = fresnel::schlick(CLEARCOAT_R0, wi.dot(wm));
    let g = ggx::smith_g1(wi, CLEARCOAT_MASKING_ALPHA) * ggx::smith_g1(wo, CLEARCOAT_MASKING_ALPHA);

    let value = 0.25 * surface.clearcoat * d * f * g / (4.0 * cos_l * cos_v);
    BsdfEval {
        reflectance: Color::splat(value),
        forward_pdf_w: d * abs_cos_m / (4.0 * wo.dot(wm).abs()),
        reverse_pdf_w: d * abs_cos_m / (4.0 * wi.dot(wm).abs()),
    }
}

fn evaluate_sheen(surface: &SurfaceParameters, wm: Vec3, wi: Vec3) -> Color {
    if surface.sheen <= 0.0 {
        return Color::ZERO;
    }

    let dot_hl = wm.dot(wi).abs();
    let tint = calculate_tint(surface.base_color);
    surface.sheen * lerp3(Color::ONE, tint, surface.sheen_tint) * fresnel::schlick_weight(dot_hl)
}

fn evaluate_retro_diffuse(surface: &SurfaceParameters, wo: Vec3, wi: Vec3) -> f32 {
    let cos_l = wi.y.abs();
    let cos_v = wo.y.abs();

    let roughness = surface.roughness * surface.roughness;
    let rr = 0.5 + 2.0 * cos_l * cos_l * roughness;
    let fl = fresnel::schlick_weight(cos_l);
    let fv = fresnel::schlick_weight(cos_v);

    rr * (fl + fv + fl * fv * (rr - 1.0))
}

/// Scalar diffuse response, including the 1/pi normalization.
fn evaluate_diffuse(surface: &SurfaceParameters, wo: Vec3, wm: Vec3, wi: Vec3, thin: bool) -> f32 {
    let cos_l = wi.y.abs();
    let cos_v = wo.y.abs();

    let fl = fresnel::schlick_weight(cos_l);
    let fv = fresnel::schlick_weight(cos_v);

    // Hanrahan-Krueger inspired flattening for thin surfaces
    let mut hanrahan_krueger = 0.0;
    if thin && surface.flatness > 0.0 {
        let roughness = surface.roughness * surface.roughness;
        let dot_hl = wm.dot(wi);
        let fss90 = dot_hl * dot_hl * roughness;
        let fss = lerp(1.0, fss90, fl) * lerp(1.0, fss90, fv);
        hanrahan_krueger = 1.25 * (fss * (1.0 / (cos_l + cos_v) - 0.5) + 0.5);
    }

    let lambert = 1.0;
    let retro = evaluate_retro_diffuse(surface, wo, wi);
    let subsurface_approx = lerp(lambert, hanrahan_krueger, if thin { surface.flatness } else { 0.0 });

    (retro + subsurface_approx * (1.0 - 0.5 * fl) * (1.0 - 0.5 * fv)) / PI
}

/// Diffuse lobe: reflection with probability `1 - diffuse_trans`, diffuse
/// transmission through to the other side otherwise.
fn evaluate_diffuse_lobe(surface: &SurfaceParameters, wo: Vec3, wi: Vec3, thin: bool) -> BsdfEval {
    if wo.y == 0.0 || wi.y == 0.0 {
        return BsdfEval::ZERO;
    }

    let same_side = wo.y * wi.y > 0.0;
    let (branch, color, wi_reflected) = if same_side {
        (1.0 - surface.diffuse_trans, surface.base_color, wi)
    } else {
        let color = if thin {
            surface.base_color.max(Color::ZERO).powf(0.5)
        } else {
            surface.base_color
        };
        (surface.diffuse_trans, color, -wi)
    };
    if branch <= 0.0 {
        return BsdfEval::ZERO;
    }

    let wm = (wo + wi_reflected).normalize_or_zero();
    let diffuse = evaluate_diffuse(surface, wo, wm, wi_reflected, thin);
    let sheen = evaluate_sheen(surface, wm, wi_reflected);

    BsdfEval {
        reflectance: (color * diffuse + sheen) * branch,
        forward_pdf_w: branch * cosine_hemisphere_pdf(wi.y),
        reverse_pdf_w: branch * cosine_hemisphere_pdf(wo.y),
    }
}

/// Indices of refraction on the `wo` side and the far side.
#[inline]
fn interface_iors(wo: Vec3, ior: f32) -> (f32, f32) {
    if wo.y > 0.0 {
        (1.0, ior)
    } else {
        (ior, 1.0)
    }
}

fn transmission_alphas(surface: &SurfaceParameters, thin: bool) -> (f32, f32) {
    let roughness = if thin {
        thin_transmission_roughness(surface.ior, surface.roughness)
    } else {
        surface.roughness
    };
    ggx::anisotropic_params(roughness, surface.anisotropic)
}

/// Rough dielectric lobe, covering both the Fresnel reflection and the
/// refraction (or thin pass-through) parts.
fn evaluate_spec_transmission(surface: &SurfaceParameters, wo: Vec3, wi: Vec3, thin: bool) -> BsdfEval {
    if wo.y == 0.0 || wi.y == 0.0 {
        return BsdfEval::ZERO;
    }

    // Work as if wo were in the upper hemisphere
    let (eta_i, eta_t) = interface_iors(wo, surface.ior);
    let flip = wo.y.signum();
    let wo = wo * flip;
    let wi = wi * flip;

    let (ax, ay) = transmission_alphas(surface, thin);
    let cos_v = wo.y;
    let cos_l = wi.y.abs();
    let gv = ggx::separable_smith_g1(wo, ax, ay);
    let gl = ggx::separable_smith_g1(wi, ax, ay);

    if wi.y > 0.0 || thin {
        // Reflection, or a thin sheet's mirrored pass-through
        let transmitted = wi.y < 0.0;
        let wi_reflected = Vec3::new(wi.x, wi.y.abs(), wi.z);
        let wm = (wo + wi_reflected).normalize_or_zero();
        let dot_vh = wo.dot(wm);
        if dot_vh <= 0.0 {
            return BsdfEval::ZERO;
        }

        let f = fresnel::dielectric(dot_vh, eta_i, eta_t);
        let (probability, color) = if transmitted {
            (1.0 - f, surface.base_color.max(Color::ZERO).powf(0.5))
        } else {
            (f, surface.base_color)
        };
        let d = ggx::anisotropic_d(wm, ax, ay);

        return BsdfEval {
            reflectance: color * (probability * d * gv * gl / (4.0 * cos_v * cos_l)),
            forward_pdf_w: probability * ggx::vndf_pdf(wo, wm, ax, ay) / (4.0 * dot_vh),
            reverse_pdf_w: probability * ggx::vndf_pdf(wi_reflected, wm, ax, ay)
                / (4.0 * wi_reflected.dot(wm).abs()),
        };
    }

    // Refraction through the generalized half vector
    let eta = eta_i / eta_t;
    let mut wm = (eta * wo + wi).normalize_or_zero();
    if wm.y < 0.0 {
        wm = -wm;
    }
    let dot_vh = wo.dot(wm);
    let dot_lh = wi.dot(wm);
    if dot_vh <= 0.0 || dot_lh >= 0.0 {
        return BsdfEval::ZERO;
    }

    let f = fresnel::dielectric(dot_vh, eta_i, eta_t);
    let d = ggx::anisotropic_d(wm, ax, ay);
    let denom = eta * dot_vh + dot_lh;
    let denom2 = denom * denom;
    if denom2 <= 0.0 {
        return BsdfEval::ZERO;
    }

    let value = (1.0 - f) * d * gv * gl * dot_vh * dot_lh.abs() / (cos_v * cos_l * denom2);
    BsdfEval {
        reflectance: surface.base_color * value,
        forward_pdf_w: (1.0 - f) * ggx::vndf_pdf(wo, wm, ax, ay) * dot_lh.abs() / denom2,
        reverse_pdf_w: (1.0 - f) * ggx::vndf_pdf(-wi, wm, ax, ay) * dot_vh * eta * eta / denom2,
    }
}

// =============================================================================
// Sampling
// =============================================================================

/// Sample a direction given the world view direction `v`.
///
/// Draws one variate to pick a lobe plus two (specular, clearcoat) or three
/// (diffuse, transmission) for the lobe itself. The returned weight and pdfs
/// account for the lobe selection.
pub fn sample_disney(
    sampler: &mut dyn Sampler,
    surface: &SurfaceParameters,
    v: Vec3,
    thin: bool,
) -> Option<BsdfSample> {
    let wo = surface.to_local(v).normalize_or_zero();
    let pdfs = calculate_lobe_pdfs(surface);

    let Some((lobe, p_lobe)) = select_lobe(&pdfs, sampler.uniform_float()) else {
        log::error!("No Disney lobe could be selected (lobe pdfs {:?})", pdfs);
        debug_assert!(false, "no lobe selected");
        return None;
    };

    let (sample, internal_weight) = match lobe {
        Lobe::Specular => (sample_brdf(sampler, surface, wo)?, 1.0),
        Lobe::Clearcoat => (sample_clearcoat(sampler, surface, wo)?, 1.0),
        Lobe::Diffuse => (
            sample_diffuse(sampler, surface, wo, thin)?,
            (1.0 - surface.metallic) * (1.0 - surface.spec_trans),
        ),
        Lobe::SpecTrans => (
            sample_spec_transmission(sampler, surface, wo, thin)?,
            (1.0 - surface.metallic) * surface.spec_trans,
        ),
    };

    Some(BsdfSample {
        wi: surface.to_world(sample.wi).normalize(),
        reflectance: sample.reflectance * (internal_weight / p_lobe),
        forward_pdf_w: sample.forward_pdf_w * p_lobe,
        reverse_pdf_w: sample.reverse_pdf_w * p_lobe,
        ..sample
    })
}

/// Pick a lobe with the cumulative order specular, clearcoat, diffuse,
/// transmission.
fn select_lobe(pdfs: &LobePdfs, u: f32) -> Option<(Lobe, f32)> {
    let lobes = [
        (Lobe::Specular, pdfs.specular),
        (Lobe::Clearcoat, pdfs.clearcoat),
        (Lobe::Diffuse, pdfs.diffuse),
        (Lobe::SpecTrans, pdfs.spec_trans),
    ];

    let mut cdf = 0.0;
    for &(lobe, p) in &lobes {
        cdf += p;
        if p > 0.0 && u < cdf {
            return Some((lobe, p));
        }
    }

    // Rounding left the cdf just short of one
    lobes.iter().rev().find(|(_, p)| *p > 0.0).copied()
}

fn scatter_flags(roughness: f32) -> SurfaceEventFlags {
    if roughness < DIRAC_ROUGHNESS {
        SurfaceEventFlags::SCATTER | SurfaceEventFlags::DIRAC
    } else {
        SurfaceEventFlags::SCATTER
    }
}

fn sample_brdf(sampler: &mut dyn Sampler, surface: &SurfaceParameters, wo: Vec3) -> Option<BsdfSample> {
    let r0 = sampler.uniform_float();
    let r1 = sampler.uniform_float();
    if wo.y <= 0.0 {
        return None;
    }

    let (ax, ay) = ggx::anisotropic_params(surface.roughness, surface.anisotropic);
    let wm = ggx::sample_vndf(wo, ax, ay, r0, r1);

    let wi = reflect(wo, wm).normalize();
    if wi.y <= 0.0 {
        return None;
    }

    // With visible normal sampling only the masking of wi is left in the weight
    let f = disney_fresnel(surface, wo, wm, wi);
    let gl = ggx::separable_smith_g1(wi, ax, ay);

    Some(BsdfSample {
        wi,
        reflectance: f * gl,
        forward_pdf_w: ggx::vndf_pdf(wo, wm, ax, ay) / (4.0 * wo.dot(wm).abs()),
        reverse_pdf_w: ggx::vndf_pdf(wi, wm, ax, ay) / (4.0 * wi.dot(wm).abs()),
        flags: scatter_flags(surface.roughness),
        medium: MediumParameters::default(),
    })
}

fn sample_clearcoat(sampler: &mut dyn Sampler, surface: &SurfaceParameters, wo: Vec3) -> Option<BsdfSample> {
    let r0 = sampler.uniform_float();
    let r1 = sampler.uniform_float();
    if wo.y <= 0.0 {
        return None;
    }

    let a = clearcoat_alpha(surface.clearcoat_gloss);
    let a2 = a * a;
    let cos_theta = ((1.0 - a2.powf(1.0 - r0)) / (1.0 - a2)).max(0.0).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * r1;

    let mut wm = Vec3::new(sin_theta * phi.cos(), cos_theta, sin_theta * phi.sin());
    if wm.dot(wo) < 0.0 {
        wm = -wm;
    }

    let wi = reflect(wo, wm);
    if wi.y <= 0.0 {
        return None;
    }

    let eval = evaluate_clearcoat(surface, wo, wm, wi);
    if eval.forward_pdf_w <= 0.0 {
        return None;
    }

    Some(BsdfSample {
        wi,
        reflectance: eval.reflectance * (wi.y / eval.forward_pdf_w),
        forward_pdf_w: eval.forward_pdf_w,
        reverse_pdf_w: eval.reverse_pdf_w,
        flags: SurfaceEventFlags::SCATTER,
        medium: MediumParameters::default(),
    })
}

fn sample_diffuse(
    sampler: &mut dyn Sampler,
    surface: &SurfaceParameters,
    wo: Vec3,
    thin: bool,
) -> Option<BsdfSample> {
    let r0 = sampler.uniform_float();
    let r1 = sampler.uniform_float();
    let p = sampler.uniform_float();

    let sign = if wo.y < 0.0 { -1.0 } else { 1.0 };
    let mut wi = cosine_hemisphere(r0, r1) * sign;

    let transmitted = p < surface.diffuse_trans;
    if transmitted {
        wi = -wi;
    }
    if wi.y == 0.0 {
        return None;
    }

    let eval = evaluate_diffuse_lobe(surface, wo, wi, thin);
    if eval.forward_pdf_w <= 0.0 {
        return None;
    }

    let (flags, medium) = if transmitted && !thin {
        (
            SurfaceEventFlags::TRANSMISSION,
            MediumParameters {
                phase: MediumPhaseFunction::Isotropic,
                extinction: calculate_extinction(surface.transmittance_color, surface.scatter_distance),
            },
        )
    } else {
        (SurfaceEventFlags::SCATTER, MediumParameters::default())
    };

    Some(BsdfSample {
        wi,
        reflectance: eval.reflectance * (wi.y.abs() / eval.forward_pdf_w),
        forward_pdf_w: eval.forward_pdf_w,
        reverse_pdf_w: eval.reverse_pdf_w,
        flags,
        medium,
    })
}

fn sample_spec_transmission(
    sampler: &mut dyn Sampler,
    surface: &SurfaceParameters,
    wo: Vec3,
    thin: bool,
) -> Option<BsdfSample> {
    let r0 = sampler.uniform_float();
    let r1 = sampler.uniform_float();
    let r2 = sampler.uniform_float();
    if wo.y == 0.0 {
        return None;
    }

    let entering = wo.y > 0.0;
    let (eta_i, eta_t) = interface_iors(wo, surface.ior);
    let flip = wo.y.signum();
    let wo_up = wo * flip;

    let (ax, ay) = transmission_alphas(surface, thin);
    let wm = ggx::sample_vndf(wo_up, ax, ay, r0, r1);
    let dot_vh = wo_up.dot(wm);
    if dot_vh <= 0.0 {
        return None;
    }

    let f = fresnel::dielectric(dot_vh, eta_i, eta_t);
    let gv_pdf = ggx::vndf_pdf(wo_up, wm, ax, ay);
    let mut flags = SurfaceEventFlags::SCATTER;
    let mut medium = MediumParameters::default();

    let refracted = if r2 < f {
        None
    } else if thin {
        // Into and straight back out of the sheet: mirror, then flip through
        let wi = reflect(wo_up, wm);
        Some(Vec3::new(wi.x, -wi.y, wi.z))
    } else {
        refract(wo_up, wm, eta_i / eta_t)
    };

    let (wi_up, reflectance, forward, reverse) = match refracted {
        Some(wi_up) if thin => {
            let wi_reflected = Vec3::new(wi_up.x, -wi_up.y, wi_up.z);
            let color = surface.base_color.max(Color::ZERO).powf(0.5);
            (
                wi_up,
                color * ggx::separable_smith_g1(wi_up, ax, ay),
                (1.0 - f) * gv_pdf / (4.0 * dot_vh),
                (1.0 - f) * ggx::vndf_pdf(wi_reflected, wm, ax, ay) / (4.0 * wi_reflected.dot(wm).abs()),
            )
        }
        Some(wi_up) => {
            let wi_up = wi_up.normalize();
            let dot_lh = wi_up.dot(wm);
            let eta = eta_i / eta_t;
            let denom = eta * dot_vh + dot_lh;
            let denom2 = denom * denom;
            if dot_lh >= 0.0 || denom2 <= 0.0 {
                return None;
            }

            flags = SurfaceEventFlags::TRANSMISSION;
            medium = MediumParameters {
                phase: if entering {
                    MediumPhaseFunction::Isotropic
                } else {
                    MediumPhaseFunction::Vacuum
                },
                extinction: calculate_extinction(surface.transmittance_color, surface.scatter_distance),
            };
            (
                wi_up,
                surface.base_color * ggx::separable_smith_g1(wi_up, ax, ay),
                (1.0 - f) * gv_pdf * dot_lh.abs() / denom2,
                (1.0 - f) * ggx::vndf_pdf(-wi_up, wm, ax, ay) * dot_vh * eta * eta / denom2,
            )
        }
        None => {
            // Fresnel reflection, also taken on total internal reflection
            let wi_up = reflect(wo_up, wm);
            (
                wi_up,
                surface.base_color * ggx::separable_smith_g1(wi_up, ax, ay),
                f * gv_pdf / (4.0 * dot_vh),
                f * ggx::vndf_pdf(wi_up, wm, ax, ay) / (4.0 * wi_up.dot(wm).abs()),
            )
        }
    };

    // Reflections must stay on wo's side and transmissions must cross
    let crossed = wi_up.y < 0.0;
    if wi_up.y == 0.0 || crossed != (refracted.is_some()) || !(forward > 0.0) {
        return None;
    }

    if surface.roughness < DIRAC_ROUGHNESS {
        flags |= SurfaceEventFlags::DIRAC;
    }

    Some(BsdfSample {
        wi: wi_up * flip,
        reflectance,
        forward_pdf_w: forward,
        reverse_pdf_w: reverse,
        flags,
        medium,
    })
}

// =============================================================================
// Helper functions
// =============================================================================

/// Luminance of a color (Rec. 709).
#[inline]
fn luminance(c: Color) -> f32 {
    0.2126 * c.x + 0.7152 * c.y + 0.0722 * c.z
}

/// Linear interpolation for colors.
#[inline]
fn lerp3(a: Color, b: Color, t: f32) -> Color {
    a + t * (b - a)
}

/// Base color normalized to unit luminance; used to tint sheen and specular.
fn calculate_tint(base_color: Color) -> Color {
    let l = luminance(base_color);
    if l > 0.0 {
        base_color / l
    } else {
        Color::ONE
    }
}
