//! Vesper renderer - bidirectional light transport on the CPU.
//!
//! Vertex connection and merging over triangle scenes shaded with a
//! multi-lobe Disney BSDF.

mod bucket;
mod bvh;
mod camera;
mod config;
mod error;
mod framebuffer;
mod hittable;
mod intersector;
mod light;
mod render;
mod sampler;
mod surface;
mod triangle;

pub mod bsdf;
pub mod vcm;

pub use bsdf::{evaluate_bsdf, sample_bsdf, BsdfEval, BsdfSample, MediumParameters, MediumPhaseFunction, SurfaceEventFlags};
pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use bvh::BvhNode;
pub use camera::Camera;
pub use config::{Technique, VcmSettings};
pub use error::{ConfigError, RenderError};
pub use framebuffer::{color_to_rgba, linear_to_gamma, Framebuffer};
pub use hittable::{hit_error_bound, HitRecord, RayCaster};
pub use intersector::SceneIntersector;
pub use light::{
    BackgroundSample, EnvironmentLight, EnvironmentRadiance, LightDirectSample, LightEmissionSample,
    LightSampler,
};
pub use render::render;
pub use sampler::{RandomSampler, Sampler};
pub use surface::{calculate_surface_params, SurfaceParameters, DIRAC_ROUGHNESS};
pub use triangle::Triangle;
pub use vcm::{PathSeeder, PathState, VcmIntegrator, VcmIterationConstants};

/// Linear RGB color.
pub type Color = vesper_math::Vec3;

/// Re-export common math types from vesper_math
pub use vesper_math::{Aabb, Interval, Ray, Vec3};
