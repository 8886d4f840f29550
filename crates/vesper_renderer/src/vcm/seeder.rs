//! Starting states for light and camera subpaths.

use crate::camera::Camera;
use crate::light::{LightEmissionSample, LightSampler};
use crate::sampler::Sampler;
use crate::vcm::path_state::PathState;

/// Seeds the subpaths of one iteration.
pub struct PathSeeder<'a> {
    camera: &'a Camera,
    light: &'a dyn LightSampler,
    light_sample_weight: f32,
}

impl<'a> PathSeeder<'a> {
    pub fn new(camera: &'a Camera, light: &'a dyn LightSampler, light_sample_weight: f32) -> Self {
        Self {
            camera,
            light,
            light_sample_weight,
        }
    }

    /// Probability that a light sample picks the scene's emitter: the
    /// emitter's own pick probability scaled by the light sample weight.
    pub fn light_pick_probability(&self) -> f32 {
        self.light.pick_probability() * self.light_sample_weight
    }

    /// Choose whether this light sample uses the emitter at all.
    ///
    /// Draws one variate only when the light sample weight is below one.
    /// Returns the pick probability contributions must be divided by.
    pub fn select_light(&self, sampler: &mut dyn Sampler) -> Option<f32> {
        if self.light_sample_weight < 1.0 && sampler.uniform_float() >= self.light_sample_weight {
            return None;
        }
        Some(self.light_pick_probability())
    }

    /// Start light path `index` from a sampled emitter ray.
    ///
    /// Returns `None` when the emitter was not selected or produced no
    /// usable ray.
    pub fn generate_light_sample(
        &self,
        sampler: &mut dyn Sampler,
        vc_weight: f32,
        index: u32,
    ) -> Option<PathState> {
        let pick = self.select_light(sampler)?;
        let emission = self.light.sample_emission(sampler)?;
        Some(light_path_state(
            &emission,
            pick,
            self.light.is_finite(),
            vc_weight,
            index,
        ))
    }

    /// Start the camera path through a jittered position in pixel `(x, y)`.
    ///
    /// Draws two variates.
    pub fn generate_camera_sample(
        &self,
        sampler: &mut dyn Sampler,
        x: u32,
        y: u32,
        light_path_count: usize,
    ) -> PathState {
        let ray = self.camera.generate_ray(x, y, sampler);
        let index = y * self.camera.image_width + x;

        let cos_at_camera = self.camera.forward().dot(ray.direction);
        let image_point_to_camera_dist = self.camera.virtual_image_plane_distance() / cos_at_camera;
        let image_to_solid_angle = image_point_to_camera_dist * image_point_to_camera_dist / cos_at_camera;
        // The image plane pdf is one per unit pixel area
        let camera_pdf_w = image_to_solid_angle;

        let mut state = PathState::new(index, ray.origin, ray.direction);
        state.d_vcm = light_path_count as f32 / camera_pdf_w;
        state
    }
}

/// Path state leaving an emitter sample.
///
/// `pick_probability` is the chance of choosing the emitter among all lights.
pub fn light_path_state(
    emission: &LightEmissionSample,
    pick_probability: f32,
    is_finite: bool,
    vc_weight: f32,
    index: u32,
) -> PathState {
    let emission_pdf_w = emission.emission_pdf_w * pick_probability;
    let direct_pdf_a = emission.direction_pdf_a * pick_probability;

    let mut state = PathState::new(index, emission.position, emission.direction);
    state.throughput = emission.radiance / emission_pdf_w;
    state.d_vcm = direct_pdf_a / emission_pdf_w;
    state.d_vc = emission.cos_theta_light / emission_pdf_w;
    state.d_vm = state.d_vc * vc_weight;
    state.is_area_measure = is_finite;
    state.specular_path = false;
    state
}
