//! Vertex connection and merging (Georgiev et al. 2012).
//!
//! One iteration traces a light path per pixel, stores its non-Dirac
//! vertices and splats light tracing contributions, builds a hash grid over
//! the stored vertices, then traces a camera path per pixel. Camera vertices
//! pick up emission from the environment, next-event estimation,
//! connections to the paired light path and merges with nearby light
//! vertices. Contributions are weighted with the balance heuristic using
//! the `d_vcm`, `d_vc` and `d_vm` recurrences carried by [`PathState`].
//!
//! Evaluated reflectance includes `|cos(theta_l)|`, so the geometry terms
//! below only divide by squared distance. Russian roulette folds the
//! continuation probability into every forward and reverse pdf.

use rayon::prelude::*;
use vesper_core::Scene;
use vesper_math::{Interval, Ray, Vec3};

use crate::bsdf::{evaluate_bsdf, sample_bsdf};
use crate::bucket::{generate_buckets, render_bucket, Bucket, BucketResult};
use crate::camera::Camera;
use crate::config::{Technique, VcmSettings};
use crate::error::ConfigError;
use crate::framebuffer::Framebuffer;
use crate::hittable::RayCaster;
use crate::light::LightSampler;
use crate::sampler::{RandomSampler, Sampler};
use crate::surface::SurfaceParameters;
use crate::vcm::hash_grid::HashGrid;
use crate::vcm::path_state::{checked_path_index, PathState};
use crate::vcm::schedule::VcmIterationConstants;
use crate::vcm::seeder::PathSeeder;
use crate::Color;

/// Decorrelates camera path streams from light path streams.
const CAMERA_STREAM: u64 = 0xC0FF_EE00_CA3E_7A00;

/// Shadow rays stop this fraction short of their target.
const SHADOW_RAY_SHORTEN: f32 = 1e-4;

/// A scattering vertex of a light path.
#[derive(Clone, Debug)]
struct LightVertex {
    /// `surface.view` points back along the path towards the light
    surface: SurfaceParameters,
    throughput: Color,
    path_length: u32,
    d_vcm: f32,
    d_vc: f32,
    d_vm: f32,
}

#[derive(Default)]
struct LightPath {
    vertices: Vec<LightVertex>,
    /// Light tracing contributions `(pixel, radiance)`
    splats: Vec<(usize, Color)>,
}

/// Technique weights with unused techniques masked out.
#[derive(Clone, Copy, Debug)]
struct MisWeights {
    vm_weight: f32,
    vc_weight: f32,
    vm_normalization: f32,
}

/// Read-only data shared by the camera paths of one iteration.
struct CameraPass<'p> {
    iteration: u32,
    weights: MisWeights,
    light_vertices: &'p [LightVertex],
    /// Exclusive end of each light path's range in `light_vertices`
    path_ends: &'p [usize],
    positions: &'p [Vec3],
    grid: &'p HashGrid,
}

impl CameraPass<'_> {
    fn light_path(&self, index: usize) -> &[LightVertex] {
        let path = index % self.path_ends.len();
        let start = if path == 0 { 0 } else { self.path_ends[path - 1] };
        &self.light_vertices[start..self.path_ends[path]]
    }
}

/// Bidirectional integrator over a fixed scene, camera and light.
pub struct VcmIntegrator<'a> {
    scene: &'a Scene,
    caster: &'a dyn RayCaster,
    camera: &'a Camera,
    light: &'a dyn LightSampler,
    settings: &'a VcmSettings,
    base_radius: f32,
    light_path_count: usize,
    buckets: Vec<Bucket>,
}

impl<'a> VcmIntegrator<'a> {
    /// Set up an integrator; one light path is traced per pixel.
    ///
    /// `scene_radius` scales `settings.radius_factor` into the base merge
    /// radius.
    pub fn new(
        scene: &'a Scene,
        caster: &'a dyn RayCaster,
        camera: &'a Camera,
        light: &'a dyn LightSampler,
        settings: &'a VcmSettings,
        scene_radius: f32,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let light_path_count = camera.pixel_count();
        if light_path_count == 0 {
            return Err(ConfigError::EmptyViewport {
                width: camera.image_width,
                height: camera.image_height,
            });
        }
        checked_path_index(light_path_count - 1)?;

        let base_radius = settings.radius_factor * scene_radius;
        if !(base_radius.is_finite() && base_radius > 0.0) {
            return Err(ConfigError::InvalidRadius(base_radius));
        }

        Ok(Self {
            scene,
            caster,
            camera,
            light,
            settings,
            base_radius,
            light_path_count,
            buckets: generate_buckets(camera.image_width, camera.image_height, settings.bucket_size),
        })
    }

    pub fn base_radius(&self) -> f32 {
        self.base_radius
    }

    pub fn light_path_count(&self) -> usize {
        self.light_path_count
    }

    /// Trace one iteration and return its (unnormalized) estimate.
    ///
    /// `iteration` is 1-based and drives the radius schedule and the
    /// sampler streams.
    pub fn run_iteration(&self, iteration: u32) -> Result<Framebuffer, ConfigError> {
        let constants = VcmIterationConstants::calculate(
            self.light_path_count,
            1,
            self.base_radius,
            self.settings.radius_alpha,
            iteration,
        )?;
        let technique = self.settings.technique;
        let weights = MisWeights {
            vm_weight: if technique.uses_merging() { constants.vm_weight } else { 0.0 },
            vc_weight: if technique.uses_connections() { constants.vc_weight } else { 0.0 },
            vm_normalization: constants.vm_normalization,
        };

        // Light pass, collected in path order so results do not depend on
        // the worker count
        let light_paths: Vec<LightPath> = (0..self.light_path_count as u32)
            .into_par_iter()
            .map(|index| self.trace_light_path(&weights, iteration, index))
            .collect();

        let mut framebuffer = Framebuffer::new(self.camera.image_width, self.camera.image_height);
        let mut light_vertices = Vec::new();
        let mut path_ends = Vec::with_capacity(light_paths.len());
        for path in light_paths {
            for (pixel, color) in path.splats {
                framebuffer.add(pixel, color);
            }
            light_vertices.extend(path.vertices);
            path_ends.push(light_vertices.len());
        }

        let positions: Vec<Vec3> = light_vertices.iter().map(|v| v.surface.position).collect();
        let grid = if technique.uses_merging() {
            HashGrid::build(&positions, constants.vm_search_radius)
        } else {
            HashGrid::build(&[], constants.vm_search_radius)
        };

        let pass = CameraPass {
            iteration,
            weights,
            light_vertices: &light_vertices,
            path_ends: &path_ends,
            positions: &positions,
            grid: &grid,
        };

        let results: Vec<BucketResult> = self
            .buckets
            .par_iter()
            .map(|bucket| render_bucket(bucket, |x, y| self.trace_camera_path(&pass, x, y)))
            .collect();
        for result in &results {
            framebuffer.add_bucket(result);
        }

        log::debug!(
            "Iteration {}: {} light vertices, radius {:.5}",
            iteration,
            light_vertices.len(),
            constants.vm_search_radius
        );
        Ok(framebuffer)
    }

    fn seeder(&self) -> PathSeeder<'_> {
        PathSeeder::new(self.camera, self.light, self.settings.light_sample_weight)
    }

    fn hit_surface(&self, state: &PathState) -> Option<(SurfaceParameters, f32)> {
        let ray = Ray::new(state.position, state.direction);
        let hit = self.caster.cast_ray(&ray, Interval::FORWARD)?;
        match SurfaceParameters::from_hit(self.scene, &hit) {
            Ok(surface) => Some((surface, hit.t)),
            Err(err) => {
                log::warn!("Dropping path at unresolvable hit: {}", err);
                None
            }
        }
    }

    // =========================================================================
    // Light paths
    // =========================================================================

    fn trace_light_path(&self, weights: &MisWeights, iteration: u32, index: u32) -> LightPath {
        let mut path = LightPath::default();
        let mut sampler = RandomSampler::for_path(self.settings.seed, iteration, index);
        let Some(mut state) = self
            .seeder()
            .generate_light_sample(&mut sampler, weights.vc_weight, index)
        else {
            return path;
        };

        let max_path_length = self.settings.max_path_length;
        loop {
            let Some((surface, distance)) = self.hit_surface(&state) else {
                break;
            };
            if !update_at_hit(&mut state, &surface, distance) {
                break;
            }

            if !surface.is_dirac() {
                path.vertices.push(LightVertex {
                    surface: surface.clone(),
                    throughput: state.throughput,
                    path_length: state.path_length,
                    d_vcm: state.d_vcm,
                    d_vc: state.d_vc,
                    d_vm: state.d_vm,
                });

                if self.settings.technique.uses_connections() {
                    if let Some(splat) = self.connect_to_camera(weights, &surface, &state) {
                        path.splats.push(splat);
                    }
                }
            }

            if state.path_length + 2 > max_path_length {
                break;
            }
            if !sample_scattering(weights, &surface, &mut state, &mut sampler) {
                break;
            }
        }

        path
    }

    /// Project a light vertex onto the image.
    fn connect_to_camera(
        &self,
        weights: &MisWeights,
        surface: &SurfaceParameters,
        state: &PathState,
    ) -> Option<(usize, Color)> {
        let raster = self.camera.raster_position(surface.position)?;

        let to_camera = self.camera.position() - surface.position;
        let dist_sqr = to_camera.length_squared();
        let distance = dist_sqr.sqrt();
        let dir_to_camera = to_camera / distance;

        let cos_at_camera = self.camera.forward().dot(-dir_to_camera);
        if cos_at_camera <= 0.0 {
            return None;
        }

        let eval = evaluate_bsdf(surface, surface.view, dir_to_camera);
        if eval.is_black() {
            return None;
        }
        let cos_to_camera = surface.geometric_normal().dot(dir_to_camera).abs();
        let rev_pdf_w = eval.reverse_pdf_w * surface.continuation_probability();

        let image_point_to_camera_dist = self.camera.virtual_image_plane_distance() / cos_at_camera;
        let image_to_solid_angle =
            image_point_to_camera_dist * image_point_to_camera_dist / cos_at_camera;
        let camera_pdf_a = image_to_solid_angle * cos_to_camera / dist_sqr;

        let n = self.light_path_count as f32;
        let w_light = (camera_pdf_a / n) * (weights.vm_weight + state.d_vcm + state.d_vc * rev_pdf_w);
        let mis_weight = 1.0 / (w_light + 1.0);

        let contrib = mis_weight * state.throughput * eval.reflectance * image_to_solid_angle
            / (n * dist_sqr);
        if contrib.max_element() <= 0.0 {
            return None;
        }

        let origin = surface.offset_ray_origin(dir_to_camera, 1.0);
        if self.occluded(origin, self.camera.position()) {
            return None;
        }
        Some((self.camera.pixel_index(raster), contrib))
    }

    // =========================================================================
    // Camera paths
    // =========================================================================

    fn trace_camera_path(&self, pass: &CameraPass<'_>, x: u32, y: u32) -> Color {
        let index = y * self.camera.image_width + x;
        let mut sampler =
            RandomSampler::for_path(self.settings.seed ^ CAMERA_STREAM, pass.iteration, index);
        let mut state =
            self.seeder()
                .generate_camera_sample(&mut sampler, x, y, self.light_path_count);

        let technique = self.settings.technique;
        let max_path_length = self.settings.max_path_length;
        let weights = &pass.weights;
        let mut color = Color::ZERO;

        loop {
            let Some((surface, distance)) = self.hit_surface(&state) else {
                color += state.throughput * self.background_radiance(&state);
                break;
            };
            if !update_at_hit(&mut state, &surface, distance) {
                break;
            }

            if state.path_length >= max_path_length {
                break;
            }

            if !surface.is_dirac() {
                if technique.uses_connections() {
                    color += state.throughput
                        * self.direct_illumination(weights, &surface, &state, &mut sampler);

                    for light_vertex in pass.light_path(state.index() as usize) {
                        if light_vertex.path_length + 1 + state.path_length > max_path_length {
                            break;
                        }
                        color += state.throughput
                            * light_vertex.throughput
                            * self.connect_vertices(weights, light_vertex, &surface, &state);
                    }
                }

                if technique.uses_merging() {
                    color += state.throughput
                        * weights.vm_normalization
                        * self.merge_vertices(pass, technique, &surface, &state);
                    if technique == Technique::Ppm {
                        break;
                    }
                }
            }

            if !sample_scattering(weights, &surface, &mut state, &mut sampler) {
                break;
            }
        }

        color
    }

    /// Environment emission seen by an escaping camera ray.
    fn background_radiance(&self, state: &PathState) -> Color {
        let Some(background) = self.light.background(state.direction) else {
            return Color::ZERO;
        };
        if background.radiance.max_element() <= 0.0 {
            return Color::ZERO;
        }

        // Seen directly from the camera
        if state.path_length == 1 {
            return background.radiance;
        }

        // Merging alone cannot reach the light along purely specular paths
        if self.settings.technique == Technique::Ppm {
            return if state.specular_path {
                background.radiance
            } else {
                Color::ZERO
            };
        }

        let pick = self.seeder().light_pick_probability();
        let direct_pdf_a = background.direct_pdf_a * pick;
        let emission_pdf_w = background.emission_pdf_w * pick;
        // Emission from an infinite light cannot be merged
        let w_camera = direct_pdf_a * state.d_vcm + emission_pdf_w * state.d_vc;
        background.radiance / (1.0 + w_camera)
    }

    /// Next-event estimation towards a sampled light direction.
    fn direct_illumination(
        &self,
        weights: &MisWeights,
        surface: &SurfaceParameters,
        state: &PathState,
        sampler: &mut dyn Sampler,
    ) -> Color {
        let Some(pick) = self.seeder().select_light(sampler) else {
            return Color::ZERO;
        };
        let Some(light_sample) = self.light.sample_direct(surface.position, sampler) else {
            return Color::ZERO;
        };
        if light_sample.radiance.max_element() <= 0.0 || light_sample.direct_pdf_w <= 0.0 {
            return Color::ZERO;
        }

        let eval = evaluate_bsdf(surface, surface.view, light_sample.direction);
        if eval.is_black() {
            return Color::ZERO;
        }

        let cp = surface.continuation_probability();
        let bsdf_dir_pdf_w = eval.forward_pdf_w * cp;
        let bsdf_rev_pdf_w = eval.reverse_pdf_w * cp;
        let cos_to_light = surface.geometric_normal().dot(light_sample.direction).abs();

        let w_light = bsdf_dir_pdf_w / (pick * light_sample.direct_pdf_w);
        let w_camera = (light_sample.emission_pdf_w * cos_to_light
            / (light_sample.direct_pdf_w * light_sample.cos_at_light))
            * (weights.vm_weight + state.d_vcm + state.d_vc * bsdf_rev_pdf_w);
        let mis_weight = 1.0 / (w_light + 1.0 + w_camera);

        let contrib = mis_weight / (pick * light_sample.direct_pdf_w)
            * light_sample.radiance
            * eval.reflectance;
        if contrib.max_element() <= 0.0 {
            return Color::ZERO;
        }

        let origin = surface.offset_ray_origin(light_sample.direction, 1.0);
        let ray = Ray::new(origin, light_sample.direction);
        let ray_t = if light_sample.distance.is_finite() {
            Interval::up_to(light_sample.distance, SHADOW_RAY_SHORTEN)
        } else {
            Interval::FORWARD
        };
        if self.caster.occluded(&ray, ray_t) {
            return Color::ZERO;
        }
        contrib
    }

    /// Connect a camera vertex to a light vertex. The result excludes both
    /// path throughputs.
    fn connect_vertices(
        &self,
        weights: &MisWeights,
        light_vertex: &LightVertex,
        surface: &SurfaceParameters,
        state: &PathState,
    ) -> Color {
        let to_light = light_vertex.surface.position - surface.position;
        let dist_sqr = to_light.length_squared();
        if dist_sqr <= 0.0 {
            return Color::ZERO;
        }
        let direction = to_light / dist_sqr.sqrt();

        let camera_eval = evaluate_bsdf(surface, surface.view, direction);
        if camera_eval.is_black() {
            return Color::ZERO;
        }
        let light_surface = &light_vertex.surface;
        let light_eval = evaluate_bsdf(light_surface, light_surface.view, -direction);
        if light_eval.is_black() {
            return Color::ZERO;
        }

        let camera_cp = surface.continuation_probability();
        let camera_dir_pdf_w = camera_eval.forward_pdf_w * camera_cp;
        let camera_rev_pdf_w = camera_eval.reverse_pdf_w * camera_cp;
        let light_cp = light_surface.continuation_probability();
        let light_dir_pdf_w = light_eval.forward_pdf_w * light_cp;
        let light_rev_pdf_w = light_eval.reverse_pdf_w * light_cp;

        let cos_camera = surface.geometric_normal().dot(direction).abs();
        let cos_light = light_surface.geometric_normal().dot(-direction).abs();

        let camera_pdf_a = camera_dir_pdf_w * cos_light / dist_sqr;
        let light_pdf_a = light_dir_pdf_w * cos_camera / dist_sqr;

        let w_light = camera_pdf_a
            * (weights.vm_weight + light_vertex.d_vcm + light_vertex.d_vc * light_rev_pdf_w);
        let w_camera =
            light_pdf_a * (weights.vm_weight + state.d_vcm + state.d_vc * camera_rev_pdf_w);
        let mis_weight = 1.0 / (w_light + 1.0 + w_camera);

        let contrib = mis_weight * camera_eval.reflectance * light_eval.reflectance / dist_sqr;
        if contrib.max_element() <= 0.0 {
            return Color::ZERO;
        }

        let origin = surface.offset_ray_origin(direction, 1.0);
        let target = light_surface.offset_ray_origin(-direction, 1.0);
        if self.occluded(origin, target) {
            return Color::ZERO;
        }
        contrib
    }

    /// Density estimate from light vertices within the merge radius. The
    /// result excludes the camera throughput and the merge normalization.
    fn merge_vertices(
        &self,
        pass: &CameraPass<'_>,
        technique: Technique,
        surface: &SurfaceParameters,
        state: &PathState,
    ) -> Color {
        let max_path_length = self.settings.max_path_length;
        let weights = &pass.weights;
        let cp = surface.continuation_probability();
        let mut contrib = Color::ZERO;

        pass.grid
            .for_each_in_radius(pass.positions, surface.position, |i| {
                let light_vertex = &pass.light_vertices[i];
                if light_vertex.path_length + state.path_length > max_path_length {
                    return;
                }

                let light_direction = light_vertex.surface.view;
                let cos_camera = surface.geometric_normal().dot(light_direction).abs();
                if cos_camera <= 0.0 {
                    return;
                }
                let eval = evaluate_bsdf(surface, surface.view, light_direction);
                if eval.is_black() {
                    return;
                }

                let mis_weight = if technique == Technique::Ppm {
                    1.0
                } else {
                    let camera_dir_pdf_w = eval.forward_pdf_w * cp;
                    let camera_rev_pdf_w = eval.reverse_pdf_w * cp;
                    let w_light = light_vertex.d_vcm * weights.vc_weight
                        + light_vertex.d_vm * camera_dir_pdf_w;
                    let w_camera =
                        state.d_vcm * weights.vc_weight + state.d_vm * camera_rev_pdf_w;
                    1.0 / (w_light + 1.0 + w_camera)
                };

                // Photon estimates use the bare BSDF, without the cosine
                contrib += mis_weight * eval.reflectance / cos_camera * light_vertex.throughput;
            });

        contrib
    }

    /// True when anything blocks the segment between two offset points.
    fn occluded(&self, from: Vec3, to: Vec3) -> bool {
        let Some((ray, distance)) = Ray::segment(from, to) else {
            return false;
        };
        self.caster
            .occluded(&ray, Interval::up_to(distance, SHADOW_RAY_SHORTEN))
    }
}

/// Convert the MIS quantities to the area measure of a new hit.
///
/// Returns false when the path arrives exactly tangent to the surface.
fn update_at_hit(state: &mut PathState, surface: &SurfaceParameters, distance: f32) -> bool {
    let cos_theta = surface.geometric_normal().dot(surface.view).abs();
    if cos_theta <= 0.0 {
        return false;
    }

    // Paths leaving an infinite light start in solid angle measure
    if state.path_length > 1 || state.is_area_measure {
        state.d_vcm *= distance * distance;
    }
    state.d_vcm /= cos_theta;
    state.d_vc /= cos_theta;
    state.d_vm /= cos_theta;
    true
}

/// Extend a path by sampling the surface's BSDF and update its MIS
/// quantities. Returns false when the path terminates.
fn sample_scattering(
    weights: &MisWeights,
    surface: &SurfaceParameters,
    state: &mut PathState,
    sampler: &mut dyn Sampler,
) -> bool {
    let Some(sample) = sample_bsdf(sampler, surface, surface.view) else {
        return false;
    };

    let specular = surface.is_dirac();
    let (weight, mut forward_pdf_w, mut reverse_pdf_w) = if specular {
        (sample.reflectance, sample.forward_pdf_w, sample.reverse_pdf_w)
    } else {
        // MIS needs the pdf of the whole lobe mixture, not just the sampled lobe
        let eval = evaluate_bsdf(surface, surface.view, sample.wi);
        if eval.forward_pdf_w <= 0.0 {
            return false;
        }
        (eval.reflectance / eval.forward_pdf_w, eval.forward_pdf_w, eval.reverse_pdf_w)
    };
    if weight.max_element() <= 0.0 || !weight.is_finite() {
        return false;
    }

    // Russian roulette
    let continuation = surface.continuation_probability();
    if continuation <= 0.0 || sampler.uniform_float() >= continuation {
        return false;
    }
    forward_pdf_w *= continuation;
    reverse_pdf_w *= continuation;

    let cos_theta_out = surface.geometric_normal().dot(sample.wi).abs();
    if specular {
        state.d_vcm = 0.0;
        state.d_vc *= cos_theta_out;
        state.d_vm *= cos_theta_out;
    } else {
        let ratio = cos_theta_out / forward_pdf_w;
        state.d_vc = ratio * (state.d_vc * reverse_pdf_w + state.d_vcm + weights.vm_weight);
        state.d_vm = ratio * (state.d_vm * reverse_pdf_w + state.d_vcm * weights.vc_weight + 1.0);
        state.d_vcm = 1.0 / forward_pdf_w;
    }

    state.specular_path &= specular;
    state.throughput *= weight / continuation;
    state.position = surface.offset_ray_origin(sample.wi, 1.0);
    state.direction = sample.wi;
    state.path_length += 1;
    true
}
