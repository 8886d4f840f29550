//! Light sampling services used by the integrator.

use vesper_math::sampling::{concentric_disk, uniform_sphere, CONCENTRIC_DISK_PDF, UNIFORM_SPHERE_PDF};
use vesper_math::{make_orthogonal_basis, Aabb, Vec3};

use crate::sampler::Sampler;
use crate::Color;

/// A point and direction of light leaving an emitter.
#[derive(Clone, Copy, Debug)]
pub struct LightEmissionSample {
    pub position: Vec3,
    /// Unit direction of travel of the emitted light
    pub direction: Vec3,
    pub radiance: Color,
    /// Pdf of the emitted ray (position and direction)
    pub emission_pdf_w: f32,
    /// Pdf of choosing this emitter point when sampling it directly
    pub direction_pdf_a: f32,
    pub cos_theta_light: f32,
}

/// Light arriving at a shading point from a directly sampled emitter.
#[derive(Clone, Copy, Debug)]
pub struct LightDirectSample {
    /// Unit direction from the shading point towards the light
    pub direction: Vec3,
    pub distance: f32,
    pub radiance: Color,
    /// Solid angle pdf of `direction` at the shading point
    pub direct_pdf_w: f32,
    /// Pdf of the light emitting the reverse ray
    pub emission_pdf_w: f32,
    pub cos_at_light: f32,
}

/// Radiance picked up by a ray that leaves the scene.
#[derive(Clone, Copy, Debug)]
pub struct BackgroundSample {
    pub radiance: Color,
    pub direct_pdf_a: f32,
    pub emission_pdf_w: f32,
}

/// Sampling interface over the scene's emitters.
pub trait LightSampler: Send + Sync {
    /// Sample a ray leaving an emitter.
    fn sample_emission(&self, sampler: &mut dyn Sampler) -> Option<LightEmissionSample>;

    /// Sample incident light at `position` for next-event estimation.
    fn sample_direct(&self, position: Vec3, sampler: &mut dyn Sampler) -> Option<LightDirectSample>;

    /// Emission seen along an escaping ray direction.
    fn background(&self, direction: Vec3) -> Option<BackgroundSample>;

    /// True for emitters with an area (as opposed to environment lights).
    fn is_finite(&self) -> bool;

    /// Probability of choosing this light among all lights.
    fn pick_probability(&self) -> f32 {
        1.0
    }
}

/// Radiance distribution of an environment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EnvironmentRadiance {
    Constant(Color),
    /// Blend from `horizon` (looking down) to `zenith` (looking up).
    Gradient { horizon: Color, zenith: Color },
}

impl EnvironmentRadiance {
    /// Sky-like default: white below fading to light blue above.
    pub fn sky() -> Self {
        EnvironmentRadiance::Gradient {
            horizon: Color::new(1.0, 1.0, 1.0),
            zenith: Color::new(0.5, 0.7, 1.0),
        }
    }

    /// Radiance arriving from unit direction `towards_light`.
    pub fn eval(&self, towards_light: Vec3) -> Color {
        match *self {
            EnvironmentRadiance::Constant(c) => c,
            EnvironmentRadiance::Gradient { horizon, zenith } => {
                let a = 0.5 * (towards_light.y + 1.0);
                horizon * (1.0 - a) + zenith * a
            }
        }
    }
}

/// Infinitely distant light surrounding the scene.
///
/// Directions are sampled uniformly over the sphere; emitted rays start on a
/// disk tangent to the scene's bounding sphere.
#[derive(Clone, Debug)]
pub struct EnvironmentLight {
    radiance: EnvironmentRadiance,
    scene_center: Vec3,
    scene_radius: f32,
}

impl EnvironmentLight {
    pub fn new(radiance: EnvironmentRadiance, scene_bounds: &Aabb) -> Self {
        let (scene_center, radius) = scene_bounds.bounding_sphere();
        Self {
            radiance,
            scene_center,
            scene_radius: radius.max(1e-3),
        }
    }

    pub fn scene_radius(&self) -> f32 {
        self.scene_radius
    }

    fn emission_pdf(&self) -> f32 {
        UNIFORM_SPHERE_PDF * CONCENTRIC_DISK_PDF / (self.scene_radius * self.scene_radius)
    }
}

impl LightSampler for EnvironmentLight {
    fn sample_emission(&self, sampler: &mut dyn Sampler) -> Option<LightEmissionSample> {
        let towards_light = uniform_sphere(sampler.uniform_float(), sampler.uniform_float());
        let disk = concentric_disk(sampler.uniform_float(), sampler.uniform_float());

        let (t, b) = make_orthogonal_basis(towards_light);
        let position = self.scene_center
            + self.scene_radius * (towards_light + t * disk.x + b * disk.y);

        Some(LightEmissionSample {
            position,
            direction: -towards_light,
            radiance: self.radiance.eval(towards_light),
            emission_pdf_w: self.emission_pdf(),
            direction_pdf_a: UNIFORM_SPHERE_PDF,
            cos_theta_light: 1.0,
        })
    }

    fn sample_direct(&self, _position: Vec3, sampler: &mut dyn Sampler) -> Option<LightDirectSample> {
        let direction = uniform_sphere(sampler.uniform_float(), sampler.uniform_float());

        Some(LightDirectSample {
            direction,
            distance: f32::INFINITY,
            radiance: self.radiance.eval(direction),
            direct_pdf_w: UNIFORM_SPHERE_PDF,
            emission_pdf_w: self.emission_pdf(),
            cos_at_light: 1.0,
        })
    }

    fn background(&self, direction: Vec3) -> Option<BackgroundSample> {
        Some(BackgroundSample {
            radiance: self.radiance.eval(direction.normalize()),
            direct_pdf_a: UNIFORM_SPHERE_PDF,
            emission_pdf_w: self.emission_pdf(),
        })
    }

    fn is_finite(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::RandomSampler;

    fn unit_box() -> Aabb {
        Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    #[test]
    fn test_sky_gradient() {
        let sky = EnvironmentRadiance::sky();
        let up = sky.eval(Vec3::Y);
        let down = sky.eval(-Vec3::Y);

        assert!((up - Color::new(0.5, 0.7, 1.0)).length() < 0.001);
        assert!((down - Color::ONE).length() < 0.001);
    }

    #[test]
    fn test_emission_starts_outside_scene_and_points_inward() {
        let light = EnvironmentLight::new(EnvironmentRadiance::Constant(Color::ONE), &unit_box());
        let mut sampler = RandomSampler::new(42);

        for _ in 0..32 {
            let sample = light.sample_emission(&mut sampler).unwrap();
            assert!((sample.direction.length() - 1.0).abs() < 0.001);

            // The disk is tangent to the bounding sphere, so the ray starts on
            // or outside it and travels back towards the centre plane
            let to_center = Vec3::ZERO - sample.position;
            assert!(sample.position.length() >= light.scene_radius() - 1e-3);
            assert!((to_center.dot(sample.direction) - light.scene_radius()).abs() < 1e-3);
            assert_eq!(sample.cos_theta_light, 1.0);
        }
    }

    #[test]
    fn test_pdfs_are_consistent() {
        let light = EnvironmentLight::new(EnvironmentRadiance::sky(), &unit_box());
        let mut sampler = RandomSampler::new(7);

        let emission = light.sample_emission(&mut sampler).unwrap();
        let direct = light.sample_direct(Vec3::ZERO, &mut sampler).unwrap();
        let background = light.background(-emission.direction).unwrap();

        assert!((emission.emission_pdf_w - direct.emission_pdf_w).abs() < 1e-6);
        assert!((background.direct_pdf_a - direct.direct_pdf_w).abs() < 1e-6);
        assert!((background.radiance - emission.radiance).length() < 1e-4);
        assert!(!light.is_finite());
    }
}
