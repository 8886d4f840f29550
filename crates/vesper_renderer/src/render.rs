//! Progressive render loop.

use std::time::Instant;

use vesper_core::Scene;

use crate::camera::Camera;
use crate::config::VcmSettings;
use crate::error::RenderError;
use crate::framebuffer::Framebuffer;
use crate::intersector::SceneIntersector;
use crate::light::LightSampler;
use crate::vcm::schedule::search_radius;
use crate::vcm::VcmIntegrator;

/// Render `scene` as seen by an initialized `camera`.
///
/// Runs `settings.iterations` VCM iterations, or fewer when the time budget
/// runs out (at least one iteration always completes), and returns their
/// average.
pub fn render(
    scene: &Scene,
    camera: &Camera,
    light: &dyn LightSampler,
    settings: &VcmSettings,
) -> Result<Framebuffer, RenderError> {
    settings.validate()?;
    let intersector = SceneIntersector::build(scene)?;
    let (_, scene_radius) = intersector.bounds().bounding_sphere();
    let integrator = VcmIntegrator::new(scene, &intersector, camera, light, settings, scene_radius)?;

    log::info!(
        "Rendering {}x{} with {:?}, {} light paths per iteration, base radius {:.5}",
        camera.image_width,
        camera.image_height,
        settings.technique,
        integrator.light_path_count(),
        integrator.base_radius()
    );

    let start = Instant::now();
    let mut accumulated = Framebuffer::new(camera.image_width, camera.image_height);
    let mut completed = 0u32;

    for iteration in 1..=settings.iterations {
        if let Some(budget) = settings.time_budget_secs {
            if completed > 0 && start.elapsed().as_secs_f64() >= budget {
                log::info!("Time budget of {:.1}s reached after {} iterations", budget, completed);
                break;
            }
        }

        let image = integrator.run_iteration(iteration)?;
        accumulated.merge(&image);
        completed += 1;

        let radius = search_radius(integrator.base_radius(), settings.radius_alpha, iteration)?;
        log::info!(
            "Iteration {}/{} radius {:.5} ({:.2}s)",
            iteration,
            settings.iterations,
            radius,
            start.elapsed().as_secs_f64()
        );
    }

    accumulated.scale(1.0 / completed.max(1) as f32);
    Ok(accumulated)
}
