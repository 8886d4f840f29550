//! Pinhole camera for ray generation and light-tracing projection.
//!
//! The virtual image plane is placed so that one pixel has unit area, which
//! makes the image-plane sampling pdf 1 and keeps the camera's area/solid
//! angle conversions in pixel units.

use vesper_math::{Ray, Vec2, Vec3};

use crate::sampler::Sampler;

/// Camera for generating rays into the scene.
#[derive(Clone, Debug)]
pub struct Camera {
    // Image settings
    pub image_width: u32,
    pub image_height: u32,

    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    /// Vertical field of view in degrees
    vfov: f32,

    // Cached computed values (set by initialize())
    center: Vec3,
    u: Vec3,
    v: Vec3,
    w: Vec3,
    image_plane_distance: f32,
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self {
            image_width: 800,
            image_height: 450,
            look_from: Vec3::new(0.0, 0.0, 0.0),
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::new(0.0, 1.0, 0.0),
            vfov: 90.0,
            center: Vec3::ZERO,
            u: Vec3::X,
            v: Vec3::Y,
            w: Vec3::Z,
            image_plane_distance: 1.0,
        }
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    /// Set the vertical field of view in degrees.
    pub fn with_fov(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self
    }

    /// Initialize the camera (must be called before generating rays).
    pub fn initialize(&mut self) {
        self.center = self.look_from;

        // Calculate camera basis vectors
        self.w = (self.look_from - self.look_at).normalize();
        self.u = self.vup.cross(self.w).normalize();
        self.v = self.w.cross(self.u);

        let h = (self.vfov.to_radians() / 2.0).tan();
        self.image_plane_distance = self.image_height as f32 / (2.0 * h);
    }

    pub fn position(&self) -> Vec3 {
        self.center
    }

    /// Unit viewing direction.
    pub fn forward(&self) -> Vec3 {
        -self.w
    }

    /// Distance to the image plane on which a pixel has unit area.
    pub fn virtual_image_plane_distance(&self) -> f32 {
        self.image_plane_distance
    }

    pub fn pixel_count(&self) -> usize {
        self.image_width as usize * self.image_height as usize
    }

    /// Unit ray through a jittered position inside pixel (x, y).
    ///
    /// Draws two variates.
    pub fn generate_ray(&self, x: u32, y: u32, sampler: &mut dyn Sampler) -> Ray {
        let jitter = Vec2::new(sampler.uniform_float(), sampler.uniform_float());
        let raster = Vec2::new(x as f32, y as f32) + jitter;
        Ray::new(self.center, self.raster_to_direction(raster))
    }

    /// Unit direction through a raster position (pixels, origin top-left).
    pub fn raster_to_direction(&self, raster: Vec2) -> Vec3 {
        let half_width = self.image_width as f32 * 0.5;
        let half_height = self.image_height as f32 * 0.5;
        let d = self.forward() * self.image_plane_distance
            + self.u * (raster.x - half_width)
            - self.v * (raster.y - half_height);
        d.normalize()
    }

    /// Project a world point to raster coordinates.
    ///
    /// Returns `None` for points behind the camera or outside the image.
    pub fn raster_position(&self, p: Vec3) -> Option<Vec2> {
        let d = p - self.center;
        let depth = d.dot(self.forward());
        if depth <= 0.0 {
            return None;
        }

        let scale = self.image_plane_distance / depth;
        let raster = Vec2::new(
            self.image_width as f32 * 0.5 + d.dot(self.u) * scale,
            self.image_height as f32 * 0.5 - d.dot(self.v) * scale,
        );

        let inside = raster.x >= 0.0
            && raster.y >= 0.0
            && raster.x < self.image_width as f32
            && raster.y < self.image_height as f32;
        inside.then_some(raster)
    }

    /// Row-major pixel index of a raster position.
    pub fn pixel_index(&self, raster: Vec2) -> usize {
        let x = (raster.x as u32).min(self.image_width.saturating_sub(1));
        let y = (raster.y as u32).min(self.image_height.saturating_sub(1));
        y as usize * self.image_width as usize + x as usize
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::RandomSampler;

    fn test_camera() -> Camera {
        let mut camera = Camera::new()
            .with_resolution(100, 50)
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
            .with_fov(90.0);
        camera.initialize();
        camera
    }

    #[test]
    fn test_camera_initialize() {
        let camera = test_camera();

        assert_eq!(camera.position(), Vec3::ZERO);
        assert!((camera.forward() + Vec3::Z).length() < 0.001);
        // tan(45) = 1, so the plane sits half the image height away
        assert!((camera.virtual_image_plane_distance() - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_camera_ray_direction() {
        let camera = test_camera();
        let mut sampler = RandomSampler::new(42);

        // Center ray should point roughly towards -Z
        let ray = camera.generate_ray(50, 25, &mut sampler);
        assert!(ray.direction.z < -0.99);
        assert!((ray.direction.length() - 1.0).abs() < 0.001);

        // Top-left pixel looks up and to the left
        let ray = camera.generate_ray(0, 0, &mut sampler);
        assert!(ray.direction.x < 0.0 && ray.direction.y > 0.0);
    }

    #[test]
    fn test_raster_projection_round_trip() {
        let camera = test_camera();
        let raster = Vec2::new(12.25, 40.5);
        let p = camera.position() + camera.raster_to_direction(raster) * 7.0;

        let projected = camera.raster_position(p).unwrap();
        assert!((projected - raster).length() < 0.01);
        assert_eq!(camera.pixel_index(projected), 40 * 100 + 12);
    }

    #[test]
    fn test_raster_rejects_behind_and_outside() {
        let camera = test_camera();
        assert!(camera.raster_position(Vec3::new(0.0, 0.0, 1.0)).is_none());
        assert!(camera.raster_position(Vec3::new(100.0, 0.0, -1.0)).is_none());
    }
}
