//! Radiance accumulation buffer.

use crate::bucket::BucketResult;
use crate::Color;

/// Linear RGB image that contributions are summed into.
#[derive(Clone, Debug, PartialEq)]
pub struct Framebuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl Framebuffer {
    /// Create a new framebuffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Add a contribution to the pixel with row-major `index`.
    #[inline]
    pub fn add(&mut self, index: usize, color: Color) {
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel += color;
        }
    }

    /// Add the pixels of a rendered bucket.
    pub fn add_bucket(&mut self, result: &BucketResult) {
        let bucket = &result.bucket;
        for local_y in 0..bucket.height {
            let row = ((bucket.y + local_y) * self.width + bucket.x) as usize;
            let src = (local_y * bucket.width) as usize;
            let len = bucket.width as usize;
            for (dst, &color) in self.pixels[row..row + len]
                .iter_mut()
                .zip(&result.pixels[src..src + len])
            {
                *dst += color;
            }
        }
    }

    /// Sum another framebuffer of the same size into this one.
    pub fn merge(&mut self, other: &Framebuffer) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        for (dst, &src) in self.pixels.iter_mut().zip(&other.pixels) {
            *dst += src;
        }
    }

    pub fn scale(&mut self, factor: f32) {
        for pixel in &mut self.pixels {
            *pixel *= factor;
        }
    }

    /// Convert to RGBA bytes (for display or saving).
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
        bytes
    }

    /// Copy into an 8-bit image for encoding with the `image` crate.
    pub fn to_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.width, self.height, |x, y| {
            image::Rgba(color_to_rgba(self.get(x, y)))
        })
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let to_byte = |c: f32| (255.0 * linear_to_gamma(c).clamp(0.0, 1.0)) as u8;
    [to_byte(color.x), to_byte(color.y), to_byte(color.z), 255]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::Bucket;

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 0.0001);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_color_to_rgba_clamps() {
        assert_eq!(color_to_rgba(Color::new(4.0, -1.0, 0.25)), [255, 0, 127, 255]);
    }

    #[test]
    fn test_add_and_merge() {
        let mut a = Framebuffer::new(4, 2);
        a.add(5, Color::ONE);
        a.add(100, Color::ONE);

        let mut b = Framebuffer::new(4, 2);
        b.add(5, Color::splat(2.0));
        a.merge(&b);
        a.scale(0.5);

        assert!((a.get(1, 1) - Color::splat(1.5)).length() < 1e-6);
        assert_eq!(a.get(0, 0), Color::ZERO);
    }

    #[test]
    fn test_add_bucket_places_pixels() {
        let mut fb = Framebuffer::new(4, 4);
        let bucket = Bucket::new(2, 1, 2, 2, 0);
        let pixels = vec![Color::X, Color::Y, Color::Z, Color::ONE];
        fb.add_bucket(&BucketResult::new(bucket, pixels));

        assert_eq!(fb.get(2, 1), Color::X);
        assert_eq!(fb.get(3, 1), Color::Y);
        assert_eq!(fb.get(2, 2), Color::Z);
        assert_eq!(fb.get(3, 2), Color::ONE);
        assert_eq!(fb.get(1, 1), Color::ZERO);
    }

    #[test]
    fn test_to_image_dimensions() {
        let fb = Framebuffer::new(3, 2);
        let img = fb.to_image();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(fb.to_rgba8().len(), 3 * 2 * 4);
    }
}
