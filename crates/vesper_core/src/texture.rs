//! Textures for material inputs.
//!
//! Two lookups are supported: uv-mapped images with bilinear filtering, and
//! per-face tiles addressed by primitive id and barycentrics (for meshes
//! authored without a uv layout).

use image::DynamicImage;
use vesper_math::{Vec2, Vec3};
use thiserror::Error;

/// Errors that can occur while building textures.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Texture has no texels ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("Texel count {got} does not match {width}x{height}")]
    SizeMismatch { width: u32, height: u32, got: usize },

    #[error("Image decoding error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type TextureResult<T> = Result<T, TextureError>;

/// An image texture.
///
/// Texels are kept as authored; `srgb` marks data that is decoded to linear
/// on lookup.
#[derive(Clone, Debug)]
pub struct Texture {
    /// Texture width in pixels
    pub width: u32,

    /// Texture height in pixels
    pub height: u32,

    /// Pixel data in RGBA format, row-major, 0-1 range
    pub pixels: Vec<[f32; 4]>,

    /// Colour channels are sRGB encoded
    pub srgb: bool,
}

impl Texture {
    /// Create a new texture from pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<[f32; 4]>, srgb: bool) -> TextureResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }
        if pixels.len() != (width * height) as usize {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                got: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            srgb,
        })
    }

    /// Create a solid color texture (1x1, linear).
    pub fn solid_color(color: Vec3) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![[color.x, color.y, color.z, 1.0]],
            srgb: false,
        }
    }

    /// Convert an in-memory image.
    pub fn from_image(img: &DynamicImage, srgb: bool) -> TextureResult<Self> {
        let rgba = img.to_rgba32f();
        let (width, height) = rgba.dimensions();
        let pixels = rgba.pixels().map(|p| p.0).collect();
        Self::new(width, height, pixels, srgb)
    }

    /// Decode an encoded image (PNG, JPEG, ...) held in memory.
    pub fn decode(bytes: &[u8], srgb: bool) -> TextureResult<Self> {
        let img = image::load_from_memory(bytes)?;
        log::debug!("Decoded texture {}x{}", img.width(), img.height());
        Self::from_image(&img, srgb)
    }

    /// Sample the texture at UV coordinates (bilinear filtering, linear result).
    ///
    /// UV coordinates wrap, with (0, 0) at bottom-left.
    pub fn sample(&self, u: f32, v: f32) -> Vec3 {
        let u = u.rem_euclid(1.0);
        let v = v.rem_euclid(1.0);

        // Convert to pixel coordinates
        let x = u * (self.width as f32 - 1.0);
        let y = (1.0 - v) * (self.height as f32 - 1.0); // Flip V for image coordinates

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let fx = x.fract();
        let fy = y.fract();

        let top = self.texel(x0, y0) * (1.0 - fx) + self.texel(x1, y0) * fx;
        let bottom = self.texel(x0, y1) * (1.0 - fx) + self.texel(x1, y1) * fx;

        top * (1.0 - fy) + bottom * fy
    }

    /// Linear colour of one texel.
    fn texel(&self, x: u32, y: u32) -> Vec3 {
        let idx = (y * self.width + x) as usize;
        let [r, g, b, _] = self.pixels.get(idx).copied().unwrap_or([0.0, 0.0, 0.0, 1.0]);
        let c = Vec3::new(r, g, b);
        if self.srgb {
            Vec3::new(srgb_to_linear(c.x), srgb_to_linear(c.y), srgb_to_linear(c.z))
        } else {
            c
        }
    }
}

/// Filtered lookup of per-face textures.
pub trait FaceTextureFilter: Send + Sync {
    /// Evaluate the colour of `face_id` at barycentric coordinates `uv`.
    fn eval(&self, face_id: u32, uv: Vec2) -> Option<Vec3>;
}

/// One face's square tile of texels.
#[derive(Clone, Debug)]
pub struct FaceTile {
    pub resolution: u32,
    pub texels: Vec<Vec3>,
}

impl FaceTile {
    pub fn constant(color: Vec3) -> Self {
        Self {
            resolution: 1,
            texels: vec![color],
        }
    }
}

/// Per-face texture: every primitive owns a tile sampled bilinearly over
/// its barycentric parameterization.
#[derive(Clone, Debug, Default)]
pub struct PerFaceTexture {
    pub faces: Vec<FaceTile>,
}

impl PerFaceTexture {
    pub fn new(faces: Vec<FaceTile>) -> Self {
        Self { faces }
    }
}

impl FaceTextureFilter for PerFaceTexture {
    fn eval(&self, face_id: u32, uv: Vec2) -> Option<Vec3> {
        let tile = self.faces.get(face_id as usize)?;
        let res = tile.resolution.max(1);
        let fetch = |x: u32, y: u32| tile.texels.get((y * res + x) as usize).copied();

        let x = uv.x.clamp(0.0, 1.0) * (res - 1) as f32;
        let y = uv.y.clamp(0.0, 1.0) * (res - 1) as f32;
        let (x0, y0) = (x.floor() as u32, y.floor() as u32);
        let (x1, y1) = ((x0 + 1).min(res - 1), (y0 + 1).min(res - 1));
        let (fx, fy) = (x.fract(), y.fract());

        let top = fetch(x0, y0)? * (1.0 - fx) + fetch(x1, y0)? * fx;
        let bottom = fetch(x0, y1)? * (1.0 - fx) + fetch(x1, y1)? * fx;
        Some(top * (1.0 - fy) + bottom * fy)
    }
}

/// Convert an sRGB encoded value in [0, 1] to linear.
pub fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color_texture() {
        let tex = Texture::solid_color(Vec3::new(1.0, 0.5, 0.0));
        assert_eq!(tex.width, 1);
        assert_eq!(tex.height, 1);

        let sample = tex.sample(0.5, 0.5);
        assert!((sample.x - 1.0).abs() < 0.001);
        assert!((sample.y - 0.5).abs() < 0.001);
        assert!((sample.z - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_srgb_texture_decodes_on_lookup() {
        let tex = Texture::new(1, 1, vec![[0.5, 0.5, 0.5, 1.0]], true).unwrap();
        let sample = tex.sample(0.2, 0.7);
        assert!((sample.x - srgb_to_linear(0.5)).abs() < 0.001);
        assert!(sample.x < 0.5);
    }

    #[test]
    fn test_bilinear_midpoint() {
        let pixels = vec![[0.0, 0.0, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]];
        let tex = Texture::new(2, 1, pixels, false).unwrap();
        let sample = tex.sample(0.5, 0.5);
        assert!((sample.x - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_texture_validation() {
        assert!(matches!(
            Texture::new(0, 4, vec![], false),
            Err(TextureError::Empty { .. })
        ));
        assert!(matches!(
            Texture::new(2, 2, vec![[0.0; 4]; 3], false),
            Err(TextureError::SizeMismatch { got: 3, .. })
        ));
        assert!(Texture::decode(&[1, 2, 3], true).is_err());
    }

    #[test]
    fn test_from_image() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            2,
            2,
            image::Rgba([255, 0, 0, 255]),
        ));
        let tex = Texture::from_image(&img, false).unwrap();
        assert_eq!(tex.width, 2);
        assert!((tex.sample(0.3, 0.3) - Vec3::X).length() < 0.001);
    }

    #[test]
    fn test_decode_png() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            3,
            2,
            image::Rgba([0, 255, 0, 255]),
        ));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageOutputFormat::Png).unwrap();

        let tex = Texture::decode(bytes.get_ref(), false).unwrap();
        assert_eq!((tex.width, tex.height), (3, 2));
        assert!((tex.sample(0.5, 0.5) - Vec3::Y).length() < 0.001);
    }

    #[test]
    fn test_per_face_texture() {
        let faces = vec![
            FaceTile::constant(Vec3::new(0.2, 0.4, 0.6)),
            FaceTile {
                resolution: 2,
                texels: vec![Vec3::ZERO, Vec3::ONE, Vec3::ZERO, Vec3::ONE],
            },
        ];
        let ptex = PerFaceTexture::new(faces);

        let c = ptex.eval(0, Vec2::new(0.3, 0.3)).unwrap();
        assert!((c - Vec3::new(0.2, 0.4, 0.6)).length() < 0.001);

        let c = ptex.eval(1, Vec2::new(0.5, 0.0)).unwrap();
        assert!((c.x - 0.5).abs() < 0.001);

        assert!(ptex.eval(2, Vec2::ZERO).is_none());
    }

    #[test]
    fn test_srgb_to_linear() {
        assert!((srgb_to_linear(0.0) - 0.0).abs() < 0.001);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 0.001);

        // Mid-gray is darker in linear
        let mid = srgb_to_linear(128.0 / 255.0);
        assert!(mid < 0.5);
        assert!(mid > 0.1);
    }
}
