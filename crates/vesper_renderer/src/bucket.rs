//! Bucket-based tiling of the camera pass.
//!
//! The image is cut into tiles that are traced independently and in
//! parallel with rayon, centre tiles first.

use crate::Color;

/// Default bucket size in pixels.
pub const DEFAULT_BUCKET_SIZE: u32 = 64;

/// A rectangular tile of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Top-left corner in pixels
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Position in the render order
    pub index: usize,
}

impl Bucket {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Squared distance from the tile's centre to `(cx, cy)`.
    fn distance_sqr_to(&self, cx: f32, cy: f32) -> f32 {
        let dx = self.x as f32 + self.width as f32 * 0.5 - cx;
        let dy = self.y as f32 + self.height as f32 * 0.5 - cy;
        dx * dx + dy * dy
    }
}

/// Cover a `width` x `height` image with tiles of at most `bucket_size`
/// pixels a side, ordered outwards from the image centre.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let size = bucket_size.max(1);
    let mut buckets: Vec<Bucket> = (0..height)
        .step_by(size as usize)
        .flat_map(|y| {
            (0..width).step_by(size as usize).map(move |x| {
                Bucket::new(x, y, size.min(width - x), size.min(height - y), 0)
            })
        })
        .collect();

    let (cx, cy) = (width as f32 * 0.5, height as f32 * 0.5);
    // Stable, so equidistant tiles keep scanline order
    buckets.sort_by(|a, b| a.distance_sqr_to(cx, cy).total_cmp(&b.distance_sqr_to(cx, cy)));

    for (index, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = index;
    }
    buckets
}

/// Pixels of one traced tile.
#[derive(Debug, Clone)]
pub struct BucketResult {
    pub bucket: Bucket,
    /// Row-major within the bucket
    pub pixels: Vec<Color>,
}

impl BucketResult {
    pub fn new(bucket: Bucket, pixels: Vec<Color>) -> Self {
        Self { bucket, pixels }
    }
}

/// Shade every pixel of a bucket.
///
/// `shade` receives global pixel coordinates.
pub fn render_bucket(bucket: &Bucket, mut shade: impl FnMut(u32, u32) -> Color) -> BucketResult {
    let mut pixels = Vec::with_capacity(bucket.pixel_count() as usize);
    for y in bucket.y..bucket.y + bucket.height {
        for x in bucket.x..bucket.x + bucket.width {
            pixels.push(shade(x, y));
        }
    }
    BucketResult::new(*bucket, pixels)
}
