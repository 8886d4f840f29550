//! Sources of uniform random numbers for the integrator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Stream of uniform variates in `[0, 1)`.
///
/// Implementations must be deterministic for a given seed so renders are
/// reproducible.
pub trait Sampler {
    fn uniform_float(&mut self) -> f32;
}

/// Pseudo-random sampler backed by `StdRng`.
pub struct RandomSampler {
    rng: StdRng,
}

impl RandomSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Sampler for one path of one iteration.
    ///
    /// Seeds are derived from `(seed, iteration, index)` only, so results do
    /// not depend on which worker traces the path.
    pub fn for_path(seed: u64, iteration: u32, index: u32) -> Self {
        let stream = ((iteration as u64) << 32) | index as u64;
        Self::new(splitmix64(seed ^ splitmix64(stream)))
    }
}

impl Sampler for RandomSampler {
    #[inline]
    fn uniform_float(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Replays a fixed list of variates and counts how many were drawn.
#[cfg(test)]
pub(crate) struct SequenceSampler {
    values: Vec<f32>,
    pub consumed: usize,
}

#[cfg(test)]
impl SequenceSampler {
    pub fn new(values: &[f32]) -> Self {
        Self {
            values: values.to_vec(),
            consumed: 0,
        }
    }
}

#[cfg(test)]
impl Sampler for SequenceSampler {
    fn uniform_float(&mut self) -> f32 {
        let value = self.values[self.consumed % self.values.len()];
        self.consumed += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_sampler_range() {
        let mut sampler = RandomSampler::new(42);
        for _ in 0..1000 {
            let u = sampler.uniform_float();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn test_path_streams_are_deterministic() {
        let mut a = RandomSampler::for_path(7, 3, 100);
        let mut b = RandomSampler::for_path(7, 3, 100);
        let mut c = RandomSampler::for_path(7, 3, 101);

        let xs: Vec<f32> = (0..4).map(|_| a.uniform_float()).collect();
        let ys: Vec<f32> = (0..4).map(|_| b.uniform_float()).collect();
        let zs: Vec<f32> = (0..4).map(|_| c.uniform_float()).collect();
        assert_eq!(xs, ys);
        assert_ne!(xs, zs);
    }

    #[test]
    fn test_sequence_sampler_counts() {
        let mut sampler = SequenceSampler::new(&[0.25, 0.75]);
        assert_eq!(sampler.uniform_float(), 0.25);
        assert_eq!(sampler.uniform_float(), 0.75);
        assert_eq!(sampler.uniform_float(), 0.25);
        assert_eq!(sampler.consumed, 3);
    }
}
