use rand::prelude::*;
use rand::rngs::StdRng;
use std::f64::consts::PI;

use crate::math::blob::Blob;

/// Fills blobs with samples from N(mean, std²), drawn from a seeded generator
/// so fixtures are reproducible.
pub struct GaussianFiller {
    pub mean: f64,
    pub std: f64,
    rng: StdRng,
}

impl GaussianFiller {
    pub fn new(mean: f64, std: f64, seed: u64) -> GaussianFiller {
        GaussianFiller {
            mean,
            std,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn fill(&mut self, blob: &mut Blob) {
        for x in blob.data_mut() {
            *x = self.mean + self.std * sample_standard_normal(&mut self.rng);
        }
    }
}

/// Fills blobs with samples from U[min, max).
pub struct UniformFiller {
    pub min: f64,
    pub max: f64,
    rng: StdRng,
}

impl UniformFiller {
    pub fn new(min: f64, max: f64, seed: u64) -> UniformFiller {
        UniformFiller {
            min,
            max,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn fill(&mut self, blob: &mut Blob) {
        let span = self.max - self.min;
        for x in blob.data_mut() {
            *x = self.min + span * self.rng.gen::<f64>();
        }
    }
}

/// Samples a single value from N(0, 1) using the Box-Muller transform.
fn sample_standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // Uniform samples on (0, 1] so ln() never sees zero.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
