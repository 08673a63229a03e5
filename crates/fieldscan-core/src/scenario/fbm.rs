//! Fractional Brownian motion texture for synthetic canopies.
//!
//! Octave amplitude decays by `gain` and frequency grows by `lacunarity`;
//! the sum is normalised so output stays within roughly [−1, 1].
use noise::{NoiseFn, Perlin};

pub struct Fbm {
    pub octaves: u32,
    pub gain: f64,
    pub lacunarity: f64,
    noise: Perlin,
}

impl Fbm {
    pub fn new(seed: u32, octaves: u32) -> Self {
        Self { octaves, gain: 0.5, lacunarity: 2.0, noise: Perlin::new(seed) }
    }

    /// Evaluate at `(x, y)` in noise space.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let mut value = 0.0f64;
        let mut amp = 1.0f64;
        let mut freq = 1.0f64;
        let mut norm = 0.0f64;
        for _ in 0..self.octaves {
            value += amp * self.noise.get([x * freq, y * freq]);
            norm += amp;
            amp *= self.gain;
            freq *= self.lacunarity;
        }
        if norm > 0.0 { value / norm } else { 0.0 }
    }
}
