//! Deterministic pseudo-random source for synthetic generation.
//!
//! A 64-bit Xorshift generator with a Box-Muller transform for normals.
//! No OS entropy and no external RNG crate anywhere in the generator: the
//! same seed always reproduces the same stream, which is what makes the
//! host backend bitwise-deterministic per seed.

/// Seeded Xorshift64 stream.
#[derive(Debug, Clone)]
pub struct SynthRng {
    state: u64,
    /// Cached second Box-Muller output.
    spare_gaussian: Option<f32>,
}

impl SynthRng {
    /// Creates a stream from a seed. Zero seeds take a fixed escape
    /// constant so the generator never locks onto the all-zero state.
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x853c_49e6_748f_ea9b } else { seed },
            spare_gaussian: None,
        }
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        // Xorshift64
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Uniform sample in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        // Top 24 bits give a full-precision f32 mantissa.
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform sample in `[lo, hi)`.
    pub fn uniform(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }

    /// Bernoulli trial with probability `p`.
    pub fn bernoulli(&mut self, p: f32) -> bool {
        self.next_f32() < p
    }

    /// Standard normal sample via Box-Muller.
    pub fn next_gaussian(&mut self) -> f32 {
        if let Some(spare) = self.spare_gaussian.take() {
            return spare;
        }
        // Reject u1 == 0 to keep ln finite.
        let mut u1 = self.next_f32();
        while u1 <= f32::EPSILON {
            u1 = self.next_f32();
        }
        let u2 = self.next_f32();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * std::f32::consts::PI * u2;
        self.spare_gaussian = Some(radius * angle.sin());
        radius * angle.cos()
    }
}
