//! Shared environmental forcing: rainfall and irrigation impulses.
//!
//! Soil moisture and the irrigation layer must agree on when water arrived,
//! so both draw from one forcing series generated up front. Rain follows a
//! seasonal probability oscillating between 2% and 30% per step over a
//! 30-day cycle; irrigation fires on a fixed schedule, skipping steps where
//! rain already fell.

use crate::rng::SynthRng;

/// Millimetres applied by one irrigation impulse.
const IRRIGATION_PULSE_MM: f32 = 3.0;

/// Steps between scheduled irrigation impulses (6 h at 15-minute cadence).
const IRRIGATION_INTERVAL_STEPS: usize = 24;

/// Farm-level water inputs per time step.
#[derive(Debug, Clone)]
pub struct SharedForcing {
    /// Rainfall in millimetres per step.
    pub rain_mm: Vec<f32>,
    /// Irrigation application in millimetres per step.
    pub irrigation_mm: Vec<f32>,
}

impl SharedForcing {
    /// Generates the forcing series for `n_steps` 15-minute steps.
    pub fn generate(seed: u64, n_steps: usize) -> Self {
        let mut rng = SynthRng::new(seed);
        let mut rain_mm = Vec::with_capacity(n_steps);
        let mut irrigation_mm = Vec::with_capacity(n_steps);

        for t in 0..n_steps {
            let day = t as f32 * 0.25 / 24.0;
            // Oscillates over [0.02, 0.30] with a 30-day period.
            let rain_probability =
                0.16 + 0.14 * (2.0 * std::f32::consts::PI * day / 30.0).sin();
            let rain = if rng.bernoulli(rain_probability) {
                rng.uniform(0.0, 4.0)
            } else {
                0.0
            };
            rain_mm.push(rain);

            let scheduled = t % IRRIGATION_INTERVAL_STEPS == 0;
            irrigation_mm.push(if scheduled && rain == 0.0 {
                IRRIGATION_PULSE_MM
            } else {
                0.0
            });
        }

        Self {
            rain_mm,
            irrigation_mm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forcing_is_deterministic() {
        let a = SharedForcing::generate(42, 960);
        let b = SharedForcing::generate(42, 960);
        assert_eq!(a.rain_mm, b.rain_mm);
        assert_eq!(a.irrigation_mm, b.irrigation_mm);
    }

    #[test]
    fn test_rain_bounds() {
        let forcing = SharedForcing::generate(7, 9600);
        assert!(forcing.rain_mm.iter().all(|&mm| (0.0..4.0).contains(&mm)));
        let wet_steps = forcing.rain_mm.iter().filter(|&&mm| mm > 0.0).count();
        // Mean probability is 0.16; allow a generous band.
        let rate = wet_steps as f32 / 9600.0;
        assert!(rate > 0.05 && rate < 0.35, "wet-step rate {rate}");
    }

    #[test]
    fn test_irrigation_skips_rainy_steps() {
        let forcing = SharedForcing::generate(9, 9600);
        for t in 0..9600 {
            if forcing.irrigation_mm[t] > 0.0 {
                assert!(forcing.rain_mm[t] == 0.0);
                assert_eq!(t % IRRIGATION_INTERVAL_STEPS, 0);
            }
        }
    }
}
