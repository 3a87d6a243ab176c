//! NPK layer synthesis at weekly cadence.
//!
//! Per-zone N/P/K baselines drift downward as crops consume nutrients and
//! step back up every four weeks when fertilization lands. Organic matter
//! follows a slow seasonal sinusoid. Values clamp to agronomic ranges and
//! the whole layer shares one dropout mask.

use std::f32::consts::PI;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::correlate::{cholesky_with_jitter, correlated_noise, factor_correlation};
use crate::missing::{apply_mask, dropout_mask, to_rows};
use crate::rng::SynthRng;
use crate::topology::Topology;

/// Weeks between fertilization events.
const FERTILIZATION_PERIOD_WEEKS: usize = 4;

/// NPK block of the synthetic dataset: one `n_samples x n_zones` matrix per
/// channel, sampled weekly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpkLayerData {
    /// Zone identifiers, column order.
    pub zone_ids: Vec<String>,
    /// Number of weekly samples.
    pub n_samples: usize,
    /// Sample time in days from the start.
    pub sample_day: Vec<f32>,
    /// Nitrogen, mg/kg.
    pub nitrogen: Vec<Vec<f32>>,
    /// Phosphorus, mg/kg.
    pub phosphorus: Vec<Vec<f32>>,
    /// Potassium, mg/kg.
    pub potassium: Vec<Vec<f32>>,
    /// Organic matter, %.
    pub organic_matter: Vec<Vec<f32>>,
    /// Shared dropout mask.
    pub missing_mask: Vec<Vec<bool>>,
}

/// Generates the NPK layer for `days` of coverage.
pub fn generate(seed: u64, days: usize, topology: &Topology, dropout_rate: f32) -> NpkLayerData {
    let mut rng = SynthRng::new(seed);
    let n = topology.n_zones;
    let n_samples = (days.max(1)).div_ceil(7);

    let base_n: Vec<f32> = (0..n).map(|_| rng.uniform(60.0, 100.0)).collect();
    let base_p: Vec<f32> = (0..n).map(|_| rng.uniform(40.0, 70.0)).collect();
    let base_k: Vec<f32> = (0..n).map(|_| rng.uniform(50.0, 90.0)).collect();

    let corr = factor_correlation(&mut rng, n);
    let l = cholesky_with_jitter(&corr);
    let noise = correlated_noise(&mut rng, n_samples, &l);

    let mut nitrogen = Array2::zeros((n_samples, n));
    let mut phosphorus = Array2::zeros((n_samples, n));
    let mut potassium = Array2::zeros((n_samples, n));
    let mut organic_matter = Array2::zeros((n_samples, n));
    let mut sample_day = Vec::with_capacity(n_samples);

    for week in 0..n_samples {
        sample_day.push(week as f32 * 7.0);
        // Step-ups land every fourth week after the start.
        let fertilizations = week / FERTILIZATION_PERIOD_WEEKS;
        for z in 0..n {
            let drift = week as f32;
            let n_value = base_n[z] - 2.2 * drift
                + 25.0 * fertilizations as f32
                + 2.0 * noise[[week, z]];
            let p_value = base_p[z] - 1.1 * drift
                + 12.0 * fertilizations as f32
                + 1.2 * noise[[week, z]];
            let k_value = base_k[z] - 1.6 * drift
                + 18.0 * fertilizations as f32
                + 1.6 * noise[[week, z]];
            nitrogen[[week, z]] = n_value.clamp(5.0, 150.0);
            phosphorus[[week, z]] = p_value.clamp(5.0, 100.0);
            potassium[[week, z]] = k_value.clamp(5.0, 120.0);
            organic_matter[[week, z]] = (3.5
                + 0.5 * (2.0 * PI * week as f32 / 52.0).sin()
                + 0.1 * noise[[week, z]])
                .clamp(0.5, 10.0);
        }
    }

    let mask = dropout_mask(&mut rng, n_samples, n, dropout_rate);
    apply_mask(&mut nitrogen, &mask);
    apply_mask(&mut phosphorus, &mask);
    apply_mask(&mut potassium, &mask);
    apply_mask(&mut organic_matter, &mask);

    NpkLayerData {
        zone_ids: topology.zones.iter().map(|z| z.zone_id.clone()).collect(),
        n_samples,
        sample_day,
        nitrogen: to_rows(&nitrogen),
        phosphorus: to_rows(&phosphorus),
        potassium: to_rows(&potassium),
        organic_matter: to_rows(&organic_matter),
        missing_mask: mask,
    }
}
