//! Lighting layer synthesis, emitted only for farms with greenhouses.
//!
//! PAR follows a clipped sinusoid scaled by a per-sensor peak; the daily
//! light integral accumulates the PAR time integral in mol/m² and resets at
//! day boundaries; the duty cycle derives from PAR; the spectrum index is a
//! bounded sinusoid.

use std::f32::consts::PI;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::missing::{apply_mask, dropout_mask, to_rows};
use crate::rng::SynthRng;
use crate::topology::Topology;

/// Seconds per 15-minute step, for the DLI integral.
const STEP_SECONDS: f32 = 900.0;

/// Lighting block of the synthetic dataset: one `n_steps x n_zones` matrix
/// per channel over the greenhouse zones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightingLayerData {
    /// Greenhouse zone identifiers, column order.
    pub zone_ids: Vec<String>,
    /// Photosynthetically active radiation, µmol/m²/s.
    pub par: Vec<Vec<f32>>,
    /// Daily light integral, mol/m², resetting each day.
    pub dli_cumulative: Vec<Vec<f32>>,
    /// Fixture duty cycle in `[0, 1]`.
    pub duty_cycle: Vec<Vec<f32>>,
    /// Spectrum index in `[0, 1]`.
    pub spectrum_index: Vec<Vec<f32>>,
    /// Shared dropout mask.
    pub missing_mask: Vec<Vec<bool>>,
}

/// Generates the lighting layer over the greenhouse zones. Returns `None`
/// when the farm has none.
pub fn generate(
    seed: u64,
    n_steps: usize,
    topology: &Topology,
    dropout_rate: f32,
) -> Option<LightingLayerData> {
    let greenhouse_zones = topology.greenhouse_zone_indices();
    if greenhouse_zones.is_empty() {
        return None;
    }
    let mut rng = SynthRng::new(seed);
    let n = greenhouse_zones.len();

    let peaks: Vec<f32> = (0..n).map(|_| rng.uniform(600.0, 900.0)).collect();

    let mut par = Array2::zeros((n_steps, n));
    let mut dli = Array2::zeros((n_steps, n));
    let mut duty = Array2::zeros((n_steps, n));
    let mut spectrum = Array2::zeros((n_steps, n));

    let mut running_dli = vec![0.0f32; n];
    let mut previous_day = 0usize;
    for t in 0..n_steps {
        let hours = t as f32 * 0.25;
        let day = (hours / 24.0) as usize;
        if day != previous_day {
            running_dli.iter_mut().for_each(|v| *v = 0.0);
            previous_day = day;
        }
        let shape = (2.0 * PI * hours / 24.0 - 1.1).sin().max(0.0);
        for (col, _) in greenhouse_zones.iter().enumerate() {
            let value = shape * peaks[col];
            par[[t, col]] = value;
            running_dli[col] += value * STEP_SECONDS / 1.0e6;
            dli[[t, col]] = running_dli[col];
            duty[[t, col]] = (value / peaks[col]).clamp(0.0, 1.0);
            spectrum[[t, col]] =
                (0.6 + 0.2 * (2.0 * PI * hours / 72.0).sin()).clamp(0.0, 1.0);
        }
    }

    let mask = dropout_mask(&mut rng, n_steps, n, dropout_rate);
    apply_mask(&mut par, &mask);
    apply_mask(&mut dli, &mask);
    apply_mask(&mut duty, &mask);
    apply_mask(&mut spectrum, &mask);

    Some(LightingLayerData {
        zone_ids: greenhouse_zones
            .iter()
            .map(|&i| topology.zones[i].zone_id.clone())
            .collect(),
        par: to_rows(&par),
        dli_cumulative: to_rows(&dli),
        duty_cycle: to_rows(&duty),
        spectrum_index: to_rows(&spectrum),
        missing_mask: mask,
    })
}
