//! Soil layer synthesis.
//!
//! Moisture follows a per-sensor exponential decay toward a dry baseline,
//! recharged by the shared rainfall and irrigation impulses, modulated by a
//! small diurnal sinusoid and correlated noise, clamped to `[0.03, 0.95]`.
//! Temperature couples to the diurnal cycle and inversely to moisture;
//! conductivity inversely to moisture; pH stays in `[4.5, 8.5]`. One mask
//! covers all channels: when a sensor drops out, every reading drops out.

use std::f32::consts::PI;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::correlate::{cholesky_with_jitter, correlated_noise, factor_correlation};
use crate::forcing::SharedForcing;
use crate::missing::{apply_mask, dropout_mask, to_rows};
use crate::rng::SynthRng;
use crate::topology::Topology;

/// Moisture clamp range.
const MOISTURE_MIN: f32 = 0.03;
const MOISTURE_MAX: f32 = 0.95;

/// Soil block of the synthetic dataset: one `n_steps x n_sensors` matrix
/// per channel, with a mask shared across channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilLayerData {
    /// Sensor identifiers, column order.
    pub sensor_ids: Vec<String>,
    /// Owning zone per sensor.
    pub zone_ids: Vec<String>,
    /// Volumetric moisture fraction.
    pub moisture: Vec<Vec<f32>>,
    /// Soil temperature, °C.
    pub temperature: Vec<Vec<f32>>,
    /// Electrical conductivity, dS/m.
    pub conductivity: Vec<Vec<f32>>,
    /// Soil pH.
    pub ph: Vec<Vec<f32>>,
    /// Shared dropout mask: a dropped sensor drops every channel.
    pub missing_mask: Vec<Vec<bool>>,
}

/// Generates the soil layer.
pub fn generate(
    seed: u64,
    n_steps: usize,
    topology: &Topology,
    forcing: &SharedForcing,
    dropout_rate: f32,
) -> SoilLayerData {
    let mut rng = SynthRng::new(seed);
    let n = topology.soil_sensors.sensor_id.len();

    // Per-sensor dynamics parameters.
    let decay: Vec<f32> = (0..n).map(|_| rng.uniform(0.002, 0.006)).collect();
    let initial: Vec<f32> = (0..n).map(|_| rng.uniform(0.18, 0.32)).collect();
    let recharge_gain: Vec<f32> = (0..n).map(|_| rng.uniform(0.008, 0.014)).collect();
    let ph_base: Vec<f32> = (0..n).map(|_| rng.uniform(6.0, 7.2)).collect();

    let corr = factor_correlation(&mut rng, n);
    let l = cholesky_with_jitter(&corr);
    let noise = correlated_noise(&mut rng, n_steps, &l);

    let mut moisture = Array2::zeros((n_steps, n));
    let mut temperature = Array2::zeros((n_steps, n));
    let mut conductivity = Array2::zeros((n_steps, n));
    let mut ph = Array2::zeros((n_steps, n));

    let mut level = initial.clone();
    for t in 0..n_steps {
        let hours = t as f32 * 0.25;
        let diurnal = (2.0 * PI * hours / 24.0).sin();
        let water_in = forcing.rain_mm[t] + forcing.irrigation_mm[t];

        for s in 0..n {
            let decayed = level[s] - decay[s] * (level[s] - 0.08);
            let next = decayed
                + recharge_gain[s] * water_in
                + 0.002 * diurnal
                + 0.003 * noise[[t, s]];
            level[s] = next.clamp(MOISTURE_MIN, MOISTURE_MAX);
            moisture[[t, s]] = level[s];

            temperature[[t, s]] = 17.0 + 5.0 * (2.0 * PI * (hours - 3.0) / 24.0).sin()
                - 4.0 * (level[s] - 0.3)
                + 0.3 * noise[[t, s]];
            conductivity[[t, s]] =
                (1.2 + 0.8 * (0.4 - level[s]) + 0.05 * noise[[t, s]]).clamp(0.05, 5.0);
            ph[[t, s]] = (ph_base[s] + 0.2 * (2.0 * PI * hours / (24.0 * 30.0)).sin()
                + 0.03 * noise[[t, s]])
                .clamp(4.5, 8.5);
        }
    }

    // One mask for the whole layer.
    let mask = dropout_mask(&mut rng, n_steps, n, dropout_rate);
    apply_mask(&mut moisture, &mask);
    apply_mask(&mut temperature, &mask);
    apply_mask(&mut conductivity, &mask);
    apply_mask(&mut ph, &mask);

    SoilLayerData {
        sensor_ids: topology.soil_sensors.sensor_id.clone(),
        zone_ids: topology.soil_sensors.zone_id.clone(),
        moisture: to_rows(&moisture),
        temperature: to_rows(&temperature),
        conductivity: to_rows(&conductivity),
        ph: to_rows(&ph),
        missing_mask: mask,
    }
}
