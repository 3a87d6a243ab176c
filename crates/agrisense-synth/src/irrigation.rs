//! Irrigation layer synthesis.
//!
//! One valve per zone replays the shared irrigation impulse series that
//! also drives soil recharge, tiled across zones with a per-valve
//! efficiency factor.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::forcing::SharedForcing;
use crate::missing::{apply_mask, dropout_mask, to_rows};
use crate::rng::SynthRng;
use crate::topology::Topology;

/// Irrigation block of the synthetic dataset: applied millimetres per
/// valve per step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrigationLayerData {
    /// Valve identifiers, column order.
    pub valve_ids: Vec<String>,
    /// Owning zone per valve.
    pub zone_ids: Vec<String>,
    /// Water applied, mm per step.
    pub applied_mm: Vec<Vec<f32>>,
    /// Dropout mask.
    pub missing_mask: Vec<Vec<bool>>,
}

/// Generates the irrigation layer from the shared impulse series.
pub fn generate(
    seed: u64,
    n_steps: usize,
    topology: &Topology,
    forcing: &SharedForcing,
    dropout_rate: f32,
) -> IrrigationLayerData {
    let mut rng = SynthRng::new(seed);
    let n = topology.n_zones;

    let efficiency: Vec<f32> = (0..n).map(|_| rng.uniform(0.9, 1.0)).collect();

    let mut applied = Array2::zeros((n_steps, n));
    for t in 0..n_steps {
        let impulse = forcing.irrigation_mm[t];
        for z in 0..n {
            applied[[t, z]] = impulse * efficiency[z];
        }
    }

    let mask = dropout_mask(&mut rng, n_steps, n, dropout_rate);
    apply_mask(&mut applied, &mask);

    IrrigationLayerData {
        valve_ids: topology
            .zones
            .iter()
            .map(|zone| format!("{}-valve", zone.zone_id))
            .collect(),
        zone_ids: topology.zones.iter().map(|z| z.zone_id.clone()).collect(),
        applied_mm: to_rows(&applied),
        missing_mask: mask,
    }
}
