//! Vision layer synthesis, emitted only for farms with greenhouses.
//!
//! Per-bed pest/disease events spread along the bed line: each step, a
//! bed's event probability is amplified by 0.12 for every adjacent bed that
//! was flagged on the previous step. The anomaly code encodes
//! `{-1 missing, 0 none, 1 pest, 2 disease}`; confidence inflates on
//! positive events; canopy coverage follows a saturating growth curve plus
//! correlated noise.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::correlate::{cholesky_with_jitter, correlated_noise, factor_correlation};
use crate::missing::{apply_mask, dropout_mask, to_rows};
use crate::rng::SynthRng;
use crate::topology::{Topology, BEDS_PER_GREENHOUSE_ZONE};

/// Baseline per-step event probability.
const BASE_EVENT_PROBABILITY: f32 = 0.0008;

/// Probability amplification per neighbour flagged on the previous step.
const NEIGHBOR_AMPLIFICATION: f32 = 0.12;

/// Steps an event persists once started (one day).
const EVENT_DURATION_STEPS: usize = 96;

/// Vision block of the synthetic dataset: one `n_steps x n_beds` matrix
/// per channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionLayerData {
    /// Crop-bed identifiers, column order.
    pub bed_ids: Vec<String>,
    /// Owning zone per bed.
    pub zone_ids: Vec<String>,
    /// Event code: -1 missing, 0 none, 1 pest, 2 disease.
    pub anomaly_code: Vec<Vec<i8>>,
    /// Detection confidence in `[0, 1]`.
    pub confidence: Vec<Vec<f32>>,
    /// Canopy coverage, %.
    pub canopy_coverage: Vec<Vec<f32>>,
    /// Shared dropout mask; masked steps carry code -1.
    pub missing_mask: Vec<Vec<bool>>,
}

/// Generates the vision layer over greenhouse beds. Returns `None` when
/// the farm has no greenhouses.
pub fn generate(
    seed: u64,
    n_steps: usize,
    topology: &Topology,
    dropout_rate: f32,
) -> Option<VisionLayerData> {
    let greenhouse_zones = topology.greenhouse_zone_indices();
    if greenhouse_zones.is_empty() {
        return None;
    }
    let mut rng = SynthRng::new(seed);

    let mut bed_ids = Vec::new();
    let mut bed_zone_ids = Vec::new();
    for &zone_idx in &greenhouse_zones {
        let zone = &topology.zones[zone_idx];
        for b in 0..BEDS_PER_GREENHOUSE_ZONE {
            bed_ids.push(format!("{}-bed-{}", zone.zone_id, b + 1));
            bed_zone_ids.push(zone.zone_id.clone());
        }
    }
    let n = bed_ids.len();

    let growth_phase: Vec<f32> = (0..n).map(|_| rng.uniform(0.0, 20.0)).collect();
    let corr = factor_correlation(&mut rng, n);
    let l = cholesky_with_jitter(&corr);
    let canopy_noise = correlated_noise(&mut rng, n_steps, &l);

    let mut code = vec![vec![0i8; n]; n_steps];
    let mut confidence = Array2::zeros((n_steps, n));
    let mut canopy = Array2::zeros((n_steps, n));

    // Remaining duration and kind of the active event per bed.
    let mut event_left = vec![0usize; n];
    let mut event_kind = vec![0i8; n];
    let mut flagged_last_step = vec![false; n];

    for t in 0..n_steps {
        let day = t as f32 * 0.25 / 24.0;
        let mut flagged_now = vec![false; n];

        for b in 0..n {
            if event_left[b] == 0 {
                // Line-adjacency clustering: neighbours flagged last step
                // amplify this bed's start probability.
                let mut neighbors = 0u32;
                if b > 0 && flagged_last_step[b - 1] {
                    neighbors += 1;
                }
                if b + 1 < n && flagged_last_step[b + 1] {
                    neighbors += 1;
                }
                let probability =
                    BASE_EVENT_PROBABILITY + NEIGHBOR_AMPLIFICATION * neighbors as f32;
                if rng.bernoulli(probability) {
                    event_left[b] = EVENT_DURATION_STEPS;
                    event_kind[b] = if rng.bernoulli(0.5) { 1 } else { 2 };
                }
            }

            if event_left[b] > 0 {
                event_left[b] -= 1;
                code[t][b] = event_kind[b];
                flagged_now[b] = true;
                confidence[[t, b]] = (0.80 + 0.15 * rng.next_f32()).clamp(0.0, 1.0);
            } else {
                code[t][b] = 0;
                confidence[[t, b]] = (0.45 + 0.10 * rng.next_f32()).clamp(0.0, 1.0);
            }

            let progress = ((day + growth_phase[b]) / 90.0).min(1.0);
            canopy[[t, b]] = (20.0 + 75.0 * (1.0 - (-3.0 * progress).exp())
                + 1.5 * canopy_noise[[t, b]])
                .clamp(0.0, 100.0);
        }
        flagged_last_step = flagged_now;
    }

    let mask = dropout_mask(&mut rng, n_steps, n, dropout_rate);
    apply_mask(&mut confidence, &mask);
    apply_mask(&mut canopy, &mask);
    for (t, row) in mask.iter().enumerate() {
        for (b, &dropped) in row.iter().enumerate() {
            if dropped {
                code[t][b] = -1;
            }
        }
    }

    Some(VisionLayerData {
        bed_ids,
        zone_ids: bed_zone_ids,
        anomaly_code: code,
        confidence: to_rows(&confidence),
        canopy_coverage: to_rows(&canopy),
        missing_mask: mask,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrisense_graph::config::FarmType;

    #[test]
    fn test_open_field_emits_nothing() {
        let topology = Topology::for_farm_type(FarmType::OpenField);
        assert!(generate(51, 960, &topology, 0.03).is_none());
    }

    #[test]
    fn test_codes_are_in_domain() {
        let topology = Topology::for_farm_type(FarmType::Greenhouse);
        let vision = generate(51, 96 * 10, &topology, 0.03).unwrap();
        for row in &vision.anomaly_code {
            for &c in row {
                assert!((-1..=2).contains(&c));
            }
        }
    }

    #[test]
    fn test_missing_codes_match_mask() {
        let topology = Topology::for_farm_type(FarmType::Greenhouse);
        let vision = generate(52, 960, &topology, 0.05).unwrap();
        for (t, row) in vision.missing_mask.iter().enumerate() {
            for (b, &dropped) in row.iter().enumerate() {
                if dropped {
                    assert_eq!(vision.anomaly_code[t][b], -1);
                    assert!(vision.confidence[t][b].is_nan());
                }
            }
        }
    }

    #[test]
    fn test_confidence_inflates_on_events() {
        let topology = Topology::for_farm_type(FarmType::Hybrid);
        let vision = generate(53, 96 * 30, &topology, 0.0).unwrap();
        let mut event_confidence = Vec::new();
        let mut clean_confidence = Vec::new();
        for t in 0..vision.anomaly_code.len() {
            for b in 0..vision.bed_ids.len() {
                match vision.anomaly_code[t][b] {
                    1 | 2 => event_confidence.push(vision.confidence[t][b]),
                    0 => clean_confidence.push(vision.confidence[t][b]),
                    _ => {}
                }
            }
        }
        if !event_confidence.is_empty() {
            let event_mean =
                event_confidence.iter().sum::<f32>() / event_confidence.len() as f32;
            let clean_mean = clean_confidence.iter().sum::<f32>() / clean_confidence.len() as f32;
            assert!(event_mean > clean_mean);
        }
    }

    #[test]
    fn test_canopy_grows_over_time() {
        let topology = Topology::for_farm_type(FarmType::Greenhouse);
        let vision = generate(54, 96 * 60, &topology, 0.0).unwrap();
        let early = vision.canopy_coverage[0][0];
        let late = vision.canopy_coverage[96 * 60 - 1][0];
        assert!(late > early, "canopy must grow ({early} -> {late})");
    }
}
