//! Irrigation scheduling over a daily water balance.
//!
//! For each day of the horizon the scheduler estimates reference
//! evapotranspiration (from a forecast when supplied, otherwise a
//! simplified Hargreaves proxy from on-graph weather), scales it by a crop
//! coefficient, advances a per-vertex soil water balance, and recommends an
//! irrigation volume wherever projected moisture falls below the wilting
//! point. Recommendations aggregate per zone over the `irrigation` layer's
//! hyperedges when that layer exists, otherwise one record per vertex.
//!
//! Requires the `soil` and `weather` layers; without them the schedule is
//! empty, never an error.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use agrisense_core::backend::{launch, Backend};
use agrisense_graph::LayeredHyperGraph;

use crate::zone::edge_zone_id;

/// Volumetric moisture below which irrigation triggers (wilting point).
pub const THETA_WP: f32 = 0.15;

/// Volumetric moisture targeted by refill (field capacity).
pub const THETA_FC: f32 = 0.35;

/// Per-event volume cap as a moisture fraction.
pub const VOLUME_CAP: f32 = 0.10;

/// Effective root-zone depth in millimetres for the water balance.
pub const EFFECTIVE_DEPTH_MM: f32 = 1000.0;

/// Optional per-day forecast inputs. Vectors shorter than the horizon fall
/// back to on-graph statistics for the remaining days.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherForecast {
    /// Daily precipitation in millimetres.
    #[serde(default)]
    pub precip_forecast: Vec<f32>,
    /// Daily reference evapotranspiration in millimetres.
    #[serde(default)]
    pub et0_forecast: Vec<f32>,
}

/// One irrigation recommendation for one zone (or vertex) on one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrigationRecommendation {
    /// Zone identifier (irrigation edge metadata `zone_id`, edge id, or
    /// vertex id in the per-vertex fallback).
    pub zone_id: String,
    /// Day of the horizon, 1-based.
    pub day: usize,
    /// Whether irrigation is recommended.
    pub irrigate: bool,
    /// Recommended volume, litres per square metre.
    pub volume_liters: f32,
    /// Projected moisture after the day's losses, before refill.
    pub projected_moisture: f32,
    /// Urgency in `[0, 1]`, scaled between wilting point and field capacity.
    pub priority: f32,
    /// Which inequality fired: `moisture_adequate`, `below_wilting_point`,
    /// or `projected_deficit`.
    pub trigger_reason: String,
}

/// One vertex's water-balance step for a single day.
#[derive(Debug, Clone, Copy, Default)]
struct DayStep {
    /// Moisture after losses, floored at zero.
    depleted: f32,
    /// Recommended refill volume as a moisture fraction.
    refill: f32,
}

/// Builds the irrigation schedule for `horizon_days` days.
pub fn irrigation_schedule(
    graph: &LayeredHyperGraph,
    horizon_days: usize,
    forecast: &WeatherForecast,
) -> Vec<IrrigationRecommendation> {
    let (Some(soil), Some(weather)) = (graph.layer("soil"), graph.layer("weather")) else {
        debug!("irrigation schedule skipped: soil or weather layer absent");
        return Vec::new();
    };
    let horizon_days = horizon_days.max(1);
    let n = graph.n_vertices();
    if n == 0 {
        return Vec::new();
    }

    let backend = if graph.is_device_resident() {
        Backend::detect()
    } else {
        Backend::Host
    };

    let soil_features = soil.features().ensure_host();
    let weather_features = weather.features().ensure_host();

    // Crop coefficient per vertex.
    let kc: Vec<f32> = match graph.layer("crop_requirements") {
        Some(crop) => {
            let crop_features = crop.features().ensure_host();
            (0..n)
                .map(|v| 0.3 + 0.9 * crop_features[[v, 1]].clamp(0.0, 1.0))
                .collect()
        }
        None => vec![1.0; n],
    };

    // Hargreaves proxy, used for days the forecast does not cover.
    let hargreaves: Vec<f32> = (0..n)
        .map(|v| {
            let t = weather_features[[v, 0]];
            let rs = weather_features[[v, 4]];
            0.0023 * (t + 17.8) * (0.3 * t.abs()).max(2.0).sqrt() * rs
        })
        .collect();

    // Mean of current precipitation readings, the no-forecast fallback.
    let mean_precip = (0..n).map(|v| weather_features[[v, 2]]).sum::<f32>() / n as f32;

    let mut moisture: Vec<f32> = (0..n).map(|v| soil_features[[v, 0]]).collect();

    // Per-day traces used by aggregation.
    let mut day_start = Array2::zeros((horizon_days, n));
    let mut projected = Array2::zeros((horizon_days, n));
    let mut recommended = Array2::zeros((horizon_days, n));

    let mut steps: Vec<DayStep> = vec![DayStep::default(); n];
    for day in 0..horizon_days {
        let et0_forecast = forecast.et0_forecast.get(day).copied();
        let precip = forecast
            .precip_forecast
            .get(day)
            .copied()
            .unwrap_or(mean_precip);

        let moisture_in = &moisture;
        let kc_ref = &kc;
        let hargreaves_ref = &hargreaves;
        let _ = launch(backend, steps.as_mut_slice(), |base, chunk| {
            for (offset, step) in chunk.iter_mut().enumerate() {
                let v = base + offset;
                let et0 = et0_forecast.unwrap_or(hargreaves_ref[v]);
                let depleted =
                    (moisture_in[v] - (et0 * kc_ref[v] + precip) / EFFECTIVE_DEPTH_MM).max(0.0);
                let refill = if depleted < THETA_WP {
                    (THETA_FC - depleted).min(VOLUME_CAP)
                } else {
                    0.0
                };
                *step = DayStep { depleted, refill };
            }
        });

        for v in 0..n {
            day_start[[day, v]] = moisture[v];
            projected[[day, v]] = steps[v].depleted;
            recommended[[day, v]] = steps[v].refill;
            // Refill propagates into the next day's balance.
            moisture[v] = steps[v].depleted + steps[v].refill;
        }
    }

    // Aggregate per zone over irrigation edges, or per vertex without them.
    let mut records = Vec::new();
    match graph.layer("irrigation").filter(|layer| layer.n_edges() > 0) {
        Some(irrigation) => {
            for col in 0..irrigation.n_edges() {
                let members: Vec<usize> = irrigation.incidence().col(col).map(|(v, _)| v).collect();
                if members.is_empty() {
                    continue;
                }
                let zone_id = edge_zone_id(irrigation, col);
                for day in 0..horizon_days {
                    let mean = |trace: &Array2<f32>| {
                        members.iter().map(|&v| trace[[day, v]]).sum::<f32>()
                            / members.len() as f32
                    };
                    records.push(build_record(
                        zone_id.clone(),
                        day + 1,
                        mean(&projected),
                        mean(&recommended),
                        mean(&day_start),
                    ));
                }
            }
        }
        None => {
            for (v, vertex_id) in graph.vertex_ids().iter().enumerate() {
                for day in 0..horizon_days {
                    records.push(build_record(
                        vertex_id.clone(),
                        day + 1,
                        projected[[day, v]],
                        recommended[[day, v]],
                        day_start[[day, v]],
                    ));
                }
            }
        }
    }
    records
}

fn build_record(
    zone_id: String,
    day: usize,
    projected_moisture: f32,
    recommended: f32,
    start_moisture: f32,
) -> IrrigationRecommendation {
    let irrigate = recommended > 0.0;
    let trigger_reason = if !irrigate {
        "moisture_adequate"
    } else if start_moisture < THETA_WP {
        "below_wilting_point"
    } else {
        "projected_deficit"
    };
    IrrigationRecommendation {
        zone_id,
        day,
        irrigate,
        volume_liters: recommended * 1000.0,
        projected_moisture,
        priority: ((THETA_WP - projected_moisture) / (THETA_FC - THETA_WP)).clamp(0.0, 1.0),
        trigger_reason: trigger_reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_layers_yield_empty_schedule() {
        let config = agrisense_graph::FarmConfig {
            farm_id: "f".into(),
            farm_type: agrisense_graph::FarmType::OpenField,
            active_layers: vec!["soil".into()],
            zones: vec![],
            models: Default::default(),
            vertices: vec![agrisense_graph::VertexDef {
                id: "v1".into(),
                vertex_type: "sensor".into(),
                zone_id: None,
            }],
            edges: vec![agrisense_graph::EdgeDef {
                id: "e1".into(),
                layer: "soil".into(),
                vertex_ids: vec!["v1".into()],
                metadata: serde_json::Map::new(),
            }],
        };
        let graph = agrisense_graph::LayeredHyperGraph::build(&config).unwrap();
        assert!(irrigation_schedule(&graph, 3, &WeatherForecast::default()).is_empty());
    }

    #[test]
    fn test_record_trigger_reasons() {
        let adequate = build_record("z".into(), 1, 0.30, 0.0, 0.30);
        assert!(!adequate.irrigate);
        assert_eq!(adequate.trigger_reason, "moisture_adequate");
        assert!(adequate.priority.abs() < f32::EPSILON);

        let already_dry = build_record("z".into(), 1, 0.08, 0.10, 0.09);
        assert!(already_dry.irrigate);
        assert_eq!(already_dry.trigger_reason, "below_wilting_point");
        assert!((already_dry.volume_liters - 100.0).abs() < 1e-3);

        let drifting = build_record("z".into(), 2, 0.14, 0.10, 0.20);
        assert_eq!(drifting.trigger_reason, "projected_deficit");
        assert!(drifting.priority > 0.0 && drifting.priority <= 1.0);
    }
}
