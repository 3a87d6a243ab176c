//! Nutrient deficit scoring against crop requirements.
//!
//! Per vertex the scorer compares current N/P/K readings against the crop's
//! targets, weights the shortfalls, scales by growth stage (young plants
//! tolerate less deficit), and normalises into a `[0, 1]` severity. A
//! confirmed visual anomaly doubles the severity. Scores aggregate per zone
//! over the `npk` layer's hyperedges.
//!
//! Requires the `npk` and `crop_requirements` layers; the `vision` layer is
//! optional. Missing required layers produce an empty report.

use serde::{Deserialize, Serialize};
use tracing::debug;

use agrisense_graph::LayeredHyperGraph;

use crate::zone::edge_zone_id;

/// Vision anomaly score above which severity doubles.
const VISION_BOOST_THRESHOLD: f32 = 0.5;

/// Deficit weights for nitrogen, phosphorus, and potassium.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NutrientWeights {
    /// Nitrogen weight.
    pub nitrogen: f32,
    /// Phosphorus weight.
    pub phosphorus: f32,
    /// Potassium weight.
    pub potassium: f32,
}

impl Default for NutrientWeights {
    fn default() -> Self {
        Self {
            nitrogen: 0.50,
            phosphorus: 0.25,
            potassium: 0.25,
        }
    }
}

/// One zone's nutrient report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutrientReport {
    /// Zone identifier (npk edge metadata `zone_id` or edge id).
    pub zone_id: String,
    /// Mean nitrogen shortfall over member vertices.
    pub nitrogen_deficit: f32,
    /// Mean phosphorus shortfall over member vertices.
    pub phosphorus_deficit: f32,
    /// Mean potassium shortfall over member vertices.
    pub potassium_deficit: f32,
    /// Mean severity in `[0, 1]`.
    pub severity_score: f32,
    /// Tier derived from severity: `low`, `medium`, `high`, `critical`.
    pub urgency: String,
    /// Human-readable amendment suggestion.
    pub suggested_amendment: String,
    /// Whether any member vertex carried a confirming vision anomaly.
    pub visual_confirmed: bool,
}

/// Urgency tier for a severity score.
pub fn urgency_tier(severity: f32) -> &'static str {
    if severity < 0.25 {
        "low"
    } else if severity < 0.5 {
        "medium"
    } else if severity < 0.75 {
        "high"
    } else {
        "critical"
    }
}

fn amendment_for(deficits: [f32; 3]) -> String {
    let names = ["nitrogen", "phosphorus", "potassium"];
    let needed: Vec<&str> = names
        .iter()
        .zip(deficits.iter())
        .filter(|(_, &deficit)| deficit > 0.0)
        .map(|(name, _)| *name)
        .collect();
    if needed.is_empty() {
        "none".to_string()
    } else {
        format!("apply {} fertilizer", needed.join(", "))
    }
}

/// Scores nutrient deficits with the default weights.
pub fn nutrient_report(graph: &LayeredHyperGraph) -> Vec<NutrientReport> {
    nutrient_report_weighted(graph, NutrientWeights::default())
}

/// Scores nutrient deficits with explicit weights.
pub fn nutrient_report_weighted(
    graph: &LayeredHyperGraph,
    weights: NutrientWeights,
) -> Vec<NutrientReport> {
    let (Some(npk), Some(crop)) = (graph.layer("npk"), graph.layer("crop_requirements")) else {
        debug!("nutrient report skipped: npk or crop_requirements layer absent");
        return Vec::new();
    };
    let n = graph.n_vertices();
    if n == 0 {
        return Vec::new();
    }

    let current = npk.features().ensure_host();
    let crop_features = crop.features().ensure_host();
    let vision = graph
        .layer("vision")
        .map(|layer| layer.features().ensure_host());

    // Host-side maximum of all required values normalises severity.
    let mut req_max = 0.0f32;
    for v in 0..n {
        for col in 2..5 {
            req_max = req_max.max(crop_features[[v, col]]);
        }
    }

    // Per-vertex deficits, severity, and vision confirmation.
    let mut deficits = vec![[0.0f32; 3]; n];
    let mut severity = vec![0.0f32; n];
    let mut confirmed = vec![false; n];
    for v in 0..n {
        let d_n = (crop_features[[v, 2]] - current[[v, 0]]).max(0.0);
        let d_p = (crop_features[[v, 3]] - current[[v, 1]]).max(0.0);
        let d_k = (crop_features[[v, 4]] - current[[v, 2]]).max(0.0);
        deficits[v] = [d_n, d_p, d_k];

        let growth = crop_features[[v, 1]].clamp(0.0, 1.0);
        let stage_weight = 1.5 - 0.5 * growth;
        let weighted =
            weights.nitrogen * d_n + weights.phosphorus * d_p + weights.potassium * d_k;
        let mut score = (weighted * stage_weight / (req_max.max(1.0) * 1.5)).clamp(0.0, 1.0);

        if let Some(vision_features) = &vision {
            if vision_features[[v, 2]] > VISION_BOOST_THRESHOLD {
                score = (score * 2.0).clamp(0.0, 1.0);
                confirmed[v] = true;
            }
        }
        severity[v] = score;
    }

    // Aggregate per zone over npk edges.
    let mut reports = Vec::with_capacity(npk.n_edges());
    for col in 0..npk.n_edges() {
        let members: Vec<usize> = npk.incidence().col(col).map(|(v, _)| v).collect();
        if members.is_empty() {
            continue;
        }
        let count = members.len() as f32;
        let mut sums = [0.0f32; 4];
        for &v in &members {
            sums[0] += deficits[v][0];
            sums[1] += deficits[v][1];
            sums[2] += deficits[v][2];
            sums[3] += severity[v];
        }
        let nitrogen_deficit = sums[0] / count;
        let phosphorus_deficit = sums[1] / count;
        let potassium_deficit = sums[2] / count;
        let severity_score = sums[3] / count;

        reports.push(NutrientReport {
            zone_id: edge_zone_id(npk, col),
            nitrogen_deficit,
            phosphorus_deficit,
            potassium_deficit,
            severity_score,
            urgency: urgency_tier(severity_score).to_string(),
            suggested_amendment: amendment_for([
                nitrogen_deficit,
                phosphorus_deficit,
                potassium_deficit,
            ]),
            visual_confirmed: members.iter().any(|&v| confirmed[v]),
        });
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_tiers() {
        assert_eq!(urgency_tier(0.0), "low");
        assert_eq!(urgency_tier(0.24), "low");
        assert_eq!(urgency_tier(0.25), "medium");
        assert_eq!(urgency_tier(0.5), "high");
        assert_eq!(urgency_tier(0.75), "critical");
        assert_eq!(urgency_tier(1.0), "critical");
    }

    #[test]
    fn test_amendment_strings() {
        assert_eq!(amendment_for([0.0, 0.0, 0.0]), "none");
        assert_eq!(amendment_for([5.0, 0.0, 0.0]), "apply nitrogen fertilizer");
        assert_eq!(
            amendment_for([5.0, 0.0, 3.0]),
            "apply nitrogen, potassium fertilizer"
        );
    }

    #[test]
    fn test_default_weights() {
        let w = NutrientWeights::default();
        assert!((w.nitrogen - 0.50).abs() < f32::EPSILON);
        assert!((w.phosphorus - 0.25).abs() < f32::EPSILON);
        assert!((w.potassium - 0.25).abs() < f32::EPSILON);
    }
}
