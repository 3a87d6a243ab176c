//! Yield forecasting: FAO multiplicative stress baseline plus an optional
//! trained ridge residual.
//!
//! The baseline multiplies the crop's potential yield by four stress
//! coefficients, each clipped to `[0, 1]`: water (soil moisture between
//! wilting point and field capacity), nutrient (relative N/P/K shortfall),
//! light (DLI against a 20 mol/m² target), and weather (piecewise-linear
//! temperature response). When trained residual coefficients are present
//! and match the assembled feature width, the forecast adds `X·β` and
//! tightens the confidence interval.
//!
//! Requires the `crop_requirements` layer; forecasts aggregate over its
//! hyperedges (one record per crop bed).

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use agrisense_graph::LayeredHyperGraph;

use crate::residual::{assemble_residual_features, ResidualModel};
use crate::zone::edge_crop_bed_id;

/// Confidence-interval half width without a residual model.
const CI_FAO_ONLY: f32 = 0.20;

/// Confidence-interval half width with a residual model.
const CI_WITH_RESIDUAL: f32 = 0.10;

/// Per-vertex stress multipliers, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StressFactors {
    /// Water stress from soil moisture.
    pub ks: f32,
    /// Nutrient stress from N/P/K shortfall.
    pub kn: f32,
    /// Light stress from daily light integral.
    pub kl: f32,
    /// Weather stress from temperature.
    pub kw: f32,
}

/// One crop bed's yield forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldForecast {
    /// Crop-bed identifier (edge metadata `crop_bed_id` or edge id).
    pub crop_bed_id: String,
    /// Point estimate in kg/m².
    pub yield_estimate_kg_m2: f32,
    /// Lower confidence bound.
    pub yield_lower: f32,
    /// Upper confidence bound.
    pub yield_upper: f32,
    /// Forecast confidence in `[0, 1]`.
    pub confidence: f32,
    /// Mean stress multipliers over member vertices.
    pub stress_factors: StressFactors,
    /// `fao_only` or `fao_plus_residual`.
    pub model_layer: String,
}

/// Piecewise-linear temperature response in `[0, 1]`.
pub fn temperature_stress(t: f32) -> f32 {
    if t < 5.0 {
        0.0
    } else if t < 15.0 {
        (t - 5.0) / 10.0
    } else if t <= 30.0 {
        1.0
    } else if t < 40.0 {
        (40.0 - t) / 10.0
    } else {
        0.0
    }
}

/// Per-vertex stress factors and FAO baseline. `None` without the
/// `crop_requirements` layer.
pub(crate) fn per_vertex_fao(graph: &LayeredHyperGraph) -> Option<(Vec<StressFactors>, Vec<f32>)> {
    let crop = graph.layer("crop_requirements")?;
    let n = graph.n_vertices();
    let crop_features = crop.features().ensure_host();

    let soil = graph.layer("soil").map(|l| l.features().ensure_host());
    let lighting = graph.layer("lighting").map(|l| l.features().ensure_host());
    let weather = graph.layer("weather").map(|l| l.features().ensure_host());
    let npk = graph.layer("npk").map(|l| l.features().ensure_host());

    let mut stress = Vec::with_capacity(n);
    let mut fao = Vec::with_capacity(n);
    for v in 0..n {
        let ks = soil.as_ref().map_or(1.0, |features| {
            ((features[[v, 0]] - 0.15) / (0.35 - 0.15)).clamp(0.0, 1.0)
        });

        let kn = match &npk {
            Some(current) => {
                let mut ratio_sum = 0.0f32;
                let mut count = 0;
                for (x, req_col) in (0..3).zip(2..5) {
                    let required = crop_features[[v, req_col]];
                    if required > 0.0 {
                        let deficit = (required - current[[v, x]]).max(0.0);
                        ratio_sum += deficit / required;
                        count += 1;
                    }
                }
                if count == 0 {
                    1.0
                } else {
                    (1.0 - ratio_sum / count as f32).clamp(0.0, 1.0)
                }
            }
            None => 1.0,
        };

        let kl = lighting.as_ref().map_or(1.0, |features| {
            (features[[v, 1]] / 20.0).clamp(0.0, 1.0)
        });

        let kw = weather
            .as_ref()
            .map_or(1.0, |features| temperature_stress(features[[v, 0]]));

        let potential = crop_features[[v, 0]];
        stress.push(StressFactors { ks, kn, kl, kw });
        fao.push(potential * ks * kn * kl * kw);
    }
    Some((stress, fao))
}

/// Forecasts yield per crop bed, applying `residual` when its width matches
/// the assembled feature matrix.
pub fn yield_forecast(
    graph: &LayeredHyperGraph,
    residual: Option<&ResidualModel>,
) -> Vec<YieldForecast> {
    let Some((stress, fao)) = per_vertex_fao(graph) else {
        debug!("yield forecast skipped: crop_requirements layer absent");
        return Vec::new();
    };
    let crop = match graph.layer("crop_requirements") {
        Some(layer) => layer,
        None => return Vec::new(),
    };
    let n = graph.n_vertices();

    // Apply the residual correction when the trained width still matches.
    let mut estimates = fao.clone();
    let mut with_residual = false;
    if let Some(model) = residual {
        let x = assemble_residual_features(graph);
        if model.len() == x.ncols() {
            for v in 0..n {
                let mut correction = 0.0f32;
                for (j, &beta) in model.coefficients.iter().enumerate() {
                    correction += x[[v, j]] * beta;
                }
                estimates[v] += correction;
            }
            with_residual = true;
        } else {
            warn!(
                trained = model.len(),
                assembled = x.ncols(),
                "residual width no longer matches assembled features, using FAO baseline"
            );
        }
    }

    let (ci, confidence, model_layer) = if with_residual {
        (CI_WITH_RESIDUAL, 0.9, "fao_plus_residual")
    } else {
        (CI_FAO_ONLY, 0.8, "fao_only")
    };

    let mut forecasts = Vec::with_capacity(crop.n_edges());
    for col in 0..crop.n_edges() {
        let members: Vec<usize> = crop.incidence().col(col).map(|(v, _)| v).collect();
        if members.is_empty() {
            continue;
        }
        let count = members.len() as f32;
        let estimate = members.iter().map(|&v| estimates[v]).sum::<f32>() / count;
        let mean_stress = StressFactors {
            ks: members.iter().map(|&v| stress[v].ks).sum::<f32>() / count,
            kn: members.iter().map(|&v| stress[v].kn).sum::<f32>() / count,
            kl: members.iter().map(|&v| stress[v].kl).sum::<f32>() / count,
            kw: members.iter().map(|&v| stress[v].kw).sum::<f32>() / count,
        };

        forecasts.push(YieldForecast {
            crop_bed_id: edge_crop_bed_id(crop, col),
            yield_estimate_kg_m2: estimate,
            yield_lower: estimate * (1.0 - ci),
            yield_upper: estimate * (1.0 + ci),
            confidence,
            stress_factors: mean_stress,
            model_layer: model_layer.to_string(),
        });
    }
    forecasts
}
