//! Trainable ridge residual on top of the FAO yield baseline.
//!
//! The residual model captures what the multiplicative stress model misses:
//! a linear correction `X·β` over the concatenated layer features plus two
//! derived columns (cumulative DLI from the lighting ring buffer and a
//! composite soil-health score). Training solves the ridge normal equations
//! `(XᵀX + λI)β = Xᵀr` in f32 with `λ = 1`.

use std::collections::HashMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use agrisense_core::error::NumericError;
use agrisense_graph::{multi_layer_features, LayeredHyperGraph};

use crate::yield_forecast::per_vertex_fao;

/// Ridge regularisation strength.
const LAMBDA: f32 = 1.0;

/// Layers whose features enter the residual matrix, in order, when present.
const RESIDUAL_LAYERS: [&str; 4] = ["soil", "lighting", "crop_requirements", "vision"];

/// Trained residual coefficients shared across yield forecasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualModel {
    /// Coefficient vector, one entry per residual feature column.
    pub coefficients: Vec<f32>,
}

impl ResidualModel {
    /// Number of coefficients.
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// `true` when the model carries no coefficients.
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }
}

/// Outcome of a residual fit.
#[derive(Debug, Clone)]
pub enum TrainOutcome {
    /// Fit succeeded; the caller owns the new model.
    Trained {
        /// The fitted model.
        model: ResidualModel,
        /// Observations used.
        n_observations: usize,
    },
    /// Too few observations for the feature width; nothing was fitted.
    InsufficientData {
        /// Observations available.
        n_observations: usize,
        /// Minimum required (`p + 1`).
        required: usize,
    },
}

/// Assembles the residual feature matrix: available layer features in
/// [`RESIDUAL_LAYERS`] order (via [`multi_layer_features`]), then
/// cumulative DLI and soil health.
pub fn assemble_residual_features(graph: &LayeredHyperGraph) -> Array2<f32> {
    let n = graph.n_vertices();
    let available: Vec<&str> = RESIDUAL_LAYERS
        .iter()
        .copied()
        .filter(|tag| graph.layer(tag).is_some())
        .collect();
    let base = multi_layer_features(graph, &available)
        .map(|tensor| tensor.ensure_host().into_owned())
        .unwrap_or_else(|_| Array2::zeros((n, 0)));
    let base_width = base.ncols();

    let mut x = Array2::zeros((n, base_width + 2));
    x.slice_mut(ndarray::s![.., ..base_width]).assign(&base);

    // Cumulative DLI: lighting ring-buffer sum over valid slots.
    if let Some(lighting) = graph.layer("lighting") {
        let history = lighting.history().ensure_host();
        let len = lighting.history_length();
        for v in 0..n {
            let mut total = 0.0f32;
            for slot in 0..len.min(lighting.history_depth()) {
                total += history[[v, slot, 1]];
            }
            x[[v, base_width]] = total;
        }
    }

    if let Some(soil) = graph.layer("soil") {
        let features = soil.features().ensure_host();
        for v in 0..n {
            x[[v, base_width + 1]] = soil_health(
                features[[v, 0]],
                features[[v, 1]],
                features[[v, 2]],
                features[[v, 3]],
            );
        }
    }

    x
}

/// Composite soil health in `[0, 1]`: weighted trapezoid ramps around
/// agronomic optima for moisture, temperature, pH, and conductivity.
pub fn soil_health(moisture: f32, temperature: f32, conductivity: f32, ph: f32) -> f32 {
    let m_score = ramp(moisture, 0.10, 0.25, 0.40, 0.60);
    let t_score = ramp(temperature, 5.0, 18.0, 26.0, 38.0);
    let ph_score = ramp(ph, 4.5, 6.0, 7.0, 8.5);
    let c_score = ramp(conductivity, 0.1, 0.8, 2.0, 4.0);
    0.3 * m_score + 0.25 * t_score + 0.25 * ph_score + 0.2 * c_score
}

/// Trapezoid ramp: 0 outside `[lo, hi]`, 1 inside `[opt_lo, opt_hi]`,
/// linear in between.
fn ramp(x: f32, lo: f32, opt_lo: f32, opt_hi: f32, hi: f32) -> f32 {
    if x <= lo || x >= hi {
        0.0
    } else if x < opt_lo {
        (x - lo) / (opt_lo - lo)
    } else if x <= opt_hi {
        1.0
    } else {
        (hi - x) / (hi - opt_hi)
    }
}

/// Fits the ridge residual against observed yields keyed by vertex id.
///
/// Requires at least `p + 1` observations for `p` feature columns;
/// otherwise nothing is fitted and [`TrainOutcome::InsufficientData`] is
/// returned.
///
/// # Errors
///
/// [`NumericError::SingularSystem`] when the regularised normal equations
/// are singular below working precision.
pub fn train_yield_residual(
    graph: &LayeredHyperGraph,
    outcomes: &HashMap<String, f32>,
) -> Result<TrainOutcome, NumericError> {
    let x_all = assemble_residual_features(graph);
    let p = x_all.ncols();

    let fao = per_vertex_fao(graph).map(|(_, fao)| fao).unwrap_or_default();

    // Residual targets for vertices with both an observation and a baseline.
    let mut rows = Vec::new();
    let mut targets = Vec::new();
    for (vertex_id, &observed) in outcomes {
        if let Some(v) = graph.vertex_row(vertex_id) {
            if v < fao.len() {
                rows.push(v);
                targets.push(observed - fao[v]);
            }
        }
    }

    let n_obs = rows.len();
    if n_obs < p + 1 {
        warn!(
            n_observations = n_obs,
            required = p + 1,
            "insufficient observations for residual fit, coefficients unchanged"
        );
        return Ok(TrainOutcome::InsufficientData {
            n_observations: n_obs,
            required: p + 1,
        });
    }

    // Normal equations A = XᵀX + λI, b = Xᵀr over the observed rows.
    let mut a = Array2::zeros((p, p));
    let mut b = vec![0.0f32; p];
    for (&v, &r) in rows.iter().zip(targets.iter()) {
        for i in 0..p {
            let xi = x_all[[v, i]];
            b[i] += xi * r;
            for j in 0..p {
                a[[i, j]] += xi * x_all[[v, j]];
            }
        }
    }
    for i in 0..p {
        a[[i, i]] += LAMBDA;
    }

    let coefficients = solve(a, b)?;
    info!(
        n_observations = n_obs,
        n_coefficients = p,
        "yield residual trained"
    );
    Ok(TrainOutcome::Trained {
        model: ResidualModel { coefficients },
        n_observations: n_obs,
    })
}

/// Solves `A·x = b` by Gauss-Jordan elimination with partial pivoting.
fn solve(mut a: Array2<f32>, mut b: Vec<f32>) -> Result<Vec<f32>, NumericError> {
    let p = b.len();
    for col in 0..p {
        // Pivot on the largest remaining magnitude in this column.
        let mut pivot = col;
        for row in (col + 1)..p {
            if a[[row, col]].abs() > a[[pivot, col]].abs() {
                pivot = row;
            }
        }
        if a[[pivot, col]].abs() < 1e-12 {
            return Err(NumericError::SingularSystem { size: p });
        }
        if pivot != col {
            for j in 0..p {
                let tmp = a[[col, j]];
                a[[col, j]] = a[[pivot, j]];
                a[[pivot, j]] = tmp;
            }
            b.swap(col, pivot);
        }

        let diag = a[[col, col]];
        for j in 0..p {
            a[[col, j]] /= diag;
        }
        b[col] /= diag;

        for row in 0..p {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for j in 0..p {
                a[[row, j]] -= factor * a[[col, j]];
            }
            b[row] -= factor * b[col];
        }
    }
    Ok(b)
}
