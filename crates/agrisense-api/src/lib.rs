//! # AgriSense API
//!
//! The external contract surface of the AgriSense core: a small set of
//! callable entry points with plain-data inputs and outputs. No opaque
//! handles cross the boundary: graphs travel as serialized
//! [`GraphState`], analytics come back as plain record vectors, and every
//! returned value is host-resident even on failure paths.
//!
//! Entry points take an explicit [`ProcessState`] carrying the graph cache
//! and the trained-residual cell. Analytics calls prefer the hot cached
//! graph for the farm and fall back to deserialising the passed state;
//! `update_features` mutates the cached graph in place when present (the
//! incremental path) and re-serialises only for the return value.
//!
//! ## Example
//!
//! ```rust
//! use agrisense_api::{build_graph, query_farm_status, ProcessState};
//! use agrisense_graph::{FarmConfig, FarmType, ModelToggles, VertexDef, EdgeDef};
//!
//! let state = ProcessState::new();
//! let config = FarmConfig {
//!     farm_id: "farm-1".into(),
//!     farm_type: FarmType::OpenField,
//!     active_layers: vec!["soil".into()],
//!     zones: vec![],
//!     models: ModelToggles::default(),
//!     vertices: vec![VertexDef { id: "v1".into(), vertex_type: "sensor".into(), zone_id: None }],
//!     edges: vec![EdgeDef {
//!         id: "e1".into(),
//!         layer: "soil".into(),
//!         vertex_ids: vec!["v1".into()],
//!         metadata: serde_json::Map::new(),
//!     }],
//! };
//! let graph_state = build_graph(&state, &config).unwrap();
//! let status = query_farm_status(&state, &graph_state, "v1").unwrap();
//! assert!(status.contains_key("soil"));
//! ```

#![forbid(unsafe_code)]

pub mod state;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use agrisense_core::error::{CoreError, CoreResult};
use agrisense_graph::{
    deserialize_graph, query_layer, serialize_graph, FarmConfig, GraphState, LayerQueryResult,
    LayeredHyperGraph,
};
use agrisense_models::{
    AnomalyRecord, IrrigationRecommendation, NutrientReport, TrainOutcome, WeatherForecast,
    YieldForecast,
};
use agrisense_synth::SyntheticDataset;

pub use state::ProcessState;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result record of a residual training call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    /// `trained` or `insufficient_data`.
    pub status: String,
    /// Observations used (or available, when insufficient).
    pub n_observations: usize,
    /// Fitted coefficient count; 0 when nothing was fitted.
    pub n_coefficients: usize,
}

/// Builds a graph from a farm configuration, caches it, and returns its
/// serialized state.
pub fn build_graph(state: &ProcessState, config: &FarmConfig) -> CoreResult<GraphState> {
    let graph = LayeredHyperGraph::build(config)?;
    let graph_state = serialize_graph(&graph);
    state.cache_graph(graph);
    Ok(graph_state)
}

/// Per-layer query results for one vertex across every materialised layer.
pub fn query_farm_status(
    state: &ProcessState,
    graph_state: &GraphState,
    vertex_id: &str,
) -> CoreResult<BTreeMap<String, LayerQueryResult>> {
    let graph = resolve_graph(state, graph_state)?;
    Ok(graph
        .layer_tags()
        .into_iter()
        .map(|tag| {
            let result = query_layer(&graph, &tag, vertex_id);
            (tag, result)
        })
        .collect())
}

/// Irrigation schedule over `horizon_days`, with optional forecast inputs.
pub fn irrigation_schedule(
    state: &ProcessState,
    graph_state: &GraphState,
    horizon_days: usize,
    forecast: &WeatherForecast,
) -> CoreResult<Vec<IrrigationRecommendation>> {
    let graph = resolve_graph(state, graph_state)?;
    Ok(agrisense_models::irrigation_schedule(
        &graph,
        horizon_days,
        forecast,
    ))
}

/// Nutrient deficit report per zone.
pub fn nutrient_report(
    state: &ProcessState,
    graph_state: &GraphState,
) -> CoreResult<Vec<NutrientReport>> {
    let graph = resolve_graph(state, graph_state)?;
    Ok(agrisense_models::nutrient_report(&graph))
}

/// Yield forecast per crop bed, applying the process-wide residual when
/// one has been trained.
pub fn yield_forecast(
    state: &ProcessState,
    graph_state: &GraphState,
) -> CoreResult<Vec<YieldForecast>> {
    let graph = resolve_graph(state, graph_state)?;
    let residual = state.residual();
    Ok(agrisense_models::yield_forecast(&graph, residual.as_ref()))
}

/// Statistical-process-control anomaly records across all layers.
pub fn detect_anomalies(
    state: &ProcessState,
    graph_state: &GraphState,
) -> CoreResult<Vec<AnomalyRecord>> {
    let graph = resolve_graph(state, graph_state)?;
    Ok(agrisense_models::detect_anomalies(&graph, chrono::Utc::now()))
}

/// Pushes a feature vector for one vertex and returns the new serialized
/// state with snapshot and history advanced.
///
/// When the farm's graph is cached the mutation happens in place and the
/// single serialization pays only for the return value; opaque-state
/// callers without a cache entry take the deserialize-mutate path (and
/// warm the cache for next time).
pub fn update_features(
    state: &ProcessState,
    graph_state: &GraphState,
    layer: &str,
    vertex_id: &str,
    features: &[f32],
) -> CoreResult<GraphState> {
    let cached = state.with_cached_graph_mut(&graph_state.farm_id, |graph| {
        graph
            .push_features(layer, vertex_id, features)
            .map(|()| serialize_graph(graph))
    });
    if let Some(result) = cached {
        return Ok(result?);
    }

    debug!(farm_id = %graph_state.farm_id, "update on uncached graph, rehydrating");
    let mut graph = deserialize_graph(graph_state)?;
    graph.push_features(layer, vertex_id, features)?;
    let new_state = serialize_graph(&graph);
    state.cache_graph(graph);
    Ok(new_state)
}

/// Fits the yield residual against observed outcomes and stores it in the
/// process-wide cell on success.
pub fn train_yield_residual(
    state: &ProcessState,
    graph_state: &GraphState,
    outcomes: &HashMap<String, f32>,
) -> CoreResult<TrainReport> {
    let graph = resolve_graph(state, graph_state)?;
    match agrisense_models::train_yield_residual(&graph, outcomes)? {
        TrainOutcome::Trained {
            model,
            n_observations,
        } => {
            let n_coefficients = model.len();
            state.set_residual(model);
            Ok(TrainReport {
                status: "trained".to_string(),
                n_observations,
                n_coefficients,
            })
        }
        TrainOutcome::InsufficientData { n_observations, .. } => Ok(TrainReport {
            status: "insufficient_data".to_string(),
            n_observations,
            n_coefficients: 0,
        }),
    }
}

/// Generates a synthetic demo dataset; see `agrisense_synth`.
pub fn generate_synthetic(farm_type: &str, days: usize, seed: u64) -> CoreResult<SyntheticDataset> {
    agrisense_synth::generate_synthetic(farm_type, days, seed).map_err(CoreError::from)
}

/// Cached graph for the farm when hot, rehydrated state otherwise.
fn resolve_graph(state: &ProcessState, graph_state: &GraphState) -> CoreResult<LayeredHyperGraph> {
    if let Some(graph) = state.get_cached_graph(&graph_state.farm_id) {
        return Ok(graph);
    }
    Ok(deserialize_graph(graph_state)?)
}
