//! Opaque serialization of graph state for the external boundary.
//!
//! A graph's serialized form is plain data: COO incidence triplets, nested
//! feature and history arrays, and host-side metadata. Serialization
//! materialises everything to host first so no device-resident storage can
//! leak across the boundary, even on failure paths.
//!
//! The contract keeps the original 1-based conventions: `vertex_index`
//! values form the dense range `1..=|V|`, incidence triplets are 1-based,
//! and `history_head` lies in `[1, H]`. Conversion to the engine's 0-based
//! rows happens only here.

use std::collections::HashMap;

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use agrisense_core::error::DeserializeError;
use agrisense_core::sparse::CscMatrix;

use crate::graph::LayeredHyperGraph;
use crate::layer::Layer;

/// Serialized form of one layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerState {
    /// Incidence row coordinates, 1-based.
    pub incidence_rows: Vec<u32>,
    /// Incidence column coordinates, 1-based.
    pub incidence_cols: Vec<u32>,
    /// Incidence values (1.0 for membership).
    pub incidence_vals: Vec<f32>,
    /// Row count of the incidence matrix.
    pub n_vertices: usize,
    /// Column count of the incidence matrix.
    pub n_edges: usize,
    /// Dense `|V| x d` feature snapshot.
    pub vertex_features: Vec<Vec<f32>>,
    /// Dense `|V| x d x H` ring buffer.
    pub feature_history: Vec<Vec<Vec<f32>>>,
    /// Next ring write slot, 1-based.
    pub history_head: usize,
    /// Valid ring entries.
    pub history_length: usize,
    /// Per-edge metadata, column order.
    pub edge_metadata: Vec<serde_json::Map<String, serde_json::Value>>,
    /// Vertex ids in row order.
    pub vertex_ids: Vec<String>,
    /// Edge ids in column order.
    pub edge_ids: Vec<String>,
}

/// Serialized form of a whole graph: the opaque state handed across the
/// external boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphState {
    /// Farm identifier.
    pub farm_id: String,
    /// Global vertex count.
    pub n_vertices: usize,
    /// Vertex id → 1-based row.
    pub vertex_index: HashMap<String, usize>,
    /// Layer tag → serialized layer.
    pub layers: HashMap<String, LayerState>,
}

impl GraphState {
    /// Parses a loose JSON value, validating the presence of the four
    /// top-level keys before handing the rest to serde.
    pub fn from_value(value: serde_json::Value) -> Result<Self, DeserializeError> {
        let obj = value
            .as_object()
            .ok_or_else(|| DeserializeError::malformed("graph state must be a JSON object"))?;
        for key in ["farm_id", "n_vertices", "vertex_index", "layers"] {
            if !obj.contains_key(key) {
                return Err(DeserializeError::MissingKey { key });
            }
        }
        serde_json::from_value(value).map_err(|e| DeserializeError::malformed(e.to_string()))
    }
}

/// Serializes a graph to its plain-data contract form.
///
/// Works from host materialisations of the numeric arrays; the input graph
/// is untouched and may stay device-resident.
pub fn serialize_graph(graph: &LayeredHyperGraph) -> GraphState {
    let vertex_index = graph
        .vertex_ids()
        .iter()
        .enumerate()
        .map(|(row, id)| (id.clone(), row + 1))
        .collect();

    let layers = graph
        .layers()
        .map(|(tag, layer)| (tag.clone(), serialize_layer(graph, layer)))
        .collect();

    GraphState {
        farm_id: graph.farm_id().to_string(),
        n_vertices: graph.n_vertices(),
        vertex_index,
        layers,
    }
}

fn serialize_layer(graph: &LayeredHyperGraph, layer: &Layer) -> LayerState {
    let triplets = layer.incidence().to_triplets();
    let mut incidence_rows = Vec::with_capacity(triplets.len());
    let mut incidence_cols = Vec::with_capacity(triplets.len());
    let mut incidence_vals = Vec::with_capacity(triplets.len());
    for (row, col, val) in triplets {
        incidence_rows.push(row + 1);
        incidence_cols.push(col + 1);
        incidence_vals.push(val);
    }

    let features = layer.features().ensure_host();
    let vertex_features = features
        .rows()
        .into_iter()
        .map(|row| row.to_vec())
        .collect();

    // Internal layout is (|V|, H, d); the contract is |V| x d x H.
    let history = layer.history().ensure_host();
    let (n, h, d) = layer.history().dim();
    let feature_history = (0..n)
        .map(|v| {
            (0..d)
                .map(|f| (0..h).map(|slot| history[[v, slot, f]]).collect())
                .collect()
        })
        .collect();

    LayerState {
        incidence_rows,
        incidence_cols,
        incidence_vals,
        n_vertices: layer.incidence().nrows(),
        n_edges: layer.n_edges(),
        vertex_features,
        feature_history,
        history_head: layer.history_head(),
        history_length: layer.history_length(),
        edge_metadata: layer.edge_metadata().to_vec(),
        vertex_ids: graph.vertex_ids().to_vec(),
        edge_ids: layer.edge_ids().to_vec(),
    }
}

/// Rehydrates a graph from its serialized form, host-resident.
///
/// Per-layer failures are wrapped with the layer name.
pub fn deserialize_graph(state: &GraphState) -> Result<LayeredHyperGraph, DeserializeError> {
    let n = state.n_vertices;
    if state.vertex_index.len() != n {
        return Err(DeserializeError::malformed(format!(
            "vertex_index holds {} entries but n_vertices is {}",
            state.vertex_index.len(),
            n
        )));
    }

    // Recover row order from the 1-based dense index.
    let mut vertex_ids = vec![String::new(); n];
    for (id, &index) in &state.vertex_index {
        if index == 0 || index > n {
            return Err(DeserializeError::malformed(format!(
                "vertex_index value {index} for '{id}' outside 1..={n}"
            )));
        }
        vertex_ids[index - 1] = id.clone();
    }
    if vertex_ids.iter().any(String::is_empty) {
        return Err(DeserializeError::malformed(
            "vertex_index values are not a dense permutation-free range",
        ));
    }

    let mut graph = LayeredHyperGraph::from_parts(state.farm_id.clone(), vertex_ids);
    for (tag, layer_state) in &state.layers {
        let layer = deserialize_layer(tag, layer_state, n)
            .map_err(|reason| DeserializeError::layer(tag.clone(), reason))?;
        graph.insert_layer(tag.clone(), layer);
    }
    Ok(graph)
}

fn deserialize_layer(tag: &str, state: &LayerState, n_vertices: usize) -> Result<Layer, String> {
    if state.incidence_rows.len() != state.incidence_cols.len()
        || state.incidence_rows.len() != state.incidence_vals.len()
    {
        return Err("incidence triplet arrays differ in length".to_string());
    }
    if state.n_vertices != n_vertices {
        return Err(format!(
            "layer vertex count {} disagrees with graph n_vertices {}",
            state.n_vertices, n_vertices
        ));
    }
    if state.edge_ids.len() != state.n_edges || state.edge_metadata.len() != state.n_edges {
        return Err(format!(
            "edge identifier/metadata counts disagree with n_edges {}",
            state.n_edges
        ));
    }
    if state.vertex_features.len() != n_vertices {
        return Err(format!(
            "vertex_features holds {} rows for {} vertices",
            state.vertex_features.len(),
            n_vertices
        ));
    }

    let d = state
        .vertex_features
        .first()
        .map_or_else(|| crate::layer::layer_feature_dim(tag), Vec::len);
    let mut features = Array2::zeros((n_vertices, d));
    for (v, row) in state.vertex_features.iter().enumerate() {
        if row.len() != d {
            return Err(format!("vertex_features row {v} has ragged width"));
        }
        for (f, &value) in row.iter().enumerate() {
            features[[v, f]] = value;
        }
    }

    if state.feature_history.len() != n_vertices {
        return Err(format!(
            "feature_history holds {} rows for {} vertices",
            state.feature_history.len(),
            n_vertices
        ));
    }
    // A vertex-free layer carries no history rows to infer the ring depth
    // from; fall back to the configured default.
    let h = state
        .feature_history
        .first()
        .and_then(|per_vertex| per_vertex.first())
        .map_or_else(
            || agrisense_core::knobs::RuntimeKnobs::global().history_size,
            Vec::len,
        );
    if h == 0 {
        return Err("feature_history ring depth is zero".to_string());
    }
    if state.history_head == 0 || state.history_head > h {
        return Err(format!(
            "history_head {} outside 1..={h}",
            state.history_head
        ));
    }
    if state.history_length > h {
        return Err(format!(
            "history_length {} exceeds ring depth {h}",
            state.history_length
        ));
    }

    let mut history = Array3::zeros((n_vertices, h, d));
    for (v, per_vertex) in state.feature_history.iter().enumerate() {
        if per_vertex.len() != d {
            return Err(format!("feature_history row {v} has ragged feature width"));
        }
        for (f, per_feature) in per_vertex.iter().enumerate() {
            if per_feature.len() != h {
                return Err(format!("feature_history row {v} has ragged ring depth"));
            }
            for (slot, &value) in per_feature.iter().enumerate() {
                history[[v, slot, f]] = value;
            }
        }
    }

    let mut triplets = Vec::with_capacity(state.incidence_rows.len());
    for i in 0..state.incidence_rows.len() {
        let row = state.incidence_rows[i];
        let col = state.incidence_cols[i];
        if row == 0 || row as usize > n_vertices {
            return Err(format!("incidence row {row} outside 1..={n_vertices}"));
        }
        if col == 0 || col as usize > state.n_edges {
            return Err(format!("incidence col {col} outside 1..={}", state.n_edges));
        }
        triplets.push((row - 1, col - 1, state.incidence_vals[i]));
    }
    let incidence = CscMatrix::from_triplets(n_vertices, state.n_edges, &triplets);

    Ok(Layer::from_parts(
        incidence,
        features,
        history,
        state.history_head,
        state.history_length,
        state.edge_ids.clone(),
        state.edge_metadata.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EdgeDef, FarmConfig, FarmType, ModelToggles, VertexDef};

    fn sample_graph() -> LayeredHyperGraph {
        let config = FarmConfig {
            farm_id: "farm-s".into(),
            farm_type: FarmType::OpenField,
            active_layers: vec!["soil".into(), "npk".into()],
            zones: vec![],
            models: ModelToggles::default(),
            vertices: ["v1", "v2"]
                .iter()
                .map(|id| VertexDef {
                    id: id.to_string(),
                    vertex_type: "sensor".into(),
                    zone_id: None,
                })
                .collect(),
            edges: vec![
                EdgeDef {
                    id: "e1".into(),
                    layer: "soil".into(),
                    vertex_ids: vec!["v1".into(), "v2".into()],
                    metadata: serde_json::Map::new(),
                },
                EdgeDef {
                    id: "e2".into(),
                    layer: "npk".into(),
                    vertex_ids: vec!["v2".into()],
                    metadata: serde_json::Map::new(),
                },
            ],
        };
        let mut graph = LayeredHyperGraph::build(&config).unwrap();
        graph
            .push_features("soil", "v1", &[0.31, 20.5, 1.1, 6.7])
            .unwrap();
        graph
            .push_features("soil", "v2", &[0.28, 21.0, 1.0, 6.9])
            .unwrap();
        graph.push_features("npk", "v2", &[80.0, 40.0, 55.0]).unwrap();
        graph
    }

    #[test]
    fn test_vertex_index_is_one_based_dense() {
        let state = serialize_graph(&sample_graph());
        let mut values: Vec<usize> = state.vertex_index.values().copied().collect();
        values.sort_unstable();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_round_trip_preserves_everything() {
        let graph = sample_graph();
        let state = serialize_graph(&graph);
        let back = deserialize_graph(&state).unwrap();

        assert_eq!(back.farm_id(), graph.farm_id());
        assert_eq!(back.n_vertices(), graph.n_vertices());
        assert_eq!(back.layer_tags(), graph.layer_tags());

        for (tag, layer) in graph.layers() {
            let other = back.layer(tag).unwrap();
            assert_eq!(layer.incidence(), other.incidence());
            assert_eq!(layer.features().data(), other.features().data());
            assert_eq!(layer.history().data(), other.history().data());
            assert_eq!(layer.history_head(), other.history_head());
            assert_eq!(layer.history_length(), other.history_length());
            assert_eq!(layer.edge_ids(), other.edge_ids());
            assert_eq!(layer.edge_metadata(), other.edge_metadata());
        }
    }

    #[test]
    fn test_device_resident_graph_serializes_host_data() {
        let mut graph = sample_graph();
        graph.to_device();
        let state = serialize_graph(&graph);
        // Round-trips to a host graph with identical values.
        let back = deserialize_graph(&state).unwrap();
        assert!(!back.is_device_resident());
        graph.to_host();
        assert_eq!(
            back.layer("soil").unwrap().features().data(),
            graph.layer("soil").unwrap().features().data()
        );
    }

    #[test]
    fn test_from_value_requires_top_level_keys() {
        let value = serde_json::json!({"farm_id": "x", "n_vertices": 0, "layers": {}});
        match GraphState::from_value(value) {
            Err(DeserializeError::MissingKey { key }) => assert_eq!(key, "vertex_index"),
            other => panic!("expected MissingKey, got {other:?}"),
        }
    }

    #[test]
    fn test_layer_failure_carries_layer_name() {
        let graph = sample_graph();
        let mut state = serialize_graph(&graph);
        state
            .layers
            .get_mut("soil")
            .unwrap()
            .incidence_rows
            .push(99);
        let err = deserialize_graph(&state).unwrap_err();
        assert!(err.to_string().contains("soil"));
    }

    #[test]
    fn test_sparse_vertex_index_rejected() {
        let graph = sample_graph();
        let mut state = serialize_graph(&graph);
        state.vertex_index.insert("v2".into(), 5);
        assert!(deserialize_graph(&state).is_err());
    }
}
