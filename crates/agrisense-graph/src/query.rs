//! Cross-layer queries, per-vertex reads, and per-edge aggregation.
//!
//! Queries compute on the graph's residency: device-resident layers
//! dispatch data-parallel kernels over the output range, host layers use
//! direct loops. Results are always host matrices or plain records; no
//! device storage crosses a query boundary.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use agrisense_core::backend::{launch, Backend};
use agrisense_core::error::GraphError;
use agrisense_core::tensor::Tensor2;

use crate::graph::LayeredHyperGraph;
use crate::layer::Layer;

/// Result of a per-vertex layer query.
///
/// Reads tolerate absence: a missing layer or vertex produces the `Error`
/// arm naming the missing entity and listing the alternatives, not a
/// failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerQueryResult {
    /// The vertex's membership and current features in one layer.
    Found {
        /// Queried vertex id.
        vertex_id: String,
        /// Queried layer tag.
        layer: String,
        /// Hyperedges of this layer containing the vertex.
        edge_ids: Vec<String>,
        /// Current feature row.
        features: Vec<f32>,
    },
    /// The layer or vertex does not exist.
    Error {
        /// What is missing.
        error: String,
        /// Available alternatives (layer tags or vertex ids).
        available: Vec<String>,
    },
}

impl LayerQueryResult {
    /// `true` for the `Found` arm.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Per-edge reduction applied by [`aggregate_by_edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    /// Column sum `Bᵀ · F`.
    Sum,
    /// Column sum divided by edge degree (floored at 1).
    Mean,
    /// Per-edge element-wise minimum (host loop).
    Min,
    /// Per-edge element-wise maximum (host loop).
    Max,
}

/// Dense `|E_a| x |E_b|` host matrix whose `(i, j)` entry counts the
/// vertices shared by edge `i` of `layer_a` and edge `j` of `layer_b`:
/// the sparse product `Bᵀ_a · B_b`.
///
/// # Errors
///
/// [`GraphError::LayerNotFound`] for either missing layer.
pub fn cross_layer_query(
    graph: &LayeredHyperGraph,
    layer_a: &str,
    layer_b: &str,
) -> Result<Array2<f32>, GraphError> {
    let a = graph.layer_or_not_found(layer_a)?;
    let b = graph.layer_or_not_found(layer_b)?;

    if a.residency().is_device() || b.residency().is_device() {
        let backend = Backend::detect();
        let (ea, eb) = (a.incidence().ncols(), b.incidence().ncols());
        let mut out = Array2::zeros((ea, eb));
        if let Some(flat) = out.as_slice_mut() {
            let inc_a = a.incidence();
            let inc_b = b.incidence();
            let _ = launch(backend, flat, |base, chunk| {
                for (offset, cell) in chunk.iter_mut().enumerate() {
                    let idx = base + offset;
                    let (i, j) = (idx / eb, idx % eb);
                    *cell = sorted_overlap(inc_a.col_row_indices(i), inc_b.col_row_indices(j));
                }
            });
        }
        Ok(out)
    } else {
        Ok(a.incidence().transpose_mul(b.incidence()))
    }
}

/// Size of the intersection of two sorted row-index slices.
fn sorted_overlap(a: &[u32], b: &[u32]) -> f32 {
    let (mut i, mut j, mut count) = (0usize, 0usize, 0u32);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count as f32
}

/// One vertex's membership and current features in one layer.
pub fn query_layer(
    graph: &LayeredHyperGraph,
    layer_tag: &str,
    vertex_id: &str,
) -> LayerQueryResult {
    let Some(layer) = graph.layer(layer_tag) else {
        return LayerQueryResult::Error {
            error: format!("layer '{layer_tag}' not found"),
            available: graph.layer_tags(),
        };
    };
    let Some(row) = graph.vertex_row(vertex_id) else {
        return LayerQueryResult::Error {
            error: format!("vertex '{vertex_id}' not found"),
            available: graph.vertex_ids().to_vec(),
        };
    };

    let edge_ids = layer
        .incidence()
        .cols_containing_row(row)
        .into_iter()
        .map(|col| layer.edge_ids()[col].clone())
        .collect();
    let features = layer.features().ensure_host().row(row).to_vec();

    LayerQueryResult::Found {
        vertex_id: vertex_id.to_string(),
        layer: layer_tag.to_string(),
        edge_ids,
        features,
    }
}

/// `|E| x d` host matrix reducing vertex features over each hyperedge.
///
/// `Sum` and `Mean` run as sparse products (`Bᵀ · F`, degree-normalised
/// with a floor of 1); `Min`/`Max` fall back to host scalar loops.
pub fn aggregate_by_edge(
    graph: &LayeredHyperGraph,
    layer_tag: &str,
    reducer: Reducer,
) -> Result<Array2<f32>, GraphError> {
    let layer = graph.layer_or_not_found(layer_tag)?;
    match reducer {
        Reducer::Sum => Ok(edge_feature_sums(layer)),
        Reducer::Mean => {
            let mut sums = edge_feature_sums(layer);
            let degrees = layer.incidence().col_degrees();
            for (j, mut row) in sums.rows_mut().into_iter().enumerate() {
                let degree = degrees[j].max(1.0);
                row.mapv_inplace(|v| v / degree);
            }
            Ok(sums)
        }
        Reducer::Min | Reducer::Max => {
            let features = layer.features().ensure_host();
            let d = layer.feature_dim();
            let mut out = Array2::zeros((layer.n_edges(), d));
            for j in 0..layer.n_edges() {
                for k in 0..d {
                    let mut acc: Option<f32> = None;
                    for (row, _) in layer.incidence().col(j) {
                        let value = features[[row, k]];
                        acc = Some(match (acc, reducer) {
                            (None, _) => value,
                            (Some(prev), Reducer::Min) => prev.min(value),
                            (Some(prev), _) => prev.max(value),
                        });
                    }
                    out[[j, k]] = acc.unwrap_or(0.0);
                }
            }
            Ok(out)
        }
    }
}

/// `Bᵀ · F` on the layer's residency.
fn edge_feature_sums(layer: &Layer) -> Array2<f32> {
    if layer.residency().is_device() {
        let backend = Backend::detect();
        let d = layer.feature_dim();
        let mut out = Array2::zeros((layer.n_edges(), d));
        if let Some(flat) = out.as_slice_mut() {
            let incidence = layer.incidence();
            let features = layer.features().data();
            let _ = launch(backend, flat, |base, chunk| {
                for (offset, cell) in chunk.iter_mut().enumerate() {
                    let idx = base + offset;
                    let (j, k) = (idx / d, idx % d);
                    *cell = incidence
                        .col(j)
                        .map(|(row, val)| val * features[[row, k]])
                        .sum();
                }
            });
        }
        out
    } else {
        layer
            .incidence()
            .transpose_mul_dense(&layer.features().data().view())
    }
}

/// Horizontal concatenation of feature matrices for the listed layers:
/// `|V| x Σd`. The result is device-tagged only when every listed layer is
/// device-resident.
pub fn multi_layer_features(
    graph: &LayeredHyperGraph,
    layer_tags: &[&str],
) -> Result<Tensor2, GraphError> {
    let mut layers = Vec::with_capacity(layer_tags.len());
    for tag in layer_tags {
        layers.push(graph.layer_or_not_found(tag)?);
    }
    let total_d: usize = layers.iter().map(|layer| layer.feature_dim()).sum();
    let n = graph.n_vertices();

    let mut out = Array2::zeros((n, total_d));
    let mut offset = 0;
    for layer in &layers {
        let d = layer.feature_dim();
        out.slice_mut(ndarray::s![.., offset..offset + d])
            .assign(layer.features().data());
        offset += d;
    }

    let mut tensor = Tensor2::from_array(out);
    if !layers.is_empty() && layers.iter().all(|layer| layer.residency().is_device()) {
        tensor.transfer(agrisense_core::backend::Residency::Device);
    }
    Ok(tensor)
}
