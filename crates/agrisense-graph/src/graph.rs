//! The layered hypergraph: construction, topology mutation, and residency
//! transfer.
//!
//! A [`LayeredHyperGraph`] owns all of its layer storage exclusively. The
//! global vertex index is shared by every layer, so cross-layer products
//! line up row-for-row. Mutation is in-place and single-threaded per graph;
//! the external collaborator serialises access per farm id.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use agrisense_core::backend::Residency;
use agrisense_core::error::{ConfigError, GraphError};
use agrisense_core::knobs::RuntimeKnobs;
use agrisense_core::sparse::CscMatrix;
use ndarray::Array2;

use crate::config::FarmConfig;
use crate::layer::Layer;

/// A farm as a layered hypergraph over a shared vertex index.
#[derive(Debug, Clone)]
pub struct LayeredHyperGraph {
    farm_id: String,
    /// Vertex ids in row order.
    vertex_ids: Vec<String>,
    /// Vertex id → 0-based row.
    vertex_rows: HashMap<String, usize>,
    /// Layer tag → storage. Ordered for deterministic iteration.
    layers: BTreeMap<String, Layer>,
    /// Ring depth `H` used when materialising new layers.
    history_depth: usize,
}

impl LayeredHyperGraph {
    /// Builds a graph from a validated farm configuration.
    ///
    /// Incidence is assembled per active layer from edge membership;
    /// unknown vertex ids inside an edge are dropped silently. Layers with
    /// no edges are not materialised. Features and history start zeroed.
    pub fn build(config: &FarmConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let history_depth = RuntimeKnobs::global().history_size;

        let mut vertex_ids = Vec::with_capacity(config.vertices.len());
        let mut vertex_rows = HashMap::with_capacity(config.vertices.len());
        for vertex in &config.vertices {
            if vertex_rows.contains_key(&vertex.id) {
                debug!(vertex_id = %vertex.id, "skipping duplicate vertex definition");
                continue;
            }
            vertex_rows.insert(vertex.id.clone(), vertex_ids.len());
            vertex_ids.push(vertex.id.clone());
        }

        let mut graph = Self {
            farm_id: config.farm_id.clone(),
            vertex_ids,
            vertex_rows,
            layers: BTreeMap::new(),
            history_depth,
        };

        for layer_tag in &config.active_layers {
            let edges: Vec<_> = config
                .edges
                .iter()
                .filter(|edge| &edge.layer == layer_tag)
                .collect();
            if edges.is_empty() {
                continue;
            }

            let mut layer = Layer::empty(layer_tag, graph.vertex_ids.len(), history_depth);
            let mut triplets = Vec::new();
            for (col, edge) in edges.iter().enumerate() {
                for vertex_id in &edge.vertex_ids {
                    match graph.vertex_rows.get(vertex_id) {
                        Some(&row) => triplets.push((row as u32, col as u32, 1.0f32)),
                        None => {
                            debug!(edge_id = %edge.id, vertex_id = %vertex_id,
                                "dropping unknown vertex id from hyperedge");
                        }
                    }
                }
                layer.edge_ids.push(edge.id.clone());
                layer.edge_metadata.push(edge.metadata.clone());
            }
            layer.incidence =
                CscMatrix::from_triplets(graph.vertex_ids.len(), edges.len(), &triplets);
            graph.layers.insert(layer_tag.clone(), layer);
        }

        Ok(graph)
    }

    /// Farm identifier.
    pub fn farm_id(&self) -> &str {
        &self.farm_id
    }

    /// Number of indexed vertices.
    pub fn n_vertices(&self) -> usize {
        self.vertex_ids.len()
    }

    /// Vertex ids in row order.
    pub fn vertex_ids(&self) -> &[String] {
        &self.vertex_ids
    }

    /// 0-based row of a vertex id.
    pub fn vertex_row(&self, vertex_id: &str) -> Option<usize> {
        self.vertex_rows.get(vertex_id).copied()
    }

    /// Tags of the materialised layers.
    pub fn layer_tags(&self) -> Vec<String> {
        self.layers.keys().cloned().collect()
    }

    /// Storage for `layer`, when materialised.
    pub fn layer(&self, layer: &str) -> Option<&Layer> {
        self.layers.get(layer)
    }

    /// Iterator over `(tag, layer)` pairs in tag order.
    pub fn layers(&self) -> impl Iterator<Item = (&String, &Layer)> {
        self.layers.iter()
    }

    /// Ring depth used for newly materialised layers.
    pub fn history_depth(&self) -> usize {
        self.history_depth
    }

    pub(crate) fn layer_or_not_found(&self, layer: &str) -> Result<&Layer, GraphError> {
        self.layers.get(layer).ok_or_else(|| GraphError::LayerNotFound {
            layer: layer.to_string(),
            available: self.layer_tags(),
        })
    }

    /// Moves every layer's numeric arrays to the accelerator lane.
    pub fn to_device(&mut self) {
        for layer in self.layers.values_mut() {
            layer.transfer(Residency::Device);
        }
    }

    /// Moves every layer's numeric arrays back to host memory.
    pub fn to_host(&mut self) {
        for layer in self.layers.values_mut() {
            layer.transfer(Residency::Host);
        }
    }

    /// `true` when any layer's numeric arrays are device-resident.
    pub fn is_device_resident(&self) -> bool {
        self.layers.values().any(|layer| layer.residency().is_device())
    }

    /// Appends a vertex with zero rows in every layer.
    ///
    /// # Errors
    ///
    /// [`GraphError::DuplicateVertex`] when the id is already indexed.
    pub fn add_vertex(&mut self, vertex_id: &str) -> Result<(), GraphError> {
        if self.vertex_rows.contains_key(vertex_id) {
            return Err(GraphError::DuplicateVertex {
                vertex_id: vertex_id.to_string(),
            });
        }
        self.vertex_rows
            .insert(vertex_id.to_string(), self.vertex_ids.len());
        self.vertex_ids.push(vertex_id.to_string());
        for layer in self.layers.values_mut() {
            Self::with_host_mutation(layer, Layer::append_vertex_row);
        }
        Ok(())
    }

    /// Adds a hyperedge column to `layer`, creating the layer (zeroed
    /// features and history for all existing vertices) when absent.
    /// Unknown vertex ids are dropped silently.
    pub fn add_hyperedge(
        &mut self,
        layer_tag: &str,
        edge_id: &str,
        vertex_ids: &[String],
        metadata: serde_json::Map<String, serde_json::Value>,
    ) {
        let n_vertices = self.vertex_ids.len();
        let history_depth = self.history_depth;
        let rows: Vec<u32> = vertex_ids
            .iter()
            .filter_map(|id| match self.vertex_rows.get(id) {
                Some(&row) => Some(row as u32),
                None => {
                    debug!(edge_id, vertex_id = %id, "dropping unknown vertex id from hyperedge");
                    None
                }
            })
            .collect();

        let layer = self
            .layers
            .entry(layer_tag.to_string())
            .or_insert_with(|| Layer::empty(layer_tag, n_vertices, history_depth));

        Self::with_host_mutation(layer, |layer| {
            layer.incidence.push_col(&rows, 1.0);
            layer.edge_ids.push(edge_id.to_string());
            layer.edge_metadata.push(metadata);
        });
    }

    /// Removes the hyperedge column and its metadata. Returns `false` when
    /// the layer or edge id is unknown.
    pub fn remove_hyperedge(&mut self, layer_tag: &str, edge_id: &str) -> bool {
        let Some(layer) = self.layers.get_mut(layer_tag) else {
            return false;
        };
        let Some(col) = layer.edge_ids.iter().position(|id| id == edge_id) else {
            return false;
        };
        Self::with_host_mutation(layer, |layer| {
            layer.incidence.remove_col(col);
            layer.edge_ids.remove(col);
            layer.edge_metadata.remove(col);
        });
        true
    }

    /// Pushes a feature vector for one vertex: updates the snapshot row,
    /// writes the current ring slot, advances the head.
    ///
    /// # Errors
    ///
    /// [`GraphError::LayerNotFound`] / [`GraphError::VertexNotFound`]: on
    /// this path absence is a precondition violation.
    pub fn push_features(
        &mut self,
        layer_tag: &str,
        vertex_id: &str,
        values: &[f32],
    ) -> Result<(), GraphError> {
        let row = self
            .vertex_rows
            .get(vertex_id)
            .copied()
            .ok_or_else(|| GraphError::VertexNotFound {
                vertex_id: vertex_id.to_string(),
                layer: layer_tag.to_string(),
            })?;
        let available = self.layer_tags();
        let layer = self
            .layers
            .get_mut(layer_tag)
            .ok_or_else(|| GraphError::LayerNotFound {
                layer: layer_tag.to_string(),
                available,
            })?;
        layer.push_features(row, values);
        Ok(())
    }

    /// Host `d x L` history matrix for one vertex, oldest reading first.
    pub fn get_history(
        &self,
        layer_tag: &str,
        vertex_id: &str,
    ) -> Result<Array2<f32>, GraphError> {
        let layer = self.layer_or_not_found(layer_tag)?;
        let row = self
            .vertex_rows
            .get(vertex_id)
            .copied()
            .ok_or_else(|| GraphError::VertexNotFound {
                vertex_id: vertex_id.to_string(),
                layer: layer_tag.to_string(),
            })?;
        Ok(layer.history_matrix(row))
    }

    /// Assembles a graph shell during deserialization.
    pub(crate) fn from_parts(farm_id: String, vertex_ids: Vec<String>) -> Self {
        let vertex_rows = vertex_ids
            .iter()
            .enumerate()
            .map(|(row, id)| (id.clone(), row))
            .collect();
        Self {
            farm_id,
            vertex_ids,
            vertex_rows,
            layers: BTreeMap::new(),
            history_depth: RuntimeKnobs::global().history_size,
        }
    }

    /// Installs a rehydrated layer during deserialization.
    pub(crate) fn insert_layer(&mut self, tag: String, layer: Layer) {
        self.layers.insert(tag, layer);
    }

    /// Topology mutation on device-resident storage pulls to host, mutates,
    /// and pushes back; host storage mutates in place.
    fn with_host_mutation(layer: &mut Layer, mutate: impl FnOnce(&mut Layer)) {
        if layer.residency().is_device() {
            layer.transfer(Residency::Host);
            mutate(layer);
            layer.transfer(Residency::Device);
        } else {
            mutate(layer);
        }
    }
}
