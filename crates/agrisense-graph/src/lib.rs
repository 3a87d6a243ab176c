//! # AgriSense Graph
//!
//! The layered hypergraph engine at the heart of the AgriSense analytics
//! core.
//!
//! A farm is modelled as a hypergraph with up to seven layers (`soil`,
//! `irrigation`, `weather`, `lighting`, `crop_requirements`, `npk`,
//! `vision`). Each layer holds a sparse vertex-to-hyperedge incidence
//! matrix over a vertex index shared by every layer, a dense feature
//! snapshot, and a fixed-capacity ring buffer of feature history.
//! Cross-layer relationships become sparse matrix products; per-vertex
//! reductions become sparse-times-dense multiplies.
//!
//! ## Capabilities
//!
//! - **Construction**: [`LayeredHyperGraph::build`] from a typed
//!   [`FarmConfig`]
//! - **Queries**: [`cross_layer_query`], [`query_layer`],
//!   [`aggregate_by_edge`], [`multi_layer_features`]
//! - **Mutation**: hyperedge add/remove, vertex append, feature pushes
//!   into the history ring
//! - **Residency**: whole-graph transfer between host and the accelerator
//!   lane, metadata pinned to host
//! - **Serialization**: the opaque [`GraphState`] contract form via
//!   [`serialize_graph`] / [`deserialize_graph`]
//!
//! ## Example
//!
//! ```rust
//! use agrisense_graph::{
//!     cross_layer_query, EdgeDef, FarmConfig, FarmType, LayeredHyperGraph, ModelToggles,
//!     VertexDef,
//! };
//!
//! let config = FarmConfig {
//!     farm_id: "demo".into(),
//!     farm_type: FarmType::OpenField,
//!     active_layers: vec!["soil".into(), "irrigation".into()],
//!     zones: vec![],
//!     models: ModelToggles::default(),
//!     vertices: vec![
//!         VertexDef { id: "v1".into(), vertex_type: "sensor".into(), zone_id: None },
//!         VertexDef { id: "v2".into(), vertex_type: "valve".into(), zone_id: None },
//!     ],
//!     edges: vec![EdgeDef {
//!         id: "e1".into(),
//!         layer: "soil".into(),
//!         vertex_ids: vec!["v1".into(), "v2".into()],
//!         metadata: serde_json::Map::new(),
//!     }],
//! };
//!
//! let graph = LayeredHyperGraph::build(&config).unwrap();
//! assert_eq!(graph.n_vertices(), 2);
//! assert!(cross_layer_query(&graph, "soil", "irrigation").is_err());
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod graph;
pub mod layer;
pub mod query;
pub mod state;

pub use config::{
    active_layers_for_farm, EdgeDef, FarmConfig, FarmType, ModelToggles, VertexDef, ZoneConfig,
    ZoneType,
};
pub use graph::LayeredHyperGraph;
pub use layer::{feature_name, layer_feature_dim, layer_feature_names, Layer, KNOWN_LAYERS};
pub use query::{
    aggregate_by_edge, cross_layer_query, multi_layer_features, query_layer, LayerQueryResult,
    Reducer,
};
pub use state::{deserialize_graph, serialize_graph, GraphState, LayerState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{FarmConfig, FarmType, ModelToggles};
    pub use crate::graph::LayeredHyperGraph;
    pub use crate::query::{aggregate_by_edge, cross_layer_query, query_layer, Reducer};
    pub use crate::state::{deserialize_graph, serialize_graph, GraphState};
}
