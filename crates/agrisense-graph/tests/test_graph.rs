//! Integration tests for the layered hypergraph engine.
//!
//! Exercises the structural invariants that must hold after every public
//! operation, plus the serialization and residency round trips. All inputs
//! are fixed; nothing here depends on OS entropy or wall-clock time.

use agrisense_graph::{
    aggregate_by_edge, cross_layer_query, deserialize_graph, query_layer, serialize_graph,
    EdgeDef, FarmConfig, FarmType, LayeredHyperGraph, ModelToggles, Reducer, VertexDef,
};

fn vertex(id: &str, vertex_type: &str) -> VertexDef {
    VertexDef {
        id: id.into(),
        vertex_type: vertex_type.into(),
        zone_id: None,
    }
}

fn edge(id: &str, layer: &str, vertices: &[&str]) -> EdgeDef {
    EdgeDef {
        id: id.into(),
        layer: layer.into(),
        vertex_ids: vertices.iter().map(|s| s.to_string()).collect(),
        metadata: serde_json::Map::new(),
    }
}

fn three_vertex_config() -> FarmConfig {
    FarmConfig {
        farm_id: "farm-int".into(),
        farm_type: FarmType::OpenField,
        active_layers: vec!["soil".into(), "irrigation".into(), "npk".into()],
        zones: vec![],
        models: ModelToggles::default(),
        vertices: vec![
            vertex("v1", "sensor"),
            vertex("v2", "sensor"),
            vertex("v3", "valve"),
        ],
        edges: vec![
            edge("e1", "soil", &["v1", "v2"]),
            edge("e2", "irrigation", &["v2", "v3"]),
        ],
    }
}

/// Seed scenario: vertices [v1, v2, v3], edges {e1 soil [v1,v2],
/// e2 irrigation [v2,v3]}: the soil/irrigation overlap matrix is [[1]].
#[test]
fn cross_layer_overlap_is_one_shared_vertex() {
    let graph = LayeredHyperGraph::build(&three_vertex_config()).unwrap();
    let overlap = cross_layer_query(&graph, "soil", "irrigation").unwrap();
    assert_eq!(overlap.dim(), (1, 1));
    assert!((overlap[[0, 0]] - 1.0).abs() < f32::EPSILON);
}

/// Structural invariants hold after a chain of mutations.
#[test]
fn invariants_hold_after_mutations() {
    let mut graph = LayeredHyperGraph::build(&three_vertex_config()).unwrap();

    graph.add_vertex("v4").unwrap();
    graph.add_hyperedge(
        "soil",
        "e3",
        &["v3".into(), "v4".into()],
        serde_json::Map::new(),
    );
    graph
        .push_features("soil", "v4", &[0.22, 19.0, 1.3, 7.1])
        .unwrap();
    assert!(graph.remove_hyperedge("irrigation", "e2"));

    for (_, layer) in graph.layers() {
        assert_eq!(layer.incidence().nrows(), graph.n_vertices());
        assert_eq!(layer.incidence().ncols(), layer.edge_ids().len());
        assert_eq!(layer.edge_ids().len(), layer.edge_metadata().len());
        assert_eq!(layer.features().dim().0, graph.n_vertices());
        assert_eq!(layer.history().dim().0, graph.n_vertices());
        assert_eq!(layer.history().dim().2, layer.feature_dim());
        assert!(layer.history_length() <= layer.history_depth());
        assert!(layer.history_head() >= 1 && layer.history_head() <= layer.history_depth());
    }
}

/// Serialization round trip preserves the nonzero pattern, feature values,
/// ring contents and pointers, identifiers, and metadata.
#[test]
fn serialization_round_trip_is_lossless() {
    let mut graph = LayeredHyperGraph::build(&three_vertex_config()).unwrap();
    let mut meta = serde_json::Map::new();
    meta.insert("zone_id".into(), serde_json::json!("zone-7"));
    graph.add_hyperedge("npk", "e-npk", &["v1".into(), "v2".into()], meta);

    for i in 0..5 {
        graph
            .push_features("soil", "v1", &[0.30 + 0.01 * i as f32, 20.0, 1.0, 6.8])
            .unwrap();
    }

    let state = serialize_graph(&graph);
    let back = deserialize_graph(&state).unwrap();
    let state_again = serialize_graph(&back);

    let json_a = serde_json::to_value(&state).unwrap();
    let json_b = serde_json::to_value(&state_again).unwrap();
    assert_eq!(json_a, json_b);
}

/// Residency round trip is value-identical and JSON output carries no
/// residency marks at all.
#[test]
fn residency_round_trip_is_value_identical() {
    let mut graph = LayeredHyperGraph::build(&three_vertex_config()).unwrap();
    graph
        .push_features("soil", "v2", &[0.25, 18.5, 0.9, 6.4])
        .unwrap();
    let before = serialize_graph(&graph);

    graph.to_device();
    graph.to_host();
    let after = serialize_graph(&graph);

    assert_eq!(
        serde_json::to_value(&before).unwrap(),
        serde_json::to_value(&after).unwrap()
    );
}

/// Aggregation shapes and the mean degree floor.
#[test]
fn aggregate_by_edge_shapes() {
    let mut graph = LayeredHyperGraph::build(&three_vertex_config()).unwrap();
    graph
        .push_features("soil", "v1", &[0.4, 20.0, 1.0, 6.5])
        .unwrap();
    graph
        .push_features("soil", "v2", &[0.2, 24.0, 1.2, 6.7])
        .unwrap();

    let sum = aggregate_by_edge(&graph, "soil", Reducer::Sum).unwrap();
    let mean = aggregate_by_edge(&graph, "soil", Reducer::Mean).unwrap();
    assert_eq!(sum.dim(), (1, 4));
    assert_eq!(mean.dim(), (1, 4));
    assert!((sum[[0, 0]] - 0.6).abs() < 1e-6);
    assert!((mean[[0, 1]] - 22.0).abs() < 1e-6);
}

/// Missing vertex/layer references in the read path return error records.
#[test]
fn query_layer_error_records() {
    let graph = LayeredHyperGraph::build(&three_vertex_config()).unwrap();

    let missing_layer = query_layer(&graph, "vision", "v1");
    let json = serde_json::to_value(&missing_layer).unwrap();
    assert!(json.get("error").is_some());

    let missing_vertex = query_layer(&graph, "soil", "nope");
    assert!(!missing_vertex.is_found());
}

/// The history ring read returns oldest-first across a wrap, through the
/// public graph surface.
#[test]
fn history_read_wraps_oldest_first() {
    let mut graph = LayeredHyperGraph::build(&three_vertex_config()).unwrap();
    let depth = graph.history_depth();
    for i in 0..(depth + 10) {
        graph
            .push_features("soil", "v1", &[i as f32, 0.0, 0.0, 0.0])
            .unwrap();
    }
    let history = graph.get_history("soil", "v1").unwrap();
    assert_eq!(history.dim(), (4, depth));
    assert!((history[[0, 0]] - 10.0).abs() < f32::EPSILON);
    assert!((history[[0, depth - 1]] - (depth + 9) as f32).abs() < f32::EPSILON);
}
