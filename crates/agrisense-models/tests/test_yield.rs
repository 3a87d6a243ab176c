//! Integration tests for the yield forecaster and the ridge residual.

use std::collections::HashMap;

use agrisense_graph::{EdgeDef, FarmConfig, FarmType, LayeredHyperGraph, ModelToggles, VertexDef};
use agrisense_models::{train_yield_residual, yield_forecast, TrainOutcome};

fn edge(id: &str, layer: &str, vertices: &[&str]) -> EdgeDef {
    EdgeDef {
        id: id.into(),
        layer: layer.into(),
        vertex_ids: vertices.iter().map(|s| s.to_string()).collect(),
        metadata: serde_json::Map::new(),
    }
}

/// Eight crop beds, crop-requirements layer only: the residual feature
/// matrix is 5 crop columns + 2 derived, so 8 observations satisfy p + 1.
fn crop_farm() -> LayeredHyperGraph {
    let ids: Vec<String> = (1..=8).map(|i| format!("bed{i}")).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let config = FarmConfig {
        farm_id: "yield-farm".into(),
        farm_type: FarmType::OpenField,
        active_layers: vec!["crop_requirements".into()],
        zones: vec![],
        models: ModelToggles::default(),
        vertices: ids
            .iter()
            .map(|id| VertexDef {
                id: id.clone(),
                vertex_type: "crop_bed".into(),
                zone_id: None,
            })
            .collect(),
        edges: vec![edge("bed-edge", "crop_requirements", &id_refs)],
    };
    let mut graph = LayeredHyperGraph::build(&config).unwrap();
    for (i, id) in ids.iter().enumerate() {
        let target = 2.0 + 0.25 * i as f32;
        let progress = 0.1 * (i + 1) as f32;
        graph
            .push_features(
                "crop_requirements",
                id,
                &[target, progress, 80.0, 60.0, 70.0],
            )
            .unwrap();
    }
    graph
}

/// Without a residual every record is FAO-only with a ±20% interval.
#[test]
fn fao_only_without_residual() {
    let graph = crop_farm();
    let forecasts = yield_forecast(&graph, None);
    assert_eq!(forecasts.len(), 1);

    let forecast = &forecasts[0];
    assert_eq!(forecast.model_layer, "fao_only");
    assert!((forecast.confidence - 0.8).abs() < 1e-6);
    let half_width = forecast.yield_upper - forecast.yield_estimate_kg_m2;
    assert!((half_width - 0.2 * forecast.yield_estimate_kg_m2).abs() < 1e-4);
}

/// Stress coefficients are all 1 when only crop requirements exist, so the
/// FAO estimate equals the mean potential yield.
#[test]
fn stress_free_estimate_equals_potential() {
    let graph = crop_farm();
    let forecasts = yield_forecast(&graph, None);
    let forecast = &forecasts[0];

    assert!((forecast.stress_factors.ks - 1.0).abs() < f32::EPSILON);
    assert!((forecast.stress_factors.kn - 1.0).abs() < f32::EPSILON);
    assert!((forecast.stress_factors.kl - 1.0).abs() < f32::EPSILON);
    assert!((forecast.stress_factors.kw - 1.0).abs() < f32::EPSILON);

    // Mean of 2.0 + 0.25*i for i in 0..8
    let expected = (0..8).map(|i| 2.0 + 0.25 * i as f32).sum::<f32>() / 8.0;
    assert!((forecast.yield_estimate_kg_m2 - expected).abs() < 1e-4);
}

/// Training with enough observations flips the model layer and halves the
/// interval to ±10%.
#[test]
fn trained_residual_tightens_interval() {
    let graph = crop_farm();
    let outcomes: HashMap<String, f32> = (1..=8)
        .map(|i| (format!("bed{i}"), 2.0 + 0.25 * (i - 1) as f32 + 0.3))
        .collect();

    let outcome = train_yield_residual(&graph, &outcomes).unwrap();
    let model = match outcome {
        TrainOutcome::Trained {
            model,
            n_observations,
        } => {
            assert_eq!(n_observations, 8);
            assert_eq!(model.len(), 7);
            model
        }
        TrainOutcome::InsufficientData { .. } => panic!("expected a successful fit"),
    };

    let forecasts = yield_forecast(&graph, Some(&model));
    let forecast = &forecasts[0];
    assert_eq!(forecast.model_layer, "fao_plus_residual");
    assert!((forecast.confidence - 0.9).abs() < 1e-6);
    let half_width = forecast.yield_upper - forecast.yield_estimate_kg_m2;
    assert!((half_width - 0.1 * forecast.yield_estimate_kg_m2).abs() < 1e-4);
}

/// Too few observations leaves the coefficients unchanged.
#[test]
fn insufficient_observations_do_not_train() {
    let graph = crop_farm();
    let outcomes: HashMap<String, f32> =
        [("bed1".to_string(), 2.4), ("bed2".to_string(), 2.6)].into();

    match train_yield_residual(&graph, &outcomes).unwrap() {
        TrainOutcome::InsufficientData {
            n_observations,
            required,
        } => {
            assert_eq!(n_observations, 2);
            assert_eq!(required, 8);
        }
        TrainOutcome::Trained { .. } => panic!("two observations must not train 7 coefficients"),
    }
}

/// Observations for unknown vertex ids are ignored rather than failing.
#[test]
fn unknown_outcome_ids_are_ignored() {
    let graph = crop_farm();
    let outcomes: HashMap<String, f32> = [("phantom".to_string(), 9.0)].into();
    assert!(matches!(
        train_yield_residual(&graph, &outcomes).unwrap(),
        TrainOutcome::InsufficientData {
            n_observations: 0,
            ..
        }
    ));
}

/// A residual trained for one feature width is skipped after the graph
/// grows a layer, falling back to FAO-only.
#[test]
fn stale_residual_width_falls_back() {
    let graph = crop_farm();
    let outcomes: HashMap<String, f32> = (1..=8)
        .map(|i| (format!("bed{i}"), 2.5 + 0.1 * i as f32))
        .collect();
    let TrainOutcome::Trained { model, .. } = train_yield_residual(&graph, &outcomes).unwrap()
    else {
        panic!("fit expected");
    };

    let mut grown = crop_farm();
    let id_refs: Vec<String> = (1..=8).map(|i| format!("bed{i}")).collect();
    grown.add_hyperedge("soil", "soil-all", &id_refs, serde_json::Map::new());
    let forecasts = yield_forecast(&grown, Some(&model));
    assert_eq!(forecasts[0].model_layer, "fao_only");
}

/// Without crop requirements the forecast is empty, not an error.
#[test]
fn missing_crop_layer_means_empty_forecast() {
    let config = FarmConfig {
        farm_id: "bare".into(),
        farm_type: FarmType::OpenField,
        active_layers: vec!["soil".into()],
        zones: vec![],
        models: ModelToggles::default(),
        vertices: vec![VertexDef {
            id: "v1".into(),
            vertex_type: "sensor".into(),
            zone_id: None,
        }],
        edges: vec![edge("e", "soil", &["v1"])],
    };
    let graph = LayeredHyperGraph::build(&config).unwrap();
    assert!(yield_forecast(&graph, None).is_empty());
}
