//! Integration tests for the synthetic generator.
//!
//! Determinism is the headline property: identical `(seed, farm_type,
//! days)` must produce element-wise identical output on the host backend.

use agrisense_synth::generate_synthetic;

#[test]
fn identical_seeds_are_bitwise_identical() {
    let a = generate_synthetic("greenhouse", 3, 42).unwrap();
    let b = generate_synthetic("greenhouse", 3, 42).unwrap();

    let json_a = serde_json::to_string(&a).unwrap();
    let json_b = serde_json::to_string(&b).unwrap();
    assert_eq!(json_a, json_b);
}

#[test]
fn different_seeds_differ() {
    let a = generate_synthetic("open_field", 2, 1).unwrap();
    let b = generate_synthetic("open_field", 2, 2).unwrap();
    assert_ne!(
        serde_json::to_string(&a.layers.soil.moisture).unwrap(),
        serde_json::to_string(&b.layers.soil.moisture).unwrap()
    );
}

#[test]
fn time_grid_is_quarter_hour() {
    let dataset = generate_synthetic("open_field", 2, 7).unwrap();
    assert_eq!(dataset.n_steps, 2 * 96);
    assert_eq!(dataset.cadence_minutes, 15);
    assert_eq!(dataset.time_hours.len(), dataset.n_steps);
    assert!(dataset.time_hours[0].abs() < f32::EPSILON);
    for w in dataset.time_hours.windows(2) {
        assert!((w[1] - w[0] - 0.25).abs() < 1e-6);
    }
}

#[test]
fn soil_nans_match_mask_exactly() {
    let dataset = generate_synthetic("hybrid", 2, 99).unwrap();
    let soil = &dataset.layers.soil;
    for (t, row) in soil.missing_mask.iter().enumerate() {
        for (s, &dropped) in row.iter().enumerate() {
            assert_eq!(soil.moisture[t][s].is_nan(), dropped);
            assert_eq!(soil.temperature[t][s].is_nan(), dropped);
            assert_eq!(soil.conductivity[t][s].is_nan(), dropped);
            assert_eq!(soil.ph[t][s].is_nan(), dropped);
        }
    }
}

#[test]
fn soil_moisture_in_unit_interval() {
    let dataset = generate_synthetic("open_field", 4, 5).unwrap();
    for row in &dataset.layers.soil.moisture {
        for &value in row {
            if !value.is_nan() {
                assert!((0.0..=1.0).contains(&value), "moisture {value} out of range");
            }
        }
    }
}

#[test]
fn greenhouse_layers_follow_farm_type() {
    let open = generate_synthetic("open_field", 1, 3).unwrap();
    assert!(open.layers.lighting.is_none());
    assert!(open.layers.vision.is_none());

    let greenhouse = generate_synthetic("greenhouse", 1, 3).unwrap();
    assert!(greenhouse.layers.lighting.is_some());
    assert!(greenhouse.layers.vision.is_some());
}

#[test]
fn hybrid_topology_leads_with_greenhouses() {
    let dataset = generate_synthetic("hybrid", 1, 8).unwrap();
    let topo = &dataset.topology;
    assert_eq!(topo.n_zones, 6);
    assert_eq!(topo.zones[0].zone_type, "greenhouse");
    assert_eq!(topo.zones[1].zone_type, "greenhouse");
    for zone in &topo.zones[2..] {
        assert_eq!(zone.zone_type, "open_field");
        assert!(!zone.active_layers.contains(&"vision".to_string()));
    }
    // Lighting and vision cover only the two greenhouse zones.
    assert_eq!(dataset.layers.lighting.as_ref().unwrap().zone_ids.len(), 2);
}

#[test]
fn unknown_farm_type_is_config_error() {
    assert!(generate_synthetic("orbital", 1, 1).is_err());
}

#[test]
fn zero_days_clamps_to_one() {
    let dataset = generate_synthetic("open_field", 0, 1).unwrap();
    assert_eq!(dataset.days, 1);
    assert_eq!(dataset.n_steps, 96);
}

#[test]
fn status_and_metadata_blocks() {
    let dataset = generate_synthetic("greenhouse", 1, 11).unwrap();
    assert_eq!(dataset.status, "ok");
    assert_eq!(dataset.missingness.encoding, "nan+mask");
    assert!((dataset.missingness.dropout_rate - 0.03).abs() < 1e-6);
    assert_eq!(dataset.reproducibility.host, "bitwise");
    assert_eq!(dataset.reproducibility.accelerator, "statistical");
    assert_eq!(dataset.seed, 11);
}
