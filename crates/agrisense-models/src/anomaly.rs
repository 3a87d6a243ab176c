//! Statistical-process-control anomaly detection over the feature history.
//!
//! Every layer with enough ring-buffer history is screened per vertex and
//! feature against its own rolling statistics using the four Western
//! Electric rules:
//!
//! - **R1** (`3sigma`): the current value deviates more than 3σ; alarm.
//! - **R2** (`2of3_2sigma`): at least 2 of the current point and the two
//!   preceding deviate more than 2σ; warning.
//! - **R3** (`4of5_1sigma`): at least 4 of the current point and the four
//!   preceding deviate more than 1σ; recorded in the rule list but never
//!   alerts on its own.
//! - **R4** (`same_side_8`): the current point and the seven preceding all
//!   lie on the same side of the mean; warning.
//!
//! A near-zero σ suppresses all rules for that series. Vertices anomalous
//! in both `soil` and `vision` escalate: their records are cross-layer
//! confirmed and warnings promote to alarms.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use agrisense_core::backend::{launch, Backend};
use agrisense_core::knobs::RuntimeKnobs;
use agrisense_graph::{feature_name, LayeredHyperGraph};

/// Minimum valid ring entries before a layer is screened.
pub const MIN_HISTORY: usize = 8;

/// Standard deviations below this floor raise no alerts.
const SIGMA_FLOOR: f32 = 1e-8;

/// Raw vision anomaly score that flags a vertex for cross-layer
/// correlation without emitting a record.
const RAW_VISION_THRESHOLD: f32 = 0.7;

/// One detected anomaly on one vertex/feature series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Vertex the series belongs to.
    pub vertex_id: String,
    /// Layer tag.
    pub layer: String,
    /// Feature column name.
    pub feature: String,
    /// Domain classification derived from the layer.
    pub anomaly_type: String,
    /// `alarm` or `warning`.
    pub severity: String,
    /// Current snapshot value.
    pub current_value: f32,
    /// Rolling mean over valid ring entries.
    pub rolling_mean: f32,
    /// Rolling standard deviation over valid ring entries.
    pub rolling_std: f32,
    /// `|current − mean| / std`.
    pub sigma_deviation: f32,
    /// Names of every rule that fired, including the non-alerting R3.
    pub anomaly_rules: Vec<String>,
    /// Set when the vertex is anomalous in both soil and vision.
    pub cross_layer_confirmed: bool,
    /// Start of the observation window.
    pub timestamp_start: DateTime<Utc>,
    /// End of the observation window.
    pub timestamp_end: DateTime<Utc>,
}

/// Domain classification for a layer's anomalies.
pub fn anomaly_type_for(layer: &str) -> &'static str {
    match layer {
        "soil" | "weather" => "environmental",
        "npk" => "nutrient_imbalance",
        "vision" => "visual_anomaly",
        "lighting" => "light_anomaly",
        "irrigation" => "irrigation_fault",
        _ => "unknown",
    }
}

/// Screens every layer with sufficient history and returns all alerts.
///
/// `now` anchors the observation windows; the cadence is fixed by the
/// runtime knobs (15 minutes by default).
pub fn detect_anomalies(graph: &LayeredHyperGraph, now: DateTime<Utc>) -> Vec<AnomalyRecord> {
    let cadence = RuntimeKnobs::global().cadence_minutes as i64;
    let mut records = Vec::new();
    let mut soil_alerts: HashSet<usize> = HashSet::new();
    let mut vision_alerts: HashSet<usize> = HashSet::new();

    for (tag, layer) in graph.layers() {
        let len = layer.history_length();
        if len < MIN_HISTORY {
            debug!(layer = %tag, history_length = len, "skipping layer below history minimum");
            continue;
        }
        let n = graph.n_vertices();
        let d = layer.feature_dim();
        let h = layer.history_depth();
        let head = layer.history_head();
        let history = layer.history().data();
        let features = layer.features().data();

        let backend = if layer.residency().is_device() {
            Backend::detect()
        } else {
            Backend::Host
        };

        // Rolling mean and std per (vertex, feature) over valid ring slots.
        let mut stats = vec![(0.0f32, 0.0f32); n * d];
        let _ = launch(backend, stats.as_mut_slice(), |base, chunk| {
            for (offset, cell) in chunk.iter_mut().enumerate() {
                let idx = base + offset;
                let (v, f) = (idx / d, idx % d);
                let mut sum = 0.0f32;
                for slot in valid_slots(len, h, head) {
                    sum += history[[v, slot, f]];
                }
                let mean = sum / len as f32;
                let mut var = 0.0f32;
                for slot in valid_slots(len, h, head) {
                    let diff = history[[v, slot, f]] - mean;
                    var += diff * diff;
                }
                *cell = (mean, (var / len as f32).sqrt());
            }
        });

        let window_start = now - Duration::minutes(cadence * len as i64);
        for v in 0..n {
            for f in 0..d {
                let (mean, std) = stats[v * d + f];
                if std < SIGMA_FLOOR {
                    continue;
                }
                let x = features[[v, f]];

                // i-th preceding point, wrap-aware. The slot before the
                // head holds the current value itself, so the window of
                // preceding points starts one slot earlier.
                let recent = |i: usize| {
                    let slot = (head + 2 * h - 3 - i) % h;
                    history[[v, slot, f]]
                };
                let beyond = |value: f32, sigmas: f32| (value - mean).abs() > sigmas * std;

                let r1 = beyond(x, 3.0);
                let r2 = {
                    let mut count = usize::from(beyond(x, 2.0));
                    for i in 0..2 {
                        count += usize::from(beyond(recent(i), 2.0));
                    }
                    count >= 2
                };
                let r3 = {
                    let mut count = usize::from(beyond(x, 1.0));
                    for i in 0..4 {
                        count += usize::from(beyond(recent(i), 1.0));
                    }
                    count >= 4
                };
                let r4 = {
                    let side = x - mean;
                    side != 0.0
                        && (0..7).all(|i| {
                            let diff = recent(i) - mean;
                            diff != 0.0 && diff.is_sign_positive() == side.is_sign_positive()
                        })
                };

                let severity = if r1 {
                    "alarm"
                } else if r2 || r4 {
                    "warning"
                } else {
                    // R3 alone stays observable in the bitfield but never
                    // raises an alert.
                    continue;
                };

                let mut rules = Vec::new();
                if r1 {
                    rules.push("3sigma".to_string());
                }
                if r2 {
                    rules.push("2of3_2sigma".to_string());
                }
                if r3 {
                    rules.push("4of5_1sigma".to_string());
                }
                if r4 {
                    rules.push("same_side_8".to_string());
                }

                if tag == "soil" {
                    soil_alerts.insert(v);
                }
                if tag == "vision" {
                    vision_alerts.insert(v);
                }

                records.push(AnomalyRecord {
                    vertex_id: graph.vertex_ids()[v].clone(),
                    layer: tag.clone(),
                    feature: feature_name(tag, f),
                    anomaly_type: anomaly_type_for(tag).to_string(),
                    severity: severity.to_string(),
                    current_value: x,
                    rolling_mean: mean,
                    rolling_std: std,
                    sigma_deviation: (x - mean).abs() / std,
                    anomaly_rules: rules,
                    cross_layer_confirmed: false,
                    timestamp_start: window_start,
                    timestamp_end: now,
                });
            }
        }
    }

    // Raw vision score flags vertices for correlation without a record.
    if let Some(vision) = graph.layer("vision") {
        let features = vision.features().ensure_host();
        for v in 0..graph.n_vertices() {
            if features[[v, 2]] > RAW_VISION_THRESHOLD {
                vision_alerts.insert(v);
            }
        }
    }

    // Cross-layer escalation: soil and vision agreeing promotes severity.
    let confirmed: HashSet<&String> = soil_alerts
        .intersection(&vision_alerts)
        .map(|&v| &graph.vertex_ids()[v])
        .collect();
    if !confirmed.is_empty() {
        for record in &mut records {
            if confirmed.contains(&record.vertex_id) {
                record.cross_layer_confirmed = true;
                if record.severity == "warning" {
                    record.severity = "alarm".to_string();
                }
            }
        }
    }

    records
}

/// Iterator over valid ring slots: sequential before the first wrap, the
/// whole ring afterwards.
fn valid_slots(len: usize, h: usize, head: usize) -> impl Iterator<Item = usize> {
    let full = len >= h;
    let start = if full { head - 1 } else { 0 };
    (0..len).map(move |i| if full { (start + i) % h } else { i })
}
