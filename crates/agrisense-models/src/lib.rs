//! # AgriSense Models
//!
//! The predictive model family over the layered hypergraph:
//!
//! - **Irrigation scheduling** ([`irrigation_schedule`]): daily water
//!   balance with Hargreaves ET₀, crop coefficients, and wilting-point
//!   triggers.
//! - **Nutrient deficit scoring** ([`nutrient_report`]): weighted N/P/K
//!   shortfalls against crop targets with growth-stage scaling and vision
//!   confirmation.
//! - **Yield forecasting** ([`yield_forecast`]): FAO multiplicative stress
//!   baseline plus a trainable ridge residual
//!   ([`train_yield_residual`]).
//! - **Anomaly detection** ([`detect_anomalies`]): Western Electric rules
//!   over per-vertex rolling statistics with cross-layer escalation.
//!
//! Models consume a graph in any residency and emit host-side records.
//! Missing required layers produce empty results, never errors; the only
//! hard failure in this crate is a singular ridge system.

#![deny(unsafe_code)]

pub mod anomaly;
pub mod irrigation;
pub mod nutrients;
pub mod residual;
pub mod yield_forecast;

mod zone;

pub use anomaly::{anomaly_type_for, detect_anomalies, AnomalyRecord, MIN_HISTORY};
pub use irrigation::{
    irrigation_schedule, IrrigationRecommendation, WeatherForecast, EFFECTIVE_DEPTH_MM, THETA_FC,
    THETA_WP, VOLUME_CAP,
};
pub use nutrients::{
    nutrient_report, nutrient_report_weighted, urgency_tier, NutrientReport, NutrientWeights,
};
pub use residual::{
    assemble_residual_features, soil_health, train_yield_residual, ResidualModel, TrainOutcome,
};
pub use yield_forecast::{temperature_stress, yield_forecast, StressFactors, YieldForecast};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
