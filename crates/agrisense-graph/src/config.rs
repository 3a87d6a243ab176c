//! Farm configuration: the typed input to graph construction.
//!
//! The external boundary speaks plain data; these structs are its typed
//! form. Validation is strict here (unknown farm types and layer tags are
//! rejected before any graph storage is allocated) while the engine
//! itself stays tolerant (a layer tag outside the known set simply gets
//! feature dimension 1).

use serde::{Deserialize, Serialize};

use agrisense_core::error::ConfigError;

use crate::layer::KNOWN_LAYERS;

/// Farm deployment type; fixes which hypergraph layers are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FarmType {
    /// Outdoor beds only; no lighting or vision layers.
    OpenField,
    /// Enclosed growing; lighting and vision available.
    Greenhouse,
    /// Mixed deployment: greenhouse zones plus open-field zones.
    Hybrid,
}

impl FarmType {
    /// Parses the wire token, rejecting anything outside the closed set.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value {
            "open_field" => Ok(Self::OpenField),
            "greenhouse" => Ok(Self::Greenhouse),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(ConfigError::UnknownFarmType {
                value: other.to_string(),
            }),
        }
    }

    /// Wire token for this farm type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenField => "open_field",
            Self::Greenhouse => "greenhouse",
            Self::Hybrid => "hybrid",
        }
    }

    /// `true` when the deployment includes greenhouse zones.
    pub fn has_greenhouses(&self) -> bool {
        matches!(self, Self::Greenhouse | Self::Hybrid)
    }
}

/// Zone classification within a farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    /// Outdoor zone.
    OpenField,
    /// Enclosed zone.
    Greenhouse,
}

/// A growing zone definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Opaque zone identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Zone classification.
    pub zone_type: ZoneType,
    /// Zone area in square metres.
    pub area_m2: f64,
    /// Soil classification, when surveyed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_type: Option<String>,
}

/// Per-model enablement toggles, each defaulting to `true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelToggles {
    /// Irrigation scheduler.
    #[serde(default = "default_true")]
    pub irrigation: bool,
    /// Nutrient deficit scorer.
    #[serde(default = "default_true")]
    pub nutrients: bool,
    /// Yield forecaster.
    #[serde(default = "default_true")]
    pub yield_forecast: bool,
    /// Statistical-process-control anomaly detector.
    #[serde(default = "default_true")]
    pub anomaly_detection: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ModelToggles {
    fn default() -> Self {
        Self {
            irrigation: true,
            nutrients: true,
            yield_forecast: true,
            anomaly_detection: true,
        }
    }
}

/// A vertex definition: a physical or logical entity entering the global
/// index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexDef {
    /// Opaque vertex identifier, unique per farm.
    pub id: String,
    /// Entity type token (`sensor`, `valve`, `crop_bed`, `weather_station`,
    /// `camera`, `light_fixture`, `climate_controller`). Metadata only; the
    /// engine never dispatches on it.
    #[serde(rename = "type")]
    pub vertex_type: String,
    /// Owning zone, when the entity is zone-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
}

/// A hyperedge definition: a typed relation over a set of vertices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDef {
    /// Opaque edge identifier.
    pub id: String,
    /// Owning layer tag.
    pub layer: String,
    /// Member vertex ids. Unknown ids are dropped at insertion.
    pub vertex_ids: Vec<String>,
    /// Free-form metadata carried on the edge.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Complete farm configuration: the input to `build_hypergraph`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmConfig {
    /// Farm identifier; keys the process-wide graph cache.
    pub farm_id: String,
    /// Deployment type.
    pub farm_type: FarmType,
    /// Active layer tags; all must be in the known set.
    #[serde(default)]
    pub active_layers: Vec<String>,
    /// Zone definitions.
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
    /// Model toggles, merged over all-true defaults.
    #[serde(default)]
    pub models: ModelToggles,
    /// Vertex definitions.
    #[serde(default)]
    pub vertices: Vec<VertexDef>,
    /// Hyperedge definitions.
    #[serde(default)]
    pub edges: Vec<EdgeDef>,
}

impl FarmConfig {
    /// Validates layer tags and zone/farm-type consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for layer in &self.active_layers {
            if !KNOWN_LAYERS.contains(&layer.as_str()) {
                return Err(ConfigError::UnknownLayer {
                    layer: layer.clone(),
                });
            }
        }
        for zone in &self.zones {
            match (self.farm_type, zone.zone_type) {
                (FarmType::OpenField, ZoneType::Greenhouse) => {
                    return Err(ConfigError::zone_mismatch(format!(
                        "open_field farms can only contain open_field zones (zone '{}')",
                        zone.id
                    )));
                }
                (FarmType::Greenhouse, ZoneType::OpenField) => {
                    return Err(ConfigError::zone_mismatch(format!(
                        "greenhouse farms can only contain greenhouse zones (zone '{}')",
                        zone.id
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Canonical active-layer list for a farm type.
///
/// Collaborators assembling configs use this to decide which layers a
/// deployment carries: open-field farms have no lighting or vision.
pub fn active_layers_for_farm(farm_type: FarmType) -> Vec<&'static str> {
    match farm_type {
        FarmType::OpenField => vec!["soil", "irrigation", "weather", "crop_requirements", "npk"],
        FarmType::Greenhouse => vec![
            "soil",
            "irrigation",
            "lighting",
            "weather",
            "crop_requirements",
            "npk",
            "vision",
        ],
        FarmType::Hybrid => vec![
            "soil",
            "irrigation",
            "lighting",
            "weather",
            "crop_requirements",
            "npk",
            "vision",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_farm_type_parse() {
        assert_eq!(FarmType::parse("greenhouse").unwrap(), FarmType::Greenhouse);
        assert!(FarmType::parse("orbital").is_err());
    }

    #[test]
    fn test_model_toggles_default_true() {
        let toggles: ModelToggles = serde_json::from_str("{}").unwrap();
        assert!(toggles.irrigation);
        assert!(toggles.anomaly_detection);

        let toggles: ModelToggles = serde_json::from_str(r#"{"nutrients": false}"#).unwrap();
        assert!(!toggles.nutrients);
        assert!(toggles.yield_forecast);
    }

    #[test]
    fn test_validate_rejects_unknown_layer() {
        let config = FarmConfig {
            farm_id: "f1".into(),
            farm_type: FarmType::OpenField,
            active_layers: vec!["soil".into(), "magnetics".into()],
            zones: vec![],
            models: ModelToggles::default(),
            vertices: vec![],
            edges: vec![],
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownLayer { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zone_mismatch() {
        let config = FarmConfig {
            farm_id: "f1".into(),
            farm_type: FarmType::OpenField,
            active_layers: vec![],
            zones: vec![ZoneConfig {
                id: "z1".into(),
                name: "North".into(),
                zone_type: ZoneType::Greenhouse,
                area_m2: 100.0,
                soil_type: None,
            }],
            models: ModelToggles::default(),
            vertices: vec![],
            edges: vec![],
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZoneMismatch { .. })
        ));
    }

    #[test]
    fn test_active_layers_per_farm_type() {
        assert!(!active_layers_for_farm(FarmType::OpenField).contains(&"vision"));
        assert!(!active_layers_for_farm(FarmType::OpenField).contains(&"lighting"));
        assert!(active_layers_for_farm(FarmType::Greenhouse).contains(&"vision"));
        assert_eq!(active_layers_for_farm(FarmType::Hybrid).len(), 7);
    }
}
