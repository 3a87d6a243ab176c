//! Synthetic farm topology: zones, sensors, stations, valves.
//!
//! Zone counts are fixed per farm type so the same seed always yields the
//! same entity layout. Hybrid farms lead with their greenhouse zones: the
//! first two zones are greenhouse, the next four open field, and open-field
//! zones declare their active layers without `vision`.

use serde::{Deserialize, Serialize};

use agrisense_graph::config::FarmType;

/// Soil sensors per zone.
const SENSORS_PER_ZONE: usize = 3;

/// Weather stations per farm.
const WEATHER_STATIONS: usize = 2;

/// Crop beds per greenhouse zone (vision coverage).
pub const BEDS_PER_GREENHOUSE_ZONE: usize = 2;

/// One zone in the synthetic farm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneInfo {
    /// Zone identifier.
    pub zone_id: String,
    /// Display name.
    pub name: String,
    /// `greenhouse` or `open_field`.
    pub zone_type: String,
    /// Layers active for this zone.
    pub active_layers: Vec<String>,
}

/// Soil sensor roster: parallel id and owning-zone arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilSensorSet {
    /// Sensor identifiers.
    pub sensor_id: Vec<String>,
    /// Owning zone per sensor.
    pub zone_id: Vec<String>,
}

/// Weather station roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherStationSet {
    /// Station identifiers.
    pub station_id: Vec<String>,
}

/// Complete topology block of the synthetic dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    /// Number of zones.
    pub n_zones: usize,
    /// Zone descriptors in order.
    pub zones: Vec<ZoneInfo>,
    /// Soil sensor roster.
    pub soil_sensors: SoilSensorSet,
    /// Weather station roster.
    pub weather_stations: WeatherStationSet,
}

impl Topology {
    /// Builds the fixed topology for a farm type.
    pub fn for_farm_type(farm_type: FarmType) -> Self {
        let zone_specs: Vec<(&str, bool)> = match farm_type {
            FarmType::OpenField => (0..6).map(|_| ("open_field", false)).collect(),
            FarmType::Greenhouse => (0..4).map(|_| ("greenhouse", true)).collect(),
            // Greenhouse zones lead, then open field.
            FarmType::Hybrid => vec![
                ("greenhouse", true),
                ("greenhouse", true),
                ("open_field", false),
                ("open_field", false),
                ("open_field", false),
                ("open_field", false),
            ],
        };

        let zones: Vec<ZoneInfo> = zone_specs
            .iter()
            .enumerate()
            .map(|(i, &(zone_type, greenhouse))| {
                let mut active_layers = vec![
                    "soil".to_string(),
                    "irrigation".to_string(),
                    "weather".to_string(),
                    "crop_requirements".to_string(),
                    "npk".to_string(),
                ];
                if greenhouse {
                    active_layers.push("lighting".to_string());
                    active_layers.push("vision".to_string());
                }
                ZoneInfo {
                    zone_id: format!("zone-{}", i + 1),
                    name: format!("Zone {}", i + 1),
                    zone_type: zone_type.to_string(),
                    active_layers,
                }
            })
            .collect();

        let mut sensor_id = Vec::new();
        let mut sensor_zone = Vec::new();
        for zone in &zones {
            for s in 0..SENSORS_PER_ZONE {
                sensor_id.push(format!("{}-soil-{}", zone.zone_id, s + 1));
                sensor_zone.push(zone.zone_id.clone());
            }
        }

        let station_id = (0..WEATHER_STATIONS)
            .map(|i| format!("station-{}", i + 1))
            .collect();

        Self {
            n_zones: zones.len(),
            zones,
            soil_sensors: SoilSensorSet {
                sensor_id,
                zone_id: sensor_zone,
            },
            weather_stations: WeatherStationSet { station_id },
        }
    }

    /// Indices of greenhouse zones.
    pub fn greenhouse_zone_indices(&self) -> Vec<usize> {
        self.zones
            .iter()
            .enumerate()
            .filter(|(_, zone)| zone.zone_type == "greenhouse")
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hybrid_zone_layout() {
        let topo = Topology::for_farm_type(FarmType::Hybrid);
        assert_eq!(topo.n_zones, 6);
        assert_eq!(topo.zones[0].zone_type, "greenhouse");
        assert_eq!(topo.zones[1].zone_type, "greenhouse");
        for zone in &topo.zones[2..] {
            assert_eq!(zone.zone_type, "open_field");
            assert!(!zone.active_layers.contains(&"vision".to_string()));
        }
    }

    #[test]
    fn test_open_field_has_no_greenhouse_layers() {
        let topo = Topology::for_farm_type(FarmType::OpenField);
        assert!(topo.greenhouse_zone_indices().is_empty());
        for zone in &topo.zones {
            assert!(!zone.active_layers.contains(&"lighting".to_string()));
        }
    }

    #[test]
    fn test_sensor_roster_is_parallel() {
        let topo = Topology::for_farm_type(FarmType::Greenhouse);
        assert_eq!(
            topo.soil_sensors.sensor_id.len(),
            topo.soil_sensors.zone_id.len()
        );
        assert_eq!(topo.soil_sensors.sensor_id.len(), 4 * SENSORS_PER_ZONE);
        assert_eq!(topo.weather_stations.station_id.len(), WEATHER_STATIONS);
    }
}
