//! Weather layer synthesis.
//!
//! Temperature rides a diurnal sinusoid (amplitude 8 °C, baseline 19 °C,
//! phase −1) with station-level baseline offsets and correlated noise.
//! Humidity anti-correlates with temperature (slope −0.9). Precipitation
//! tiles the shared rainfall forcing across stations. Wind, direction,
//! pressure, solar radiation, and a Hargreaves ET₀ proxy derive on-grid.
//! Each channel carries its own dropout mask.

use std::collections::BTreeMap;
use std::f32::consts::PI;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::correlate::{cholesky_with_jitter, correlated_noise, factor_correlation};
use crate::forcing::SharedForcing;
use crate::missing::{apply_mask, dropout_mask, to_rows};
use crate::rng::SynthRng;
use crate::topology::Topology;

/// Weather block of the synthetic dataset: one `n_steps x n_stations`
/// matrix per channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherLayerData {
    /// Station identifiers, column order.
    pub station_ids: Vec<String>,
    /// Air temperature, °C.
    pub temperature: Vec<Vec<f32>>,
    /// Relative humidity, %.
    pub humidity: Vec<Vec<f32>>,
    /// Precipitation, mm per step.
    pub precipitation: Vec<Vec<f32>>,
    /// Wind speed, m/s.
    pub wind_speed: Vec<Vec<f32>>,
    /// Wind direction, degrees.
    pub wind_direction: Vec<Vec<f32>>,
    /// Barometric pressure, hPa.
    pub pressure: Vec<Vec<f32>>,
    /// Solar radiation, W/m².
    pub solar_radiation: Vec<Vec<f32>>,
    /// Reference evapotranspiration proxy, mm/day.
    pub et0: Vec<Vec<f32>>,
    /// Per-channel dropout masks.
    pub missing_masks: BTreeMap<String, Vec<Vec<bool>>>,
}

/// Generates the weather layer.
pub fn generate(
    seed: u64,
    n_steps: usize,
    topology: &Topology,
    forcing: &SharedForcing,
    dropout_rate: f32,
) -> WeatherLayerData {
    let mut rng = SynthRng::new(seed);
    let n = topology.weather_stations.station_id.len();

    let baseline_offsets: Vec<f32> = (0..n).map(|_| rng.uniform(-1.5, 1.5)).collect();
    let corr = factor_correlation(&mut rng, n);
    let l = cholesky_with_jitter(&corr);
    let temp_noise = correlated_noise(&mut rng, n_steps, &l);
    let humidity_noise = correlated_noise(&mut rng, n_steps, &l);

    let mut temperature = Array2::zeros((n_steps, n));
    let mut humidity = Array2::zeros((n_steps, n));
    let mut precipitation = Array2::zeros((n_steps, n));
    let mut wind_speed = Array2::zeros((n_steps, n));
    let mut wind_direction = Array2::zeros((n_steps, n));
    let mut pressure = Array2::zeros((n_steps, n));
    let mut solar_radiation = Array2::zeros((n_steps, n));
    let mut et0 = Array2::zeros((n_steps, n));

    for t in 0..n_steps {
        let hours = t as f32 * 0.25;
        let day = hours / 24.0;
        let diurnal = (2.0 * PI * hours / 24.0 - 1.0).sin();
        // Daylight curve peaking at local noon.
        let daylight = (PI * ((hours % 24.0) - 6.0) / 12.0).sin().max(0.0);

        for s in 0..n {
            let temp = 19.0 + 8.0 * diurnal + baseline_offsets[s] + 0.8 * temp_noise[[t, s]];
            temperature[[t, s]] = temp;
            humidity[[t, s]] =
                (62.0 - 0.9 * (temp - 19.0) + 3.0 * humidity_noise[[t, s]]).clamp(5.0, 100.0);
            precipitation[[t, s]] = forcing.rain_mm[t];
            wind_speed[[t, s]] = (3.0
                + 2.0 * (2.0 * PI * hours / 24.0 + s as f32).sin()
                + 0.5 * temp_noise[[t, s]])
                .abs();
            wind_direction[[t, s]] = (180.0
                + 120.0 * (2.0 * PI * day / 5.0).sin()
                + 15.0 * humidity_noise[[t, s]])
                .rem_euclid(360.0);
            pressure[[t, s]] =
                1013.0 + 5.0 * (2.0 * PI * day / 7.0).sin() + 0.6 * temp_noise[[t, s]];
            let solar = 820.0 * daylight;
            solar_radiation[[t, s]] = solar;
            // Hargreaves-style proxy on the grid, radiation in MJ/m²/day.
            let radiation_mj = solar * 0.0864;
            et0[[t, s]] = (0.0023
                * (temp + 17.8)
                * (0.3 * temp.abs()).max(2.0).sqrt()
                * radiation_mj
                / 24.0)
                .max(0.0);
        }
    }

    let mut missing_masks = BTreeMap::new();
    let mut masked = |name: &str, matrix: &mut Array2<f32>| {
        let mask = dropout_mask(&mut rng, n_steps, n, dropout_rate);
        apply_mask(matrix, &mask);
        missing_masks.insert(name.to_string(), mask);
    };
    masked("temperature", &mut temperature);
    masked("humidity", &mut humidity);
    masked("precipitation", &mut precipitation);
    masked("wind_speed", &mut wind_speed);
    masked("wind_direction", &mut wind_direction);
    masked("pressure", &mut pressure);
    masked("solar_radiation", &mut solar_radiation);
    masked("et0", &mut et0);

    WeatherLayerData {
        station_ids: topology.weather_stations.station_id.clone(),
        temperature: to_rows(&temperature),
        humidity: to_rows(&humidity),
        precipitation: to_rows(&precipitation),
        wind_speed: to_rows(&wind_speed),
        wind_direction: to_rows(&wind_direction),
        pressure: to_rows(&pressure),
        solar_radiation: to_rows(&solar_radiation),
        et0: to_rows(&et0),
        missing_masks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrisense_graph::config::FarmType;

    fn sample() -> WeatherLayerData {
        let topology = Topology::for_farm_type(FarmType::OpenField);
        let forcing = SharedForcing::generate(10, 960);
        generate(11, 960, &topology, &forcing, 0.03)
    }

    #[test]
    fn test_shapes() {
        let weather = sample();
        assert_eq!(weather.temperature.len(), 960);
        assert_eq!(weather.temperature[0].len(), weather.station_ids.len());
        assert_eq!(weather.missing_masks.len(), 8);
    }

    #[test]
    fn test_temperature_and_humidity_anticorrelate() {
        let weather = sample();
        let mut pairs = Vec::new();
        for t in 0..960 {
            let temp = weather.temperature[t][0];
            let hum = weather.humidity[t][0];
            if temp.is_nan() || hum.is_nan() {
                continue;
            }
            pairs.push((temp, hum));
        }
        let n = pairs.len() as f32;
        let mean_t = pairs.iter().map(|p| p.0).sum::<f32>() / n;
        let mean_h = pairs.iter().map(|p| p.1).sum::<f32>() / n;
        let mut cov = 0.0;
        for (temp, hum) in &pairs {
            cov += (temp - mean_t) * (hum - mean_h);
        }
        assert!(cov < 0.0, "humidity must anti-correlate with temperature");
    }

    #[test]
    fn test_physical_bounds() {
        let weather = sample();
        for t in 0..960 {
            for s in 0..weather.station_ids.len() {
                let hum = weather.humidity[t][s];
                if !hum.is_nan() {
                    assert!((5.0..=100.0).contains(&hum));
                }
                let wind = weather.wind_speed[t][s];
                if !wind.is_nan() {
                    assert!(wind >= 0.0);
                }
                let dir = weather.wind_direction[t][s];
                if !dir.is_nan() {
                    assert!((0.0..360.0).contains(&dir));
                }
                let solar = weather.solar_radiation[t][s];
                if !solar.is_nan() {
                    assert!(solar >= 0.0);
                }
                let et0 = weather.et0[t][s];
                if !et0.is_nan() {
                    assert!(et0 >= 0.0);
                }
            }
        }
    }
}
