use std::time::Duration;

use bevy::prelude::*;

use crate::error::ConfigError;

/// Default period between two probability polls.
pub const POLL_INTERVAL_MS: u64 = 5000;

/// Probability endpoint used when `FAULTWATCH_ENDPOINT` is not set.
pub const PROBABILITY_ENDPOINT: &str = "http://localhost:8000/probabilities";

/// Probability strictly above this value makes a line blink.
pub const BLINK_THRESHOLD: f64 = 0.7;

/// Half period of the blink animation (time spent in each color).
pub const BLINK_HALF_PERIOD_MS: u64 = 500;

/// Map center (latitude, longitude), Valparaíso region.
pub const MAP_CENTER: (f64, f64) = (-33.0257, -71.5510);
pub const MAP_ZOOM: u8 = 13;

/// Per-request timeout for the probability and weather endpoints.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(4);

pub const WEATHER_API_BASE: &str = "https://api.openweathermap.org/data/2.5";
pub const WEATHER_TILE_BASE: &str = "https://tile.openweathermap.org/map";
pub const BASE_TILE_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const BASE_TILE_ATTRIBUTION: &str = "© OpenStreetMap contributors";
pub const WEATHER_TILE_ATTRIBUTION: &str = "© OpenWeatherMap";

/// Maximum number of forecast rows kept from the 3-hourly forecast feed.
pub const FORECAST_ENTRIES: usize = 8;

/// Runtime configuration for the viewer.
///
/// `Default` reads environment overrides so the binary can be pointed at a
/// different backend without a rebuild.
#[derive(Resource, Debug, Clone)]
pub struct MonitorConfig {
    pub endpoint: String,
    pub poll_interval: Duration,
    pub weather_api_key: String,
    /// Optional JSON manifest replacing the built-in line catalog.
    pub lines_manifest: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let endpoint = std::env::var("FAULTWATCH_ENDPOINT")
            .unwrap_or_else(|_| PROBABILITY_ENDPOINT.to_string());
        let poll_ms = std::env::var("FAULTWATCH_POLL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(POLL_INTERVAL_MS);
        let weather_api_key = std::env::var("FAULTWATCH_WEATHER_KEY").unwrap_or_default();
        let lines_manifest = std::env::var("FAULTWATCH_LINES").ok();

        Self {
            endpoint,
            poll_interval: Duration::from_millis(poll_ms),
            weather_api_key,
            lines_manifest,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_polling(&self.endpoint, self.poll_interval)
    }
}

/// Checks the arguments accepted by `start_polling`.
pub fn validate_polling(endpoint: &str, interval: Duration) -> Result<(), ConfigError> {
    if endpoint.trim().is_empty() {
        return Err(ConfigError::EmptyEndpoint);
    }
    if interval.is_zero() {
        return Err(ConfigError::ZeroInterval);
    }
    Ok(())
}
