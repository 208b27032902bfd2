use serde::Deserialize;

use crate::config::{
    BASE_TILE_ATTRIBUTION, BASE_TILE_TEMPLATE, FORECAST_ENTRIES, WEATHER_TILE_ATTRIBUTION,
    WEATHER_TILE_BASE,
};
use crate::error::FetchError;

// ---------------------------------------------------------------------------
// Tile layers
// ---------------------------------------------------------------------------

/// Map style chosen in the menu. `Normal` is the base map alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeatherLayer {
    #[default]
    Normal,
    Temperature,
    Wind,
}

impl WeatherLayer {
    pub const ALL: [WeatherLayer; 3] = [
        WeatherLayer::Normal,
        WeatherLayer::Temperature,
        WeatherLayer::Wind,
    ];

    pub fn label(self) -> &'static str {
        match self {
            WeatherLayer::Normal => "Normal",
            WeatherLayer::Temperature => "Temperature",
            WeatherLayer::Wind => "Wind",
        }
    }

    fn tile_slug(self) -> Option<&'static str> {
        match self {
            WeatherLayer::Normal => None,
            WeatherLayer::Temperature => Some("temp_new"),
            WeatherLayer::Wind => Some("wind_new"),
        }
    }

    /// Tile layer drawn on top of the base map, if any.
    pub fn overlay_tiles(self, api_key: &str) -> Option<TileLayer> {
        let slug = self.tile_slug()?;
        Some(TileLayer {
            template: format!("{WEATHER_TILE_BASE}/{slug}/{{z}}/{{x}}/{{y}}.png?appid={api_key}"),
            attribution: WEATHER_TILE_ATTRIBUTION,
        })
    }

    /// Base map first, then at most one weather layer.
    pub fn tile_stack(self, api_key: &str) -> Vec<TileLayer> {
        let mut stack = vec![TileLayer::base()];
        stack.extend(self.overlay_tiles(api_key));
        stack
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayer {
    pub template: String,
    pub attribution: &'static str,
}

impl TileLayer {
    pub fn base() -> Self {
        Self {
            template: BASE_TILE_TEMPLATE.to_string(),
            attribution: BASE_TILE_ATTRIBUTION,
        }
    }
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

pub fn ms_to_kmh(speed_ms: f64) -> f64 {
    speed_ms * 3.6
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherReading {
    pub temperature_c: f64,
    pub wind_kmh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastEntry {
    /// Unix timestamp (seconds) of the forecast slot.
    pub timestamp: i64,
    pub temperature_c: f64,
    pub wind_kmh: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub current: WeatherReading,
    pub forecast: Vec<ForecastEntry>,
}

// OpenWeatherMap payloads, metric units.

#[derive(Deserialize)]
struct OwmMain {
    temp: f64,
}

#[derive(Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Deserialize)]
struct OwmCurrent {
    main: OwmMain,
    wind: OwmWind,
}

#[derive(Deserialize)]
struct OwmForecastItem {
    dt: i64,
    main: OwmMain,
    wind: OwmWind,
}

#[derive(Deserialize)]
struct OwmForecast {
    list: Vec<OwmForecastItem>,
}

pub fn parse_current(json: &str) -> Result<WeatherReading, FetchError> {
    let current: OwmCurrent = serde_json::from_str(json)?;
    Ok(WeatherReading {
        temperature_c: current.main.temp,
        wind_kmh: ms_to_kmh(current.wind.speed),
    })
}

/// The first `FORECAST_ENTRIES` slots of a 3-hourly forecast.
pub fn parse_forecast(json: &str) -> Result<Vec<ForecastEntry>, FetchError> {
    let forecast: OwmForecast = serde_json::from_str(json)?;
    Ok(forecast
        .list
        .into_iter()
        .take(FORECAST_ENTRIES)
        .map(|item| ForecastEntry {
            timestamp: item.dt,
            temperature_c: item.main.temp,
            wind_kmh: ms_to_kmh(item.wind.speed),
        })
        .collect())
}
