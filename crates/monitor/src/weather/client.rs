use std::sync::Arc;

use bevy::prelude::*;

use crate::config::{HTTP_TIMEOUT, WEATHER_API_BASE};
use crate::error::FetchError;
use crate::geometry::GeoPoint;

use super::types::{parse_current, parse_forecast, ForecastEntry, WeatherReading};

/// Point weather lookups. Implemented over HTTP by [`OpenWeatherClient`].
pub trait WeatherSource: Send + Sync + 'static {
    fn current(&self, at: GeoPoint) -> Result<WeatherReading, FetchError>;
    fn forecast(&self, at: GeoPoint) -> Result<Vec<ForecastEntry>, FetchError>;
}

#[derive(Resource, Clone)]
pub struct WeatherFeed(pub Arc<dyn WeatherSource>);

impl WeatherFeed {
    pub fn new(source: impl WeatherSource) -> Self {
        Self(Arc::new(source))
    }
}

pub struct OpenWeatherClient {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, WEATHER_API_BASE.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {e}");
                reqwest::blocking::Client::new()
            });
        Self {
            client,
            api_key,
            base_url,
        }
    }

    /// `{base}/{resource}?lat=..&lon=..&appid=..&units=metric`
    pub fn url(&self, resource: &str, at: GeoPoint) -> String {
        format!(
            "{}/{}?lat={}&lon={}&appid={}&units=metric",
            self.base_url.trim_end_matches('/'),
            resource,
            at.lat,
            at.lon,
            self.api_key
        )
    }

    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text()?)
    }
}

impl WeatherSource for OpenWeatherClient {
    fn current(&self, at: GeoPoint) -> Result<WeatherReading, FetchError> {
        let body = self.get_text(&self.url("weather", at))?;
        parse_current(&body)
    }

    fn forecast(&self, at: GeoPoint) -> Result<Vec<ForecastEntry>, FetchError> {
        let body = self.get_text(&self.url("forecast", at))?;
        parse_forecast(&body)
    }
}
