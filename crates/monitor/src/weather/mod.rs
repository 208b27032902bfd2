//! Third-party weather: tile-layer selection and point lookups.
//!
//! The viewer never downloads tiles; a layer is only a URL template plus an
//! attribution handed to whatever draws the base map. Point lookups (current
//! conditions and a short forecast) fill the weather popup.

pub mod client;
pub mod systems;
mod tests_systems;
pub mod types;

pub use client::{OpenWeatherClient, WeatherFeed, WeatherSource};
pub use systems::{
    apply_layer_selection, collect_weather_results, dispatch_weather_requests, PendingWeather,
    PopupContent, PopupState, SelectWeatherLayer, WeatherLayerSelection, WeatherPopup,
    WeatherRequest,
};
pub use types::{
    ms_to_kmh, parse_current, parse_forecast, ForecastEntry, TileLayer, WeatherLayer,
    WeatherReading, WeatherReport,
};

use bevy::prelude::*;

use crate::config::MonitorConfig;

pub struct WeatherPlugin;

impl Plugin for WeatherPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<WeatherFeed>() {
            let api_key = app
                .world()
                .get_resource::<MonitorConfig>()
                .map(|c| c.weather_api_key.clone())
                .unwrap_or_default();
            if api_key.is_empty() {
                warn!("FAULTWATCH_WEATHER_KEY is not set; weather lookups will fail");
            }
            app.insert_resource(WeatherFeed::new(OpenWeatherClient::new(api_key)));
        }

        app.init_resource::<WeatherLayerSelection>()
            .init_resource::<WeatherPopup>()
            .init_resource::<PendingWeather>()
            .add_event::<SelectWeatherLayer>()
            .add_event::<WeatherRequest>()
            .add_systems(
                Update,
                (
                    apply_layer_selection,
                    dispatch_weather_requests,
                    collect_weather_results,
                )
                    .chain(),
            );
    }
}
