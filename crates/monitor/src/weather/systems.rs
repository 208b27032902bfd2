use std::sync::Arc;

use bevy::prelude::*;
use bevy::tasks::{block_on, IoTaskPool, Task};

use crate::error::FetchError;
use crate::geometry::GeoPoint;

use super::client::WeatherFeed;
use super::types::{WeatherLayer, WeatherReport};

// ---------------------------------------------------------------------------
// Layer selection
// ---------------------------------------------------------------------------

#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WeatherLayerSelection {
    pub layer: WeatherLayer,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectWeatherLayer(pub WeatherLayer);

pub fn apply_layer_selection(
    mut requests: EventReader<SelectWeatherLayer>,
    mut selection: ResMut<WeatherLayerSelection>,
) {
    let Some(SelectWeatherLayer(layer)) = requests.read().last().copied() else {
        return;
    };
    if selection.layer != layer {
        selection.layer = layer;
        info!("Weather layer set to {}", layer.label());
    }
}

// ---------------------------------------------------------------------------
// Popup lookups
// ---------------------------------------------------------------------------

/// Ask for the weather at a point; the result lands in [`WeatherPopup`].
#[derive(Event, Debug, Clone, PartialEq)]
pub struct WeatherRequest {
    pub label: String,
    pub at: GeoPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PopupState {
    Loading,
    Ready(WeatherReport),
    /// Lookup failed; the popup shows N/A values.
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    pub label: String,
    pub at: GeoPoint,
    pub state: PopupState,
}

#[derive(Resource, Debug, Default)]
pub struct WeatherPopup {
    pub content: Option<PopupContent>,
}

impl WeatherPopup {
    pub fn close(&mut self) {
        self.content = None;
    }
}

/// Only the newest lookup is kept; issuing another drops the previous task.
#[derive(Resource, Default)]
pub struct PendingWeather(Option<Task<Result<WeatherReport, FetchError>>>);

impl PendingWeather {
    pub fn is_pending(&self) -> bool {
        self.0.is_some()
    }
}

pub fn dispatch_weather_requests(
    mut requests: EventReader<WeatherRequest>,
    feed: Res<WeatherFeed>,
    mut pending: ResMut<PendingWeather>,
    mut popup: ResMut<WeatherPopup>,
) {
    let Some(request) = requests.read().last().cloned() else {
        return;
    };

    let source = Arc::clone(&feed.0);
    let at = request.at;
    let task = IoTaskPool::get().spawn(async move {
        let current = source.current(at)?;
        // The forecast is optional: a failure only empties the table.
        let forecast = source.forecast(at).unwrap_or_else(|e| {
            warn!("Forecast lookup failed at ({}, {}): {e}", at.lat, at.lon);
            Vec::new()
        });
        Ok::<_, FetchError>(WeatherReport { current, forecast })
    });

    debug!("Weather lookup for '{}' at ({}, {})", request.label, at.lat, at.lon);
    pending.0 = Some(task);
    popup.content = Some(PopupContent {
        label: request.label,
        at,
        state: PopupState::Loading,
    });
}

pub fn collect_weather_results(
    mut pending: ResMut<PendingWeather>,
    mut popup: ResMut<WeatherPopup>,
) {
    let Some(task) = pending.0.as_mut() else {
        return;
    };
    let Some(result) = block_on(futures_lite::future::poll_once(task)) else {
        return;
    };
    pending.0 = None;

    let Some(content) = popup.content.as_mut() else {
        // Popup was closed while the lookup was running.
        return;
    };
    content.state = match result {
        Ok(report) => PopupState::Ready(report),
        Err(e) => {
            error!("Weather lookup for '{}' failed: {e}", content.label);
            PopupState::Unavailable(e.to_string())
        }
    };
}
