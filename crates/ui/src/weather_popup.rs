//! Weather popup: current conditions and the short forecast for a point.

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use monitor::weather::{ForecastEntry, PopupContent, PopupState, WeatherReading, WeatherPopup};

use crate::theme::{MUTED_TEXT, WARNING_TEXT};

const NOT_AVAILABLE: &str = "N/A";
const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Display strings for one popup.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupView {
    pub title: String,
    pub location: String,
    pub temperature: String,
    pub wind: String,
    /// (time, temperature, wind) per forecast slot.
    pub forecast: Vec<[String; 3]>,
    pub note: Option<String>,
}

pub fn format_temperature(celsius: f64) -> String {
    format!("{celsius:.1} °C")
}

pub fn format_wind(kmh: f64) -> String {
    format!("{kmh:.1} km/h")
}

/// `"Thu 15:00"` in UTC.
pub fn format_slot(timestamp: i64) -> String {
    let days = timestamp.div_euclid(86_400);
    let secs = timestamp.rem_euclid(86_400);
    // 1970-01-01 was a Thursday.
    let weekday = WEEKDAYS[(days + 4).rem_euclid(7) as usize];
    format!("{weekday} {:02}:{:02}", secs / 3600, secs % 3600 / 60)
}

fn forecast_row(entry: &ForecastEntry) -> [String; 3] {
    [
        format_slot(entry.timestamp),
        format_temperature(entry.temperature_c),
        format_wind(entry.wind_kmh),
    ]
}

pub fn popup_view(content: &PopupContent) -> PopupView {
    let location = format!("{:.4}, {:.4}", content.at.lat, content.at.lon);
    let (current, forecast, note): (Option<WeatherReading>, Vec<[String; 3]>, Option<String>) =
        match &content.state {
            PopupState::Loading => (None, Vec::new(), Some("Loading...".to_string())),
            PopupState::Ready(report) => (
                Some(report.current),
                report.forecast.iter().map(forecast_row).collect(),
                report
                    .forecast
                    .is_empty()
                    .then(|| "Forecast unavailable".to_string()),
            ),
            PopupState::Unavailable(reason) => (None, Vec::new(), Some(reason.clone())),
        };

    let (temperature, wind) = match current {
        Some(reading) => (
            format_temperature(reading.temperature_c),
            format_wind(reading.wind_kmh),
        ),
        None if matches!(content.state, PopupState::Loading) => ("...".into(), "...".into()),
        None => (NOT_AVAILABLE.into(), NOT_AVAILABLE.into()),
    };

    PopupView {
        title: format!("Weather: {}", content.label),
        location,
        temperature,
        wind,
        forecast,
        note,
    }
}

pub fn weather_popup_ui(mut contexts: EguiContexts, mut popup: ResMut<WeatherPopup>) {
    let Some(view) = popup.content.as_ref().map(popup_view) else {
        return;
    };

    let mut open = true;
    egui::Window::new(view.title.as_str())
        .id(egui::Id::new("weather_popup"))
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .default_width(260.0)
        .show(contexts.ctx_mut(), |ui| {
            ui.colored_label(MUTED_TEXT, view.location.as_str());
            ui.add_space(4.0);
            egui::Grid::new("weather_current").show(ui, |ui| {
                ui.label("Temperature");
                ui.label(view.temperature.as_str());
                ui.end_row();
                ui.label("Wind");
                ui.label(view.wind.as_str());
                ui.end_row();
            });

            if !view.forecast.is_empty() {
                ui.separator();
                ui.label(egui::RichText::new("Forecast (UTC)").strong());
                egui::Grid::new("weather_forecast")
                    .striped(true)
                    .show(ui, |ui| {
                        for [time, temperature, wind] in &view.forecast {
                            ui.label(time.as_str());
                            ui.label(temperature.as_str());
                            ui.label(wind.as_str());
                            ui.end_row();
                        }
                    });
            }

            if let Some(note) = &view.note {
                ui.add_space(4.0);
                ui.colored_label(WARNING_TEXT, note.as_str());
            }
        });

    if !open {
        popup.close();
    }
}
