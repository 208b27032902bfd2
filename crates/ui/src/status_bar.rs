use std::time::Duration;

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use monitor::config::MonitorConfig;
use monitor::poller::{PollStats, ProbabilityPoller};
use monitor::weather::{TileLayer, WeatherLayerSelection};

use crate::theme::{MUTED_TEXT, WARNING_TEXT};

/// Poll counters for the status bar. `None` means polling never started.
pub fn poll_status_text(stats: Option<&PollStats>, cancelled: bool) -> String {
    let Some(stats) = stats else {
        return "Polling disabled".to_string();
    };
    if cancelled {
        return format!("Polling stopped ({} applied)", stats.applied);
    }
    let freshness = match stats.since_last_applied() {
        Some(age) => format!("Updated {} ago", format_age(age)),
        None => "Waiting for first update".to_string(),
    };
    format!(
        "{freshness} | {} sent, {} applied, {} failed",
        stats.sent, stats.applied, stats.failed
    )
}

fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

pub fn attribution_text(stack: &[TileLayer]) -> String {
    stack
        .iter()
        .map(|layer| layer.attribution)
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn status_bar_ui(
    mut contexts: EguiContexts,
    poller: Option<Res<ProbabilityPoller>>,
    selection: Res<WeatherLayerSelection>,
    config: Res<MonitorConfig>,
) {
    let status = poll_status_text(
        poller.as_ref().map(|p| &p.stats),
        poller.as_ref().is_some_and(|p| p.is_cancelled()),
    );
    let last_error = poller.as_ref().and_then(|p| p.stats.last_error.clone());
    let attribution = attribution_text(&selection.layer.tile_stack(&config.weather_api_key));

    egui::TopBottomPanel::bottom("status_bar")
        .exact_height(24.0)
        .show(contexts.ctx_mut(), |ui| {
            ui.horizontal_centered(|ui| {
                ui.label(status.as_str());
                if let Some(error) = &last_error {
                    ui.colored_label(WARNING_TEXT, "last poll failed")
                        .on_hover_text(error.as_str());
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.colored_label(MUTED_TEXT, attribution.as_str());
                });
            });
        });
}
