use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use monitor::blink::BlinkClock;
use monitor::geometry::{GeoPoint, GeometryStatus, GeometryStore};
use monitor::lines::{LineCatalog, LineGroup, LineKey};
use monitor::overlay::{EffectiveColor, OverlayState};
use monitor::weather::WeatherRequest;

use crate::theme::{line_color32, MUTED_TEXT, WARNING_TEXT};

/// One entry of the line list.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRow {
    pub key: LineKey,
    pub name: String,
    /// `None` while the line's group is hidden.
    pub effective_color: Option<EffectiveColor>,
    pub label: Option<String>,
    pub blinking: bool,
    pub geometry_failed: bool,
    /// Where a weather lookup for this line points; needs loaded geometry.
    pub weather_at: Option<GeoPoint>,
}

pub fn line_rows(
    catalog: &LineCatalog,
    overlay: &OverlayState,
    geometry: &GeometryStore,
) -> Vec<(LineGroup, Vec<LineRow>)> {
    catalog
        .groups()
        .into_iter()
        .map(|group| {
            let rows = catalog
                .in_group(group)
                .map(|line| {
                    let entry = overlay.get(&line.key);
                    LineRow {
                        key: line.key.clone(),
                        name: line.display_name.clone(),
                        effective_color: entry.map(|o| o.effective_color),
                        label: entry.map(|o| o.marker_label.clone()),
                        blinking: entry.is_some_and(|o| o.is_blinking),
                        geometry_failed: matches!(
                            geometry.status(&line.key),
                            Some(GeometryStatus::Failed(_))
                        ),
                        weather_at: geometry
                            .ready(&line.key)
                            .and_then(|g| g.bounds())
                            .map(|b| b.center()),
                    }
                })
                .collect();
            (group, rows)
        })
        .collect()
}

pub fn line_panel_ui(
    mut contexts: EguiContexts,
    catalog: Option<Res<LineCatalog>>,
    overlay: Res<OverlayState>,
    geometry: Res<GeometryStore>,
    clock: Res<BlinkClock>,
    mut weather_requests: EventWriter<WeatherRequest>,
) {
    let Some(catalog) = catalog else {
        return;
    };
    let groups = line_rows(&catalog, &overlay, &geometry);
    let phase = clock.phase();

    egui::SidePanel::left("line_panel")
        .default_width(260.0)
        .resizable(true)
        .show(contexts.ctx_mut(), |ui| {
            ui.heading("Lines");
            egui::ScrollArea::vertical().show(ui, |ui| {
                for (group, rows) in &groups {
                    ui.add_space(6.0);
                    ui.label(egui::RichText::new(group.key()).strong());
                    for row in rows {
                        ui.horizontal(|ui| {
                            match row.effective_color {
                                Some(color) => {
                                    ui.colored_label(line_color32(color.at(phase)), "■");
                                }
                                None => {
                                    ui.colored_label(MUTED_TEXT, "□");
                                }
                            }
                            ui.label(row.name.as_str());
                            match &row.label {
                                Some(label) if row.blinking => {
                                    ui.colored_label(WARNING_TEXT, format!("{label} !"));
                                }
                                Some(label) => {
                                    ui.label(label.as_str());
                                }
                                None => {
                                    ui.colored_label(MUTED_TEXT, "hidden");
                                }
                            }
                            if row.geometry_failed {
                                ui.colored_label(MUTED_TEXT, "(no geometry)")
                                    .on_hover_text("Geometry file could not be loaded");
                            }
                            if let Some(at) = row.weather_at {
                                if ui.small_button("Weather").clicked() {
                                    weather_requests.send(WeatherRequest {
                                        label: row.name.clone(),
                                        at,
                                    });
                                }
                            }
                        });
                    }
                }
            });
        });
}
