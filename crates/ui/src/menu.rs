//! Top menu: map style buttons, group toggles and a weather lookup for the
//! center of the view.

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use monitor::lines::LineCatalog;
use monitor::overlay::{GroupVisibility, SetGroupVisibility};
use monitor::weather::{SelectWeatherLayer, WeatherLayer, WeatherLayerSelection, WeatherRequest};

use rendering::camera::MapCamera;
use rendering::projection::MapProjection;

use crate::theme::MUTED_TEXT;

#[allow(clippy::too_many_arguments)]
pub fn menu_bar_ui(
    mut contexts: EguiContexts,
    catalog: Option<Res<LineCatalog>>,
    visibility: Res<GroupVisibility>,
    selection: Res<WeatherLayerSelection>,
    camera: Res<MapCamera>,
    projection: Res<MapProjection>,
    mut layer_events: EventWriter<SelectWeatherLayer>,
    mut visibility_events: EventWriter<SetGroupVisibility>,
    mut weather_requests: EventWriter<WeatherRequest>,
) {
    egui::TopBottomPanel::top("menu_bar")
        .exact_height(34.0)
        .show(contexts.ctx_mut(), |ui| {
            ui.horizontal_centered(|ui| {
                ui.spacing_mut().item_spacing.x = 10.0;
                ui.label(egui::RichText::new("Faultwatch").strong());
                ui.separator();

                for layer in WeatherLayer::ALL {
                    if ui
                        .selectable_label(selection.layer == layer, layer.label())
                        .clicked()
                    {
                        layer_events.send(SelectWeatherLayer(layer));
                    }
                }

                ui.separator();

                match &catalog {
                    Some(catalog) => {
                        for group in catalog.groups() {
                            let mut visible = visibility.is_visible(group);
                            if ui.checkbox(&mut visible, group.key()).changed() {
                                visibility_events.send(SetGroupVisibility { group, visible });
                            }
                        }
                    }
                    None => {
                        ui.colored_label(MUTED_TEXT, "Loading lines...");
                    }
                }

                ui.separator();

                if ui.button("Weather here").clicked() {
                    weather_requests.send(WeatherRequest {
                        label: "Map center".to_string(),
                        at: projection.unproject(camera.center),
                    });
                }
            });
        });
}
