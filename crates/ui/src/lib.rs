use bevy::prelude::*;
use bevy_egui::EguiPlugin;

use monitor::MonitorSet;

pub mod line_panel;
pub mod menu;
pub mod status_bar;
pub mod theme;
pub mod weather_popup;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin)
            .add_systems(Startup, theme::apply_viewer_theme)
            .add_systems(
                Update,
                // Panels claim screen space in this order: top, bottom, left, then windows.
                (
                    menu::menu_bar_ui,
                    status_bar::status_bar_ui,
                    line_panel::line_panel_ui,
                    weather_popup::weather_popup_ui,
                )
                    .chain()
                    .after(MonitorSet::Derive),
            );
    }
}
