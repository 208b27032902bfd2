use bevy_egui::{egui, EguiContexts};

use monitor::lines::LineColor;

pub fn apply_viewer_theme(mut contexts: EguiContexts) {
    let ctx = contexts.ctx_mut();
    let mut style = (*ctx.style()).clone();

    // Cool slate panels so line colors stand out
    let panel = egui::Color32::from_rgb(28, 31, 38);
    let inactive = egui::Color32::from_rgb(44, 49, 60);
    let hover = egui::Color32::from_rgb(62, 72, 92);
    let active = egui::Color32::from_rgb(70, 140, 210);

    style.visuals.widgets.noninteractive.bg_fill = panel;
    style.visuals.widgets.inactive.bg_fill = inactive;
    style.visuals.widgets.hovered.bg_fill = hover;
    style.visuals.widgets.active.bg_fill = active;
    style.visuals.widgets.inactive.weak_bg_fill = inactive;
    style.visuals.widgets.hovered.weak_bg_fill = hover;
    style.visuals.widgets.active.weak_bg_fill = active;

    style.visuals.window_fill = panel;
    style.visuals.panel_fill = panel;
    style.visuals.extreme_bg_color = egui::Color32::from_rgb(22, 24, 30);
    style.visuals.faint_bg_color = egui::Color32::from_rgb(34, 37, 46);

    style.visuals.selection.bg_fill = active;
    style.visuals.selection.stroke = egui::Stroke::new(1.0, active);

    let window_rounding = egui::CornerRadius::same(6);
    let widget_rounding = egui::CornerRadius::same(4);
    style.visuals.window_corner_radius = window_rounding;
    style.visuals.widgets.noninteractive.corner_radius = widget_rounding;
    style.visuals.widgets.inactive.corner_radius = widget_rounding;
    style.visuals.widgets.hovered.corner_radius = widget_rounding;
    style.visuals.widgets.active.corner_radius = widget_rounding;

    ctx.set_style(style);
}

pub fn line_color32(color: LineColor) -> egui::Color32 {
    let [r, g, b] = color.rgb();
    egui::Color32::from_rgb(
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

pub const MUTED_TEXT: egui::Color32 = egui::Color32::from_rgb(150, 158, 172);
pub const WARNING_TEXT: egui::Color32 = egui::Color32::from_rgb(240, 170, 60);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_maps_to_full_channels() {
        assert_eq!(line_color32(LineColor::White), egui::Color32::from_rgb(255, 255, 255));
    }

    #[test]
    fn channels_are_rounded() {
        // Lime is [0.20, 0.95, 0.20]
        assert_eq!(line_color32(LineColor::Lime), egui::Color32::from_rgb(51, 242, 51));
    }
}
