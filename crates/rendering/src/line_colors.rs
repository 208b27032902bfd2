//! Catalog colors as Bevy colors.

use bevy::prelude::*;

use monitor::blink::BlinkPhase;
use monitor::lines::LineColor;
use monitor::overlay::EffectiveColor;

pub fn line_color(color: LineColor) -> Color {
    let [r, g, b] = color.rgb();
    Color::srgb(r, g, b)
}

/// Color of a line right now.
pub fn overlay_color(effective: EffectiveColor, phase: BlinkPhase) -> Color {
    line_color(effective.at(phase))
}

/// Marker text is drawn slightly lighter than the line so it reads on top of it.
pub fn marker_color(effective: EffectiveColor, phase: BlinkPhase) -> Color {
    let line = overlay_color(effective, phase).to_srgba();
    Color::Srgba(line.mix(&Srgba::WHITE, 0.35))
}
