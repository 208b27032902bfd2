//! Keeps map input from reacting to clicks and scrolls meant for egui panels.

use bevy_egui::EguiContexts;

/// `true` when the cursor is over an egui area or egui is handling a drag.
/// Without an egui context (headless) nothing is guarded.
#[inline]
pub fn egui_wants_pointer(contexts: &mut EguiContexts) -> bool {
    contexts
        .try_ctx_mut()
        .is_some_and(|ctx| ctx.wants_pointer_input() || ctx.is_pointer_over_area())
}
