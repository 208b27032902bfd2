use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy_egui::EguiContexts;

use monitor::geometry::{GeometryLoaded, GeometryStore};

use crate::egui_input_guard::egui_wants_pointer;
use crate::projection::MapProjection;

/// Screen pixels per second at scale 1.
const PAN_SPEED: f32 = 600.0;
const ZOOM_SPEED: f32 = 0.15;
const MIN_SCALE: f32 = 0.05;
const MAX_SCALE: f32 = 64.0;
/// Margin kept around fitted geometry, as a fraction of its size.
const FIT_PADDING: f32 = 0.1;
const FALLBACK_VIEWPORT: Vec2 = Vec2::new(1280.0, 720.0);

/// Top-down map camera: world point in the middle of the screen and world
/// units per screen pixel.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct MapCamera {
    pub center: Vec2,
    pub scale: f32,
}

impl Default for MapCamera {
    fn default() -> Self {
        // The projection origin is the configured map center.
        Self {
            center: Vec2::ZERO,
            scale: 1.0,
        }
    }
}

impl MapCamera {
    pub fn zoom_by(&mut self, factor: f32) {
        self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
    }
}

#[derive(Resource, Default)]
pub struct CameraDrag {
    pub dragging: bool,
    pub last_pos: Vec2,
}

/// Set once the view has been fitted to the loaded geometry.
#[derive(Resource, Default)]
pub struct CameraFit {
    pub done: bool,
}

pub fn setup_camera(mut commands: Commands, camera: Res<MapCamera>) {
    commands.spawn((
        Camera2d,
        Transform::from_translation(camera.center.extend(0.0)),
    ));
}

/// Center and scale that show `rect` inside `viewport` (both in world/screen units).
pub fn fit_view(rect: Rect, viewport: Vec2) -> (Vec2, f32) {
    let padded = rect.size() * (1.0 + 2.0 * FIT_PADDING);
    let scale = (padded.x / viewport.x.max(1.0)).max(padded.y / viewport.y.max(1.0));
    (rect.center(), scale.clamp(MIN_SCALE, MAX_SCALE))
}

/// Fit the view to every ready geometry when the first one arrives.
pub fn fit_camera_to_geometry(
    mut loaded: EventReader<GeometryLoaded>,
    store: Res<GeometryStore>,
    projection: Res<MapProjection>,
    windows: Query<&Window>,
    mut fit: ResMut<CameraFit>,
    mut camera: ResMut<MapCamera>,
) {
    if loaded.read().count() == 0 || fit.done {
        return;
    }
    let Some(bounds) = store.bounds() else {
        return;
    };
    let viewport = windows
        .get_single()
        .map(|w| Vec2::new(w.width(), w.height()))
        .unwrap_or(FALLBACK_VIEWPORT);
    let (center, scale) = fit_view(projection.project_bounds(&bounds), viewport);
    camera.center = center;
    camera.scale = scale;
    fit.done = true;
    debug!("Camera fitted to geometry: center {center}, scale {scale:.3}");
}

/// System: apply `MapCamera` to the camera entity.
pub fn apply_map_camera(
    camera: Res<MapCamera>,
    mut query: Query<(&mut Transform, &mut OrthographicProjection), With<Camera2d>>,
) {
    if !camera.is_changed() {
        return;
    }
    let Ok((mut transform, mut ortho)) = query.get_single_mut() else {
        return;
    };
    transform.translation.x = camera.center.x;
    transform.translation.y = camera.center.y;
    ortho.scale = camera.scale;
}

/// WASD/Arrow keys: pan. Q/E or +/-: zoom.
pub fn camera_keyboard(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut camera: ResMut<MapCamera>,
) {
    let mut dir = Vec2::ZERO;
    if keys.pressed(KeyCode::KeyW) || keys.pressed(KeyCode::ArrowUp) {
        dir.y += 1.0;
    }
    if keys.pressed(KeyCode::KeyS) || keys.pressed(KeyCode::ArrowDown) {
        dir.y -= 1.0;
    }
    if keys.pressed(KeyCode::KeyA) || keys.pressed(KeyCode::ArrowLeft) {
        dir.x -= 1.0;
    }
    if keys.pressed(KeyCode::KeyD) || keys.pressed(KeyCode::ArrowRight) {
        dir.x += 1.0;
    }
    if dir != Vec2::ZERO {
        let step = PAN_SPEED * camera.scale * time.delta_secs();
        camera.center += dir.normalize() * step;
    }

    let zoom_in = keys.pressed(KeyCode::KeyE) || keys.pressed(KeyCode::Equal);
    let zoom_out = keys.pressed(KeyCode::KeyQ) || keys.pressed(KeyCode::Minus);
    if zoom_in != zoom_out {
        let rate = if zoom_in { -1.0 } else { 1.0 };
        camera.zoom_by(1.0 + rate * ZOOM_SPEED * 4.0 * time.delta_secs());
    }
}

/// Left or middle mouse drag: pan.
pub fn camera_drag(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window>,
    mut contexts: EguiContexts,
    mut drag: ResMut<CameraDrag>,
    mut camera: ResMut<MapCamera>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    let pressed = [MouseButton::Left, MouseButton::Middle];

    if buttons.any_just_pressed(pressed) && !egui_wants_pointer(&mut contexts) {
        if let Some(pos) = window.cursor_position() {
            drag.dragging = true;
            drag.last_pos = pos;
        }
    }
    if !buttons.any_pressed(pressed) {
        drag.dragging = false;
    }

    if drag.dragging {
        if let Some(pos) = window.cursor_position() {
            let delta = pos - drag.last_pos;
            // Screen y grows downwards, world y upwards.
            camera.center += Vec2::new(-delta.x, delta.y) * camera.scale;
            drag.last_pos = pos;
        }
    }
}

/// Scroll wheel: zoom.
pub fn camera_zoom(
    mut scroll_evts: EventReader<MouseWheel>,
    mut contexts: EguiContexts,
    mut camera: ResMut<MapCamera>,
) {
    if egui_wants_pointer(&mut contexts) {
        scroll_evts.clear();
        return;
    }
    for evt in scroll_evts.read() {
        let dy = match evt.unit {
            MouseScrollUnit::Line => evt.y,
            MouseScrollUnit::Pixel => evt.y / 100.0,
        };
        camera.zoom_by(1.0 - dy * ZOOM_SPEED);
    }
}
