//! Line overlays in the scene.
//!
//! `RenderedOverlays` remembers the overlay state that is currently on
//! screen. Each frame the desired state (visible lines whose geometry is
//! ready) is diffed against it and only the changes touch entities. Paths
//! are drawn with gizmos every frame in the current blink color.

use std::collections::BTreeMap;

use bevy::prelude::*;

use monitor::blink::{BlinkClock, BlinkPhase};
use monitor::geometry::{GeometryLoaded, GeometryStore};
use monitor::lines::LineKey;
use monitor::overlay::{EffectiveColor, LineOverlay, OverlayChange, OverlayState};

use crate::line_colors::{marker_color, overlay_color};
use crate::projection::MapProjection;

const MARKER_FONT_SIZE: f32 = 14.0;
/// Markers sit above the line gizmos.
const MARKER_Z: f32 = 10.0;

/// Probability label entity for one line.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct LineMarker {
    pub key: LineKey,
    pub effective_color: EffectiveColor,
}

/// Projected paths per line, filled as geometry loads finish.
#[derive(Resource, Default)]
pub struct ProjectedLines {
    paths: BTreeMap<LineKey, Vec<Vec<Vec2>>>,
    anchors: BTreeMap<LineKey, Vec2>,
}

impl ProjectedLines {
    pub fn paths(&self, key: &LineKey) -> Option<&[Vec<Vec2>]> {
        self.paths.get(key).map(Vec::as_slice)
    }

    pub fn anchor(&self, key: &LineKey) -> Option<Vec2> {
        self.anchors.get(key).copied()
    }

    pub fn contains(&self, key: &LineKey) -> bool {
        self.paths.contains_key(key)
    }
}

/// What is on screen right now, and the marker entity per line.
#[derive(Resource, Default)]
pub struct RenderedOverlays {
    state: OverlayState,
    markers: BTreeMap<LineKey, Entity>,
}

impl RenderedOverlays {
    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn marker(&self, key: &LineKey) -> Option<Entity> {
        self.markers.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

pub fn project_loaded_geometry(
    mut loaded: EventReader<GeometryLoaded>,
    store: Res<GeometryStore>,
    projection: Res<MapProjection>,
    mut projected: ResMut<ProjectedLines>,
) {
    for GeometryLoaded { key } in loaded.read() {
        let Some(geometry) = store.ready(key) else {
            continue;
        };
        let paths = geometry
            .paths
            .iter()
            .map(|path| projection.project_path(path))
            .filter(|path| path.len() >= 2)
            .collect();
        projected.paths.insert(key.clone(), paths);
        if let Some(anchor) = geometry.label_anchor() {
            projected.anchors.insert(key.clone(), projection.project(anchor));
        }
    }
}

/// Overlay entries that can actually be drawn.
fn drawable_state(overlay: &OverlayState, projected: &ProjectedLines) -> OverlayState {
    overlay.filtered(|key, _| projected.contains(key))
}

fn spawn_marker(
    commands: &mut Commands,
    key: &LineKey,
    overlay: &LineOverlay,
    at: Vec2,
    phase: BlinkPhase,
) -> Entity {
    commands
        .spawn((
            LineMarker {
                key: key.clone(),
                effective_color: overlay.effective_color,
            },
            Text2d::new(overlay.marker_label.clone()),
            TextFont {
                font_size: MARKER_FONT_SIZE,
                ..default()
            },
            TextColor(marker_color(overlay.effective_color, phase)),
            Transform::from_translation(at.extend(MARKER_Z)),
        ))
        .id()
}

/// Apply the overlay diff to marker entities.
pub fn sync_line_markers(
    mut commands: Commands,
    overlay: Res<OverlayState>,
    projected: Res<ProjectedLines>,
    clock: Res<BlinkClock>,
    mut rendered: ResMut<RenderedOverlays>,
    mut markers: Query<(&mut LineMarker, &mut Text2d)>,
) {
    if !(overlay.is_changed() || projected.is_changed()) {
        return;
    }
    let desired = drawable_state(&overlay, &projected);
    let changes = rendered.state.diff(&desired);
    if changes.is_empty() {
        return;
    }

    for change in changes {
        match change {
            OverlayChange::Added(key, line) => {
                let at = projected.anchor(&key).unwrap_or_default();
                let entity = spawn_marker(&mut commands, &key, &line, at, clock.phase());
                rendered.markers.insert(key, entity);
            }
            OverlayChange::Updated(key, line) => {
                let Some(entity) = rendered.markers.get(&key).copied() else {
                    continue;
                };
                if let Ok((mut marker, mut text)) = markers.get_mut(entity) {
                    marker.effective_color = line.effective_color;
                    text.0.clone_from(&line.marker_label);
                }
            }
            OverlayChange::Removed(key) => {
                if let Some(entity) = rendered.markers.remove(&key) {
                    commands.entity(entity).despawn_recursive();
                }
            }
        }
    }
    rendered.state = desired;
}

/// Recolor markers to the current blink phase.
pub fn animate_markers(clock: Res<BlinkClock>, mut markers: Query<(&LineMarker, &mut TextColor)>) {
    let phase = clock.phase();
    for (marker, mut color) in &mut markers {
        let wanted = marker_color(marker.effective_color, phase);
        if color.0 != wanted {
            color.0 = wanted;
        }
    }
}

pub fn draw_line_gizmos(
    mut gizmos: Gizmos,
    rendered: Res<RenderedOverlays>,
    projected: Res<ProjectedLines>,
    clock: Res<BlinkClock>,
) {
    let phase = clock.phase();
    for (key, line) in rendered.state.iter() {
        let Some(paths) = projected.paths(key) else {
            continue;
        };
        let color = overlay_color(line.effective_color, phase);
        for path in paths {
            gizmos.linestrip_2d(path.iter().copied(), color);
        }
    }
}
