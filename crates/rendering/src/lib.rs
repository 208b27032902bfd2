use bevy::prelude::*;

use monitor::MonitorSet;

pub mod camera;
pub mod egui_input_guard;
pub mod line_colors;
pub mod line_render;
pub mod projection;

use camera::{CameraDrag, CameraFit, MapCamera};
use line_render::{ProjectedLines, RenderedOverlays};
use projection::MapProjection;

/// Everything drawn in the map scene: camera, line gizmos and markers.
pub struct RenderingPlugin;

impl Plugin for RenderingPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(Color::srgb(0.08, 0.09, 0.11)))
            .init_resource::<MapProjection>()
            .init_resource::<MapCamera>()
            .init_resource::<CameraDrag>()
            .init_resource::<CameraFit>()
            .init_resource::<ProjectedLines>()
            .init_resource::<RenderedOverlays>()
            .add_systems(Startup, camera::setup_camera)
            .add_systems(
                Update,
                (
                    camera::camera_keyboard,
                    camera::camera_drag,
                    camera::camera_zoom,
                    camera::fit_camera_to_geometry,
                    camera::apply_map_camera,
                )
                    .chain()
                    .after(MonitorSet::Derive),
            )
            .add_systems(
                Update,
                (
                    line_render::project_loaded_geometry,
                    line_render::sync_line_markers,
                    line_render::animate_markers,
                    line_render::draw_line_gizmos,
                )
                    .chain()
                    .after(MonitorSet::Derive),
            );
    }
}
