use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::render::view::screenshot::{save_to_disk, Screenshot};
use bevy::window::PresentMode;
use bevy::winit::{UpdateMode, WinitSettings};

/// Frames to wait before a capture so geometry and the first poll can land.
const SCREENSHOT_WARMUP_FRAMES: u32 = 360;
const SCREENSHOT_EXIT_DELAY: u32 = 20;

fn main() {
    let mut app = App::new();

    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Faultwatch".to_string(),
                    resolution: (1280.0, 720.0).into(),
                    present_mode: PresentMode::AutoVsync,
                    ..default()
                }),
                ..default()
            })
            .set(LogPlugin {
                filter: "info,monitor=debug,wgpu=error,naga=warn".to_string(),
                ..default()
            }),
    )
    // The blink animation needs steady frames even without input.
    .insert_resource(WinitSettings {
        focused_mode: UpdateMode::reactive_low_power(std::time::Duration::from_millis(16)),
        unfocused_mode: UpdateMode::reactive_low_power(std::time::Duration::from_millis(100)),
    })
    .add_plugins((
        monitor::MonitorPlugin,
        rendering::RenderingPlugin,
        ui::UiPlugin,
    ));

    // Screenshot mode: capture one frame to the given path and exit
    if let Ok(path) = std::env::var("FAULTWATCH_SCREENSHOT") {
        app.insert_resource(ScreenshotRequest { frame: 0, path, taken: false });
        app.add_systems(Update, drive_screenshot);
    }

    app.run();
}

#[derive(Resource)]
struct ScreenshotRequest {
    frame: u32,
    path: String,
    taken: bool,
}

fn drive_screenshot(
    mut commands: Commands,
    mut request: ResMut<ScreenshotRequest>,
    mut exit: EventWriter<AppExit>,
) {
    request.frame += 1;
    if request.frame < SCREENSHOT_WARMUP_FRAMES {
        return;
    }
    if !request.taken {
        info!("Saving screenshot to {}", request.path);
        commands
            .spawn(Screenshot::primary_window())
            .observe(save_to_disk(request.path.clone()));
        request.taken = true;
        return;
    }
    // Wait a few frames for the save, then exit (which also stops polling)
    if request.frame > SCREENSHOT_WARMUP_FRAMES + SCREENSHOT_EXIT_DELAY {
        exit.send(AppExit::Success);
    }
}
