use std::sync::Arc;

use bevy::prelude::*;

pub mod blink;
pub mod config;
pub mod error;
pub mod geometry;
pub mod lines;
pub mod overlay;
pub mod poller;
pub mod probability;
pub mod weather;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

use blink::BlinkClock;
use config::MonitorConfig;
use geometry::{GeometryFailed, GeometryLoaded, GeometryStore, PendingGeometryLoads};
use lines::LineCatalog;
use overlay::{GroupVisibility, OverlayState, SetGroupVisibility};
use poller::{HttpProbabilitySource, ProbabilityFeed};
use probability::ProbabilityStore;

/// Frame ordering for the monitor systems.
///
/// `Ingest` applies everything that arrived this frame (poll results,
/// visibility requests, geometry loads); `Derive` recomputes the overlay
/// state from it. Renderers run after `Derive`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum MonitorSet {
    Ingest,
    Derive,
}

pub struct MonitorPlugin;

impl Plugin for MonitorPlugin {
    fn build(&self, app: &mut App) {
        // A feed inserted before the plugin (tests, alternate backends) wins.
        if !app.world().contains_resource::<ProbabilityFeed>() {
            app.insert_resource(ProbabilityFeed(Arc::new(HttpProbabilitySource::new())));
        }

        app.init_resource::<MonitorConfig>()
            .init_resource::<ProbabilityStore>()
            .init_resource::<GroupVisibility>()
            .init_resource::<OverlayState>()
            .init_resource::<BlinkClock>()
            .init_resource::<GeometryStore>()
            .init_resource::<PendingGeometryLoads>()
            .add_event::<SetGroupVisibility>()
            .add_event::<GeometryLoaded>()
            .add_event::<GeometryFailed>()
            .configure_sets(Update, (MonitorSet::Ingest, MonitorSet::Derive).chain())
            .add_systems(
                Startup,
                (load_line_catalog, poller::start_configured_polling).chain(),
            )
            .add_systems(
                Update,
                (
                    (
                        poller::dispatch_probability_polls,
                        poller::collect_probability_polls,
                    )
                        .chain(),
                    overlay::apply_visibility_requests,
                    (
                        geometry::begin_geometry_loads,
                        geometry::collect_geometry_loads,
                    )
                        .chain(),
                )
                    .in_set(MonitorSet::Ingest),
            )
            .add_systems(
                Update,
                (overlay::refresh_overlay_state, blink::tick_blink_clock)
                    .chain()
                    .in_set(MonitorSet::Derive),
            )
            .add_systems(Last, poller::cancel_polling_on_exit);

        app.add_plugins(weather::WeatherPlugin);
    }
}

/// Startup: install the line catalog unless one was inserted up front.
///
/// A broken manifest is logged and replaced by the built-in catalog.
fn load_line_catalog(
    mut commands: Commands,
    config: Res<MonitorConfig>,
    existing: Option<Res<LineCatalog>>,
) {
    if existing.is_some() {
        return;
    }
    let catalog = match &config.lines_manifest {
        Some(path) => match LineCatalog::from_manifest_file(std::path::Path::new(path)) {
            Ok(catalog) => catalog,
            Err(e) => {
                error!("Ignoring line manifest '{}': {e}", path);
                LineCatalog::builtin()
            }
        },
        None => LineCatalog::builtin(),
    };
    info!(
        "Line catalog: {} lines in {} groups",
        catalog.len(),
        catalog.groups().len()
    );
    commands.insert_resource(catalog);
}
