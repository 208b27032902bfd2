//! # TestViewer: headless harness for the probability refresh loop
//!
//! Wraps a `bevy::app::App` with `MinimalPlugins` + `MonitorPlugin`, a
//! scripted probability source and manual 100 ms time steps, so tests can
//! drive polls deterministically and inspect the derived overlay state.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bevy::app::App;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

use crate::blink::{BlinkClock, BlinkPhase};
use crate::config::MonitorConfig;
use crate::error::FetchError;
use crate::geometry::{GeometryStore, PendingGeometryLoads};
use crate::lines::{LineCatalog, LineGroup, LineKey, LineSpec};
use crate::overlay::{LineOverlay, OverlayState, SetGroupVisibility};
use crate::poller::{start_polling, PollHandle, ProbabilityFeed, ProbabilityPoller, ProbabilitySource};
use crate::probability::ProbabilityStore;
use crate::MonitorPlugin;

/// Simulated frame length.
pub const STEP: Duration = Duration::from_millis(100);

/// Poll interval used unless a test picks another one.
pub const TEST_INTERVAL: Duration = Duration::from_millis(1000);

const TEST_ENDPOINT: &str = "http://probabilities.test/latest";

/// Probability source answering from a queue. An empty queue answers with a
/// transport error, like an unreachable server.
#[derive(Default)]
pub struct ScriptedSource {
    queue: Mutex<VecDeque<Result<String, FetchError>>>,
    requests: AtomicUsize,
}

impl ScriptedSource {
    pub fn push(&self, response: Result<String, FetchError>) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl ProbabilitySource for ScriptedSource {
    fn fetch(&self, _endpoint: &str) -> Result<String, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Transport("no scripted response".into())))
    }
}

pub struct TestViewer {
    app: App,
    source: Arc<ScriptedSource>,
    handle: Option<PollHandle>,
}

impl Default for TestViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl TestViewer {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Empty catalog, scripted feed, polling every [`TEST_INTERVAL`].
    pub fn new() -> Self {
        Self::with_polling(TEST_ENDPOINT, TEST_INTERVAL)
    }

    /// Like [`TestViewer::new`] with a custom startup configuration. An
    /// invalid one leaves the viewer running without a poller.
    pub fn with_polling(endpoint: &str, interval: Duration) -> Self {
        let source = Arc::new(ScriptedSource::default());

        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(TimeUpdateStrategy::ManualDuration(STEP));
        app.insert_resource(MonitorConfig {
            endpoint: endpoint.to_string(),
            poll_interval: interval,
            weather_api_key: String::new(),
            lines_manifest: None,
        });
        app.insert_resource(ProbabilityFeed(source.clone() as Arc<dyn ProbabilitySource>));
        // Inserted up front so the catalog loader leaves it alone.
        app.insert_resource(LineCatalog::default());
        app.add_plugins(MonitorPlugin);

        // Run one update so Startup systems execute (polling starts).
        app.update();

        Self {
            app,
            source,
            handle: None,
        }
    }

    // -----------------------------------------------------------------------
    // Setup (builder pattern)
    // -----------------------------------------------------------------------

    pub fn with_lines(mut self, specs: Vec<LineSpec>) -> Self {
        let catalog = match LineCatalog::new(specs) {
            Ok(catalog) => catalog,
            Err(e) => panic!("test catalog is invalid: {e}"),
        };
        self.app.insert_resource(catalog);
        self.settle();
        self
    }

    /// Restart polling with a different interval and keep the handle.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        let handle = match start_polling(self.app.world_mut(), TEST_ENDPOINT, interval) {
            Ok(handle) => handle,
            Err(e) => panic!("invalid test interval: {e}"),
        };
        self.handle = Some(handle);
        self
    }

    // -----------------------------------------------------------------------
    // Scripted responses
    // -----------------------------------------------------------------------

    pub fn respond(&self, raw: &str) {
        self.source.push(Ok(raw.to_string()));
    }

    pub fn fail_next(&self, error: FetchError) {
        self.source.push(Err(error));
    }

    pub fn requests_sent(&self) -> usize {
        self.source.requests()
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// Advance `n` frames of [`STEP`] each.
    pub fn tick(&mut self, n: u32) {
        self.set_step(STEP);
        for _ in 0..n {
            self.app.update();
        }
    }

    /// Advance exactly one poll interval, then wait for the request to land.
    pub fn poll_cycle(&mut self) {
        let interval = self.app.world().resource::<ProbabilityPoller>().interval();
        let frames = (interval.as_millis() / STEP.as_millis()).max(1) as u32;
        self.tick(frames);
        self.settle();
    }

    /// Run zero-length frames until no request or geometry load is pending.
    pub fn settle(&mut self) {
        self.set_step(Duration::ZERO);
        for _ in 0..1000 {
            self.app.update();
            if self.idle() {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        // One more frame so anything applied last gets derived.
        self.app.update();
        self.set_step(STEP);
    }

    fn idle(&self) -> bool {
        let world = self.app.world();
        let polls_idle = world
            .get_resource::<ProbabilityPoller>()
            .is_none_or(|p| p.in_flight() == 0);
        polls_idle && world.resource::<PendingGeometryLoads>().is_empty()
    }

    fn set_step(&mut self, step: Duration) {
        self.app
            .insert_resource(TimeUpdateStrategy::ManualDuration(step));
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    pub fn set_group_visibility(&mut self, group: LineGroup, visible: bool) {
        self.app
            .world_mut()
            .send_event(SetGroupVisibility { group, visible });
        self.set_step(Duration::ZERO);
        self.app.update();
        self.set_step(STEP);
    }

    /// Cancel through the handle from `with_interval`, or the poller itself.
    pub fn cancel_polling(&mut self) {
        match &self.handle {
            Some(handle) => handle.cancel(),
            None => {
                if let Some(mut poller) = self.app.world_mut().get_resource_mut::<ProbabilityPoller>() {
                    poller.cancel();
                }
            }
        }
    }

    pub fn send_exit(&mut self) {
        self.app.world_mut().send_event(AppExit::Success);
        self.app.update();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn overlay(&self) -> &OverlayState {
        self.resource::<OverlayState>()
    }

    pub fn line(&self, group: LineGroup, id: &str) -> Option<&LineOverlay> {
        self.overlay().get(&LineKey::new(group, id))
    }

    pub fn store(&self) -> &ProbabilityStore {
        self.resource::<ProbabilityStore>()
    }

    pub fn poller(&self) -> &ProbabilityPoller {
        self.resource::<ProbabilityPoller>()
    }

    pub fn blink_phase(&self) -> BlinkPhase {
        self.resource::<BlinkClock>().phase()
    }

    pub fn geometry(&self) -> &GeometryStore {
        self.resource::<GeometryStore>()
    }
}
