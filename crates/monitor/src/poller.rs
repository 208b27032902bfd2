//! Probability refresh loop.
//!
//! A repeating timer issues one request per period on the I/O task pool.
//! Finished requests are polled every frame and applied in completion order
//! (last applied wins). Failures are logged and counted; they never touch the
//! probability store, so the view keeps its last good state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bevy::prelude::*;
use bevy::tasks::{block_on, IoTaskPool, Task};

use crate::config::{validate_polling, MonitorConfig, HTTP_TIMEOUT};
use crate::error::{ConfigError, FetchError};
use crate::probability::{parse_snapshot, ProbabilityStore};

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Anything that can answer a probability request with a raw JSON body.
pub trait ProbabilitySource: Send + Sync + 'static {
    fn fetch(&self, endpoint: &str) -> Result<String, FetchError>;
}

/// Plain HTTP GET, no authentication.
pub struct HttpProbabilitySource {
    client: reqwest::blocking::Client,
}

impl HttpProbabilitySource {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {e}");
                reqwest::blocking::Client::new()
            });
        Self { client }
    }
}

impl Default for HttpProbabilitySource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbabilitySource for HttpProbabilitySource {
    fn fetch(&self, endpoint: &str) -> Result<String, FetchError> {
        let response = self.client.get(endpoint).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text()?)
    }
}

/// The source used by the poll systems. Inserted before `MonitorPlugin` to
/// override the HTTP default (tests use a scripted source).
#[derive(Resource, Clone)]
pub struct ProbabilityFeed(pub Arc<dyn ProbabilitySource>);

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Cancellation handle returned by [`start_polling`].
#[derive(Debug, Clone, Default)]
pub struct PollHandle {
    cancelled: Arc<AtomicBool>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollStats {
    pub sent: u64,
    pub applied: u64,
    pub failed: u64,
    /// Time the poller has been running.
    pub elapsed: Duration,
    /// Value of `elapsed` when the last snapshot was applied.
    pub last_applied_at: Option<Duration>,
    pub last_error: Option<String>,
}

impl PollStats {
    pub fn since_last_applied(&self) -> Option<Duration> {
        self.last_applied_at.map(|at| self.elapsed.saturating_sub(at))
    }
}

struct InFlightPoll {
    seq: u64,
    task: Task<Result<String, FetchError>>,
}

#[derive(Resource)]
pub struct ProbabilityPoller {
    endpoint: String,
    timer: Timer,
    handle: PollHandle,
    in_flight: Vec<InFlightPoll>,
    next_seq: u64,
    pub stats: PollStats,
}

impl ProbabilityPoller {
    pub fn start(endpoint: &str, interval: Duration) -> Result<(Self, PollHandle), ConfigError> {
        validate_polling(endpoint, interval)?;
        let handle = PollHandle::default();
        let poller = Self {
            endpoint: endpoint.to_string(),
            timer: Timer::new(interval, TimerMode::Repeating),
            handle: handle.clone(),
            in_flight: Vec::new(),
            next_seq: 0,
            stats: PollStats::default(),
        };
        Ok((poller, handle))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn interval(&self) -> Duration {
        self.timer.duration()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    /// Stop ticking and drop every pending request.
    pub fn cancel(&mut self) {
        self.handle.cancel();
        self.in_flight.clear();
    }

    /// Advance the timer. Returns `true` when a request is due; periods that
    /// elapsed within the same frame coalesce into a single request.
    pub fn tick(&mut self, delta: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.stats.elapsed += delta;
        self.timer.tick(delta);
        let fired = self.timer.times_finished_this_tick();
        if fired > 1 {
            debug!("{} poll periods elapsed in one frame, issuing one request", fired);
        }
        fired > 0
    }

    fn track(&mut self, task: Task<Result<String, FetchError>>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.stats.sent += 1;
        self.in_flight.push(InFlightPoll { seq, task });
        seq
    }
}

/// Begin polling `endpoint` every `interval`.
///
/// Replaces (and cancels) any poller already running in `world`.
pub fn start_polling(
    world: &mut World,
    endpoint: &str,
    interval: Duration,
) -> Result<PollHandle, ConfigError> {
    let (poller, handle) = ProbabilityPoller::start(endpoint, interval)?;
    if let Some(mut previous) = world.get_resource_mut::<ProbabilityPoller>() {
        previous.cancel();
    }
    world.insert_resource(poller);
    info!(
        "Polling {} every {} ms",
        endpoint,
        interval.as_millis()
    );
    Ok(handle)
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// Startup: start polling with the configured endpoint and interval.
///
/// An invalid configuration disables polling but leaves the view running.
pub fn start_configured_polling(world: &mut World) {
    let config = world.resource::<MonitorConfig>().clone();
    if let Err(e) = config.validate() {
        error!("Probability polling disabled: {e}");
        return;
    }
    if let Err(e) = start_polling(world, &config.endpoint, config.poll_interval) {
        error!("Probability polling disabled: {e}");
    }
}

pub fn dispatch_probability_polls(
    time: Res<Time>,
    feed: Option<Res<ProbabilityFeed>>,
    poller: Option<ResMut<ProbabilityPoller>>,
) {
    let Some(mut poller) = poller else {
        return;
    };
    if poller.is_cancelled() {
        if !poller.in_flight.is_empty() {
            poller.in_flight.clear();
        }
        return;
    }
    if !poller.tick(time.delta()) {
        return;
    }
    let Some(feed) = feed else {
        warn!("Probability poll due but no feed is configured");
        return;
    };

    let source = Arc::clone(&feed.0);
    let endpoint = poller.endpoint.clone();
    let task = IoTaskPool::get().spawn(async move { source.fetch(&endpoint) });
    let seq = poller.track(task);
    debug!("Probability poll #{} sent to {}", seq, poller.endpoint);
}

/// Apply finished polls in completion order.
pub fn collect_probability_polls(
    poller: Option<ResMut<ProbabilityPoller>>,
    mut store: ResMut<ProbabilityStore>,
) {
    let Some(mut poller) = poller else {
        return;
    };
    if poller.in_flight.is_empty() {
        return;
    }

    let poller = &mut *poller;
    let mut finished = Vec::new();
    poller.in_flight.retain_mut(|pending| {
        match block_on(futures_lite::future::poll_once(&mut pending.task)) {
            Some(result) => {
                finished.push((pending.seq, result));
                false
            }
            None => true,
        }
    });

    for (seq, result) in finished {
        match result.and_then(|raw| parse_snapshot(&raw)) {
            Ok(update) => {
                let applied = store.apply(update);
                if !applied.ignored.is_empty() {
                    warn!(
                        "Probability poll #{}: ignored groups {:?}",
                        seq, applied.ignored
                    );
                }
                if !applied.carried.is_empty() {
                    warn!(
                        "Probability poll #{}: malformed groups {:?} keep their previous values",
                        seq, applied.carried
                    );
                }
                debug!(
                    "Probability poll #{} applied as generation {} ({} groups)",
                    seq, applied.generation, applied.groups_updated
                );
                poller.stats.applied += 1;
                poller.stats.last_applied_at = Some(poller.stats.elapsed);
                poller.stats.last_error = None;
            }
            Err(e) => {
                warn!("Probability poll #{} failed, keeping previous state: {e}", seq);
                poller.stats.failed += 1;
                poller.stats.last_error = Some(e.to_string());
            }
        }
    }
}

/// Teardown: clear the poll timer and pending requests when the app exits.
pub fn cancel_polling_on_exit(
    mut exits: EventReader<AppExit>,
    poller: Option<ResMut<ProbabilityPoller>>,
) {
    if exits.read().next().is_none() {
        return;
    }
    if let Some(mut poller) = poller {
        poller.cancel();
        info!("Probability polling stopped");
    }
}
