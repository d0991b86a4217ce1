use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, Notify, watch};
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use super::differ::{SnapshotDiff, diff};
use super::selection::{SelectionSet, SharedSelection};
use super::snapshot::Snapshot;
use super::source::{SnapshotSource, SourceError};

const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// The consistent result of one tick, handed to the presentation layer.
#[derive(Clone, Debug)]
pub struct Publication {
    /// Strictly increasing across the scheduler's lifetime, including restarts.
    pub seq: u64,
    pub snapshot: Arc<Snapshot>,
    pub diff: SnapshotDiff,
    pub selection: SelectionSet,
}

/// Implemented by the UI. Called only from the publish step, at most once per tick.
pub trait PresentationBridge: Send + Sync + 'static {
    fn render(&self, publication: Publication);
    fn notify_transient_error(&self, error: &SourceError);
    fn notify_persistent_error(&self, error: &SourceError);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerOptions {
    pub interval: Duration,
    pub sample_timeout: Duration,
    /// Consecutive failures that halt ticking until an explicit restart.
    pub failure_threshold: u32,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        SchedulerOptions {
            interval: Duration::from_millis(500),
            sample_timeout: Duration::from_secs(2),
            failure_threshold: 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

struct Control {
    state: SchedulerState,
    runs: u64,
    cancel: Option<watch::Sender<bool>>,
}

#[derive(Default)]
struct TickState {
    last_snapshot: Option<Arc<Snapshot>>,
    consecutive_failures: u32,
    seq: u64,
}

#[derive(Debug, PartialEq, Eq)]
enum TickOutcome {
    Continue,
    Halt,
}

/// Drives sample -> diff -> reconcile -> publish on a fixed cadence.
///
/// Sampling runs on the blocking pool so the interaction thread never waits
/// on the OS. `TickState` is locked for the whole pipeline, which keeps at
/// most one tick in flight even across a stop/start cycle, and keeps
/// `last_snapshot` private to whichever worker currently holds it.
pub struct RefreshScheduler<S, B> {
    source: Arc<AsyncMutex<S>>,
    bridge: Arc<B>,
    selection: SharedSelection,
    options: SchedulerOptions,
    control: Arc<Mutex<Control>>,
    ticks: Arc<AsyncMutex<TickState>>,
    wake: Arc<Notify>,
}

impl<S, B> RefreshScheduler<S, B> {
    pub fn state(&self) -> SchedulerState {
        self.control.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// How many times ticking has been started.
    pub fn runs(&self) -> u64 {
        self.control.lock().runs
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    /// Halts ticking. A tick already in flight completes and publishes;
    /// nothing new is scheduled once this returns.
    pub fn stop(&self) {
        if cancel(&self.control) {
            tracing::info!("refresh scheduler stopped");
        }
    }

    /// Requests a tick ahead of the cadence.
    pub fn refresh_now(&self) {
        self.wake.notify_one();
    }
}

impl<S, B> RefreshScheduler<S, B>
where
    S: SnapshotSource + 'static,
    B: PresentationBridge,
{
    pub fn new(
        source: S,
        bridge: Arc<B>,
        selection: SharedSelection,
        options: SchedulerOptions,
    ) -> Self {
        RefreshScheduler {
            source: Arc::new(AsyncMutex::new(source)),
            bridge,
            selection,
            options,
            control: Arc::new(Mutex::new(Control {
                state: SchedulerState::Idle,
                runs: 0,
                cancel: None,
            })),
            ticks: Arc::new(AsyncMutex::new(TickState::default())),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Begins ticking; a no-op while already running. Must be called from
    /// within a tokio runtime.
    pub fn start(&self, interval: Duration) {
        let mut control = self.control.lock();
        if control.state == SchedulerState::Running {
            tracing::debug!("start ignored, scheduler already running");
            return;
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        control.runs += 1;
        control.state = SchedulerState::Running;
        control.cancel = Some(cancel_tx);

        let interval = interval.max(MIN_INTERVAL);
        let worker = Worker {
            run: control.runs,
            interval,
            sample_timeout: self.options.sample_timeout,
            failure_threshold: self.options.failure_threshold.max(1),
            source: Arc::clone(&self.source),
            bridge: Arc::clone(&self.bridge),
            selection: self.selection.clone(),
            control: Arc::clone(&self.control),
            ticks: Arc::clone(&self.ticks),
            wake: Arc::clone(&self.wake),
            cancel: cancel_rx,
        };
        tracing::info!(
            run = control.runs,
            interval_ms = interval.as_millis() as u64,
            "refresh scheduler started"
        );
        tokio::spawn(worker.run());
    }
}

impl<S, B> Drop for RefreshScheduler<S, B> {
    fn drop(&mut self) {
        cancel(&self.control);
    }
}

fn cancel(control: &Mutex<Control>) -> bool {
    let mut control = control.lock();
    if control.state != SchedulerState::Running {
        return false;
    }
    if let Some(cancel) = control.cancel.take() {
        let _ = cancel.send(true);
    }
    control.state = SchedulerState::Stopped;
    true
}

struct Worker<S, B> {
    run: u64,
    interval: Duration,
    sample_timeout: Duration,
    failure_threshold: u32,
    source: Arc<AsyncMutex<S>>,
    bridge: Arc<B>,
    selection: SharedSelection,
    control: Arc<Mutex<Control>>,
    ticks: Arc<AsyncMutex<TickState>>,
    wake: Arc<Notify>,
    cancel: watch::Receiver<bool>,
}

impl<S, B> Worker<S, B>
where
    S: SnapshotSource + 'static,
    B: PresentationBridge,
{
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = self.cancel.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {}
                _ = self.wake.notified() => {}
            }
            if *self.cancel.borrow() {
                break;
            }

            let span = tracing::debug_span!("scheduler.tick", run = self.run);
            if self.tick().instrument(span).await == TickOutcome::Halt {
                break;
            }
        }
        tracing::debug!(run = self.run, "refresh worker exited");
    }

    async fn tick(&self) -> TickOutcome {
        let mut ticks = self.ticks.lock().await;

        match self.sample().await {
            Ok(snapshot) => {
                ticks.consecutive_failures = 0;
                let snapshot = Arc::new(snapshot);
                let diff = diff(ticks.last_snapshot.as_deref(), &snapshot);
                let selection = self.selection.reconcile(&snapshot);
                ticks.seq += 1;
                let seq = ticks.seq;

                tracing::debug!(
                    seq,
                    rows = snapshot.len(),
                    added = diff.added_count(),
                    removed = diff.removed().len(),
                    selected = selection.len(),
                    "publishing snapshot"
                );
                self.bridge.render(Publication {
                    seq,
                    snapshot: Arc::clone(&snapshot),
                    diff,
                    selection,
                });
                ticks.last_snapshot = Some(snapshot);
                TickOutcome::Continue
            }
            Err(error) => {
                ticks.consecutive_failures += 1;
                let failures = ticks.consecutive_failures;
                if failures >= self.failure_threshold {
                    if !self.halt() {
                        // stopped or replaced mid-tick: the current run's count
                        // and state stay as they are
                        ticks.consecutive_failures -= 1;
                        tracing::warn!(%error, run = self.run, "sample failed after this run ended");
                        self.bridge.notify_transient_error(&error);
                        return TickOutcome::Halt;
                    }
                    ticks.consecutive_failures = 0;
                    tracing::error!(%error, failures, "sampling keeps failing, halting refresh");
                    self.bridge.notify_persistent_error(&error);
                    TickOutcome::Halt
                } else {
                    tracing::warn!(%error, failures, "sampling failed, keeping last snapshot");
                    self.bridge.notify_transient_error(&error);
                    TickOutcome::Continue
                }
            }
        }
    }

    async fn sample(&self) -> Result<Snapshot, SourceError> {
        let source = Arc::clone(&self.source);
        let task = tokio::task::spawn_blocking(move || source.blocking_lock().sample());
        match tokio::time::timeout(self.sample_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(SourceError::Unavailable(format!(
                "sampling task failed: {join_error}"
            ))),
            Err(_) => Err(SourceError::TimedOut(self.sample_timeout)),
        }
    }

    /// Marks the scheduler stopped, unless this run was stopped or replaced.
    /// Returns whether this call halted it.
    fn halt(&self) -> bool {
        let mut control = self.control.lock();
        if control.runs != self.run || control.state != SchedulerState::Running {
            return false;
        }
        control.state = SchedulerState::Stopped;
        control.cancel = None;
        true
    }
}
