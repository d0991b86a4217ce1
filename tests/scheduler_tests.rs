use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use ramtop::system::differ::RowChange;
use ramtop::system::scheduler::{
    PresentationBridge, Publication, RefreshScheduler, SchedulerOptions, SchedulerState,
};
use ramtop::system::selection::SharedSelection;
use ramtop::system::snapshot::{MemorySummary, ProcessIdentity, ProcessRow, Snapshot};
use ramtop::system::source::{SnapshotSource, SourceError};
use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_secs(3);
const HOUR: Duration = Duration::from_secs(3600);

#[derive(Clone)]
enum Step {
    Rows(Vec<(u32, u64)>),
    Fail,
}

#[derive(Clone, Default)]
struct Probe {
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

struct ScriptedSource {
    script: Arc<Mutex<VecDeque<Step>>>,
    delay: Duration,
    probe: Probe,
}

impl ScriptedSource {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Arc::new(Mutex::new(steps.into())),
            delay: Duration::ZERO,
            probe: Probe::default(),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl SnapshotSource for ScriptedSource {
    fn sample(&mut self) -> Result<Snapshot, SourceError> {
        self.probe.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let step = self.script.lock().pop_front().unwrap_or(Step::Fail);
        self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);

        match step {
            Step::Rows(rows) => Ok(Snapshot::new(
                rows.into_iter().map(|(pid, mem)| row(pid, mem)).collect(),
                MemorySummary::default(),
            )),
            Step::Fail => Err(SourceError::Unavailable("scripted failure".to_string())),
        }
    }
}

fn row(pid: u32, memory: u64) -> ProcessRow {
    ProcessRow {
        identity: identity(pid),
        name: format!("proc{pid}"),
        memory_bytes: memory,
        access_denied: false,
    }
}

fn identity(pid: u32) -> ProcessIdentity {
    ProcessIdentity::new(pid, 10_000 + pid as u64)
}

#[derive(Debug)]
enum Signal {
    Render(Publication),
    Transient(SourceError),
    Persistent(SourceError),
}

struct RecordingBridge {
    tx: mpsc::UnboundedSender<Signal>,
}

impl PresentationBridge for RecordingBridge {
    fn render(&self, publication: Publication) {
        let _ = self.tx.send(Signal::Render(publication));
    }

    fn notify_transient_error(&self, error: &SourceError) {
        let _ = self.tx.send(Signal::Transient(error.clone()));
    }

    fn notify_persistent_error(&self, error: &SourceError) {
        let _ = self.tx.send(Signal::Persistent(error.clone()));
    }
}

type Scheduler = RefreshScheduler<ScriptedSource, RecordingBridge>;

fn scheduler_with(
    source: ScriptedSource,
    options: SchedulerOptions,
) -> (Scheduler, SharedSelection, mpsc::UnboundedReceiver<Signal>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let selection = SharedSelection::new();
    let scheduler = RefreshScheduler::new(
        source,
        Arc::new(RecordingBridge { tx }),
        selection.clone(),
        options,
    );
    (scheduler, selection, rx)
}

fn options(interval: Duration) -> SchedulerOptions {
    SchedulerOptions {
        interval,
        ..SchedulerOptions::default()
    }
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Signal>) -> Signal {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for scheduler output")
        .expect("bridge channel closed")
}

async fn next_render(rx: &mut mpsc::UnboundedReceiver<Signal>) -> Publication {
    match next(rx).await {
        Signal::Render(publication) => publication,
        other => panic!("expected a render, got {other:?}"),
    }
}

async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<Signal>, window: Duration) {
    if let Ok(Some(signal)) = tokio::time::timeout(window, rx.recv()).await {
        panic!("expected no scheduler output, got {signal:?}");
    }
}

#[tokio::test]
async fn transient_failures_then_success() {
    let source = ScriptedSource::new(vec![Step::Fail, Step::Fail, Step::Rows(vec![(1, 100)])]);
    let (scheduler, _selection, mut rx) = scheduler_with(source, options(Duration::from_millis(20)));

    scheduler.start(Duration::from_millis(20));

    assert!(matches!(next(&mut rx).await, Signal::Transient(_)));
    assert!(matches!(next(&mut rx).await, Signal::Transient(_)));
    let publication = next_render(&mut rx).await;
    assert_eq!(publication.seq, 1);
    assert_eq!(publication.snapshot.len(), 1);
    assert_eq!(scheduler.state(), SchedulerState::Running);
    scheduler.stop();
}

#[tokio::test]
async fn transient_failures_leave_selection_and_frame_alone() {
    let source = ScriptedSource::new(vec![
        Step::Rows(vec![(1, 100), (2, 50)]),
        Step::Fail,
        Step::Fail,
        Step::Rows(vec![(1, 100), (2, 60)]),
    ]);
    let (scheduler, selection, mut rx) = scheduler_with(source, options(HOUR));

    scheduler.start(HOUR);
    let first = next_render(&mut rx).await;
    assert_eq!(first.seq, 1);
    selection.toggle(identity(2));

    for _ in 0..2 {
        scheduler.refresh_now();
        assert!(matches!(next(&mut rx).await, Signal::Transient(_)));
        assert_eq!(selection.len(), 1);
        assert!(selection.contains(&identity(2)));
        assert_eq!(scheduler.state(), SchedulerState::Running);
    }

    scheduler.refresh_now();
    let recovered = next_render(&mut rx).await;
    // diffed against the last good snapshot, not the failed ticks
    assert_eq!(recovered.seq, 2);
    assert_eq!(
        recovered.diff.changes(),
        &[RowChange::Unchanged, RowChange::Updated]
    );
    assert!(recovered.selection.contains(&identity(2)));
    assert_eq!(recovered.selection.len(), 1);
    scheduler.stop();
}

#[tokio::test]
async fn superseded_run_failure_is_not_persistent() {
    let source = ScriptedSource::new(vec![Step::Fail, Step::Rows(vec![(3, 30)])])
        .with_delay(Duration::from_millis(200));
    let options = SchedulerOptions {
        interval: Duration::from_millis(20),
        failure_threshold: 1,
        ..SchedulerOptions::default()
    };
    let (scheduler, _selection, mut rx) = scheduler_with(source, options);

    scheduler.start(options.interval);
    tokio::time::sleep(Duration::from_millis(50)).await;
    scheduler.stop();
    scheduler.start(options.interval);

    match next(&mut rx).await {
        Signal::Transient(_) => {}
        other => panic!("expected the old run's failure as transient, got {other:?}"),
    }
    assert_eq!(scheduler.state(), SchedulerState::Running);

    // the new run is not charged for the old run's failure
    let publication = next_render(&mut rx).await;
    assert_eq!(publication.seq, 1);
    assert_eq!(scheduler.state(), SchedulerState::Running);
    scheduler.stop();
}

#[tokio::test]
async fn repeated_failures_halt_until_restart() {
    let source = ScriptedSource::new(vec![Step::Fail, Step::Fail, Step::Fail]);
    let script = Arc::clone(&source.script);
    let probe = source.probe.clone();
    let (scheduler, _selection, mut rx) = scheduler_with(source, options(Duration::from_millis(20)));

    scheduler.start(Duration::from_millis(20));

    assert!(matches!(next(&mut rx).await, Signal::Transient(_)));
    assert!(matches!(next(&mut rx).await, Signal::Transient(_)));
    match next(&mut rx).await {
        Signal::Persistent(SourceError::Unavailable(_)) => {}
        other => panic!("expected persistent failure, got {other:?}"),
    }
    assert_eq!(scheduler.state(), SchedulerState::Stopped);

    assert_quiet(&mut rx, Duration::from_millis(150)).await;
    assert_eq!(probe.calls.load(Ordering::SeqCst), 3);

    script.lock().push_back(Step::Rows(vec![(7, 70)]));
    scheduler.start(Duration::from_millis(20));
    let publication = next_render(&mut rx).await;
    assert_eq!(publication.seq, 1);
    assert_eq!(scheduler.runs(), 2);
    scheduler.stop();
}

#[tokio::test]
async fn exited_selection_is_purged_before_publish() {
    let source = ScriptedSource::new(vec![
        Step::Rows(vec![(10, 500), (20, 300)]),
        Step::Rows(vec![(20, 350)]),
    ]);
    let (scheduler, selection, mut rx) = scheduler_with(source, options(HOUR));

    scheduler.start(HOUR);
    let first = next_render(&mut rx).await;
    assert_eq!(first.snapshot.len(), 2);
    assert!(first.diff.is_initial());

    selection.toggle(identity(10));
    scheduler.refresh_now();

    let second = next_render(&mut rx).await;
    assert_eq!(second.seq, 2);
    assert!(second.selection.is_empty());
    assert!(selection.is_empty());
    assert_eq!(second.snapshot.len(), 1);
    assert_eq!(second.diff.changes(), &[RowChange::Updated]);
    assert_eq!(second.diff.removed(), &[identity(10)]);
    scheduler.stop();
}

#[tokio::test]
async fn selection_of_surviving_process_is_kept() {
    let source = ScriptedSource::new(vec![
        Step::Rows(vec![(10, 500), (20, 300)]),
        Step::Rows(vec![(10, 800), (30, 5)]),
    ]);
    let (scheduler, selection, mut rx) = scheduler_with(source, options(HOUR));

    scheduler.start(HOUR);
    next_render(&mut rx).await;
    selection.toggle(identity(10));
    selection.toggle(identity(20));
    scheduler.refresh_now();

    let second = next_render(&mut rx).await;
    assert_eq!(second.selection.len(), 1);
    assert!(second.selection.contains(&identity(10)));
    assert_eq!(
        second.diff.changes(),
        &[RowChange::Updated, RowChange::Added]
    );
    scheduler.stop();
}

#[tokio::test]
async fn ticks_never_overlap_and_sequence_increases() {
    let steps = (0..40).map(|i| Step::Rows(vec![(1, i)])).collect();
    let source = ScriptedSource::new(steps).with_delay(Duration::from_millis(25));
    let probe = source.probe.clone();
    let (scheduler, _selection, mut rx) = scheduler_with(source, options(Duration::from_millis(10)));

    scheduler.start(Duration::from_millis(10));
    let mut last_seq = 0;
    for round in 0..6 {
        scheduler.refresh_now();
        if round == 3 {
            // restart while a sample may still be in flight
            scheduler.stop();
            scheduler.start(Duration::from_millis(10));
        }
        let publication = next_render(&mut rx).await;
        assert!(publication.seq > last_seq);
        last_seq = publication.seq;
    }
    scheduler.stop();

    assert_eq!(probe.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn slow_sample_is_reported_as_timeout() {
    let source = ScriptedSource::new(vec![Step::Rows(vec![(1, 1)])])
        .with_delay(Duration::from_millis(300));
    let options = SchedulerOptions {
        interval: Duration::from_millis(20),
        sample_timeout: Duration::from_millis(50),
        failure_threshold: 1,
    };
    let (scheduler, _selection, mut rx) = scheduler_with(source, options);

    scheduler.start(options.interval);

    match next(&mut rx).await {
        Signal::Persistent(error) => {
            assert_eq!(error, SourceError::TimedOut(Duration::from_millis(50)));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
}

#[tokio::test]
async fn stop_prevents_further_publications() {
    let steps = (0..20).map(|i| Step::Rows(vec![(1, i)])).collect();
    let (scheduler, _selection, mut rx) =
        scheduler_with(ScriptedSource::new(steps), options(Duration::from_millis(20)));

    scheduler.start(Duration::from_millis(20));
    next_render(&mut rx).await;
    scheduler.stop();

    // drain anything that completed while stopping
    while let Ok(Some(_)) = tokio::time::timeout(Duration::from_millis(60), rx.recv()).await {}
    assert_quiet(&mut rx, Duration::from_millis(120)).await;
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
}

#[tokio::test]
async fn dropping_scheduler_cancels_worker() {
    let steps = (0..20).map(|i| Step::Rows(vec![(1, i)])).collect();
    let source = ScriptedSource::new(steps);
    let probe = source.probe.clone();
    let (scheduler, _selection, mut rx) = scheduler_with(source, options(Duration::from_millis(20)));

    scheduler.start(Duration::from_millis(20));
    next_render(&mut rx).await;
    drop(scheduler);

    tokio::time::sleep(Duration::from_millis(60)).await;
    let calls = probe.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(probe.calls.load(Ordering::SeqCst), calls);
}
