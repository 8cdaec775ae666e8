#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use pretty_assertions::assert_eq;
use tokio::time::{Instant, sleep};

use super::*;

// ── Fakes ───────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeJob {
    unneeded: AtomicBool,
    panic_next: AtomicBool,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    script: Mutex<VecDeque<Result<(), CoreError>>>,
}

impl FakeJob {
    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn failing_with(err: CoreError) -> Self {
        let job = Self::default();
        job.script.lock().unwrap().push_back(Err(err));
        job
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RefreshJob for FakeJob {
    fn is_needed(&self) -> bool {
        !self.unneeded.load(Ordering::SeqCst)
    }

    fn refresh(&self) -> BoxFuture<'_, Result<(), CoreError>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            assert!(!self.panic_next.swap(false, Ordering::SeqCst), "job blew up");
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
        .boxed()
    }
}

#[derive(Default)]
struct FakeOwner {
    reports: Mutex<Vec<HealthReport>>,
    reconnects: AtomicUsize,
}

impl FakeOwner {
    fn reports(&self) -> Vec<HealthReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl TaskOwner for FakeOwner {
    fn label(&self) -> &str {
        "fake"
    }

    fn report_health(&self, report: HealthReport) {
        self.reports.lock().unwrap().push(report);
    }

    fn reconnect(&self, _force_logout: bool) -> BoxFuture<'_, Result<ReconnectOutcome, CoreError>> {
        async move {
            self.reconnects.fetch_add(1, Ordering::SeqCst);
            Ok(ReconnectOutcome::Reconnected)
        }
        .boxed()
    }
}

fn task(kind: TaskKind, interval_secs: i64, job: &Arc<FakeJob>, owner: &Arc<FakeOwner>) -> RefreshTask {
    let owner: Weak<dyn TaskOwner> = Arc::downgrade(owner) as Weak<dyn TaskOwner>;
    RefreshTask::new(kind, interval_secs, job.clone(), owner)
}

// ── Scheduling ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn zero_or_negative_interval_never_schedules() {
    let owner = Arc::new(FakeOwner::default());
    for interval in [0, -5] {
        let job = Arc::new(FakeJob::default());
        let task = task(TaskKind::HomeMode, interval, &job, &owner);
        assert!(!task.start().await);
        sleep(Duration::from_secs(120)).await;
        assert_eq!(job.calls(), 0);
        assert!(!task.is_scheduled().await);
    }
}

#[tokio::test(start_paused = true)]
async fn fixed_delay_runs_immediately_then_every_interval() {
    let owner = Arc::new(FakeOwner::default());
    let job = Arc::new(FakeJob::default());
    let task = task(TaskKind::HomeMode, 5, &job, &owner);

    assert!(task.start().await);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(job.calls(), 1);

    sleep(Duration::from_secs(12)).await;
    assert_eq!(job.calls(), 3);
    assert_eq!(owner.reports(), vec![HealthReport::Online; 3]);
}

#[tokio::test(start_paused = true)]
async fn fixed_rate_skips_ticks_while_previous_one_runs() {
    let owner = Arc::new(FakeOwner::default());
    let job = Arc::new(FakeJob::slow(Duration::from_millis(2500)));
    let task = task(TaskKind::Snapshot, 1, &job, &owner);

    task.start().await;
    sleep(Duration::from_millis(10_500)).await;

    // Boundaries at 0, 3, 6 and 9 find the task idle; the rest are skipped.
    assert_eq!(job.calls(), 4);
    assert_eq!(job.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn run_once_is_single_flight() {
    let owner = Arc::new(FakeOwner::default());
    let job = Arc::new(FakeJob::slow(Duration::from_secs(10)));
    let task = task(TaskKind::Event, 3, &job, &owner);

    let (first, second) = tokio::join!(task.run_once(), task.run_once());
    assert_eq!(first, TickOutcome::Success);
    assert_eq!(second, TickOutcome::Skipped);
    assert_eq!(job.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_waits_for_in_flight_tick_within_grace() {
    let owner = Arc::new(FakeOwner::default());
    let job = Arc::new(FakeJob::slow(Duration::from_secs(1)));
    let task = task(TaskKind::CameraState, 60, &job, &owner);

    task.start().await;
    sleep(Duration::from_millis(10)).await;
    assert!(task.is_running());

    let started = Instant::now();
    task.stop().await;
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(900), "waited {waited:?}");
    assert!(waited < STOP_GRACE);
    assert!(!task.is_running());

    sleep(Duration::from_secs(300)).await;
    assert_eq!(job.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn no_fixed_rate_tick_runs_after_stop_returns() {
    let owner = Arc::new(FakeOwner::default());
    // Vary how far the loop gets before stop, so stop lands before the
    // spawned tick is polled as well as while it runs.
    for yields in 0..6 {
        let job = Arc::new(FakeJob::slow(Duration::from_millis(500)));
        let task = task(TaskKind::Snapshot, 1, &job, &owner);

        task.start().await;
        for _ in 0..yields {
            tokio::task::yield_now().await;
        }
        task.stop().await;

        let calls = job.calls();
        assert_eq!(job.in_flight.load(Ordering::SeqCst), 0, "after {yields} yields");
        assert!(!task.is_running());

        sleep(Duration::from_secs(10)).await;
        assert_eq!(job.calls(), calls, "tick ran after stop, {yields} yields");
    }
}

#[tokio::test(start_paused = true)]
async fn stop_gives_up_after_grace_period() {
    let owner = Arc::new(FakeOwner::default());
    let job = Arc::new(FakeJob::slow(Duration::from_secs(30)));
    let task = task(TaskKind::LiveUri, 60, &job, &owner);

    task.start().await;
    sleep(Duration::from_millis(10)).await;

    let started = Instant::now();
    task.stop().await;
    assert!(started.elapsed() >= STOP_GRACE);
    assert!(task.is_running(), "in-flight call is not interrupted");
    assert!(!task.is_scheduled().await);
}

#[tokio::test(start_paused = true)]
async fn set_refresh_rate_restarts_and_disables() {
    let owner = Arc::new(FakeOwner::default());
    let job = Arc::new(FakeJob::default());
    let task = task(TaskKind::HomeMode, 100, &job, &owner);

    task.start().await;
    sleep(Duration::from_millis(10)).await;
    assert_eq!(job.calls(), 1);

    task.set_refresh_rate(5).await;
    sleep(Duration::from_millis(10)).await;
    assert_eq!(job.calls(), 2, "restart runs a tick immediately");
    sleep(Duration::from_secs(5)).await;
    assert_eq!(job.calls(), 3);

    task.set_refresh_rate(0).await;
    assert!(!task.is_scheduled().await);
    sleep(Duration::from_secs(60)).await;
    assert_eq!(job.calls(), 3);

    task.set_refresh_rate(5).await;
    assert!(task.is_scheduled().await);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(job.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn set_refresh_rate_on_stopped_task_does_not_schedule() {
    let owner = Arc::new(FakeOwner::default());
    let job = Arc::new(FakeJob::default());
    let task = task(TaskKind::HomeMode, 10, &job, &owner);

    task.set_refresh_rate(5).await;
    assert!(!task.is_scheduled().await);
    assert_eq!(task.interval_secs(), 5);
    sleep(Duration::from_secs(30)).await;
    assert_eq!(job.calls(), 0);
}

// ── Failure handling ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn unneeded_job_makes_no_call_and_reports_nothing() {
    let owner = Arc::new(FakeOwner::default());
    let job = Arc::new(FakeJob::default());
    job.unneeded.store(true, Ordering::SeqCst);
    let task = task(TaskKind::Snapshot, 10, &job, &owner);

    assert_eq!(task.run_once().await, TickOutcome::Idle);
    assert_eq!(job.calls(), 0);
    assert!(owner.reports().is_empty());
}

#[tokio::test(start_paused = true)]
async fn timeout_is_logged_without_health_change() {
    let owner = Arc::new(FakeOwner::default());
    let job = Arc::new(FakeJob::failing_with(CoreError::Timeout { timeout_secs: Some(20) }));
    let task = task(TaskKind::Snapshot, 10, &job, &owner);

    assert_eq!(task.run_once().await, TickOutcome::Tolerated);
    assert!(owner.reports().is_empty());
    assert_eq!(owner.reconnects.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn auth_expired_reconnects_once_without_health_change() {
    let owner = Arc::new(FakeOwner::default());
    let job = Arc::new(FakeJob::failing_with(CoreError::AuthExpired { code: Some(119) }));
    let task = task(TaskKind::Event, 3, &job, &owner);

    assert_eq!(task.run_once().await, TickOutcome::Reconnected);
    assert_eq!(owner.reconnects.load(Ordering::SeqCst), 1);
    assert!(owner.reports().is_empty());
}

#[tokio::test(start_paused = true)]
async fn other_failure_goes_offline_naming_task_then_recovers() {
    let owner = Arc::new(FakeOwner::default());
    let job = Arc::new(FakeJob::failing_with(CoreError::ServiceUnavailable { code: 102 }));
    let task = task(TaskKind::Snapshot, 10, &job, &owner);

    assert_eq!(task.run_once().await, TickOutcome::Failed);
    assert_eq!(task.run_once().await, TickOutcome::Success);

    let reports = owner.reports();
    assert_eq!(reports.len(), 2);
    match &reports[0] {
        HealthReport::CommunicationError(reason) => assert!(reason.starts_with("snapshot refresh failed")),
        other => panic!("unexpected report {other:?}"),
    }
    assert_eq!(reports[1], HealthReport::Online);
}

#[tokio::test(start_paused = true)]
async fn configuration_failure_reports_configuration_error() {
    let owner = Arc::new(FakeOwner::default());
    let job = Arc::new(FakeJob::failing_with(CoreError::Config {
        message: "station rejected the credentials (code 400)".into(),
    }));
    let task = task(TaskKind::HomeMode, 10, &job, &owner);

    assert_eq!(task.run_once().await, TickOutcome::Failed);
    assert!(matches!(owner.reports()[0], HealthReport::ConfigurationError(_)));
}

#[tokio::test(start_paused = true)]
async fn panicking_job_is_contained_and_task_keeps_working() {
    let owner = Arc::new(FakeOwner::default());
    let job = Arc::new(FakeJob::default());
    job.panic_next.store(true, Ordering::SeqCst);
    let task = task(TaskKind::CameraState, 10, &job, &owner);

    assert_eq!(task.run_once().await, TickOutcome::Failed);
    assert!(!task.is_running());
    assert_eq!(task.run_once().await, TickOutcome::Success);
}

#[tokio::test(start_paused = true)]
async fn dropped_owner_makes_ticks_idle() {
    let owner = Arc::new(FakeOwner::default());
    let job = Arc::new(FakeJob::default());
    let task = task(TaskKind::HomeMode, 10, &job, &owner);
    drop(owner);

    assert_eq!(task.run_once().await, TickOutcome::Idle);
    assert_eq!(job.calls(), 0);
}

#[test]
fn only_snapshot_runs_at_fixed_rate() {
    use strum::IntoEnumIterator;

    for kind in TaskKind::iter() {
        let expected = if kind == TaskKind::Snapshot {
            Schedule::FixedRate
        } else {
            Schedule::FixedDelay
        };
        assert_eq!(kind.schedule(), expected, "{kind}");
    }
    assert_eq!(TaskKind::CameraEvent.to_string(), "camera-event");
}
