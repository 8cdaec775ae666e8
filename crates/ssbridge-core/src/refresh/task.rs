// ── Refresh task scheduling ──
//
// One `RefreshTask` per kind of device output. Ticks are single-flight:
// a compare-and-set on `running` admits one tick at a time, so a slow
// fixed-rate tick causes the next one to be skipped, never stacked.
// Failures are classified and handled here, so a tick never propagates
// an error (or a panic) to the scheduler.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::{Mutex, Notify};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use super::{ReconnectOutcome, RefreshJob, Schedule, TaskKind, TaskOwner, TickOutcome};
use crate::error::Disposition;
use crate::health::HealthReport;

/// How long `stop` waits for an in-flight tick before detaching it.
pub const STOP_GRACE: Duration = Duration::from_secs(2);

/// A periodic unit of work owned by one device.
pub struct RefreshTask {
    inner: Arc<TaskInner>,
    control: Mutex<Control>,
}

#[derive(Default)]
struct Control {
    /// The owner asked for this task to run.
    wanted: bool,
    active: Option<Active>,
}

struct Active {
    cancel: CancellationToken,
    /// The scheduling loop and every tick it spawned.
    tracker: TaskTracker,
}

struct TaskInner {
    kind: TaskKind,
    job: Arc<dyn RefreshJob>,
    owner: Weak<dyn TaskOwner>,
    interval_secs: AtomicI64,
    running: AtomicBool,
    idle: Notify,
}

impl RefreshTask {
    pub fn new(
        kind: TaskKind,
        interval_secs: i64,
        job: Arc<dyn RefreshJob>,
        owner: Weak<dyn TaskOwner>,
    ) -> Self {
        Self {
            inner: Arc::new(TaskInner {
                kind,
                job,
                owner,
                interval_secs: AtomicI64::new(interval_secs),
                running: AtomicBool::new(false),
                idle: Notify::new(),
            }),
            control: Mutex::new(Control::default()),
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.inner.kind
    }

    pub fn interval_secs(&self) -> i64 {
        self.inner.interval_secs.load(Ordering::Relaxed)
    }

    /// Whether ticks are currently scheduled.
    pub async fn is_scheduled(&self) -> bool {
        self.control.lock().await.active.is_some()
    }

    /// Whether a tick is executing right now.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Schedule periodic ticks. The first tick runs immediately.
    ///
    /// Returns `false` if the interval disables the task. The task stays
    /// wanted, so a later positive [`set_refresh_rate`](Self::set_refresh_rate)
    /// schedules it.
    pub async fn start(&self) -> bool {
        let mut control = self.control.lock().await;
        control.wanted = true;
        self.schedule(&mut control)
    }

    /// Cancel future ticks and wait up to [`STOP_GRACE`] for an in-flight
    /// tick. An in-flight remote call is never interrupted.
    pub async fn stop(&self) {
        let mut control = self.control.lock().await;
        control.wanted = false;
        self.unschedule(&mut control).await;
    }

    /// Change the interval. A scheduled task is stopped and restarted;
    /// zero or negative leaves it unscheduled.
    pub async fn set_refresh_rate(&self, interval_secs: i64) {
        let mut control = self.control.lock().await;
        let previous = self.inner.interval_secs.swap(interval_secs, Ordering::Relaxed);
        if previous == interval_secs {
            return;
        }
        info!(
            task = %self.inner.kind,
            from = previous,
            to = interval_secs,
            "refresh interval changed"
        );
        if control.wanted {
            self.unschedule(&mut control).await;
            self.schedule(&mut control);
        }
    }

    /// Run one tick now, under the same single-flight rule as scheduled
    /// ticks.
    pub async fn run_once(&self) -> TickOutcome {
        self.inner.tick().await
    }

    fn schedule(&self, control: &mut Control) -> bool {
        if control.active.is_some() {
            return true;
        }
        let secs = self.interval_secs();
        let Some(period) = u64::try_from(secs)
            .ok()
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
        else {
            debug!(task = %self.inner.kind, interval_secs = secs, "refresh disabled");
            return false;
        };

        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let inner = Arc::clone(&self.inner);
        let schedule = inner.kind.schedule();
        match schedule {
            Schedule::FixedRate => {
                tracker.spawn(run_fixed_rate(inner, period, cancel.clone(), tracker.clone()));
            }
            Schedule::FixedDelay => {
                tracker.spawn(run_fixed_delay(inner, period, cancel.clone()));
            }
        }
        debug!(
            task = %self.inner.kind,
            %schedule,
            interval_secs = secs,
            "refresh scheduled"
        );
        control.active = Some(Active { cancel, tracker });
        true
    }

    async fn unschedule(&self, control: &mut Control) {
        let Some(active) = control.active.take() else {
            return;
        };
        active.cancel.cancel();
        active.tracker.close();
        let drained = async {
            // Loop and spawned ticks first, then a concurrent `run_once`.
            active.tracker.wait().await;
            self.inner.wait_idle().await;
        };
        if tokio::time::timeout(STOP_GRACE, drained).await.is_err() {
            warn!(
                task = %self.inner.kind,
                grace_secs = STOP_GRACE.as_secs(),
                "in-flight refresh still running after grace period, detaching"
            );
        }
        debug!(task = %self.inner.kind, "refresh stopped");
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        if let Some(active) = self.control.get_mut().active.take() {
            active.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for RefreshTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTask")
            .field("kind", &self.inner.kind)
            .field("interval_secs", &self.interval_secs())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

// ── Scheduling loops ────────────────────────────────────────────────

async fn run_fixed_rate(
    inner: Arc<TaskInner>,
    period: Duration,
    cancel: CancellationToken,
    tracker: TaskTracker,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                // Spawned so a slow tick cannot delay the next boundary;
                // the single-flight check skips it instead.
                let inner = Arc::clone(&inner);
                let cancel = cancel.clone();
                tracker.spawn(async move {
                    // Stopped between spawn and first poll.
                    if !cancel.is_cancelled() {
                        inner.tick().await;
                    }
                });
            }
        }
    }
}

async fn run_fixed_delay(inner: Arc<TaskInner>, period: Duration, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        inner.tick().await;

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(period) => {}
        }
    }
}

// ── Tick execution ──────────────────────────────────────────────────

/// Clears the single-flight flag however the tick ends.
struct RunGuard<'a>(&'a TaskInner);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::Release);
        self.0.idle.notify_waiters();
    }
}

impl TaskInner {
    async fn tick(&self) -> TickOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!(task = %self.kind, "previous refresh still running, skipping tick");
            return TickOutcome::Skipped;
        }
        let _guard = RunGuard(self);

        let Some(owner) = self.owner.upgrade() else {
            trace!(task = %self.kind, "owner dropped, nothing to refresh");
            return TickOutcome::Idle;
        };

        match AssertUnwindSafe(self.execute(owner.as_ref()))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(task = %self.kind, device = owner.label(), "refresh panicked");
                owner.report_health(HealthReport::CommunicationError(format!(
                    "{} refresh failed unexpectedly",
                    self.kind
                )));
                TickOutcome::Failed
            }
        }
    }

    async fn execute(&self, owner: &dyn TaskOwner) -> TickOutcome {
        if !self.job.is_needed() {
            trace!(task = %self.kind, device = owner.label(), "no consumer, skipping remote call");
            return TickOutcome::Idle;
        }

        let err = match self.job.refresh().await {
            Ok(()) => {
                owner.report_health(HealthReport::Online);
                return TickOutcome::Success;
            }
            Err(err) => err,
        };

        match err.disposition() {
            Disposition::Tolerate => {
                warn!(
                    task = %self.kind,
                    device = owner.label(),
                    error = %err,
                    "refresh timed out; consider a longer refresh interval if this repeats"
                );
                TickOutcome::Tolerated
            }
            Disposition::Reconnect => {
                info!(task = %self.kind, device = owner.label(), error = %err, "session rejected, reconnecting");
                match owner.reconnect(false).await {
                    Ok(ReconnectOutcome::Reconnected) => TickOutcome::Reconnected,
                    Ok(ReconnectOutcome::AlreadyInProgress) => {
                        debug!(task = %self.kind, "reconnect already in progress elsewhere");
                        TickOutcome::Reconnected
                    }
                    Err(e) => {
                        error!(task = %self.kind, device = owner.label(), error = %e, "reconnect failed");
                        TickOutcome::ReconnectFailed
                    }
                }
            }
            Disposition::Misconfigured => {
                error!(task = %self.kind, device = owner.label(), error = %err, "refresh failed");
                owner.report_health(HealthReport::ConfigurationError(err.to_string()));
                TickOutcome::Failed
            }
            Disposition::Offline => {
                warn!(task = %self.kind, device = owner.label(), error = %err, "refresh failed");
                owner.report_health(HealthReport::CommunicationError(format!(
                    "{} refresh failed: {err}",
                    self.kind
                )));
                TickOutcome::Failed
            }
        }
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.running.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}
