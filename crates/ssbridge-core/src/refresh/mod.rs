//! Periodic refresh tasks.
//!
//! Every device output is produced by one [`RefreshTask`]: a unit of
//! periodic work that fetches one slice of remote state, publishes it,
//! and reports the outcome back to its owning device. The task itself
//! knows nothing about cameras or stations. It sees only a
//! [`RefreshJob`] (what to fetch) and a [`TaskOwner`] (who to tell).

mod task;

use futures_util::future::BoxFuture;

use crate::error::CoreError;
use crate::health::HealthReport;

pub use task::{RefreshTask, STOP_GRACE};

/// The kinds of periodic work a device runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr, strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum TaskKind {
    /// Camera still image.
    Snapshot,
    /// Station-wide event reconciliation.
    Event,
    /// Camera enabled flag and status text.
    CameraState,
    /// Station home mode.
    HomeMode,
    /// Camera stream URIs.
    LiveUri,
    /// Per-camera event reconciliation.
    CameraEvent,
}

impl TaskKind {
    pub fn schedule(self) -> Schedule {
        match self {
            Self::Snapshot => Schedule::FixedRate,
            Self::Event
            | Self::CameraState
            | Self::HomeMode
            | Self::LiveUri
            | Self::CameraEvent => Schedule::FixedDelay,
        }
    }
}

/// How consecutive ticks are spaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Schedule {
    /// Ticks start every interval. A tick that finds the previous one
    /// still running is skipped.
    FixedRate,
    /// The next tick starts one interval after the previous one ended.
    FixedDelay,
}

/// The work a task performs on each tick.
pub trait RefreshJob: Send + Sync {
    /// `false` when nothing consumes the output, e.g. no linked channel.
    /// An unneeded tick makes no remote call and reports nothing.
    fn is_needed(&self) -> bool;

    /// Fetch and publish. Must not block the calling thread.
    fn refresh(&self) -> BoxFuture<'_, Result<(), CoreError>>;
}

/// What a task needs from the device that owns it.
pub trait TaskOwner: Send + Sync {
    /// Device label for logs and status reasons.
    fn label(&self) -> &str;

    fn report_health(&self, report: HealthReport);

    /// Re-authenticate the session the device's calls use.
    ///
    /// Single-flight: concurrent callers past the first get
    /// [`ReconnectOutcome::AlreadyInProgress`] and must not log in again.
    fn reconnect(&self, force_logout: bool) -> BoxFuture<'_, Result<ReconnectOutcome, CoreError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectOutcome {
    Reconnected,
    AlreadyInProgress,
}

/// Result of one tick, for callers of [`RefreshTask::run_once`] and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum TickOutcome {
    /// A previous tick of the same task was still running.
    Skipped,
    /// Nothing needed the output, or the owner is gone.
    Idle,
    Success,
    /// Timed out. Logged only.
    Tolerated,
    /// The session was renewed, by this tick or a concurrent one.
    Reconnected,
    /// Re-authentication itself failed.
    ReconnectFailed,
    /// The device was marked offline.
    Failed,
}

#[cfg(test)]
mod tests;
