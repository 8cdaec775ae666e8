// ── Station (bridge) device ──
//
// Owns the one authenticated client for a Surveillance Station host.
// Cameras borrow this client and re-authenticate through the station, so
// a session rotated by any task is seen by every other task at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, join_all};
use tracing::{debug, error, info, warn};

use ssbridge_api::events::EXTERNAL_EVENT_IDS;
use ssbridge_api::{CameraInfo, StreamProfile, SurveillanceClient};

use crate::config::StationConfig;
use crate::error::{CoreError, Disposition};
use crate::health::{DeviceHealth, HealthReport};
use crate::jobs::{EventJob, HomeModeJob};
use crate::reconcile::EventReason;
use crate::refresh::{ReconnectOutcome, RefreshTask, TaskKind, TaskOwner};
use crate::thing::{ChannelCommand, State, ThingCallback, ThingStatus, channel};

/// A Surveillance Station host and its station-wide tasks.
#[derive(Clone)]
pub struct Station {
    inner: Arc<StationInner>,
}

pub(crate) struct StationInner {
    label: String,
    config: StationConfig,
    client: Arc<SurveillanceClient>,
    thing: Arc<dyn ThingCallback>,
    health: DeviceHealth,
    /// Set when the station refused the credentials; blocks further logins.
    credentials_rejected: AtomicBool,
    tasks: Vec<RefreshTask>,
}

impl Station {
    /// Build the station and its HTTP client. No remote call is made.
    pub fn new(config: StationConfig, thing: Arc<dyn ThingCallback>) -> Result<Self, CoreError> {
        let client = SurveillanceClient::new(config.url.clone(), config.credentials(), &config.transport())?;
        Ok(Self::with_client(config, client, thing))
    }

    /// Build the station around a pre-built client.
    pub fn with_client(
        config: StationConfig,
        client: SurveillanceClient,
        thing: Arc<dyn ThingCallback>,
    ) -> Self {
        let client = Arc::new(client);
        let label = format!("station {}", config.url.host_str().unwrap_or("<no host>"));
        let health = DeviceHealth::new(label.clone(), Arc::clone(&thing));

        let inner = Arc::new_cyclic(|weak: &Weak<StationInner>| {
            let owner: Weak<dyn TaskOwner> = weak.clone();
            let tasks = vec![
                RefreshTask::new(
                    TaskKind::HomeMode,
                    config.home_mode_interval_secs,
                    Arc::new(HomeModeJob::new(Arc::clone(&client), Arc::clone(&thing))),
                    owner.clone(),
                ),
                RefreshTask::new(
                    TaskKind::Event,
                    config.event_interval_secs,
                    Arc::new(EventJob::new(Arc::clone(&client), Arc::clone(&thing), None)),
                    owner,
                ),
            ];
            StationInner {
                label,
                config,
                client,
                thing,
                health,
                credentials_rejected: AtomicBool::new(false),
                tasks,
            }
        });
        Self { inner }
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn config(&self) -> &StationConfig {
        &self.inner.config
    }

    /// The shared client. Cameras call the station through this.
    pub fn client(&self) -> &Arc<SurveillanceClient> {
        &self.inner.client
    }

    /// Last published status, `None` before [`initialize`](Self::initialize).
    pub fn status(&self) -> Option<ThingStatus> {
        self.inner.health.status()
    }

    pub fn task(&self, kind: TaskKind) -> Option<&RefreshTask> {
        self.inner.tasks.iter().find(|t| t.kind() == kind)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Validate the configuration, log in and start the station tasks.
    ///
    /// A configuration problem marks the station offline and returns the
    /// error without contacting the station. A failed login for any other
    /// reason marks it offline but still starts the tasks, which retry the
    /// login on their next tick.
    pub async fn initialize(&self) -> Result<(), CoreError> {
        if let Err(err) = self.inner.config.validate() {
            error!(station = %self.inner.label, error = %err, "invalid configuration");
            self.inner
                .health
                .report(HealthReport::ConfigurationError(err.to_string()));
            return Err(err);
        }

        self.inner.credentials_rejected.store(false, Ordering::SeqCst);
        match self.inner.relogin(true).await {
            Ok(_) => {}
            Err(err) if err.disposition() == Disposition::Misconfigured => return Err(err),
            Err(err) => {
                warn!(station = %self.inner.label, error = %err, "initial login failed, tasks will retry");
                self.inner
                    .health
                    .report(HealthReport::CommunicationError(format!("login failed: {err}")));
            }
        }

        for task in &self.inner.tasks {
            task.start().await;
        }
        info!(station = %self.inner.label, "station initialized");
        Ok(())
    }

    /// Stop all tasks, then end the session.
    pub async fn dispose(&self) {
        join_all(self.inner.tasks.iter().map(RefreshTask::stop)).await;
        self.inner.client.disconnect().await;
        info!(station = %self.inner.label, "station disposed");
    }

    /// Re-authenticate. See [`TaskOwner::reconnect`].
    pub async fn reconnect(&self, force_logout: bool) -> Result<ReconnectOutcome, CoreError> {
        self.inner.relogin(force_logout).await
    }

    pub async fn set_refresh_rate(&self, kind: TaskKind, interval_secs: i64) -> Result<(), CoreError> {
        let task = self.task(kind).ok_or_else(|| CoreError::Unsupported {
            operation: format!("{kind} refresh"),
            reason: "not a station task".into(),
        })?;
        task.set_refresh_rate(interval_secs).await;
        Ok(())
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn handle_command(&self, channel_id: &str, command: ChannelCommand) -> Result<(), CoreError> {
        debug!(station = %self.inner.label, channel = channel_id, ?command, "command");
        match (channel_id, command) {
            (_, ChannelCommand::Refresh) => {
                let kind = if channel_id == channel::HOME_MODE {
                    TaskKind::HomeMode
                } else if is_event_channel(channel_id) {
                    TaskKind::Event
                } else {
                    return Err(invalid(channel_id, "channel has no refreshable state"));
                };
                if let Some(task) = self.task(kind) {
                    let outcome = task.run_once().await;
                    debug!(station = %self.inner.label, %kind, %outcome, "refresh on demand");
                }
                Ok(())
            }
            (channel::HOME_MODE, ChannelCommand::OnOff(on)) => {
                self.settle(self.inner.client.set_home_mode(on).await).await?;
                self.inner.thing.update_state(channel::HOME_MODE, State::OnOff(on));
                Ok(())
            }
            (channel::EXTERNAL_EVENT, ChannelCommand::Number(n)) => {
                let event_id = u8::try_from(n)
                    .ok()
                    .filter(|id| EXTERNAL_EVENT_IDS.contains(id))
                    .ok_or_else(|| invalid(channel_id, &format!("external event must be 1..=10, got {n}")))?;
                self.settle(self.inner.client.trigger_external_event(event_id, None).await)
                    .await
            }
            (_, command) => Err(invalid(channel_id, &format!("unsupported command {command:?}"))),
        }
    }

    // ── One-shot queries ─────────────────────────────────────────────

    pub async fn list_cameras(&self) -> Result<Vec<CameraInfo>, CoreError> {
        self.settle(self.inner.client.list_cameras().await).await
    }

    pub async fn home_mode(&self) -> Result<bool, CoreError> {
        self.settle(self.inner.client.home_mode().await).await
    }

    pub async fn snapshot(&self, camera_id: u32, profile: StreamProfile) -> Result<Bytes, CoreError> {
        self.settle(self.inner.client.snapshot(camera_id, profile).await).await
    }

    /// Classify a command result, starting a reconnect if the session
    /// was rejected. The original error is still returned.
    pub(crate) async fn settle<T>(&self, result: Result<T, ssbridge_api::Error>) -> Result<T, CoreError> {
        let err = match result {
            Ok(value) => return Ok(value),
            Err(e) => CoreError::from(e),
        };
        if err.is_auth_expired() {
            if let Err(e) = self.reconnect(false).await {
                warn!(station = %self.inner.label, error = %e, "reconnect after rejected command failed");
            }
        }
        Err(err)
    }
}

impl StationInner {
    async fn relogin(&self, force_logout: bool) -> Result<ReconnectOutcome, CoreError> {
        if self.credentials_rejected.load(Ordering::SeqCst) {
            return Err(CoreError::config(
                "credentials were rejected by the station; update the configuration",
            ));
        }
        let Some(_guard) = self.client.session().try_begin_reconnect() else {
            debug!(station = %self.label, "reconnect already in progress");
            return Ok(ReconnectOutcome::AlreadyInProgress);
        };

        info!(station = %self.label, force_logout, "logging in");
        match self.client.connect(force_logout).await {
            Ok(session) => {
                info!(station = %self.label, generation = session.generation(), "session established");
                // Clears an earlier OFFLINE, whichever path logged in.
                self.health.report(HealthReport::Online);
                Ok(ReconnectOutcome::Reconnected)
            }
            Err(e) => {
                let err = CoreError::from(e);
                if err.disposition() == Disposition::Misconfigured {
                    self.credentials_rejected.store(true, Ordering::SeqCst);
                    error!(station = %self.label, error = %err, "login rejected");
                    self.health
                        .report(HealthReport::ConfigurationError(err.to_string()));
                }
                Err(err)
            }
        }
    }
}

impl TaskOwner for StationInner {
    fn label(&self) -> &str {
        &self.label
    }

    fn report_health(&self, report: HealthReport) {
        self.health.report(report);
    }

    fn reconnect(&self, force_logout: bool) -> BoxFuture<'_, Result<ReconnectOutcome, CoreError>> {
        self.relogin(force_logout).boxed()
    }
}

impl std::fmt::Debug for Station {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Station")
            .field("label", &self.inner.label)
            .field("status", &self.inner.health.status())
            .finish_non_exhaustive()
    }
}

pub(crate) fn is_event_channel(channel_id: &str) -> bool {
    use strum::IntoEnumIterator;
    EventReason::iter().any(|r| r.channel() == channel_id)
}

pub(crate) fn invalid(channel_id: &str, reason: &str) -> CoreError {
    CoreError::InvalidCommand {
        channel: channel_id.to_owned(),
        reason: reason.to_owned(),
    }
}
