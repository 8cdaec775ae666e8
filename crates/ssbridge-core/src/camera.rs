// ── Camera device ──
//
// A camera has no session of its own: it calls through the station's
// client and asks the station to re-authenticate when a call is rejected.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, join_all};
use tracing::{debug, error, info};

use ssbridge_api::PtzDirection;

use crate::config::CameraConfig;
use crate::error::CoreError;
use crate::health::{DeviceHealth, HealthReport};
use crate::jobs::{CameraStateJob, EventJob, LiveUriJob, SnapshotJob};
use crate::refresh::{ReconnectOutcome, RefreshTask, TaskKind, TaskOwner};
use crate::station::{Station, invalid, is_event_channel};
use crate::thing::{ChannelCommand, State, ThingCallback, ThingStatus, channel};

/// One camera on a station.
#[derive(Clone)]
pub struct Camera {
    inner: Arc<CameraInner>,
}

struct CameraInner {
    label: String,
    camera_id: u32,
    station: Station,
    thing: Arc<dyn ThingCallback>,
    health: DeviceHealth,
    config: Mutex<CameraConfig>,
    snapshot: Arc<SnapshotJob>,
    tasks: Vec<RefreshTask>,
}

impl Camera {
    pub fn new(station: &Station, config: CameraConfig, thing: Arc<dyn ThingCallback>) -> Self {
        let client = station.client();
        let camera_id = config.camera_id;
        let label = format!("camera {camera_id}");
        let health = DeviceHealth::new(label.clone(), Arc::clone(&thing));
        let snapshot = Arc::new(SnapshotJob::new(
            Arc::clone(client),
            Arc::clone(&thing),
            camera_id,
            config.stream,
        ));

        let inner = Arc::new_cyclic(|weak: &Weak<CameraInner>| {
            let owner: Weak<dyn TaskOwner> = weak.clone();
            let tasks = vec![
                RefreshTask::new(
                    TaskKind::Snapshot,
                    config.snapshot_interval_secs,
                    snapshot.clone(),
                    owner.clone(),
                ),
                RefreshTask::new(
                    TaskKind::CameraState,
                    config.state_interval_secs,
                    Arc::new(CameraStateJob::new(Arc::clone(client), Arc::clone(&thing), camera_id)),
                    owner.clone(),
                ),
                RefreshTask::new(
                    TaskKind::LiveUri,
                    config.live_uri_interval_secs,
                    Arc::new(LiveUriJob::new(Arc::clone(client), Arc::clone(&thing), camera_id)),
                    owner.clone(),
                ),
                RefreshTask::new(
                    TaskKind::CameraEvent,
                    config.event_interval_secs,
                    Arc::new(EventJob::new(Arc::clone(client), Arc::clone(&thing), Some(camera_id))),
                    owner,
                ),
            ];
            CameraInner {
                label,
                camera_id,
                station: station.clone(),
                thing,
                health,
                config: Mutex::new(config),
                snapshot,
                tasks,
            }
        });
        Self { inner }
    }

    pub fn camera_id(&self) -> u32 {
        self.inner.camera_id
    }

    pub fn config(&self) -> CameraConfig {
        self.inner.config().clone()
    }

    pub fn status(&self) -> Option<ThingStatus> {
        self.inner.health.status()
    }

    pub fn task(&self, kind: TaskKind) -> Option<&RefreshTask> {
        self.inner.tasks.iter().find(|t| t.kind() == kind)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Validate the configuration and start the camera tasks.
    ///
    /// The camera starts ONLINE when the station holds a session and
    /// OFFLINE otherwise; the first completed tick corrects either.
    pub async fn initialize(&self) -> Result<(), CoreError> {
        let validated = self.inner.config().validate();
        if let Err(err) = validated {
            error!(camera = %self.inner.label, error = %err, "invalid configuration");
            self.inner
                .health
                .report(HealthReport::ConfigurationError(err.to_string()));
            return Err(err);
        }

        if self.inner.station.client().session().is_active() {
            self.inner.health.report(HealthReport::Online);
        } else {
            self.inner
                .health
                .report(HealthReport::CommunicationError("station is not connected".into()));
        }

        for task in &self.inner.tasks {
            task.start().await;
        }
        info!(camera = %self.inner.label, "camera initialized");
        Ok(())
    }

    /// Stop all tasks. The session belongs to the station and stays.
    pub async fn dispose(&self) {
        join_all(self.inner.tasks.iter().map(RefreshTask::stop)).await;
        info!(camera = %self.inner.label, "camera disposed");
    }

    /// Apply changed settings. Tasks whose interval changed are
    /// rescheduled; the rest keep running undisturbed.
    pub async fn update_config(&self, config: CameraConfig) -> Result<(), CoreError> {
        config.validate()?;
        if config.camera_id != self.inner.camera_id {
            return Err(CoreError::config(format!(
                "camera id cannot change from {} to {}; recreate the camera",
                self.inner.camera_id, config.camera_id
            )));
        }

        self.inner.snapshot.set_profile(config.stream);
        for task in &self.inner.tasks {
            if let Some(secs) = config.interval_secs(task.kind()) {
                task.set_refresh_rate(secs).await;
            }
        }
        *self.inner.config.lock().unwrap_or_else(PoisonError::into_inner) = config;
        debug!(camera = %self.inner.label, "configuration updated");
        Ok(())
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn handle_command(&self, channel_id: &str, command: ChannelCommand) -> Result<(), CoreError> {
        debug!(camera = %self.inner.label, channel = channel_id, ?command, "command");

        if let Some(direction) = channel::ptz_direction(channel_id) {
            return self.ptz(channel_id, direction, command).await;
        }

        let station = &self.inner.station;
        let client = station.client();
        let camera_id = self.inner.camera_id;
        match (channel_id, command) {
            (_, ChannelCommand::Refresh) => {
                let kind = refresh_kind(channel_id)
                    .ok_or_else(|| invalid(channel_id, "channel has no refreshable state"))?;
                if let Some(task) = self.task(kind) {
                    let outcome = task.run_once().await;
                    debug!(camera = %self.inner.label, %kind, %outcome, "refresh on demand");
                }
                Ok(())
            }
            (channel::ENABLE, ChannelCommand::OnOff(on)) => {
                let result = if on {
                    client.enable_camera(camera_id).await
                } else {
                    client.disable_camera(camera_id).await
                };
                station.settle(result).await?;
                self.inner.thing.update_state(channel::ENABLE, State::OnOff(on));
                if let Some(task) = self.task(TaskKind::CameraState) {
                    task.run_once().await;
                }
                Ok(())
            }
            (_, command) => Err(invalid(channel_id, &format!("unsupported command {command:?}"))),
        }
    }

    async fn ptz(&self, channel_id: &str, direction: PtzDirection, command: ChannelCommand) -> Result<(), CoreError> {
        let ptz_enabled = self.inner.config().ptz;
        if !ptz_enabled {
            return Err(CoreError::Unsupported {
                operation: format!("PTZ {}", direction.as_str()),
                reason: format!("{} has no PTZ capability configured", self.inner.label),
            });
        }
        let ChannelCommand::OnOff(start) = command else {
            return Err(invalid(channel_id, "PTZ channels accept ON (start) and OFF (stop)"));
        };

        let client = self.inner.station.client();
        let camera_id = self.inner.camera_id;
        let result = if start {
            client.ptz_start(camera_id, direction).await
        } else {
            client.ptz_stop(camera_id, direction).await
        };
        self.inner.station.settle(result).await
    }
}

impl CameraInner {
    fn config(&self) -> std::sync::MutexGuard<'_, CameraConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaskOwner for CameraInner {
    fn label(&self) -> &str {
        &self.label
    }

    fn report_health(&self, report: HealthReport) {
        self.health.report(report);
    }

    fn reconnect(&self, force_logout: bool) -> BoxFuture<'_, Result<ReconnectOutcome, CoreError>> {
        self.station.reconnect(force_logout).boxed()
    }
}

impl std::fmt::Debug for Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Camera")
            .field("camera_id", &self.inner.camera_id)
            .field("status", &self.inner.health.status())
            .finish_non_exhaustive()
    }
}

fn refresh_kind(channel_id: &str) -> Option<TaskKind> {
    match channel_id {
        channel::SNAPSHOT => Some(TaskKind::Snapshot),
        channel::ENABLE | channel::STATUS => Some(TaskKind::CameraState),
        channel::RTSP_URI | channel::MJPEG_URI => Some(TaskKind::LiveUri),
        other if is_event_channel(other) => Some(TaskKind::CameraEvent),
        _ => None,
    }
}
