// ── Concrete refresh jobs ──
//
// Each job fetches one slice of station state and publishes it to the
// owning device's channels. Scheduling, single-flight and failure
// handling live in `refresh`; jobs only call, convert and publish.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use strum::IntoEnumIterator;
use tracing::{debug, trace};

use ssbridge_api::{EventQuery, StreamProfile, SurveillanceClient};

use crate::error::CoreError;
use crate::reconcile::{EventReason, EventReconciler, Occurrence};
use crate::refresh::RefreshJob;
use crate::thing::{State, ThingCallback, channel};

/// Upper bound on events fetched per poll.
pub const EVENT_QUERY_LIMIT: u32 = 100;

fn any_linked(thing: &dyn ThingCallback, channels: &[&str]) -> bool {
    channels.iter().any(|c| thing.is_linked(c))
}

fn text_or_undef(value: Option<String>) -> State {
    value
        .filter(|v| !v.is_empty())
        .map_or(State::Undef, State::Text)
}

// ── Snapshot ────────────────────────────────────────────────────────

pub struct SnapshotJob {
    client: Arc<SurveillanceClient>,
    thing: Arc<dyn ThingCallback>,
    camera_id: u32,
    profile: Mutex<StreamProfile>,
}

impl SnapshotJob {
    pub fn new(
        client: Arc<SurveillanceClient>,
        thing: Arc<dyn ThingCallback>,
        camera_id: u32,
        profile: StreamProfile,
    ) -> Self {
        Self {
            client,
            thing,
            camera_id,
            profile: Mutex::new(profile),
        }
    }

    pub fn set_profile(&self, profile: StreamProfile) {
        *self.profile.lock().unwrap_or_else(PoisonError::into_inner) = profile;
    }

    fn profile(&self) -> StreamProfile {
        *self.profile.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RefreshJob for SnapshotJob {
    fn is_needed(&self) -> bool {
        self.thing.is_linked(channel::SNAPSHOT)
    }

    fn refresh(&self) -> BoxFuture<'_, Result<(), CoreError>> {
        async move {
            let image = self.client.snapshot(self.camera_id, self.profile()).await?;
            trace!(camera_id = self.camera_id, bytes = image.len(), "snapshot fetched");
            self.thing.update_state(channel::SNAPSHOT, State::Image(image));
            Ok(())
        }
        .boxed()
    }
}

// ── Camera state ────────────────────────────────────────────────────

pub struct CameraStateJob {
    client: Arc<SurveillanceClient>,
    thing: Arc<dyn ThingCallback>,
    camera_id: u32,
}

impl CameraStateJob {
    pub fn new(client: Arc<SurveillanceClient>, thing: Arc<dyn ThingCallback>, camera_id: u32) -> Self {
        Self {
            client,
            thing,
            camera_id,
        }
    }
}

impl RefreshJob for CameraStateJob {
    fn is_needed(&self) -> bool {
        any_linked(self.thing.as_ref(), &[channel::ENABLE, channel::STATUS])
    }

    fn refresh(&self) -> BoxFuture<'_, Result<(), CoreError>> {
        async move {
            let info = self.client.camera_info(self.camera_id).await?;
            self.thing
                .update_state(channel::ENABLE, State::OnOff(info.enabled));
            self.thing
                .update_state(channel::STATUS, State::Text(info.status_text().to_owned()));
            Ok(())
        }
        .boxed()
    }
}

// ── Live URIs ───────────────────────────────────────────────────────

pub struct LiveUriJob {
    client: Arc<SurveillanceClient>,
    thing: Arc<dyn ThingCallback>,
    camera_id: u32,
}

impl LiveUriJob {
    pub fn new(client: Arc<SurveillanceClient>, thing: Arc<dyn ThingCallback>, camera_id: u32) -> Self {
        Self {
            client,
            thing,
            camera_id,
        }
    }
}

impl RefreshJob for LiveUriJob {
    fn is_needed(&self) -> bool {
        any_linked(self.thing.as_ref(), &[channel::RTSP_URI, channel::MJPEG_URI])
    }

    fn refresh(&self) -> BoxFuture<'_, Result<(), CoreError>> {
        async move {
            let uri = self.client.live_uri(self.camera_id).await?;
            self.thing
                .update_state(channel::RTSP_URI, text_or_undef(uri.rtsp_path));
            self.thing
                .update_state(channel::MJPEG_URI, text_or_undef(uri.mjpeg_http_path));
            Ok(())
        }
        .boxed()
    }
}

// ── Home mode ───────────────────────────────────────────────────────

pub struct HomeModeJob {
    client: Arc<SurveillanceClient>,
    thing: Arc<dyn ThingCallback>,
}

impl HomeModeJob {
    pub fn new(client: Arc<SurveillanceClient>, thing: Arc<dyn ThingCallback>) -> Self {
        Self { client, thing }
    }
}

impl RefreshJob for HomeModeJob {
    fn is_needed(&self) -> bool {
        self.thing.is_linked(channel::HOME_MODE)
    }

    fn refresh(&self) -> BoxFuture<'_, Result<(), CoreError>> {
        async move {
            let on = self.client.home_mode().await?;
            self.thing.update_state(channel::HOME_MODE, State::OnOff(on));
            Ok(())
        }
        .boxed()
    }
}

// ── Events ──────────────────────────────────────────────────────────

/// Polls the event log and feeds the reconciler.
///
/// Station-wide when `camera_id` is `None`, otherwise filtered to one
/// camera. Only reasons with a linked channel are queried.
pub struct EventJob {
    client: Arc<SurveillanceClient>,
    thing: Arc<dyn ThingCallback>,
    camera_id: Option<u32>,
    reconciler: Mutex<EventReconciler>,
}

impl EventJob {
    pub fn new(
        client: Arc<SurveillanceClient>,
        thing: Arc<dyn ThingCallback>,
        camera_id: Option<u32>,
    ) -> Self {
        Self::with_reconciler(client, thing, camera_id, EventReconciler::starting_now())
    }

    pub fn with_reconciler(
        client: Arc<SurveillanceClient>,
        thing: Arc<dyn ThingCallback>,
        camera_id: Option<u32>,
        reconciler: EventReconciler,
    ) -> Self {
        Self {
            client,
            thing,
            camera_id,
            reconciler: Mutex::new(reconciler),
        }
    }

    fn observed(&self) -> Vec<EventReason> {
        EventReason::iter()
            .filter(|r| self.thing.is_linked(r.channel()))
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EventReconciler> {
        self.reconciler.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RefreshJob for EventJob {
    fn is_needed(&self) -> bool {
        EventReason::iter().any(|r| self.thing.is_linked(r.channel()))
    }

    fn refresh(&self) -> BoxFuture<'_, Result<(), CoreError>> {
        async move {
            let observed = self.observed();
            let query = EventQuery {
                from_time: self.lock().watermark(),
                reasons: observed.iter().map(|r| r.code()).collect(),
                camera_ids: self.camera_id.into_iter().collect(),
                limit: EVENT_QUERY_LIMIT,
            };
            let list = self.client.events_since(&query).await?;

            let occurrences: Vec<Occurrence> = list
                .events
                .iter()
                .filter(|e| self.camera_id.is_none_or(|id| e.camera_id == id))
                .filter_map(Occurrence::from_record)
                .collect();

            // Lock held for the merge only, never across the remote call.
            let emissions = self.lock().apply(&observed, &occurrences, list.timestamp);
            if !emissions.is_empty() {
                debug!(
                    camera_id = ?self.camera_id,
                    count = emissions.len(),
                    "event state changed"
                );
            }
            for emission in emissions {
                self.thing
                    .update_state(emission.reason.channel(), emission.state());
            }
            Ok(())
        }
        .boxed()
    }
}
