// Event log and external event endpoints
//
// `Event.List` is the only way to learn about motion/alarm/etc. activity;
// the station offers no push channel. `ExternalEvent.Trigger` fires one of
// the ten user-defined external events that action rules can react to.

use tracing::debug;

use crate::client::{Endpoint, SurveillanceClient};
use crate::error::Error;
use crate::models::EventList;

const LIST: Endpoint = Endpoint::entry("SYNO.SurveillanceStation.Event", "List", 5);
const TRIGGER: Endpoint = Endpoint::entry("SYNO.SurveillanceStation.ExternalEvent", "Trigger", 1);

/// External event ids accepted by the station.
pub const EXTERNAL_EVENT_IDS: std::ops::RangeInclusive<u8> = 1..=10;

/// Filter for [`SurveillanceClient::events_since`].
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Epoch seconds; events starting at or after this are returned.
    pub from_time: i64,
    /// Wire reason codes to include. Empty means all reasons.
    pub reasons: Vec<u8>,
    /// Cameras to include. Empty means every camera.
    pub camera_ids: Vec<u32>,
    /// Upper bound on returned events.
    pub limit: u32,
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl SurveillanceClient {
    /// Query the event log from `query.from_time` onward.
    pub async fn events_since(&self, query: &EventQuery) -> Result<EventList, Error> {
        let mut params = vec![
            ("fromTime", query.from_time.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if !query.reasons.is_empty() {
            params.push(("reason", join(&query.reasons)));
        }
        if !query.camera_ids.is_empty() {
            params.push(("cameraIds", join(&query.camera_ids)));
        }

        debug!(from_time = query.from_time, reasons = ?query.reasons, "querying events");
        self.call(LIST, &params).await
    }

    /// Fire external event `event_id` (1..=10).
    pub async fn trigger_external_event(
        &self,
        event_id: u8,
        event_name: Option<&str>,
    ) -> Result<(), Error> {
        if !EXTERNAL_EVENT_IDS.contains(&event_id) {
            return Err(Error::InvalidArgument(format!(
                "external event id must be 1..=10, got {event_id}"
            )));
        }

        let mut params = vec![("eventId", event_id.to_string())];
        if let Some(name) = event_name {
            params.push(("eventName", name.to_owned()));
        }

        debug!(event_id, "triggering external event");
        self.call_unit(TRIGGER, &params).await
    }
}
