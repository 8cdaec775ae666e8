// ── Derived device health ──
//
// Health is never polled. Each refresh tick reports its outcome, and the
// device status changes only on a transition: a failure while ONLINE goes
// OFFLINE, a success while OFFLINE comes back ONLINE.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::thing::{StatusDetail, ThingCallback, ThingStatus};

/// The outcome a tick or a lifecycle step reports to its device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthReport {
    Online,
    CommunicationError(String),
    ConfigurationError(String),
}

impl HealthReport {
    fn into_status(self) -> ThingStatus {
        match self {
            Self::Online => ThingStatus::Online,
            Self::CommunicationError(reason) => ThingStatus::Offline {
                detail: StatusDetail::CommunicationError,
                reason,
            },
            Self::ConfigurationError(reason) => ThingStatus::Offline {
                detail: StatusDetail::ConfigurationError,
                reason,
            },
        }
    }
}

/// Last published status of one device.
pub struct DeviceHealth {
    label: String,
    thing: Arc<dyn ThingCallback>,
    current: Mutex<Option<ThingStatus>>,
}

impl DeviceHealth {
    pub fn new(label: impl Into<String>, thing: Arc<dyn ThingCallback>) -> Self {
        Self {
            label: label.into(),
            thing,
            current: Mutex::new(None),
        }
    }

    /// Apply a report. Returns `true` if the published status changed.
    pub fn report(&self, report: HealthReport) -> bool {
        let next = report.into_status();
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);

        let changed = match (current.as_ref(), &next) {
            (Some(ThingStatus::Online), ThingStatus::Online) => false,
            // Keep the first failure reason while already offline for the same cause.
            (Some(ThingStatus::Offline { detail: was, .. }), ThingStatus::Offline { detail, .. }) => {
                was != detail
            }
            _ => true,
        };
        if !changed {
            debug!(device = %self.label, status = %next, "status unchanged");
            return false;
        }

        match &next {
            ThingStatus::Online => info!(device = %self.label, "device online"),
            ThingStatus::Offline { .. } => warn!(device = %self.label, status = %next, "device offline"),
        }
        // Published under the lock so concurrent ticks cannot reorder transitions.
        self.thing.update_status(next.clone());
        *current = Some(next);
        true
    }

    /// Last published status, or `None` before the first report.
    pub fn status(&self) -> Option<ThingStatus> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_online(&self) -> bool {
        self.status().is_some_and(|s| s.is_online())
    }
}

impl std::fmt::Debug for DeviceHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHealth")
            .field("label", &self.label)
            .field("current", &self.status())
            .finish_non_exhaustive()
    }
}
