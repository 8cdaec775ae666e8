//! Device layer between `ssbridge-api` and a host platform.
//!
//! This crate owns session lifecycle, periodic polling and event
//! reconciliation for Synology Surveillance Station:
//!
//! - **[`Station`]** owns the single authenticated client for a host and
//!   runs station-wide tasks (home mode, events). Re-authentication is
//!   single-flight, so concurrent rejected calls cause one login.
//!
//! - **[`Camera`]** borrows the station's client and runs per-camera
//!   tasks (snapshot, enabled/status, stream URIs, events).
//!
//! - **[`RefreshTask`]** schedules one [`RefreshJob`] at a fixed rate or
//!   fixed delay, skips ticks while the previous one runs, and turns each
//!   outcome into a health report or a reconnect.
//!
//! - **[`EventReconciler`]** converts overlapping event-log reads into
//!   ON/OFF edges per [`EventReason`], tracking each camera separately and
//!   keeping the channel ON while any camera has an open occurrence.
//!
//! Output goes to the host through [`ThingCallback`]. Device status is
//! derived from tick outcomes; it is never polled.

pub mod camera;
pub mod config;
pub mod error;
pub mod health;
pub mod jobs;
pub mod reconcile;
pub mod refresh;
pub mod station;
pub mod thing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use camera::Camera;
pub use config::{CameraConfig, StationConfig, TlsVerification};
pub use error::{CoreError, Disposition};
pub use health::{DeviceHealth, HealthReport};
pub use reconcile::{Emission, EventReason, EventReconciler, EventState, Occurrence};
pub use refresh::{RefreshJob, RefreshTask, Schedule, TaskKind, TaskOwner, TickOutcome};
pub use station::Station;
pub use thing::{ChannelCommand, State, StatusDetail, ThingCallback, ThingStatus, channel};

pub use ssbridge_api::{CameraInfo, PtzDirection, StreamProfile};
