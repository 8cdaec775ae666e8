// ── Host platform callbacks ──
//
// A device (station or camera) publishes channel states and its own
// status through `ThingCallback`. The host decides which channels are
// linked; tasks whose channels are all unlinked skip their remote call.

use std::fmt;

use bytes::Bytes;

use ssbridge_api::PtzDirection;

/// Implemented by the host to receive device output.
///
/// Called from refresh tasks on arbitrary runtime threads.
pub trait ThingCallback: Send + Sync {
    /// Whether anything consumes this channel.
    fn is_linked(&self, channel: &str) -> bool;

    fn update_state(&self, channel: &str, state: State);

    fn update_status(&self, status: ThingStatus);
}

/// A channel value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    OnOff(bool),
    Text(String),
    /// Raw JPEG bytes.
    Image(Bytes),
    /// The station had no value for this channel.
    Undef,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnOff(true) => f.write_str("ON"),
            Self::OnOff(false) => f.write_str("OFF"),
            Self::Text(text) => f.write_str(text),
            Self::Image(bytes) => write!(f, "<image {} bytes>", bytes.len()),
            Self::Undef => f.write_str("UNDEF"),
        }
    }
}

/// Why a device is offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusDetail {
    CommunicationError,
    ConfigurationError,
}

/// Device status as shown to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThingStatus {
    Online,
    Offline { detail: StatusDetail, reason: String },
}

impl ThingStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for ThingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => f.write_str("ONLINE"),
            Self::Offline { detail, reason } => write!(f, "OFFLINE ({detail}): {reason}"),
        }
    }
}

/// A command sent by the host to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCommand {
    OnOff(bool),
    Number(i64),
    /// Re-read the channel now.
    Refresh,
}

/// Channel identifiers.
///
/// Event channels are derived from [`EventReason`](crate::EventReason).
pub mod channel {
    use super::PtzDirection;

    // Station
    pub const HOME_MODE: &str = "home-mode";
    pub const EXTERNAL_EVENT: &str = "external-event";

    // Camera
    pub const SNAPSHOT: &str = "snapshot";
    pub const ENABLE: &str = "enable";
    pub const STATUS: &str = "status";
    pub const RTSP_URI: &str = "rtsp-uri";
    pub const MJPEG_URI: &str = "mjpeg-uri";
    pub const PTZ_UP: &str = "ptz-up";
    pub const PTZ_DOWN: &str = "ptz-down";
    pub const PTZ_LEFT: &str = "ptz-left";
    pub const PTZ_RIGHT: &str = "ptz-right";
    pub const PTZ_HOME: &str = "ptz-home";

    /// Map a PTZ channel to the direction it drives.
    pub fn ptz_direction(channel: &str) -> Option<PtzDirection> {
        match channel {
            PTZ_UP => Some(PtzDirection::Up),
            PTZ_DOWN => Some(PtzDirection::Down),
            PTZ_LEFT => Some(PtzDirection::Left),
            PTZ_RIGHT => Some(PtzDirection::Right),
            PTZ_HOME => Some(PtzDirection::Home),
            _ => None,
        }
    }
}
