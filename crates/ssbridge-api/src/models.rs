// Surveillance Station response types
//
// Every call answers with the same envelope; the payload under `data`
// differs per operation and gets its own explicit type below. Fields use
// `#[serde(default)]` liberally because DSM versions disagree on which
// fields they bother to send.

use serde::{Deserialize, Deserializer, Serialize};

// ── Response Envelope ────────────────────────────────────────────────

/// Standard envelope wrapping every JSON response:
/// ```json
/// { "success": true, "data": { ... } }
/// { "success": false, "error": { "code": 105 } }
/// ```
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: u16,
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub sid: String,
}

// ── Camera ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CameraList {
    #[serde(default)]
    pub cameras: Vec<CameraInfo>,
}

/// One camera as returned by `Camera.List` / `Camera.GetInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    pub id: u32,
    /// Name as set in Surveillance Station (newer DSM).
    #[serde(default)]
    pub new_name: Option<String>,
    /// Name as reported by older DSM.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Camera status code, see [`CameraInfo::status_text`].
    #[serde(default)]
    pub status: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// PTZ capability bitmask, 0 = no PTZ.
    #[serde(default)]
    pub ptz_cap: u32,
}

fn default_true() -> bool {
    true
}

impl CameraInfo {
    pub fn display_name(&self) -> &str {
        self.new_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("unnamed")
    }

    pub fn has_ptz(&self) -> bool {
        self.ptz_cap > 0
    }

    /// Human-readable label for the `status` code.
    pub fn status_text(&self) -> &'static str {
        match self.status {
            1 => "normal",
            2 => "deleted",
            3 => "disconnected",
            4 => "unavailable",
            5 => "ready",
            6 => "inaccessible",
            7 => "disabled",
            8 => "unrecognized",
            9 => "setting",
            10 => "server disconnected",
            11 => "migrating",
            13 => "storage removed",
            14 => "stopping",
            15 => "connection history failed",
            16 => "unauthorized",
            17 => "RTSP error",
            18 => "no video",
            _ => "other",
        }
    }
}

/// Stream URIs for one camera from `Camera.GetLiveViewPath`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveUri {
    pub id: u32,
    #[serde(default)]
    pub rtsp_path: Option<String>,
    #[serde(default)]
    pub rtsp_over_http_path: Option<String>,
    #[serde(default)]
    pub mjpeg_http_path: Option<String>,
    #[serde(default)]
    pub mxpeg_http_path: Option<String>,
    #[serde(default)]
    pub multicst_path: Option<String>,
}

/// Snapshot quality profile (`profileType`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamProfile {
    #[default]
    HighQuality,
    Balanced,
    LowBandwidth,
}

impl StreamProfile {
    pub fn code(self) -> u8 {
        match self {
            Self::HighQuality => 0,
            Self::Balanced => 1,
            Self::LowBandwidth => 2,
        }
    }
}

// ── PTZ ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PtzDirection {
    Up,
    Down,
    Left,
    Right,
    Home,
}

impl PtzDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Home => "home",
        }
    }
}

// ── Home mode ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct HomeModeInfo {
    pub on: bool,
}

// ── Events ───────────────────────────────────────────────────────────

/// Payload of `Event.List`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub events: Vec<EventRecord>,
    /// Server clock at the time of the response, epoch seconds.
    #[serde(deserialize_with = "epoch_seconds")]
    pub timestamp: i64,
    #[serde(default)]
    pub total: Option<u32>,
}

/// One event occurrence from the station's event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "eventId")]
    pub event_id: i64,
    #[serde(rename = "cameraId", default)]
    pub camera_id: u32,
    /// Wire reason code (1 = continuous, 2 = motion, ...).
    pub reason: u8,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(rename = "startTime", default)]
    pub start_time: i64,
    #[serde(rename = "stopTime", default)]
    pub stop_time: Option<i64>,
    #[serde(default)]
    pub camera_name: Option<String>,
}

/// Accept epoch seconds as either a JSON number or a numeric string.
fn epoch_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
