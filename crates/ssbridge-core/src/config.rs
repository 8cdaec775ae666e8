// ── Runtime device configuration ──
//
// These types describe how to reach a station and what to poll.
// They carry credential data and interval tuning, but never touch disk.
// The binary builds them from `ssbridge-config` and hands them in.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use ssbridge_api::{Credentials, StreamProfile, TlsMode, TransportConfig};

use crate::error::CoreError;
use crate::refresh::TaskKind;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification. Default, since DSM ships a self-signed cert.
    #[default]
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Connection and polling settings for one station (the bridge).
///
/// Intervals are seconds. Zero or negative disables the task.
#[derive(Debug, Clone)]
pub struct StationConfig {
    /// Station URL (e.g., `https://192.168.1.10:5001`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    pub home_mode_interval_secs: i64,
    pub event_interval_secs: i64,
}

impl StationConfig {
    /// Station settings with default intervals and TLS policy.
    pub fn new(url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            url,
            username: username.into(),
            password,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(20),
            home_mode_interval_secs: 10,
            event_interval_secs: 3,
        }
    }

    /// Reject settings that can never work, before any remote call.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.username.trim().is_empty() {
            return Err(CoreError::config("username must not be empty"));
        }
        if self.password.expose_secret().is_empty() {
            return Err(CoreError::config("password must not be empty"));
        }
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(CoreError::config(format!(
                "unsupported URL scheme '{}'",
                self.url.scheme()
            )));
        }
        if self.url.host_str().is_none() {
            return Err(CoreError::config("station URL has no host"));
        }
        if self.timeout.is_zero() {
            return Err(CoreError::config("timeout must be greater than zero"));
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: (&self.tls).into(),
            timeout: self.timeout,
            ..TransportConfig::default()
        }
    }

    pub fn interval_secs(&self, kind: TaskKind) -> Option<i64> {
        match kind {
            TaskKind::HomeMode => Some(self.home_mode_interval_secs),
            TaskKind::Event => Some(self.event_interval_secs),
            _ => None,
        }
    }
}

/// Polling settings for one camera thing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConfig {
    /// Camera id as the station knows it.
    pub camera_id: u32,
    pub stream: StreamProfile,
    /// Whether the PTZ channels accept commands.
    pub ptz: bool,
    pub snapshot_interval_secs: i64,
    pub state_interval_secs: i64,
    pub live_uri_interval_secs: i64,
    pub event_interval_secs: i64,
}

impl CameraConfig {
    pub fn new(camera_id: u32) -> Self {
        Self {
            camera_id,
            stream: StreamProfile::default(),
            ptz: false,
            snapshot_interval_secs: 10,
            state_interval_secs: 10,
            live_uri_interval_secs: 3600,
            event_interval_secs: 3,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.camera_id == 0 {
            return Err(CoreError::config("camera id must be a positive number"));
        }
        Ok(())
    }

    pub fn interval_secs(&self, kind: TaskKind) -> Option<i64> {
        match kind {
            TaskKind::Snapshot => Some(self.snapshot_interval_secs),
            TaskKind::CameraState => Some(self.state_interval_secs),
            TaskKind::LiveUri => Some(self.live_uri_interval_secs),
            TaskKind::CameraEvent => Some(self.event_interval_secs),
            TaskKind::HomeMode | TaskKind::Event => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn station() -> StationConfig {
        StationConfig::new(
            Url::parse("https://nas.local:5001").unwrap(),
            "viewer",
            SecretString::from("hunter2".to_string()),
        )
    }

    #[test]
    fn valid_station_passes() {
        station().validate().unwrap();
    }

    #[test]
    fn blank_username_is_a_configuration_error() {
        let config = StationConfig {
            username: "  ".into(),
            ..station()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn empty_password_is_a_configuration_error() {
        let config = StationConfig {
            password: SecretString::from(String::new()),
            ..station()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let config = StationConfig {
            url: Url::parse("ftp://nas.local").unwrap(),
            ..station()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn camera_zero_is_rejected() {
        assert!(CameraConfig::new(0).validate().is_err());
        assert!(CameraConfig::new(3).validate().is_ok());
    }

    #[test]
    fn intervals_are_looked_up_per_task() {
        let camera = CameraConfig::new(1);
        assert_eq!(camera.interval_secs(TaskKind::LiveUri), Some(3600));
        assert_eq!(camera.interval_secs(TaskKind::HomeMode), None);
        assert_eq!(station().interval_secs(TaskKind::Event), Some(3));
    }
}
