//! Configuration for the ssbridge binary.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `ssbridge_core::StationConfig` / `CameraConfig`.
//! Core never reads config files; everything disk-related lives here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ssbridge_core::{CameraConfig, StationConfig, StreamProfile, TlsVerification};

/// Keyring service name; entries are `{profile}/password`.
pub const KEYRING_SERVICE: &str = "ssbridge";
/// Environment prefix for config overrides and credentials.
pub const ENV_PREFIX: &str = "SSBRIDGE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in {path}")]
    UnknownProfile { name: String, path: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named station profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

/// Values a profile falls back to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept self-signed certificates.
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    #[serde(default = "default_home_mode_interval")]
    pub home_mode_interval: i64,

    #[serde(default = "default_event_interval")]
    pub event_interval: i64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            insecure: default_insecure(),
            home_mode_interval: default_home_mode_interval(),
            event_interval: default_event_interval(),
        }
    }
}

fn default_timeout() -> u64 {
    20
}
fn default_insecure() -> bool {
    true
}
fn default_home_mode_interval() -> i64 {
    10
}
fn default_event_interval() -> i64 {
    3
}

/// One station.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Station base URL (e.g., "https://nas.local:5001").
    pub url: String,

    pub username: Option<String>,

    /// Plaintext password. Prefer the keyring or an environment variable.
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// PEM file with the CA that signed the station certificate.
    pub ca_cert: Option<PathBuf>,

    /// Overrides `defaults.insecure`.
    pub insecure: Option<bool>,

    /// Overrides `defaults.timeout`.
    pub timeout: Option<u64>,

    /// Seconds between home-mode polls. Zero or negative disables.
    pub home_mode_interval: Option<i64>,

    /// Seconds between station-wide event polls. Zero or negative disables.
    pub event_interval: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cameras: Vec<CameraProfile>,
}

/// One camera under a station profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraProfile {
    pub id: u32,

    #[serde(default)]
    pub stream: StreamProfile,

    /// Whether PTZ commands are accepted.
    #[serde(default)]
    pub ptz: bool,

    pub snapshot_interval: Option<i64>,
    pub state_interval: Option<i64>,
    pub live_uri_interval: Option<i64>,
    pub event_interval: Option<i64>,
}

impl Config {
    /// Look up a profile, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());
        self.profiles
            .get(&name)
            .map(|p| (name.clone(), p))
            .ok_or_else(|| ConfigError::UnknownProfile {
                name,
                path: config_path().display().to_string(),
            })
    }

    /// Render as TOML with plaintext passwords masked.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut redacted = self.clone();
        for profile in redacted.profiles.values_mut() {
            if profile.password.is_some() {
                profile.password = Some("********".into());
            }
        }
        Ok(toml::to_string_pretty(&redacted)?)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "ssbridge", "ssbridge").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("ssbridge");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then the TOML file at `path` (if present), then
/// `SSBRIDGE_`-prefixed environment variables (`__` separates keys).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    Ok(figment.extract()?)
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Where credentials come from besides the config file.
pub trait SecretSource {
    fn env(&self, key: &str) -> Option<String>;

    /// The keyring password for `profile`.
    fn keyring(&self, profile: &str) -> Option<String>;
}

/// Process environment and the platform keyring.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSecrets;

impl SecretSource for SystemSecrets {
    fn env(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn keyring(&self, profile: &str) -> Option<String> {
        keyring::Entry::new(KEYRING_SERVICE, &format!("{profile}/password"))
            .and_then(|entry| entry.get_password())
            .ok()
    }
}

/// Username from the profile, else `SSBRIDGE_USERNAME`.
pub fn resolve_username(
    profile: &Profile,
    profile_name: &str,
    secrets: &impl SecretSource,
) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .or_else(|| secrets.env("SSBRIDGE_USERNAME"))
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Password chain: `password_env`, `SSBRIDGE_PASSWORD`, keyring, plaintext.
pub fn resolve_password(
    profile: &Profile,
    profile_name: &str,
    secrets: &impl SecretSource,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env, then the global variable
    let from_env = profile
        .password_env
        .as_deref()
        .and_then(|name| secrets.env(name))
        .or_else(|| secrets.env("SSBRIDGE_PASSWORD"));
    if let Some(pw) = from_env {
        return Ok(SecretString::from(pw));
    }

    // 2. System keyring
    if let Some(pw) = secrets.keyring(profile_name) {
        return Ok(SecretString::from(pw));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Translation to core types ───────────────────────────────────────

/// Build a `StationConfig` from a profile and the global defaults.
pub fn profile_to_station_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    secrets: &impl SecretSource,
) -> Result<StationConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: '{}'", profile.url),
    })?;

    let username = resolve_username(profile, profile_name, secrets)?;
    let password = resolve_password(profile, profile_name, secrets)?;

    let tls = if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else {
        TlsVerification::SystemDefaults
    };

    let timeout_secs = profile.timeout.unwrap_or(defaults.timeout);
    if timeout_secs == 0 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least one second".into(),
        });
    }

    let mut config = StationConfig::new(url, username, password);
    config.tls = tls;
    config.timeout = Duration::from_secs(timeout_secs);
    config.home_mode_interval_secs = profile
        .home_mode_interval
        .unwrap_or(defaults.home_mode_interval);
    config.event_interval_secs = profile.event_interval.unwrap_or(defaults.event_interval);
    Ok(config)
}

/// Camera configs declared under a profile, in file order.
pub fn camera_configs(profile: &Profile) -> Result<Vec<CameraConfig>, ConfigError> {
    let mut seen = std::collections::HashSet::new();
    profile
        .cameras
        .iter()
        .map(|cam| {
            if cam.id == 0 || !seen.insert(cam.id) {
                return Err(ConfigError::Validation {
                    field: "cameras.id".into(),
                    reason: format!("camera id {} is zero or listed twice", cam.id),
                });
            }
            let base = CameraConfig::new(cam.id);
            Ok(CameraConfig {
                stream: cam.stream,
                ptz: cam.ptz,
                snapshot_interval_secs: cam.snapshot_interval.unwrap_or(base.snapshot_interval_secs),
                state_interval_secs: cam.state_interval.unwrap_or(base.state_interval_secs),
                live_uri_interval_secs: cam.live_uri_interval.unwrap_or(base.live_uri_interval_secs),
                event_interval_secs: cam.event_interval.unwrap_or(base.event_interval_secs),
                ..base
            })
        })
        .collect()
}
