// ── Core error types ──
//
// The failure taxonomy every refresh task consults after a failed call.
// Consumers never see raw envelope codes or reqwest errors; the
// `From<ssbridge_api::Error>` impl classifies them once, here.

use thiserror::Error;

use ssbridge_api::error::codes;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Remote failures ──────────────────────────────────────────────
    /// The session is no longer accepted. A fresh login should fix it.
    #[error("Session expired or rejected{}", code_suffix(*.code))]
    AuthExpired { code: Option<u16> },

    /// The surveillance package is stopped, missing or disabled.
    #[error("Surveillance Station is not available (code {code})")]
    ServiceUnavailable { code: u16 },

    /// Connect or read timed out. `None` when the duration is unknown.
    #[error("Station did not answer{}", within_secs(*.timeout_secs))]
    Timeout { timeout_secs: Option<u64> },

    /// TLS handshake, truncated body, refused connection and similar.
    /// Often a local transport problem such as certificate policy.
    #[error("Transport failure: {reason}")]
    TransportFailure { reason: String },

    /// Anything else. Carries the raw code when the station sent one.
    #[error("Request failed{}: {message}", code_suffix(*.code))]
    Unclassified { code: Option<u16>, message: String },

    // ── Local failures ───────────────────────────────────────────────
    /// Detected before any remote call: empty credentials, bad interval,
    /// unusable URL, or credentials the station rejected outright.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A command the device cannot honour.
    #[error("Operation not supported: {operation} ({reason})")]
    Unsupported { operation: String, reason: String },

    /// A command sent to a channel that does not accept it.
    #[error("Invalid command for channel '{channel}': {reason}")]
    InvalidCommand { channel: String, reason: String },
}

fn code_suffix(code: Option<u16>) -> String {
    code.map(|c| format!(" (code {c})")).unwrap_or_default()
}

fn within_secs(timeout_secs: Option<u64>) -> String {
    timeout_secs.map(|s| format!(" within {s}s")).unwrap_or_default()
}

/// What a refresh task does with a failed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Log only. Device health is untouched.
    Tolerate,
    /// Re-authenticate. Device health is untouched.
    Reconnect,
    /// Mark the device offline with a configuration-error detail.
    Misconfigured,
    /// Mark the device offline with a communication-error detail.
    Offline,
}

impl CoreError {
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Timeout { .. } => Disposition::Tolerate,
            Self::AuthExpired { .. } => Disposition::Reconnect,
            Self::Config { .. } => Disposition::Misconfigured,
            Self::ServiceUnavailable { .. }
            | Self::TransportFailure { .. }
            | Self::Unclassified { .. }
            | Self::Unsupported { .. }
            | Self::InvalidCommand { .. } => Disposition::Offline,
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired { .. })
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

const AUTH_API: &str = "SYNO.API.Auth";

impl From<ssbridge_api::Error> for CoreError {
    fn from(err: ssbridge_api::Error) -> Self {
        use ssbridge_api::Error as ApiError;

        match err {
            ApiError::Api { api, code, .. } => match code {
                codes::API_NOT_FOUND => CoreError::ServiceUnavailable { code },
                codes::INSUFFICIENT_PRIVILEGE
                | codes::SESSION_TIMEOUT
                | codes::SESSION_INTERRUPTED
                | codes::SESSION_NOT_FOUND => CoreError::AuthExpired { code: Some(code) },
                codes::LOGIN_BAD_CREDENTIALS
                | codes::LOGIN_ACCOUNT_DISABLED
                | codes::LOGIN_PERMISSION_DENIED
                    if api == AUTH_API =>
                {
                    CoreError::Config {
                        message: format!("station rejected the credentials (code {code})"),
                    }
                }
                _ => CoreError::Unclassified {
                    code: Some(code),
                    message: err.to_string(),
                },
            },
            ApiError::NotLoggedIn => CoreError::AuthExpired { code: None },
            ApiError::InvalidCredentials(reason) => CoreError::config(reason),
            ApiError::InvalidUrl(e) => CoreError::config(format!("invalid URL: {e}")),
            ApiError::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            ApiError::Transport(ref e) if e.is_timeout() => CoreError::Timeout { timeout_secs: None },
            ApiError::Transport(e) => CoreError::TransportFailure {
                reason: e.to_string(),
            },
            ApiError::Tls(reason) => CoreError::TransportFailure {
                reason: format!("TLS error: {reason}"),
            },
            ApiError::InvalidArgument(message) => CoreError::Unclassified {
                code: None,
                message,
            },
            ApiError::HttpStatus { .. }
            | ApiError::Deserialization { .. }
            | ApiError::MissingData { .. } => CoreError::Unclassified {
                code: None,
                message: err.to_string(),
            },
        }
    }
}
