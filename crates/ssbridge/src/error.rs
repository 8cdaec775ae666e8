//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help text.

use miette::Diagnostic;
use thiserror::Error;

use ssbridge_config::ConfigError;
use ssbridge_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the station: {reason}")]
    #[diagnostic(
        code(ssbridge::connection_failed),
        help(
            "Check that DSM is running and Surveillance Station is installed.\n\
             A self-signed certificate needs --insecure (-k) or ca_cert in the profile."
        )
    )]
    ConnectionFailed { reason: String },

    #[error("The station is temporarily unavailable (code {code})")]
    #[diagnostic(
        code(ssbridge::unavailable),
        help("Surveillance Station may still be starting. Try again shortly.")
    )]
    Unavailable { code: u16 },

    #[error("Request timed out{}", after_secs(*.seconds))]
    #[diagnostic(
        code(ssbridge::timeout),
        help("Increase the timeout with --timeout or check the station's load.")
    )]
    Timeout { seconds: Option<u64> },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Station settings rejected: {message}")]
    #[diagnostic(
        code(ssbridge::misconfigured),
        help(
            "Verify the URL, user name and password, and that the account may use\n\
             Surveillance Station. Accounts with 2-step verification cannot log in."
        )
    )]
    Misconfigured { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(ssbridge::no_credentials),
        help(
            "Set SSBRIDGE_USERNAME and SSBRIDGE_PASSWORD, or store the password with:\n\
             ssbridge config set-password --profile {profile}"
        )
    )]
    NoCredentials { profile: String },

    // ── Commands ─────────────────────────────────────────────────────

    #[error("'{operation}' is not available: {reason}")]
    #[diagnostic(code(ssbridge::unsupported))]
    Unsupported { operation: String, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ssbridge::validation))]
    Validation { field: String, reason: String },

    #[error("Station API error{}: {message}", code_suffix(*.code))]
    #[diagnostic(code(ssbridge::api_error))]
    Api { code: Option<u16>, message: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(ssbridge::profile_not_found),
        help(
            "Add a [profiles.{name}] table to {path},\n\
             or pass --url and --username directly."
        )
    )]
    ProfileNotFound { name: String, path: String },

    #[error(transparent)]
    #[diagnostic(code(ssbridge::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to encode JSON: {0}")]
    #[diagnostic(code(ssbridge::json))]
    Json(#[from] serde_json::Error),

    #[error("Keyring error: {0}")]
    #[diagnostic(code(ssbridge::keyring))]
    Keyring(#[from] keyring::Error),
}

fn code_suffix(code: Option<u16>) -> String {
    code.map(|c| format!(" ({c})")).unwrap_or_default()
}

fn after_secs(seconds: Option<u64>) -> String {
    seconds.map(|s| format!(" after {s}s")).unwrap_or_default()
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Unavailable { .. } => exit_code::CONNECTION,
            Self::Misconfigured { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::Config(_) => {
                exit_code::USAGE
            }
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name, path } => CliError::ProfileNotFound { name, path },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthExpired { code } => CliError::Api {
                code,
                message: "session expired".into(),
            },

            CoreError::ServiceUnavailable { code } => CliError::Unavailable { code },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::TransportFailure { reason } => CliError::ConnectionFailed { reason },

            CoreError::Config { message } => CliError::Misconfigured { message },

            CoreError::Unsupported { operation, reason } => {
                CliError::Unsupported { operation, reason }
            }

            CoreError::InvalidCommand { channel, reason } => CliError::Validation {
                field: channel,
                reason,
            },

            CoreError::Unclassified { code, message } => CliError::Api { code, message },
        }
    }
}
