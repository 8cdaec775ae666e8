use thiserror::Error;

/// Error codes returned in the `error.code` field of a failed envelope.
///
/// Only the codes the client reasons about are named here; everything else
/// is carried through verbatim in [`Error::Api`].
pub mod codes {
    /// Unknown error.
    pub const UNKNOWN: u16 = 100;
    /// Invalid parameter.
    pub const INVALID_PARAMETER: u16 = 101;
    /// The requested API does not exist: the Surveillance Station package
    /// is stopped, uninstalled, or disabled for this user.
    pub const API_NOT_FOUND: u16 = 102;
    /// The requested method does not exist.
    pub const METHOD_NOT_FOUND: u16 = 103;
    /// The requested version is not supported.
    pub const VERSION_NOT_SUPPORTED: u16 = 104;
    /// The logged in session does not have permission.
    pub const INSUFFICIENT_PRIVILEGE: u16 = 105;
    /// Session timeout.
    pub const SESSION_TIMEOUT: u16 = 106;
    /// Session interrupted by a duplicate login.
    pub const SESSION_INTERRUPTED: u16 = 107;
    /// Undocumented, but returned once a session id has gone stale.
    pub const SESSION_NOT_FOUND: u16 = 119;
    /// Login: no such account or incorrect password.
    pub const LOGIN_BAD_CREDENTIALS: u16 = 400;
    /// Login: account disabled.
    pub const LOGIN_ACCOUNT_DISABLED: u16 = 401;
    /// Login: permission denied.
    pub const LOGIN_PERMISSION_DENIED: u16 = 402;
}

/// Top-level error type for the `ssbridge-api` crate.
///
/// Raw failures only: this crate never decides what a failure *means*
/// for device health. `ssbridge-core` classifies these into its taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Remote ──────────────────────────────────────────────────────
    /// The service answered with `success: false`.
    #[error("{api}.{method} failed with error code {code}")]
    Api {
        api: &'static str,
        method: &'static str,
        code: u16,
    },

    /// A call that needs a session was attempted before login.
    #[error("Not logged in -- no session id available")]
    NotLoggedIn,

    /// Credentials rejected locally before any request was sent.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(&'static str),

    /// An argument outside the range the station accepts.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out. The duration is known only for clients built
    /// from a `TransportConfig`.
    #[error("Request timed out{}", after_secs(*.timeout_secs))]
    Timeout { timeout_secs: Option<u64> },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-2xx HTTP status from the web server in front of the API.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The envelope reported success but carried no `data` object.
    #[error("{api}.{method} returned no data")]
    MissingData {
        api: &'static str,
        method: &'static str,
    },
}

impl Error {
    /// The remote error code, if the service produced one.
    pub fn api_code(&self) -> Option<u16> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` if the remote code indicates the session is no
    /// longer accepted and a fresh login may resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self.api_code(),
            Some(
                codes::INSUFFICIENT_PRIVILEGE
                    | codes::SESSION_TIMEOUT
                    | codes::SESSION_INTERRUPTED
                    | codes::SESSION_NOT_FOUND
            )
        ) || matches!(self, Self::NotLoggedIn)
    }

    /// Returns `true` if the transport gave up waiting on the remote end.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

fn after_secs(timeout_secs: Option<u64>) -> String {
    timeout_secs.map(|s| format!(" after {s}s")).unwrap_or_default()
}
