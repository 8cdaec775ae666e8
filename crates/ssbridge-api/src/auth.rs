// Session login / logout
//
// `SYNO.API.Auth` issues a session id (`format=sid`) that every other call
// carries as `_sid`. The id lands in the shared SessionStore, so all
// holders of the client see a rotation at once.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::client::{Endpoint, SurveillanceClient, parse_envelope};
use crate::error::Error;
use crate::models::LoginData;
use crate::session::Session;

const AUTH_API: &str = "SYNO.API.Auth";
const AUTH_VERSION: u32 = 6;
const SESSION_NAME: &str = "SurveillanceStation";

const LOGIN: Endpoint = Endpoint {
    api: AUTH_API,
    method: "Login",
    version: AUTH_VERSION,
    cgi: "auth.cgi",
};

const LOGOUT: Endpoint = Endpoint {
    api: AUTH_API,
    method: "Logout",
    version: AUTH_VERSION,
    cgi: "auth.cgi",
};

impl SurveillanceClient {
    /// Log in and store the new session.
    ///
    /// With `force_logout`, any session this client still holds is ended
    /// first (best effort) so the station does not keep a stale one around.
    /// An empty username is rejected without contacting the station.
    pub async fn connect(&self, force_logout: bool) -> Result<Arc<Session>, Error> {
        if self.credentials().username.trim().is_empty() {
            return Err(Error::InvalidCredentials("username is empty"));
        }

        if force_logout && self.session().is_active() {
            if let Err(e) = self.logout().await {
                debug!(error = %e, "pre-login logout failed (ignored)");
            }
            self.session().clear();
        }

        let sid = self.login().await?;
        let session = self.session().rotate(sid);
        debug!(generation = session.generation(), "session established");
        Ok(session)
    }

    /// Best-effort logout. The local session is cleared regardless of
    /// what the station answers.
    pub async fn disconnect(&self) {
        if self.session().is_active() {
            if let Err(e) = self.logout().await {
                warn!(error = %e, "logout failed (non-fatal)");
            }
        }
        self.session().clear();
    }

    /// `POST /webapi/auth.cgi` with `method=Login`.
    async fn login(&self) -> Result<SecretString, Error> {
        let creds = self.credentials();
        let params = [
            ("account", creds.username.clone()),
            ("passwd", creds.password.expose_secret().to_owned()),
            ("session", SESSION_NAME.to_owned()),
            ("format", "sid".to_owned()),
        ];

        let body = self.post_form(LOGIN, &params).await?;
        let data = parse_envelope(LOGIN, &body)?.ok_or(Error::MissingData {
            api: LOGIN.api,
            method: LOGIN.method,
        })?;
        let login: LoginData =
            serde_json::from_value(data).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: String::new(),
            })?;

        debug!("login successful");
        Ok(SecretString::from(login.sid))
    }

    /// `GET /webapi/auth.cgi` with `method=Logout`.
    async fn logout(&self) -> Result<(), Error> {
        self.call_unit(LOGOUT, &[("session", SESSION_NAME.to_owned())])
            .await?;
        debug!("logout complete");
        Ok(())
    }
}
