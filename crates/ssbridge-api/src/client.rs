// Surveillance Station HTTP client
//
// Wraps `reqwest::Client` with the `{base}/webapi/{cgi}` URL scheme,
// session-id injection and envelope unwrapping. Endpoint groups (auth,
// camera, ptz, ...) are inherent methods in sibling files so this module
// stays focused on transport mechanics.

use std::sync::Arc;

use bytes::Bytes;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, codes};
use crate::models::ApiResponse;
use crate::session::SessionStore;
use crate::transport::TransportConfig;

/// Account used for `SYNO.API.Auth` login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// One remote operation: which API, method, version and CGI script.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Endpoint {
    pub api: &'static str,
    pub method: &'static str,
    pub version: u32,
    pub cgi: &'static str,
}

impl Endpoint {
    pub(crate) const fn entry(api: &'static str, method: &'static str, version: u32) -> Self {
        Self {
            api,
            method,
            version,
            cgi: "entry.cgi",
        }
    }
}

/// The single authenticated client for one station.
///
/// Cheap to share behind an `Arc`: the session lives in a shared
/// [`SessionStore`], so a token rotated by one caller is picked up by every
/// other caller on its next request.
pub struct SurveillanceClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    session: Arc<SessionStore>,
    /// Configured request timeout, `None` when the `reqwest::Client` was
    /// supplied by the caller.
    timeout_secs: Option<u64>,
}

impl SurveillanceClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the DSM root, e.g. `https://nas.local:5001`.
    pub fn new(
        base_url: Url,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            credentials,
            session: Arc::new(SessionStore::new()),
            timeout_secs: Some(transport.timeout_secs()).filter(|s| *s > 0),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, credentials: Credentials) -> Self {
        Self {
            http,
            base_url,
            credentials,
            session: Arc::new(SessionStore::new()),
            timeout_secs: None,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The shared session store.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    // ── URL builders ─────────────────────────────────────────────────

    pub(crate) fn cgi_url(&self, cgi: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/webapi/{cgi}"))?)
    }

    fn base_params(ep: Endpoint) -> Vec<(&'static str, String)> {
        vec![
            ("api", ep.api.to_owned()),
            ("version", ep.version.to_string()),
            ("method", ep.method.to_owned()),
        ]
    }

    fn session_param(&self) -> Result<(&'static str, String), Error> {
        let session = self.session.current().ok_or(Error::NotLoggedIn)?;
        Ok(("_sid", session.token().expose_secret().to_owned()))
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send an authenticated GET and return the raw response.
    async fn send(
        &self,
        ep: Endpoint,
        params: &[(&'static str, String)],
    ) -> Result<reqwest::Response, Error> {
        let url = self.cgi_url(ep.cgi)?;
        let mut query = Self::base_params(ep);
        query.push(self.session_param()?);
        query.extend(params.iter().cloned());

        debug!(api = ep.api, method = ep.method, "GET {}", url);

        let resp = self
            .http
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: resp.url().path().to_owned(),
            });
        }
        Ok(resp)
    }

    /// Send an unauthenticated form POST (login only).
    pub(crate) async fn post_form(
        &self,
        ep: Endpoint,
        params: &[(&'static str, String)],
    ) -> Result<String, Error> {
        let url = self.cgi_url(ep.cgi)?;
        let mut form = Self::base_params(ep);
        form.extend(params.iter().cloned());

        debug!(api = ep.api, method = ep.method, "POST {}", url);

        let resp = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: resp.url().path().to_owned(),
            });
        }
        resp.text().await.map_err(|e| self.map_transport(e))
    }

    /// Call an operation and decode its `data` payload.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        ep: Endpoint,
        params: &[(&'static str, String)],
    ) -> Result<T, Error> {
        let body = self
            .send(ep, params)
            .await?
            .text()
            .await
            .map_err(|e| self.map_transport(e))?;
        let data = parse_envelope(ep, &body)?.ok_or(Error::MissingData {
            api: ep.api,
            method: ep.method,
        })?;
        decode_data(&body, data)
    }

    /// Call an operation whose payload is irrelevant.
    pub(crate) async fn call_unit(
        &self,
        ep: Endpoint,
        params: &[(&'static str, String)],
    ) -> Result<(), Error> {
        let body = self
            .send(ep, params)
            .await?
            .text()
            .await
            .map_err(|e| self.map_transport(e))?;
        parse_envelope(ep, &body).map(|_| ())
    }

    /// Call an operation that answers with a binary body on success and a
    /// JSON envelope on failure.
    pub(crate) async fn call_binary(
        &self,
        ep: Endpoint,
        params: &[(&'static str, String)],
    ) -> Result<Bytes, Error> {
        let resp = self.send(ep, params).await?;
        let is_json = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json") || ct.starts_with("text/"));

        let body = resp.bytes().await.map_err(|e| self.map_transport(e))?;
        if is_json || body.first() == Some(&b'{') {
            let text = String::from_utf8_lossy(&body);
            // A JSON body here is always an error; success carries no envelope.
            parse_envelope(ep, &text)?;
            return Err(Error::Api {
                api: ep.api,
                method: ep.method,
                code: codes::UNKNOWN,
            });
        }
        trace!(bytes = body.len(), "binary payload received");
        Ok(body)
    }

    fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }
}

/// Parse the `{ success, data, error }` envelope.
///
/// Returns the raw `data` value on success (possibly absent) or
/// `Error::Api` carrying the remote code.
pub(crate) fn parse_envelope(
    ep: Endpoint,
    body: &str,
) -> Result<Option<serde_json::Value>, Error> {
    let envelope: ApiResponse =
        serde_json::from_str(body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.to_owned(),
        })?;

    if envelope.success {
        Ok(envelope.data)
    } else {
        let code = envelope.error.map_or(codes::UNKNOWN, |e| e.code);
        debug!(api = ep.api, method = ep.method, code, "remote call failed");
        Err(Error::Api {
            api: ep.api,
            method: ep.method,
            code,
        })
    }
}

fn decode_data<T: DeserializeOwned>(body: &str, data: serde_json::Value) -> Result<T, Error> {
    serde_json::from_value(data).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: body.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EP: Endpoint = Endpoint::entry("SYNO.Test", "Get", 1);

    #[test]
    fn envelope_success_returns_data() {
        let data = parse_envelope(EP, r#"{"success":true,"data":{"on":true}}"#)
            .expect("success")
            .expect("data");
        assert_eq!(data["on"], true);
    }

    #[test]
    fn envelope_failure_carries_code() {
        let err = parse_envelope(EP, r#"{"success":false,"error":{"code":105}}"#)
            .expect_err("failure");
        assert_eq!(err.api_code(), Some(codes::INSUFFICIENT_PRIVILEGE));
        assert!(err.is_auth_expired());
    }

    #[test]
    fn envelope_failure_without_code_is_unknown() {
        let err = parse_envelope(EP, r#"{"success":false}"#).expect_err("failure");
        assert_eq!(err.api_code(), Some(codes::UNKNOWN));
    }

    #[test]
    fn envelope_garbage_is_deserialization_error() {
        let err = parse_envelope(EP, "<html>").expect_err("garbage");
        assert!(matches!(err, Error::Deserialization { .. }));
    }
}
