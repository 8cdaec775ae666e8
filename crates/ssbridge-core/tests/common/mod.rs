#![allow(clippy::unwrap_used, dead_code)]
// Shared fixtures for the wiremock-backed device tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ssbridge_api::{Credentials, SurveillanceClient};
use ssbridge_core::{State, StationConfig, ThingCallback, ThingStatus};

/// Records everything a device publishes.
#[derive(Default)]
pub struct RecordingThing {
    linked: Mutex<HashSet<String>>,
    states: Mutex<Vec<(String, State)>>,
    statuses: Mutex<Vec<ThingStatus>>,
}

impl RecordingThing {
    pub fn linked(channels: &[&str]) -> Arc<Self> {
        let thing = Self::default();
        thing
            .linked
            .lock()
            .unwrap()
            .extend(channels.iter().map(|c| (*c).to_owned()));
        Arc::new(thing)
    }

    pub fn statuses(&self) -> Vec<ThingStatus> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn last_status(&self) -> Option<ThingStatus> {
        self.statuses.lock().unwrap().last().cloned()
    }

    pub fn states_of(&self, channel: &str) -> Vec<State> {
        self.states
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, s)| s.clone())
            .collect()
    }
}

impl ThingCallback for RecordingThing {
    fn is_linked(&self, channel: &str) -> bool {
        self.linked.lock().unwrap().contains(channel)
    }

    fn update_state(&self, channel: &str, state: State) {
        self.states.lock().unwrap().push((channel.to_owned(), state));
    }

    fn update_status(&self, status: ThingStatus) {
        self.statuses.lock().unwrap().push(status);
    }
}

/// Station config pointing at the mock server with every task disabled,
/// so tests drive ticks explicitly through `run_once`.
pub fn config_for(server: &MockServer) -> StationConfig {
    let mut config = StationConfig::new(
        Url::parse(&server.uri()).unwrap(),
        "admin",
        SecretString::from("hunter2".to_owned()),
    );
    config.home_mode_interval_secs = 0;
    config.event_interval_secs = 0;
    config
}

pub fn client_for(config: &StationConfig) -> SurveillanceClient {
    client_with(config, reqwest::Client::new())
}

pub fn client_with(config: &StationConfig, http: reqwest::Client) -> SurveillanceClient {
    SurveillanceClient::with_client(
        http,
        config.url.clone(),
        Credentials {
            username: config.username.clone(),
            password: config.password.clone(),
        },
    )
}

pub fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

pub fn ok_empty() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true }))
}

pub fn fail(code: u16) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": false, "error": { "code": code } }))
}

pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/webapi/auth.cgi"))
        .and(body_string_contains("method=Login"))
        .respond_with(ok(json!({ "sid": "sid-abc" })))
        .mount(server)
        .await;
}

pub async fn mount_logout(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/webapi/auth.cgi"))
        .and(query_param("method", "Logout"))
        .respond_with(ok_empty())
        .mount(server)
        .await;
}

/// Matcher for one entry.cgi operation.
pub fn entry(api: &str, op: &str) -> wiremock::MockBuilder {
    Mock::given(method("GET"))
        .and(path("/webapi/entry.cgi"))
        .and(query_param("api", api))
        .and(query_param("method", op))
}

pub async fn login_count(server: &MockServer) -> usize {
    requests_matching(server, "method=Login").await
}

pub async fn requests_matching(server: &MockServer, needle: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| {
            r.url.query().is_some_and(|q| q.contains(needle))
                || String::from_utf8_lossy(&r.body).contains(needle)
        })
        .count()
}
