//! API gateway
//!
//! Issues authenticated HTTP calls against the backend, classifies responses
//! and owns the clear-session-on-unauthorized side effect. Callers never see
//! a transport error or a parse error; every operation resolves to a
//! three-way [`Outcome`].
//!
//! Every response is logged with method, URL, status and the parsed payload
//! (or the raw body when the payload is not JSON); that log is the primary
//! diagnostic surface for backend mismatches.

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ConfigStore;
use crate::models::{CheckIn, Route, User};
use crate::normalize;
use crate::session::SessionStore;

/// Request timeout applied to every call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one gateway operation.
///
/// `Unauthorized` means the backend rejected the held credential (401/403);
/// the session has already been cleared when it is returned. `Failure`
/// covers everything else that went wrong: non-2xx statuses, unusable
/// bodies, transport faults.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Data(T),
    Unauthorized,
    Failure,
}

impl<T> Outcome<T> {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Outcome::Unauthorized)
    }

    /// The payload, if the operation produced one
    pub fn into_data(self) -> Option<T> {
        match self {
            Outcome::Data(data) => Some(data),
            _ => None,
        }
    }

    /// Map the payload, preserving the other arms
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Data(data) => Outcome::Data(f(data)),
            Outcome::Unauthorized => Outcome::Unauthorized,
            Outcome::Failure => Outcome::Failure,
        }
    }
}

/// A response read to completion: status, raw body and its JSON parse when
/// the body was valid JSON.
struct RawResponse {
    status: StatusCode,
    payload: Option<Value>,
    raw: String,
}

impl RawResponse {
    fn unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED || self.status == StatusCode::FORBIDDEN
    }

    /// Payload if parsed, raw text otherwise; for failure logs
    fn body_text(&self) -> String {
        match &self.payload {
            Some(payload) => payload.to_string(),
            None => self.raw.clone(),
        }
    }
}

/// Authenticated HTTP client for the backend API.
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ConfigStore>,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(config: Arc<ConfigStore>, session: Arc<SessionStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            config,
            session,
        })
    }

    /// POST /auth/login. The session record is not written here; callers
    /// decide whether to persist the returned user.
    pub async fn login(&self, username: &str, password: &str) -> Outcome<User> {
        self.authenticate("login", username, password).await
    }

    /// POST /auth/register
    pub async fn register(&self, username: &str, password: &str) -> Outcome<User> {
        self.authenticate("register", username, password).await
    }

    async fn authenticate(&self, action: &str, username: &str, password: &str) -> Outcome<User> {
        let url = format!("{}/auth/{}", self.config.base_url().await, action);
        let body = json!({"username": username, "password": password});
        let builder = self.request(Method::POST, &url).await.json(&body);

        match self.classify("POST", &url, builder).await {
            Outcome::Data(response) => {
                match normalize::user(response.payload.as_ref(), &response.raw, username) {
                    Some(user) => Outcome::Data(user),
                    None => {
                        tracing::warn!(%url, "auth response held no usable token");
                        Outcome::Failure
                    }
                }
            }
            Outcome::Unauthorized => Outcome::Unauthorized,
            Outcome::Failure => Outcome::Failure,
        }
    }

    /// GET /routes
    pub async fn list_routes(&self) -> Outcome<Vec<Route>> {
        let url = format!("{}/routes", self.config.base_url().await);
        let builder = self.request(Method::GET, &url).await;

        match self.classify("GET", &url, builder).await {
            Outcome::Data(response) => {
                match response.payload.as_ref().and_then(normalize::routes) {
                    Some(routes) => Outcome::Data(routes),
                    None => {
                        tracing::warn!(%url, body = %response.body_text(), "unexpected routes payload");
                        Outcome::Failure
                    }
                }
            }
            Outcome::Unauthorized => Outcome::Unauthorized,
            Outcome::Failure => Outcome::Failure,
        }
    }

    /// GET /routes/{id}, falling back to searching the full route list when
    /// the direct fetch fails for any non-auth reason.
    pub async fn get_route(&self, route_id: &str) -> Outcome<Route> {
        if route_id.is_empty() {
            return Outcome::Failure;
        }

        let url = format!("{}/routes/{}", self.config.base_url().await, route_id);
        let builder = self.request(Method::GET, &url).await;

        match self.classify("GET", &url, builder).await {
            Outcome::Data(response) => {
                if let Some(route) = response.payload.as_ref().and_then(normalize::route) {
                    return Outcome::Data(route);
                }
                tracing::warn!(route_id, "single-route payload did not normalize");
            }
            Outcome::Unauthorized => return Outcome::Unauthorized,
            Outcome::Failure => {}
        }

        tracing::info!(route_id, "falling back to route list");
        match self.list_routes().await {
            Outcome::Data(routes) => match routes.into_iter().find(|route| route.id == route_id) {
                Some(route) => Outcome::Data(route),
                None => Outcome::Failure,
            },
            Outcome::Unauthorized => Outcome::Unauthorized,
            Outcome::Failure => Outcome::Failure,
        }
    }

    /// GET /routes/{id}/checkins?username=...
    pub async fn list_check_ins(&self, route_id: &str, username: &str) -> Outcome<Vec<CheckIn>> {
        let url = format!(
            "{}/routes/{}/checkins",
            self.config.base_url().await,
            route_id
        );
        let builder = self
            .request(Method::GET, &url)
            .await
            .query(&[("username", username)]);

        match self.classify("GET", &url, builder).await {
            Outcome::Data(response) => {
                match response.payload.as_ref().and_then(normalize::check_ins) {
                    Some(check_ins) => Outcome::Data(check_ins),
                    None => {
                        tracing::warn!(%url, body = %response.body_text(), "unexpected check-ins payload");
                        Outcome::Failure
                    }
                }
            }
            Outcome::Unauthorized => Outcome::Unauthorized,
            Outcome::Failure => Outcome::Failure,
        }
    }

    /// POST /routes/{id}/checkins. Numeric checkpoint ids are sent as JSON
    /// numbers, matching what the backend expects; anything else is sent as
    /// a string.
    pub async fn create_check_in(
        &self,
        route_id: &str,
        checkpoint_id: &str,
        username: &str,
    ) -> Outcome<CheckIn> {
        let url = format!(
            "{}/routes/{}/checkins",
            self.config.base_url().await,
            route_id
        );
        let checkpoint_value = match checkpoint_id.parse::<i64>() {
            Ok(numeric) => json!(numeric),
            Err(_) => json!(checkpoint_id),
        };
        let body = json!({"username": username, "checkpointId": checkpoint_value});
        let builder = self.request(Method::POST, &url).await.json(&body);

        match self.classify("POST", &url, builder).await {
            Outcome::Data(response) => {
                match response.payload.as_ref().and_then(normalize::check_in) {
                    Some(check_in) => Outcome::Data(check_in),
                    None => {
                        tracing::warn!(%url, body = %response.body_text(), "created check-in did not normalize");
                        Outcome::Failure
                    }
                }
            }
            Outcome::Unauthorized => Outcome::Unauthorized,
            Outcome::Failure => Outcome::Failure,
        }
    }

    /// Start a request, attaching the bearer token when a session holds one
    async fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        match self.session.token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send, read the body as text, attempt a JSON parse, log, and classify
    /// the status. 401/403 clears the session before returning. Transport
    /// errors become `Failure`.
    async fn classify(
        &self,
        method: &str,
        url: &str,
        builder: reqwest::RequestBuilder,
    ) -> Outcome<RawResponse> {
        let response = match self.dispatch(builder).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(method, url, error = %err, "request failed in transport");
                return Outcome::Failure;
            }
        };

        let status = response.status.as_u16();
        match &response.payload {
            Some(payload) => {
                tracing::info!(method, url, status, payload = %payload, "api response")
            }
            None => tracing::info!(method, url, status, raw = %response.raw, "api response"),
        }

        if response.unauthorized() {
            self.session.clear().await;
            return Outcome::Unauthorized;
        }

        if !response.status.is_success() {
            tracing::warn!(method, url, status, body = %response.body_text(), "request failed");
            return Outcome::Failure;
        }

        Outcome::Data(response)
    }

    async fn dispatch(&self, builder: reqwest::RequestBuilder) -> reqwest::Result<RawResponse> {
        let response = builder.send().await?;
        let status = response.status();
        let raw = response.text().await?;
        let payload = if raw.is_empty() {
            None
        } else {
            serde_json::from_str(&raw).ok()
        };

        Ok(RawResponse {
            status,
            payload,
            raw,
        })
    }
}
