//!
//! HTTP gateway to the remote authority
//! ------------------------------------
//! One attempt per call, JSON in and out. The `reqwest` client keeps a cookie jar so the session
//! cookie set at login rides along on every later request; when the session also carries a
//! bearer token it is attached as `Authorization`. Failures come back as `HttpError` with the
//! status (if any) and the parsed error body, and are never retried here.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn, Instrument};

pub use reqwest::Method;

use crate::config::ConsoleConfig;
use crate::error::{AppError, AppResult, HttpError};
use crate::identity::SessionContext;

/// Successful (2xx) response. `body` is `Null` for an empty body and a JSON string when the
/// authority answered with non-JSON text.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Value,
}

impl GatewayResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<GatewayResponse, HttpError>;

    /// Drop any transport-held credential (cookies) after logout.
    fn forget_session(&self) {}
}

pub struct HttpGateway {
    base: Url,
    timeout: Duration,
    client: RwLock<reqwest::Client>,
    session: SessionContext,
}

fn build_client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::config("http_client", e.to_string()))
}

impl HttpGateway {
    pub fn new(config: &ConsoleConfig, session: SessionContext) -> AppResult<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self { base: as_directory(&config.api_url), timeout: config.timeout, client: RwLock::new(client), session })
    }

    fn url_for(&self, path: &str) -> Result<Url, HttpError> {
        // Relative join keeps any path prefix of the base (`https://host/backend`).
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::transport(format!("invalid path '{}': {}", path, e)))
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<GatewayResponse, HttpError> {
        let url = self.url_for(path)?;
        let client = self.client.read().clone();
        let mut req = client.request(method, url);
        if let Some(token) = self.session.token() {
            req = req.bearer_auth(token);
        }
        if let Some(b) = &body {
            req = req.json(b);
        }
        let started = Instant::now();
        let resp = req.send().await.map_err(|e| HttpError::transport(e.to_string()))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| HttpError::transport(e.to_string()))?;
        debug!(target: "gateway", status = status.as_u16(), elapsed_ms = started.elapsed().as_millis() as u64, "response");

        let parsed = parse_body(&text);
        if status.is_success() {
            return Ok(GatewayResponse::new(status.as_u16(), parsed.unwrap_or(Value::String(text))));
        }
        let reason = status.canonical_reason().unwrap_or("Request failed").to_string();
        Err(HttpError::status(status.as_u16(), reason, parsed))
    }
}

fn as_directory(base: &Url) -> Url {
    let mut out = base.clone();
    if !out.path().ends_with('/') {
        let dir = format!("{}/", out.path());
        out.set_path(&dir);
    }
    out
}

fn parse_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return Some(Value::Null);
    }
    serde_json::from_str::<Value>(text).ok()
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<GatewayResponse, HttpError> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::debug_span!("gateway", %request_id, method = %method, path);
        let out = self.send(method, path, body).instrument(span.clone()).await;
        if let Err(e) = &out {
            let _enter = span.enter();
            warn!(target: "gateway", error = %e, "request failed");
        }
        out
    }

    fn forget_session(&self) {
        match build_client(self.timeout) {
            Ok(fresh) => *self.client.write() = fresh,
            Err(e) => warn!(target: "gateway", error = %e, "could not reset cookie jar"),
        }
    }
}

/// Interpolate one path segment, percent-encoding it.
pub fn path_with_id(prefix: &str, id: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), urlencoding::encode(id))
}
