//! Unified client error model.
//! Every component (session, guard, registries) reports failures through `AppError`, so the
//! console can render one inline banner or blocking notice regardless of where the call began.
//! `HttpError` is the raw classification produced by the gateway before a component maps it.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Bad credentials or no session.
    Auth { code: String, message: String },
    /// Access check rejected: 401 unauthenticated or 403 insufficient privilege.
    Access { code: String, message: String },
    /// Network or transport failure, or a non-2xx status on a read.
    Fetch { code: String, message: String },
    /// Payload did not match any accepted envelope.
    Shape { code: String, message: String },
    /// Create/update/delete rejected by the authority or refused locally.
    Mutation { code: String, message: String },
    /// Client-side form validation.
    Validation { code: String, message: String },
    /// Persisted session storage could not be read or written.
    Storage { code: String, message: String },
    Config { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Auth { code, .. }
            | AppError::Access { code, .. }
            | AppError::Fetch { code, .. }
            | AppError::Shape { code, .. }
            | AppError::Mutation { code, .. }
            | AppError::Validation { code, .. }
            | AppError::Storage { code, .. }
            | AppError::Config { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Auth { message, .. }
            | AppError::Access { message, .. }
            | AppError::Fetch { message, .. }
            | AppError::Shape { message, .. }
            | AppError::Mutation { message, .. }
            | AppError::Validation { message, .. }
            | AppError::Storage { message, .. }
            | AppError::Config { message, .. } => message.as_str(),
        }
    }

    pub fn auth(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn access(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Access { code: code.into(), message: msg.into() } }
    pub fn fetch(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Fetch { code: code.into(), message: msg.into() } }
    pub fn shape(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Shape { code: code.into(), message: msg.into() } }
    pub fn mutation(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Mutation { code: code.into(), message: msg.into() } }
    pub fn validation(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Validation { code: code.into(), message: msg.into() } }
    pub fn storage(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Storage { code: code.into(), message: msg.into() } }
    pub fn config(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Config { code: code.into(), message: msg.into() } }

    /// Nearest HTTP status for the failure class; logged alongside registry failures.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Auth { .. } => 401,
            AppError::Access { code, .. } if code == "forbidden" => 403,
            AppError::Access { .. } => 401,
            AppError::Fetch { .. } => 503,
            AppError::Shape { .. } => 502,
            AppError::Mutation { .. } => 422,
            AppError::Validation { .. } => 400,
            AppError::Storage { .. } | AppError::Config { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<HttpError> for AppError {
    fn from(err: HttpError) -> Self {
        match err.status_code {
            Some(status) => AppError::Fetch { code: format!("http_{}", status), message: err.message },
            None => AppError::Fetch { code: "transport".into(), message: err.message },
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage { code: "io".into(), message: err.to_string() }
    }
}

/// Classified failure of a single gateway call. `status_code` is `None` when the request never
/// produced an HTTP response (connect error, timeout, unreadable body).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}", describe(.status_code, .message))]
pub struct HttpError {
    pub status_code: Option<u16>,
    pub message: String,
    /// Parsed JSON error body when the authority sent one.
    pub body: Option<serde_json::Value>,
}

fn describe(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(s) => format!("HTTP {}: {}", s, message),
        None => format!("transport: {}", message),
    }
}

impl HttpError {
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self { status_code: None, message: msg.into(), body: None }
    }

    pub fn status(status: u16, message: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self { status_code: Some(status), message: message.into(), body }
    }

    pub fn is_unauthenticated(&self) -> bool { self.status_code == Some(401) }
    pub fn is_forbidden(&self) -> bool { self.status_code == Some(403) }

    /// First string found under any of `fields` in the error body, in order.
    pub fn body_field(&self, fields: &[&str]) -> Option<&str> {
        let body = self.body.as_ref()?;
        fields
            .iter()
            .find_map(|f| body.get(*f).and_then(|v| v.as_str()).filter(|s| !s.is_empty()))
    }
}
