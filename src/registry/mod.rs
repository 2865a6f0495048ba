//!
//! Entity registries
//! -----------------
//! A registry holds the locally cached list of one entity kind (users, teams) and the
//! create/update/delete operations against the authority. The cache is a snapshot of the
//! authority as of the last successful fetch: it is only ever replaced wholesale by `list()`,
//! and every successful mutation triggers a fresh `list()` instead of patching the cache, so
//! server-side side effects (members moved off a deleted team, etc.) show up.
//!
//! Failures never touch the cache. The message for the inline banner is kept in
//! `last_error()` and also returned to the caller.

use std::fmt::Display;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, HttpError};
use crate::gateway::{Gateway, Method};
use crate::presenter::Presenter;
use crate::scope::ViewScope;

pub mod envelope;
pub mod forms;
pub mod teams;
pub mod users;

pub use forms::{CreateForm, EditSurface};
pub use teams::{Team, TeamDraft, Teams, DEFAULT_TEAM_ID};
pub use users::{team_label, User, UserDraft, UserPatch, Users};

pub type UserRegistry = EntityRegistry<Users>;
pub type TeamRegistry = EntityRegistry<Teams>;

/// Client-side checks run before a draft or patch is sent.
pub trait Validate {
    fn validate(&self) -> AppResult<()>;
}

/// Wire contract and user-facing texts for one entity kind.
pub trait Resource: Send + Sync + 'static {
    type Item: DeserializeOwned + Clone + Send + Sync + 'static;
    type Id: Display + Clone + Send + Sync;
    type Draft: Serialize + Validate + Send + Sync;
    type Patch: Serialize + Validate + Send + Sync;

    /// Singular noun for logs and messages.
    const NOUN: &'static str;
    const LIST_PATH: &'static str;
    const CREATE_PATH: &'static str;
    /// Object keys probed, in order, when the list payload is not a bare array.
    const ENVELOPE_KEYS: &'static [&'static str];
    const DELETE_PROMPT: &'static str;
    const CREATE_FAILED: &'static str;
    const CREATE_SUCCEEDED: Option<&'static str> = None;
    const UPDATE_FAILED: &'static str;
    const DELETE_FAILED: &'static str;

    /// `None` when the authority offers no update for this kind.
    fn update_path(id: &Self::Id) -> Option<String>;
    fn delete_path(id: &Self::Id) -> String;
    /// Local refusal message for ids that must never be deleted.
    fn delete_refusal(_id: &Self::Id) -> Option<&'static str> {
        None
    }
    /// Banner text for a failed list call.
    fn list_failure(err: &HttpError) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The user declined the confirmation; nothing was sent.
    Declined,
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct EntityRegistry<R: Resource> {
    gateway: Arc<dyn Gateway>,
    presenter: Arc<dyn Presenter>,
    cache: RwLock<Vec<R::Item>>,
    last_error: RwLock<Option<String>>,
    loading: AtomicUsize,
    scope: ViewScope,
}

impl<R: Resource> EntityRegistry<R> {
    pub fn new(gateway: Arc<dyn Gateway>, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            gateway,
            presenter,
            cache: RwLock::new(Vec::new()),
            last_error: RwLock::new(None),
            loading: AtomicUsize::new(0),
            scope: ViewScope::new(),
        }
    }

    /// Snapshot of the cache.
    pub fn items(&self) -> Vec<R::Item> {
        self.cache.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn set_error(&self, err: &AppError) {
        *self.last_error.write() = Some(err.message().to_string());
    }

    /// Replace the cache with the authority's current list.
    ///
    /// Overlapping calls are not fenced: whichever response lands last wins. A response that
    /// lands after `teardown` is returned but not applied.
    pub async fn list(&self) -> AppResult<Vec<R::Item>> {
        let ticket = self.scope.ticket();
        let _busy = InFlight::start(&self.loading);
        *self.last_error.write() = None;

        let result = match self.gateway.request(Method::GET, R::LIST_PATH, None).await {
            Ok(resp) => envelope::decode_list::<R::Item>(&resp.body, R::ENVELOPE_KEYS),
            Err(e) => Err(AppError::fetch(
                e.status_code.map(|s| format!("http_{}", s)).unwrap_or_else(|| "transport".into()),
                R::list_failure(&e),
            )),
        };

        if !ticket.is_current() {
            debug!(target: "registry", noun = R::NOUN, "discarding list response that landed after teardown");
            return result;
        }
        match &result {
            Ok(items) => {
                debug!(target: "registry", noun = R::NOUN, count = items.len(), "cache replaced");
                *self.cache.write() = items.clone();
            }
            Err(e) => {
                warn!(target: "registry", noun = R::NOUN, status = e.http_status(), error = %e, "list failed; keeping previous cache");
                self.set_error(e);
            }
        }
        result
    }

    /// Validate and send a new entity, then refetch on success. The cache is not touched until
    /// the refetch lands.
    pub async fn create(&self, draft: &R::Draft) -> AppResult<()> {
        draft.validate()?;
        let body = encode(draft)?;
        let ticket = self.scope.ticket();
        let outcome = self.mutate(Method::POST, R::CREATE_PATH, Some(body), R::CREATE_FAILED).await;
        self.finish(outcome, &ticket, "create").await?;
        if let Some(msg) = R::CREATE_SUCCEEDED {
            self.presenter.notify(msg);
        }
        Ok(())
    }

    /// Send the full patch for `id`, then refetch on success.
    pub async fn update(&self, id: &R::Id, patch: &R::Patch) -> AppResult<()> {
        let Some(path) = R::update_path(id) else {
            let err = AppError::mutation("unsupported", format!("Updating a {} is not supported", R::NOUN));
            self.set_error(&err);
            return Err(err);
        };
        patch.validate()?;
        let body = encode(patch)?;
        let ticket = self.scope.ticket();
        let outcome = self.mutate(Method::PUT, &path, Some(body), R::UPDATE_FAILED).await;
        self.finish(outcome, &ticket, "update").await
    }

    /// Delete `id` after explicit confirmation. Protected ids are refused locally and the
    /// displayed row stays until a refetch proves it gone.
    pub async fn delete(&self, id: &R::Id) -> AppResult<DeleteOutcome> {
        if let Some(refusal) = R::delete_refusal(id) {
            info!(target: "registry", noun = R::NOUN, %id, "delete refused locally");
            self.presenter.notify(refusal);
            return Err(AppError::mutation("protected", refusal));
        }
        if !self.presenter.confirm(R::DELETE_PROMPT) {
            debug!(target: "registry", noun = R::NOUN, %id, "delete declined");
            return Ok(DeleteOutcome::Declined);
        }
        let ticket = self.scope.ticket();
        let outcome = self.mutate(Method::DELETE, &R::delete_path(id), None, R::DELETE_FAILED).await;
        self.finish(outcome, &ticket, "delete").await?;
        Ok(DeleteOutcome::Deleted)
    }

    /// Forget the cache and drop any response still in flight.
    pub fn teardown(&self) {
        self.scope.teardown();
        self.cache.write().clear();
        *self.last_error.write() = None;
    }

    async fn mutate(&self, method: Method, path: &str, body: Option<Value>, fallback: &str) -> AppResult<()> {
        match self.gateway.request(method, path, body).await {
            Ok(resp) if acknowledged(&resp.body) => Ok(()),
            Ok(resp) => Err(AppError::mutation("rejected", message_in(&resp.body).unwrap_or(fallback))),
            Err(e) => {
                let code = e.status_code.map(|s| format!("http_{}", s)).unwrap_or_else(|| "transport".into());
                Err(AppError::mutation(code, e.body_field(&["error", "message"]).unwrap_or(fallback)))
            }
        }
    }

    async fn finish(&self, outcome: AppResult<()>, ticket: &crate::scope::ScopeTicket, op: &str) -> AppResult<()> {
        if let Err(e) = &outcome {
            warn!(target: "registry", noun = R::NOUN, op, status = e.http_status(), error = %e, "mutation failed");
            if ticket.is_current() {
                self.set_error(e);
            }
            return outcome;
        }
        info!(target: "registry", noun = R::NOUN, op, "mutation accepted");
        if ticket.is_current() {
            // A failed refetch leaves its own banner; the mutation itself succeeded.
            let _ = self.list().await;
        }
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|e| AppError::validation("encode", e.to_string()))
}

/// `success: false` in a 2xx body is a rejection; anything else is an acknowledgement.
fn acknowledged(body: &Value) -> bool {
    body.get("success").and_then(|v| v.as_bool()) != Some(false)
}

fn message_in(body: &Value) -> Option<&str> {
    ["error", "message"]
        .iter()
        .find_map(|k| body.get(*k).and_then(|v| v.as_str()).filter(|s| !s.is_empty()))
}
