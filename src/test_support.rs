//! Scripted collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::error::HttpError;
use crate::gateway::{Gateway, GatewayResponse, Method};
use crate::identity::Route;
use crate::presenter::Presenter;
use crate::tprintln;

type Scripted = Result<GatewayResponse, HttpError>;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Gateway double. Each (method, path) has a queue of responses; the last one repeats.
/// A held path blocks until the test releases it, after the call has been recorded.
#[derive(Default)]
pub struct MockGateway {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    calls: Mutex<Vec<RecordedCall>>,
    holds: Mutex<HashMap<String, Arc<Semaphore>>>,
    forgotten: Mutex<usize>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the script for a route with a single repeating response.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.set(method, path, Ok(GatewayResponse::new(status, body)));
    }

    pub fn fail(&self, method: Method, path: &str, err: HttpError) {
        self.set(method, path, Err(err));
    }

    fn set(&self, method: Method, path: &str, r: Scripted) {
        self.routes.lock().insert((method, path.to_string()), VecDeque::from(vec![r]));
    }

    /// Block requests to `path` until permits are added to the returned semaphore.
    pub fn hold(&self, path: &str) -> Arc<Semaphore> {
        let sem = Arc::new(Semaphore::new(0));
        self.holds.lock().insert(path.to_string(), sem.clone());
        sem
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// How many times the session's transport credentials were dropped.
    pub fn forgotten(&self) -> usize {
        *self.forgotten.lock()
    }

    pub fn call_count(&self, method: Method, path: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.method == method && c.path == path).count()
    }

    fn next(&self, method: &Method, path: &str) -> Scripted {
        let mut routes = self.routes.lock();
        let Some(queue) = routes.get_mut(&(method.clone(), path.to_string())) else {
            return Err(HttpError::status(404, "Not Found", None));
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap_or_else(|| Err(HttpError::transport("empty script")))
        } else {
            queue.front().cloned().unwrap_or_else(|| Err(HttpError::transport("empty script")))
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<GatewayResponse, HttpError> {
        tprintln!("mock {} {}", method, path);
        self.calls.lock().push(RecordedCall { method: method.clone(), path: path.to_string(), body });
        let hold = self.holds.lock().get(path).cloned();
        if let Some(sem) = hold {
            let permit = sem.acquire().await.map_err(|e| HttpError::transport(e.to_string()))?;
            permit.forget();
        }
        self.next(&method, path)
    }

    fn forget_session(&self) {
        *self.forgotten.lock() += 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    Notice(String),
    Navigate(Route),
    Confirm(String),
}

/// Presenter double that records every effect in order and answers confirmations from a
/// preset value.
pub struct RecordingPresenter {
    events: Mutex<Vec<Shown>>,
    answer: bool,
}

impl RecordingPresenter {
    pub fn answering(answer: bool) -> Self {
        Self { events: Mutex::new(Vec::new()), answer }
    }

    pub fn events(&self) -> Vec<Shown> {
        self.events.lock().clone()
    }
}

impl Presenter for RecordingPresenter {
    fn notify(&self, message: &str) {
        self.events.lock().push(Shown::Notice(message.to_string()));
    }

    fn navigate(&self, route: Route) {
        self.events.lock().push(Shown::Navigate(route));
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.events.lock().push(Shown::Confirm(prompt.to_string()));
        self.answer
    }
}
