//! Form state around registry mutations.
//!
//! A create form keeps its draft until the authority accepts it, then resets to a fresh draft.
//! An edit surface stays open with an inline error until an update is accepted.

use super::{EntityRegistry, Resource};
use crate::error::AppResult;

pub struct CreateForm<R: Resource> {
    pub draft: R::Draft,
    error: Option<String>,
    submitting: bool,
}

impl<R: Resource> CreateForm<R> {
    pub fn new(draft: R::Draft) -> Self {
        Self { draft, error: None, submitting: false }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Send the draft. On success the draft is replaced by `fresh()`; on failure it is kept for
    /// correction and the message is held for display.
    pub async fn submit(&mut self, registry: &EntityRegistry<R>, fresh: impl FnOnce() -> R::Draft) -> AppResult<()> {
        self.submitting = true;
        self.error = None;
        let result = registry.create(&self.draft).await;
        self.submitting = false;
        match &result {
            Ok(()) => self.draft = fresh(),
            Err(e) => self.error = Some(e.message().to_string()),
        }
        result
    }
}

pub struct EditSurface<R: Resource> {
    target: Option<(R::Id, R::Patch)>,
    error: Option<String>,
}

impl<R: Resource> Default for EditSurface<R> {
    fn default() -> Self {
        Self { target: None, error: None }
    }
}

impl<R: Resource> EditSurface<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, id: R::Id, patch: R::Patch) {
        self.target = Some((id, patch));
        self.error = None;
    }

    pub fn is_open(&self) -> bool {
        self.target.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn patch_mut(&mut self) -> Option<&mut R::Patch> {
        self.target.as_mut().map(|(_, p)| p)
    }

    pub fn cancel(&mut self) {
        self.target = None;
        self.error = None;
    }

    /// Send the whole patch. Closes on success; stays open with the error otherwise.
    pub async fn save(&mut self, registry: &EntityRegistry<R>) -> AppResult<()> {
        let Some((id, patch)) = self.target.as_ref() else {
            return Ok(());
        };
        match registry.update(id, patch).await {
            Ok(()) => {
                self.cancel();
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.message().to_string());
                Err(e)
            }
        }
    }
}
