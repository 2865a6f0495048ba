use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lifetime marker for a mounted view.
///
/// Every async call takes a [`ScopeTicket`] before it suspends and checks it when the
/// response lands; `teardown` invalidates all outstanding tickets so late responses are dropped
/// instead of writing into a view that is gone. Tickets taken after a teardown are valid again,
/// which is what a re-mount looks like.
#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    generation: Arc<AtomicU64>,
}

#[derive(Debug, Clone)]
pub struct ScopeTicket {
    issued: u64,
    generation: Arc<AtomicU64>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticket(&self) -> ScopeTicket {
        ScopeTicket { issued: self.generation.load(Ordering::SeqCst), generation: self.generation.clone() }
    }

    pub fn teardown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl ScopeTicket {
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.issued
    }
}
