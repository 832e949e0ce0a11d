use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tracing::debug;

/// Tracks which incarnation of a view is live so results of asynchronous
/// work started by a dismissed view can be discarded instead of being
/// applied to a now-irrelevant view state.
#[derive(Clone, Default)]
pub struct ViewScope {
    generation: Arc<AtomicU64>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket tied to the current incarnation of the view.
    pub fn enter(&self) -> ViewTicket {
        ViewTicket {
            generation: Arc::clone(&self.generation),
            issued_at: self.generation.load(Ordering::Acquire),
        }
    }

    /// Invalidates every outstanding ticket, e.g. when the view is
    /// navigated away from.
    pub fn dismiss(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

/// Proof that an asynchronous result still belongs to a live view.
pub struct ViewTicket {
    generation: Arc<AtomicU64>,
    issued_at: u64,
}

impl ViewTicket {
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::Acquire) == self.issued_at
    }

    /// Passes `value` through when the view is still live, otherwise drops
    /// it.
    pub fn apply<T>(&self, value: T) -> Option<T> {
        if self.is_current() {
            Some(value)
        } else {
            debug!("discarding result for dismissed view");
            None
        }
    }
}
