// ── Modal presenter ──
//
// Owns the at-most-one open reconciliation session. Presenting a new
// session replaces (and closes) the previous one.

use std::sync::{Mutex, PoisonError};

use crate::session::{CloseReason, ReconciliationSession};

#[derive(Debug, Default)]
pub struct Presenter {
    current: Mutex<Option<ReconciliationSession>>,
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Present `session`, closing whatever was presented before.
    pub fn present(&self, session: ReconciliationSession) {
        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(session);
        if let Some(previous) = previous {
            previous.close_with(CloseReason::Replaced);
        }
    }

    /// The presented session, if it is still open.
    pub fn current(&self) -> Option<ReconciliationSession> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|s| !s.is_open()) {
            *current = None;
        }
        current.clone()
    }

    /// Close and forget the presented session.
    pub fn dismiss(&self) {
        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(previous) = previous {
            previous.close_with(CloseReason::Dismissed);
        }
    }
}
