// ── Debounced input ──
//
// Coalesces bursts of edits into one settled value. Each `push` cancels
// the pending timer and schedules a new one; only a timer that survives
// the full quiet window emits. Timers are children of the owner's
// cancellation token, so tearing down the owner drops pending emissions.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub struct Debouncer<T> {
    window: Duration,
    parent: CancellationToken,
    tx: mpsc::UnboundedSender<T>,
    pending: Arc<Mutex<Pending>>,
}

#[derive(Default)]
struct Pending {
    generation: u64,
    timer: Option<CancellationToken>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer and the receiver its settled values arrive on.
    pub fn new(window: Duration, parent: CancellationToken) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            window,
            parent,
            tx,
            pending: Arc::new(Mutex::new(Pending::default())),
        };
        (debouncer, rx)
    }

    /// Submit a raw value, superseding any value still inside its window.
    pub fn push(&self, value: T) {
        if self.parent.is_cancelled() {
            return;
        }

        let token = self.parent.child_token();
        let generation = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = pending.timer.replace(token.clone()) {
                previous.cancel();
            }
            pending.generation += 1;
            pending.generation
        };

        let window = self.window;
        let tx = self.tx.clone();
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = tokio::time::sleep(window) => {
                    let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
                    if pending.generation == generation && !token.is_cancelled() {
                        pending.timer = None;
                        let _ = tx.send(value);
                    }
                }
            }
        });
    }

    /// Drop the pending value, if any.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.generation += 1;
        if let Some(timer) = pending.timer.take() {
            timer.cancel();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = pending.timer.take() {
            timer.cancel();
        }
    }
}
