//! Input broker — correlates `input_required` events with later submissions.
//!
//! A token maps to a one-shot rendezvous slot. Exactly one value can ever be
//! delivered per token: `deliver` removes the entry before sending, so a
//! second submission for the same token reports not-found instead of
//! silently overwriting anything. The broker is shared by every live run and
//! the submission handler; it is injected as `Arc<InputBroker>`, never
//! reached through global state.
//!
//! Pending entries have no expiry. A run whose caller never submits input
//! stays blocked and its token stays registered (see DESIGN.md); a wait
//! that is dropped mid-flight unregisters its token through the
//! supervisor's guard.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;

use crate::error::CoreError;

#[derive(Default)]
pub struct InputBroker {
    pending: Mutex<HashMap<String, oneshot::Sender<String>>>,
}

impl InputBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock is never held across an await point. A poisoned lock is
    /// recovered; entries are independent one-shot senders.
    fn pending(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<String>>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a pending input request. The returned receiver resolves when
    /// a value is delivered for `token`.
    pub fn register(&self, token: &str) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        let previous = self.pending().insert(token.to_string(), tx);
        // Tokens are 128-bit random; a collision here means a caller re-used one.
        debug_assert!(previous.is_none(), "input token registered twice: {token}");
        rx
    }

    /// Deliver a value to the run waiting on `token`.
    ///
    /// The entry is removed before sending, so delivering twice returns
    /// `NotFound` on the second call.
    pub fn deliver(&self, token: &str, value: String) -> Result<(), CoreError> {
        let tx = self
            .pending()
            .remove(token)
            .ok_or_else(|| CoreError::NotFound(format!("No pending input request for id '{}'", token)))?;
        // The waiter may have gone away; the token is consumed either way.
        let _ = tx.send(value);
        Ok(())
    }

    /// Drop a pending request without delivering (error-path cleanup).
    pub fn forget(&self, token: &str) {
        self.pending().remove(token);
    }

    /// Number of requests currently awaiting input.
    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }
}
