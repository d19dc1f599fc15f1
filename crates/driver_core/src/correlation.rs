use std::collections::HashMap;

use tokio::sync::{oneshot, Mutex};
use tracing::debug;

use shared::{error::DriverError, protocol::ReplyOutcome};

/// Maps outstanding request ids to single-shot result slots. All access is
/// serialized on one lock so "resolve happens at most once" holds without
/// per-entry bookkeeping.
pub struct CorrelationTable {
    entries: Mutex<HashMap<String, oneshot::Sender<ReplyOutcome>>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register a fresh pending entry. `DuplicateId` here means id
    /// generation is broken, not that the remote misbehaved.
    pub async fn register(
        &self,
        request_id: &str,
    ) -> Result<oneshot::Receiver<ReplyOutcome>, DriverError> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(request_id) {
            return Err(DriverError::DuplicateId(request_id.to_string()));
        }
        let (tx, rx) = oneshot::channel();
        entries.insert(request_id.to_string(), tx);
        Ok(rx)
    }

    /// Hand a reply outcome to the matching pending entry. Returns false
    /// when no entry exists (late or unknown reply).
    pub async fn resolve(&self, request_id: &str, outcome: ReplyOutcome) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.remove(request_id) {
            Some(sender) => {
                if sender.send(outcome).is_err() {
                    debug!(request_id, "caller stopped waiting before its reply arrived");
                }
                true
            }
            None => false,
        }
    }

    /// Remove an entry without resolving it. Returns false when the entry
    /// is already gone, i.e. a reply won the race against the canceller.
    pub async fn cancel(&self, request_id: &str) -> bool {
        self.entries.lock().await.remove(request_id).is_some()
    }

    pub async fn outstanding(&self) -> usize {
        self.entries.lock().await.len()
    }
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}
