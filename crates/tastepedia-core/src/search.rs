//! Debounced Query Composer.
//!
//! Rapid filter adjustment (a slider drag fires a change per pixel) must
//! not flood the network: each change fully cancels the previous debounce
//! task and arms a new one, so a burst of N changes closer together than
//! the debounce window issues exactly one request, reflecting only the
//! final state. Sequence numbers are assigned at dispatch time; a response
//! is applied only if no later request has been dispatched, so a slow early
//! response can never overwrite fresher results.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::events::CoreEvent;
use crate::gateway::{Gateway, GatewayError};
use crate::models::{FilterState, RecipeSummary};

struct ComposerShared {
    /// Armed debounce task, if any. Replaced (aborted) by every change.
    pending: Option<JoinHandle<()>>,
    /// Last sequence number handed out.
    next_seq: u64,
    /// Highest sequence number actually dispatched; responses below it are
    /// stale.
    latest_dispatched: u64,
    /// Displayed result set, replaced atomically on accepted responses.
    results: Vec<RecipeSummary>,
}

pub struct QueryComposer {
    gateway: Arc<dyn Gateway>,
    events: UnboundedSender<CoreEvent>,
    debounce: Duration,
    shared: Arc<Mutex<ComposerShared>>,
}

impl QueryComposer {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        events: UnboundedSender<CoreEvent>,
        debounce: Duration,
    ) -> Self {
        Self {
            gateway,
            events,
            debounce,
            shared: Arc::new(Mutex::new(ComposerShared {
                pending: None,
                next_seq: 0,
                latest_dispatched: 0,
                results: Vec::new(),
            })),
        }
    }

    /// Register a filter change. No request leaves for this state unless it
    /// survives the debounce window unreplaced.
    pub fn on_filter_change(&self, state: FilterState) {
        let mut shared = self.shared.lock();
        if let Some(pending) = shared.pending.take() {
            pending.abort();
        }

        let gateway = Arc::clone(&self.gateway);
        let events = self.events.clone();
        // The debounce window is measured from the change itself, not from
        // when the spawned task first runs.
        let deadline = tokio::time::Instant::now() + self.debounce;
        let shared_handle = Arc::clone(&self.shared);

        shared.pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;

            let query = state.minimize();
            let seq = {
                let mut shared = shared_handle.lock();
                shared.pending = None;
                shared.next_seq += 1;
                shared.latest_dispatched = shared.next_seq;
                shared.next_seq
            };
            tracing::debug!(seq, "search: dispatching query");

            let result = gateway.submit_search(query).await;

            let mut shared = shared_handle.lock();
            if seq != shared.latest_dispatched {
                // A newer query superseded this one while it was in flight.
                tracing::debug!(
                    seq,
                    latest = shared.latest_dispatched,
                    "search: stale response discarded"
                );
                return;
            }
            match result {
                Ok(results) => {
                    shared.results = results.clone();
                    let _ = events.send(CoreEvent::SearchResults { seq, results });
                }
                Err(GatewayError::AuthRequired) => {
                    let _ = events.send(CoreEvent::AuthRequired);
                }
                Err(err) => {
                    tracing::warn!(seq, "search: request failed: {err}");
                    let _ = events.send(CoreEvent::SearchFailed {
                        seq,
                        reason: err.to_string(),
                    });
                }
            }
        }));
    }

    /// The currently displayed result set.
    pub fn results(&self) -> Vec<RecipeSummary> {
        self.shared.lock().results.clone()
    }
}
