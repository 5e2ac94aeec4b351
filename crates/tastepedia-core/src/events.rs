use crate::models::{EntityKey, EntityValue, RecipeSummary};
use crate::mutation::RollbackReason;

/// Events published to the UI layer over the core's event channel.
///
/// Raw transport errors never appear here; controllers classify failures
/// before anything is published.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// An entity's visible value changed (optimistic apply or a
    /// server-authoritative correction on confirmation).
    EntityChanged { key: EntityKey, value: EntityValue },
    /// A mutation failed and the entity snapped back to its committed value.
    MutationRolledBack {
        key: EntityKey,
        value: EntityValue,
        reason: RollbackReason,
    },
    /// A remote call was rejected for a missing/expired session; the UI
    /// should route to the authentication flow.
    AuthRequired,
    /// A search response was accepted and the displayed set replaced.
    SearchResults {
        seq: u64,
        results: Vec<RecipeSummary>,
    },
    /// A dispatched search failed; non-fatal, the previous set stays.
    SearchFailed { seq: u64, reason: String },
}
