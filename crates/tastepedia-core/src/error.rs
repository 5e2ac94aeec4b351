use thiserror::Error;

use crate::models::EntityKey;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A like or vote was attempted on an entity the store has never
    /// observed. Those transforms need a real starting count, so there is
    /// nothing sensible to seed.
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityKey),

    /// The entity exists but holds a different kind of value (e.g. a like
    /// toggle addressed at a favorite entry).
    #[error("entity {key} holds a {actual} value, expected {expected}")]
    WrongValueKind {
        key: EntityKey,
        expected: &'static str,
        actual: &'static str,
    },

    /// The cart merge succeeded in memory but writing it to disk did not.
    #[error("cart persistence failed: {0}")]
    Persistence(String),
}
