//! Client-side core for the Tastepedia catalog/ordering front end.
//!
//! Three subsystems live here, everything else (rendering, routing, auth
//! bootstrap) is the embedding application's problem:
//!
//! - [`mutation::MutationController`]: optimistic favorite/like/vote updates
//!   with generation-guarded reconciliation and deterministic rollback.
//! - [`search::QueryComposer`]: debounced, sequence-guarded search dispatch.
//! - [`store::CartStore`]: deduplicating, disk-persisted ingredient cart.

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod gateway;
pub mod models;
pub mod mutation;
pub mod search;
pub mod store;

pub use config::CoreConfig;
pub use error::CoreError;
pub use events::CoreEvent;
pub use gateway::{Gateway, GatewayError, HttpGateway, MockGateway};
pub use mutation::{MutationController, MutationOutcome, RollbackReason};
pub use search::QueryComposer;
pub use store::{CartStore, EntityStateStore};
