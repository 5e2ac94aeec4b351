//! The network boundary.
//!
//! Everything remote goes through the [`Gateway`] trait: one typed method
//! per operation, with latency and failure treated as arbitrary and
//! untrusted. Responses are validated into typed values here, at the edge,
//! so nothing above this layer branches on loose JSON.

mod http;
mod mock;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::models::{NewPost, PollState, PostRecord, RecipeSummary, SearchQuery};

pub use http::HttpGateway;
pub use mock::{MockGateway, PlannedCall};

/// Boxed future so the trait stays object-safe behind `Arc<dyn Gateway>`.
pub type GatewayFuture<'a, T> = BoxFuture<'a, Result<T, GatewayError>>;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The session is missing or expired; distinct from generic failure so
    /// the controller can route to the auth flow instead of a retry notice.
    #[error("authentication required")]
    AuthRequired,
    /// The server answered and said no.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The request never completed (connection refused, reset, DNS, ...).
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Server acknowledgement of a like toggle, reduced from the updated post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeAck {
    pub liked: bool,
    pub likes: i64,
}

/// Server-confirmed poll tally after a vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTally {
    pub state: PollState,
}

pub trait Gateway: Send + Sync {
    /// Put `recipe_id` into (or remove it from) the caller's favorites.
    fn set_favorite(&self, recipe_id: &str, desired: bool) -> GatewayFuture<'_, ()>;

    /// Toggle the actor's like on a post; returns the authoritative count.
    fn toggle_like(&self, post_id: &str, actor_id: &str) -> GatewayFuture<'_, LikeAck>;

    /// Cast (or switch) the actor's vote; returns the authoritative tally.
    fn vote_poll(&self, post_id: &str, actor_id: &str, option_id: u32)
        -> GatewayFuture<'_, PollTally>;

    /// Run a minimized facet query against the catalog.
    fn submit_search(&self, query: SearchQuery) -> GatewayFuture<'_, Vec<RecipeSummary>>;

    /// Submit a structured post/question/tip/poll; returns the created record.
    fn create_post(&self, post: NewPost) -> GatewayFuture<'_, PostRecord>;
}
