/// Base URL of the Tastepedia HTTP API when none is configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:8080";

/// Quiet period a burst of filter changes must survive before a search
/// request is dispatched. Chosen so slider drags never flood the network.
pub const DEBOUNCE_MS: u64 = 500;

/// How long a mutation request may stay outstanding before it is treated as
/// failed and the optimistic value is rolled back. A hung connection would
/// otherwise leave the entry in-flight forever.
pub const MUTATION_TIMEOUT_MS: u64 = 10_000;

/// File name of the persisted cart inside the data directory.
pub const CART_FILE: &str = "cart.json";
