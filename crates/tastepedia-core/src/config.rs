use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{DEBOUNCE_MS, DEFAULT_API_BASE, MUTATION_TIMEOUT_MS};

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Directory holding locally persisted state (the cart file).
    pub data_dir: PathBuf,
    /// Base URL of the remote API.
    pub api_base: String,
    /// Debounce window for the query composer.
    pub debounce: Duration,
    /// Upper bound on how long an optimistic mutation may stay in flight.
    pub mutation_timeout: Duration,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            api_base: DEFAULT_API_BASE.to_string(),
            debounce: Duration::from_millis(DEBOUNCE_MS),
            mutation_timeout: Duration::from_millis(MUTATION_TIMEOUT_MS),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new("tastepedia_data")
    }
}
