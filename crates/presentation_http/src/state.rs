//! Application state shared across handlers

use std::sync::Arc;

use infrastructure::SqliteLetterRepository;

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Authoritative letter store served over HTTP
    pub letters: Arc<SqliteLetterRepository>,
}

impl AppState {
    pub fn new(letters: SqliteLetterRepository) -> Self {
        Self {
            letters: Arc::new(letters),
        }
    }
}
