//! Application state shared across handlers.

use std::sync::Arc;

use index::SearchIndexClient;
use worker::ReplayCache;

/// Shared state for the health probe and regression replay mock endpoints.
#[derive(Clone)]
pub struct AppState {
    pub replay_cache: Arc<ReplayCache>,
    pub index_client: Arc<SearchIndexClient>,
    pub testcases_index: Arc<str>,
}

impl AppState {
    pub fn new(
        replay_cache: Arc<ReplayCache>,
        index_client: Arc<SearchIndexClient>,
        testcases_index: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            replay_cache,
            index_client,
            testcases_index: testcases_index.into(),
        }
    }
}
