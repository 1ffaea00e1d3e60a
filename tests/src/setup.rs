//! Builds a `TestContext` that wires the real pipeline handlers against the
//! containers started in `containers`, the same way `main.rs` wires them
//! against production infrastructure.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use api::AppState;
use engine_core::config::RelationalConfig;
use index::SearchIndexClient;
use store::writer::RelationalWriter;
use worker::{JobTracker, ReplayCache};

use crate::containers::TestContainers;

pub const TESTCASES_INDEX: &str = "rts_testcases_test";

pub struct TestContext {
    pub containers: TestContainers,
    pub writer: RelationalWriter,
    pub index_client: Arc<SearchIndexClient>,
    pub replay_cache: Arc<ReplayCache>,
    pub job_tracker: Arc<JobTracker>,
    pub relational_config: RelationalConfig,
}

impl TestContext {
    pub async fn new() -> Self {
        let containers = TestContainers::start().await;

        let relational_config = RelationalConfig {
            database_url: containers.postgres_url.clone(),
            ..RelationalConfig::default()
        };

        create_billing_tables(&relational_config).await;

        let writer = RelationalWriter::connect(&relational_config, 4)
            .await
            .expect("failed to connect relational writer to test postgres");

        let index_client = Arc::new(
            SearchIndexClient::new(&containers.elasticsearch_url)
                .expect("failed to construct search index client"),
        );

        let replay_cache = Arc::new(ReplayCache::new(128));
        let job_tracker = Arc::new(JobTracker::new(16));

        Self {
            containers,
            writer,
            index_client,
            replay_cache,
            job_tracker,
            relational_config,
        }
    }

    /// Builds the app state the HTTP router is mounted on, the same way
    /// `main.rs` builds it for the health/mock surface.
    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.replay_cache.clone(),
            self.index_client.clone(),
            TESTCASES_INDEX,
        )
    }
}

/// Creates the two billing tables with the column layout `RelationalConfig`'s
/// defaults expect. Production provisions these out of band; the test suite
/// provisions them itself against the ephemeral container.
async fn create_billing_tables(config: &RelationalConfig) {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .expect("failed to connect for schema bootstrap");

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            transaction_id TEXT NOT NULL,
            inquiry_timestamp TIMESTAMP NOT NULL,
            billing_record TEXT NOT NULL,
            silent_launch BOOLEAN NOT NULL,
            solution_id TEXT NOT NULL,
            subcode TEXT NOT NULL
        )",
        config.summary_table
    ))
    .execute(&pool)
    .await
    .expect("failed to create summary table");

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            transaction_id TEXT NOT NULL,
            inquiry_timestamp TIMESTAMP NOT NULL,
            solution_id TEXT NOT NULL,
            subcode TEXT NOT NULL,
            product_code TEXT NOT NULL,
            product_code_type TEXT NOT NULL,
            silent_launch BOOLEAN NOT NULL
        )",
        config.product_table
    ))
    .execute(&pool)
    .await
    .expect("failed to create product table");

    pool.close().await;
}
