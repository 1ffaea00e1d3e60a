//! Super-store solution-id allow-list (spec §4.8 step 3).
//!
//! Grounded on `superstore_utils.py`'s `@lru_cache`-wrapped `load_config`:
//! the config object is fetched once from object storage and memoized for
//! the process lifetime. Reimplemented as an explicit once-initialized
//! cache object (spec §9 Design Note "Singleton lifecycles") rather than a
//! process-global memoizing decorator.

use serde::Deserialize;
use tokio::sync::OnceCell;

use engine_core::error::{Error, Result};

use crate::client::ObjectStoreClient;

#[derive(Debug, Deserialize)]
struct SuperstoreConfigFile {
    config: Vec<String>,
}

/// Caches the super-store allow-list (solution ids permitted to land in
/// object storage) for the lifetime of the process.
pub struct SuperstoreAllowList {
    bucket: String,
    config_key: String,
    cached: OnceCell<Vec<String>>,
}

impl SuperstoreAllowList {
    pub fn new(bucket: impl Into<String>, config_key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            config_key: config_key.into(),
            cached: OnceCell::new(),
        }
    }

    async fn load(&self, client: &ObjectStoreClient) -> Result<&Vec<String>> {
        self.cached
            .get_or_try_init(|| async {
                let bytes = client.get_object(&self.bucket, &self.config_key).await?;
                let parsed: SuperstoreConfigFile = serde_json::from_slice(&bytes)
                    .map_err(|e| Error::configuration(format!("invalid superstore config: {e}")))?;
                Ok::<_, Error>(parsed.config)
            })
            .await
    }

    /// Whether `solution_id` is allow-listed (spec §8 scenario 4: a miss is
    /// still an offset-advancing no-op, never an error).
    pub async fn is_allowed(&self, client: &ObjectStoreClient, solution_id: &str) -> Result<bool> {
        let config = self.load(client).await?;
        Ok(config.iter().any(|id| id == solution_id))
    }
}
