//! Search-index health checks.

use elasticsearch::cat::CatHealthParts;
use tracing::{debug, error};

use crate::client::SearchIndexClient;

/// Checks cluster health via `_cat/health` (mirrors the relational and
/// object-store health probes; see `store::writer::RelationalWriter::ping`).
pub async fn check_connection(client: &SearchIndexClient) -> bool {
    match client.inner.cat().health(CatHealthParts::None).send().await {
        Ok(resp) if resp.status_code().is_success() => {
            debug!("search index connection healthy");
            true
        }
        Ok(resp) => {
            error!(status = %resp.status_code(), "search index health check returned non-success");
            false
        }
        Err(e) => {
            error!("search index health check failed: {}", e);
            false
        }
    }
}
