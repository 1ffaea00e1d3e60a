//! Search-Index Client (C4).
//!
//! Grounded on `es_util.py`'s `ESConnector`: a thin wrapper around the
//! official client that retries every call on transport failure with a
//! fixed short backoff. The Python original retries forever; here the
//! retry count is bounded (spec §9 Design Note -- unbounded retries inside
//! a consumer loop would stall offset commits indefinitely on a genuinely
//! dead cluster), but the backoff and "retry transparently, never bubble a
//! transport error" behavior are unchanged.

use std::time::{Duration, Instant};

use elasticsearch::http::transport::Transport;
use elasticsearch::{
    BulkParts, CountParts, DeleteByQueryParts, Elasticsearch, IndexParts, ScrollParts,
    SearchParts, UpdateParts,
};
use serde_json::{json, Value};
use tracing::warn;

use engine_core::error::{Error, Result};
use telemetry::metrics;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(50);
const MAX_ATTEMPTS: u32 = 5;

/// Outcome of an operation that Elasticsearch may reject without it being a
/// transport failure (index already exists, document/index not found).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredError {
    pub error: String,
    pub status_code: u16,
}

/// Shared client for the audit-log/regression search index.
pub struct SearchIndexClient {
    pub(crate) inner: Elasticsearch,
}

impl SearchIndexClient {
    pub fn new(url: &str) -> Result<Self> {
        let transport = Transport::single_node(url)
            .map_err(|e| Error::configuration(format!("invalid index url {url}: {e}")))?;
        Ok(Self {
            inner: Elasticsearch::new(transport),
        })
    }

    async fn with_retry<F, Fut, T>(&self, op: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => {
                    metrics()
                        .index_latency_ms
                        .observe(start.elapsed().as_millis() as u64);
                    metrics().index_upserts.inc();
                    return Ok(value);
                }
                Err(err) if attempt < MAX_ATTEMPTS => {
                    warn!(op, attempt, error = %err, "index transport error, retrying");
                    tokio::time::sleep(DEFAULT_RETRY_DELAY).await;
                }
                Err(err) => {
                    metrics().index_upsert_errors.inc();
                    return Err(err);
                }
            }
        }
    }

    /// Idempotent upsert by document id (`doc_as_upsert`, spec §4.7).
    pub async fn upsert_document(&self, index: &str, doc_id: &str, doc: &Value) -> Result<()> {
        self.with_retry("upsert_document", || async {
            let body = json!({ "doc": doc, "doc_as_upsert": true });
            self.inner
                .update(UpdateParts::IndexId(index, doc_id))
                .body(body)
                .send()
                .await
                .map_err(|e| Error::index_upsert(format!("upsert {index}/{doc_id}: {e}")))?
                .error_for_status_code()
                .map_err(|e| Error::index_upsert(format!("upsert {index}/{doc_id}: {e}")))?;
            Ok(())
        })
        .await
    }

    /// Query documents with a raw ES query body (match/term/range, spec §4.7).
    pub async fn query(&self, index: &str, query: &Value, size: i64) -> Result<Vec<Value>> {
        self.with_retry("query", || async {
            let response = self
                .inner
                .search(SearchParts::Index(&[index]))
                .body(json!({ "query": query }))
                .size(size)
                .send()
                .await
                .map_err(|e| Error::index_upsert(format!("query {index}: {e}")))?;

            let body: Value = response
                .json()
                .await
                .map_err(|e| Error::index_upsert(format!("query {index} decode: {e}")))?;

            let hits = body["hits"]["hits"]
                .as_array()
                .cloned()
                .unwrap_or_default();
            Ok(hits)
        })
        .await
    }

    /// Document count matching a query (spec §4.7).
    pub async fn count(&self, index: &str, query: &Value) -> Result<u64> {
        self.with_retry("count", || async {
            let response = self
                .inner
                .count(CountParts::Index(&[index]))
                .body(json!({ "query": query }))
                .send()
                .await
                .map_err(|e| Error::index_upsert(format!("count {index}: {e}")))?;

            let body: Value = response
                .json()
                .await
                .map_err(|e| Error::index_upsert(format!("count {index} decode: {e}")))?;

            Ok(body["count"].as_u64().unwrap_or(0))
        })
        .await
    }

    /// Delete-by-query (spec §4.7). A 404 on a missing index is surfaced as
    /// a structured error, never raised.
    pub async fn delete_by_query(
        &self,
        index: &str,
        query: &Value,
    ) -> Result<std::result::Result<(), StructuredError>> {
        self.with_retry("delete_by_query", || async {
            let response = self
                .inner
                .delete_by_query(DeleteByQueryParts::Index(&[index]))
                .body(json!({ "query": query }))
                .send()
                .await
                .map_err(|e| Error::index_upsert(format!("delete_by_query {index}: {e}")))?;

            let status = response.status_code().as_u16();
            if status == 404 {
                return Ok(Err(StructuredError {
                    error: "index_not_found_exception".to_string(),
                    status_code: status,
                }));
            }
            Ok(Ok(()))
        })
        .await
    }

    /// Scroll-based read of every document matching `query` (spec §4.7).
    pub async fn scroll_all(&self, index: &str, query: &Value, scroll: &str) -> Result<Vec<Value>> {
        self.with_retry("scroll_all", || async {
            let mut docs = Vec::new();

            let response = self
                .inner
                .search(SearchParts::Index(&[index]))
                .scroll(scroll)
                .body(json!({ "query": query }))
                .send()
                .await
                .map_err(|e| Error::index_upsert(format!("scroll {index}: {e}")))?;

            let mut body: Value = response
                .json()
                .await
                .map_err(|e| Error::index_upsert(format!("scroll {index} decode: {e}")))?;

            loop {
                let hits = body["hits"]["hits"].as_array().cloned().unwrap_or_default();
                if hits.is_empty() {
                    break;
                }
                docs.extend(hits);

                let scroll_id = body["_scroll_id"]
                    .as_str()
                    .ok_or_else(|| Error::index_upsert("scroll response missing _scroll_id"))?
                    .to_string();

                let next = self
                    .inner
                    .scroll(ScrollParts::None)
                    .body(json!({ "scroll": scroll, "scroll_id": scroll_id }))
                    .send()
                    .await
                    .map_err(|e| Error::index_upsert(format!("scroll continuation {index}: {e}")))?;

                body = next
                    .json()
                    .await
                    .map_err(|e| Error::index_upsert(format!("scroll continuation {index} decode: {e}")))?;
            }

            Ok(docs)
        })
        .await
    }

    /// Bulk-indexes `actions`, each `(doc_id, document)` pair landing in
    /// `index` (spec §4.7 bulk action list).
    pub async fn bulk_index(&self, index: &str, actions: &[(String, Value)]) -> Result<()> {
        if actions.is_empty() {
            return Ok(());
        }
        self.with_retry("bulk_index", || async {
            let mut body: Vec<elasticsearch::http::request::JsonBody<Value>> =
                Vec::with_capacity(actions.len() * 2);
            for (doc_id, doc) in actions {
                body.push(json!({ "index": { "_id": doc_id } }).into());
                body.push(json!(doc).into());
            }

            let response = self
                .inner
                .bulk(BulkParts::Index(index))
                .body(body)
                .send()
                .await
                .map_err(|e| Error::index_upsert(format!("bulk {index}: {e}")))?;

            let parsed: Value = response
                .json()
                .await
                .map_err(|e| Error::index_upsert(format!("bulk {index} decode: {e}")))?;

            if parsed["errors"].as_bool().unwrap_or(false) {
                return Err(Error::index_upsert(format!("bulk {index} reported item errors")));
            }
            Ok(())
        })
        .await
    }

    /// Direct (non-upserting) document creation, used by seed/fixture paths.
    pub async fn index_document(&self, index: &str, doc_id: &str, doc: &Value) -> Result<()> {
        self.with_retry("index_document", || async {
            self.inner
                .index(IndexParts::IndexId(index, doc_id))
                .body(doc)
                .send()
                .await
                .map_err(|e| Error::index_upsert(format!("index {index}/{doc_id}: {e}")))?
                .error_for_status_code()
                .map_err(|e| Error::index_upsert(format!("index {index}/{doc_id}: {e}")))?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction_rejects_malformed_url() {
        assert!(SearchIndexClient::new("not a url").is_err());
    }

    #[test]
    fn client_construction_accepts_valid_url() {
        assert!(SearchIndexClient::new("http://localhost:9200").is_ok());
    }
}
