//! Regression Replay Cache (C12).
//!
//! Two independent pieces share this module because they back the same
//! regression-run feature: a bounded LRU over test-case service snapshots
//! (grounded on `replay_cache.py`'s `@lru_cache`-wrapped `get_record`), and
//! the job-tracker FIFO overload shedder (grounded line-for-line on
//! `rts_job_manager.py`'s `run_job`).

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use serde_json::json;

use engine_core::error::{Error, Result};
use engine_core::model::{JobStatus, JobTrackerEntry};

use index::SearchIndexClient;
use telemetry::metrics;

/// Process-local cache of `testcase_id -> services snapshot` (spec §4.10).
/// A miss fetches the `services` field from the search index by document id
/// and memoizes the result.
pub struct ReplayCache {
    cache: moka::future::Cache<String, serde_json::Value>,
}

impl ReplayCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: moka::future::Cache::new(max_capacity),
        }
    }

    /// Returns the `services` snapshot for `testcase_id`, fetching and
    /// memoizing on a cache miss.
    pub async fn get_services(
        &self,
        index_client: &SearchIndexClient,
        testcases_index: &str,
        testcase_id: &str,
    ) -> Result<serde_json::Value> {
        if let Some(services) = self.cache.get(testcase_id).await {
            metrics().replay_cache_hits.inc();
            return Ok(services);
        }
        metrics().replay_cache_misses.inc();

        let query = json!({ "term": { "_id": testcase_id } });
        let hits = index_client.query(testcases_index, &query, 1).await?;
        let doc = hits
            .into_iter()
            .next()
            .ok_or_else(|| Error::missing_field(format!("testcase {testcase_id} not found in index")))?;

        let services = doc["_source"]["services"].clone();
        self.cache
            .insert(testcase_id.to_string(), services.clone())
            .await;
        Ok(services)
    }

    pub fn invalidate(&self, testcase_id: &str) {
        self.cache.invalidate(testcase_id);
    }
}

struct TrackerState {
    entries: HashMap<String, JobTrackerEntry>,
    queue: VecDeque<String>,
}

/// Bounded FIFO job tracker backing regression runs (spec §3 "JobTracker
/// entry"). Preserves `rts_job_manager.py`'s overload-shedding rule
/// verbatim: when the tracker grows past capacity, the oldest tracked job is
/// popped; if it is still running, it is put back and the *new* job is
/// dropped instead, otherwise the oldest entry is evicted and the new job
/// proceeds. This is the system's only backpressure signal and must not be
/// replaced with a blocking enqueue.
pub struct JobTracker {
    state: Mutex<TrackerState>,
    max_size: usize,
}

impl JobTracker {
    pub fn new(max_size: usize) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                entries: HashMap::new(),
                queue: VecDeque::new(),
            }),
            max_size,
        }
    }

    /// Registers a new job. Returns `false` if the tracker was at capacity
    /// and the new job was dropped to protect an in-flight older one.
    pub fn start_job(&self, job_id: &str) -> bool {
        let mut state = self.state.lock();
        state.entries.insert(
            job_id.to_string(),
            JobTrackerEntry {
                job_id: job_id.to_string(),
                status: JobStatus::JobStarted,
                results: None,
            },
        );

        if state.entries.len() > self.max_size {
            if let Some(oldest_id) = state.queue.pop_front() {
                let oldest_running = state
                    .entries
                    .get(&oldest_id)
                    .map(|e| e.status.is_running())
                    .unwrap_or(false);

                if oldest_running {
                    state.queue.push_back(oldest_id);
                    state.entries.remove(job_id);
                    metrics().replay_jobs_evicted.inc();
                    return false;
                }
                state.entries.remove(&oldest_id);
            }
        }

        state.queue.push_back(job_id.to_string());
        true
    }

    pub fn set_status(&self, job_id: &str, status: JobStatus) {
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.get_mut(job_id) {
            entry.status = status;
        }
    }

    pub fn set_results(&self, job_id: &str, results: serde_json::Value) {
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.get_mut(job_id) {
            entry.results = Some(results);
        }
    }

    pub fn get(&self, job_id: &str) -> Option<JobTrackerEntry> {
        self.state.lock().entries.get(job_id).cloned()
    }
}
