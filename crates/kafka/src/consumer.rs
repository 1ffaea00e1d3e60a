//! Kafka Batch Consumer (C6).
//!
//! Grounded on `async_consumer.py`'s `AIOConsumer.consume_batch`: subscribe,
//! poll with a fixed timeout, hand the whole batch to the handler, and only
//! commit the *last* offset in the batch once the handler returns `Ok`. A
//! handler error leaves the offset untouched so the next poll redelivers the
//! same records (spec §4.1, scenario 6 "Offset discipline"). `auto_commit`
//! is never enabled, matching the Python client's `enable_auto_commit=False`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rskafka::client::partition::{OffsetAt, PartitionClient, UnknownTopicHandling};
use rskafka::client::{Client, ClientBuilder};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use engine_core::config::KafkaConfig;
use engine_core::error::{Error, Result};
use engine_core::model::{InquiryEvent, PartitionCoordinate};
use telemetry::metrics;

use crate::config::{build_tls_config, requires_tls};

/// Decides the offset to track for a partition after one handler call (spec
/// §4.1 poll loop / §8 testable properties 5-6): advance past the last
/// record in the batch on success, leave untouched on failure so the next
/// poll redelivers the same records.
fn offset_after_handler_result(current: i64, max_seen_offset: i64, handled_ok: bool) -> i64 {
    if handled_ok {
        max_seen_offset + 1
    } else {
        current
    }
}

struct PartitionState {
    client: Arc<PartitionClient>,
    next_offset: AtomicI64,
}

/// Consumes one topic across all of its partitions, dispatching each
/// partition's batch to a handler and committing per-partition offsets only
/// on success.
pub struct BatchConsumer {
    config: KafkaConfig,
    topic: String,
    topic_index: u32,
    partitions: RwLock<HashMap<i32, PartitionState>>,
    client: RwLock<Option<Arc<Client>>>,
}

impl BatchConsumer {
    pub fn new(config: KafkaConfig, topic: String, topic_index: u32) -> Self {
        Self {
            config,
            topic,
            topic_index,
            partitions: RwLock::new(HashMap::new()),
            client: RwLock::new(None),
        }
    }

    async fn ensure_client(&self) -> Result<Arc<Client>> {
        {
            let guard = self.client.read().await;
            if let Some(c) = guard.as_ref() {
                return Ok(c.clone());
            }
        }

        let mut builder = ClientBuilder::new(self.config.bootstrap_servers.clone());
        if requires_tls(&self.config) {
            builder = builder.tls_config(build_tls_config(&self.config)?);
        }

        let client = builder
            .build()
            .await
            .map_err(|e| Error::internal(format!("failed to connect to kafka: {e}")))?;
        let client = Arc::new(client);

        let mut guard = self.client.write().await;
        *guard = Some(client.clone());
        Ok(client)
    }

    /// Discovers (or reuses) the partition clients for this consumer's topic,
    /// seeding each partition's offset to the current latest on first
    /// connect, matching the teacher consumer's "start from latest" policy.
    async fn ensure_partitions(&self) -> Result<()> {
        if !self.partitions.read().await.is_empty() {
            return Ok(());
        }

        let client = self.ensure_client().await?;
        let topics = client
            .list_topics()
            .await
            .map_err(|e| Error::internal(format!("failed to list topics: {e}")))?;

        let partition_ids: Vec<i32> = topics
            .iter()
            .find(|t| t.name == self.topic)
            .map(|t| t.partitions.clone())
            .ok_or_else(|| Error::configuration(format!("topic {} not found", self.topic)))?;

        let mut states = HashMap::new();
        for partition in partition_ids {
            let partition_client = client
                .partition_client(
                    self.topic.clone(),
                    partition,
                    UnknownTopicHandling::Error,
                )
                .await
                .map_err(|e| Error::internal(format!("failed to get partition client: {e}")))?;

            let offset = partition_client
                .get_offset(OffsetAt::Latest)
                .await
                .map_err(|e| Error::internal(format!("failed to get offset: {e}")))?;

            info!(topic = %self.topic, partition, offset, "consumer initialized at offset");

            states.insert(
                partition,
                PartitionState {
                    client: Arc::new(partition_client),
                    next_offset: AtomicI64::new(offset),
                },
            );
        }

        let mut guard = self.partitions.write().await;
        *guard = states;
        Ok(())
    }

    /// Polls every partition once, for the configured timeout, and invokes
    /// `handler` with each partition's non-empty batch. Returns once every
    /// partition has been polled a single time; callers loop this in a
    /// supervised task (C11) for continuous consumption.
    pub async fn poll_once<F, Fut>(&self, handler: F) -> Result<()>
    where
        F: Fn(Vec<InquiryEvent>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        self.ensure_partitions().await?;

        let partitions = self.partitions.read().await;
        for (&partition, state) in partitions.iter() {
            let start = std::time::Instant::now();
            let current = state.next_offset.load(Ordering::SeqCst);
            let timeout = Duration::from_millis(self.config.poll_timeout_ms);
            let max_bytes = self.config.max_poll_records * 64 * 1024;

            let fetch = state
                .client
                .fetch_records(current, 1..max_bytes as i32, timeout.as_millis() as i32)
                .await;

            let (records, _watermark) = match fetch {
                Ok(r) => r,
                Err(e) => {
                    error!(topic = %self.topic, partition, error = %e, "fetch failed");
                    continue;
                }
            };

            if records.is_empty() {
                continue;
            }

            let mut events = Vec::with_capacity(records.len());
            let mut max_offset = current;
            for record in &records {
                max_offset = max_offset.max(record.offset);
                if let Some(value) = &record.record.value {
                    let headers: Vec<(String, Vec<u8>)> = record
                        .record
                        .headers
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect();
                    events.push(InquiryEvent {
                        key: record
                            .record
                            .key
                            .as_ref()
                            .map(|k| String::from_utf8_lossy(k).to_string()),
                        payload: value.clone(),
                        headers,
                        partition: PartitionCoordinate {
                            topic_index: self.topic_index,
                            partition,
                            offset: record.offset,
                        },
                    });
                }
            }

            debug!(
                topic = %self.topic,
                partition,
                count = events.len(),
                latency_ms = %start.elapsed().as_millis(),
                "fetched batch"
            );
            metrics().events_consumed.inc_by(events.len() as u64);

            let handler_result = handler(events).await;
            let next = offset_after_handler_result(current, max_offset, handler_result.is_ok());
            state.next_offset.store(next, Ordering::SeqCst);

            match handler_result {
                Ok(()) => {
                    debug!(topic = %self.topic, partition, committed = next, "committed offset");
                }
                Err(e) => {
                    warn!(
                        topic = %self.topic,
                        partition,
                        error = %e,
                        "handler failed, offset not advanced, batch will be redelivered"
                    );
                    metrics().consumer_errors.inc_by(1);
                }
            }
        }

        Ok(())
    }

    /// Runs `poll_once` forever. The supervisor (C11) owns the task this
    /// future is spawned on and restarts the whole worker if it ever exits.
    pub async fn run<F, Fut>(&self, handler: F) -> Result<()>
    where
        F: Fn(Vec<InquiryEvent>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        loop {
            self.poll_once(&handler).await?;
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}
