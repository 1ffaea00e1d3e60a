//! Pipeline handlers (C10), process supervisor (C11) and regression replay
//! cache (C12) for the ingestion engine.
//!
//! Three independent pipelines (billing, super-store, audit-log/regression)
//! share the same C6 batch-consumer engine; each gets its own handler module
//! here and is wired to a dedicated `BatchConsumer` by `main.rs`.

pub mod auditlog;
pub mod billing;
pub mod replay;
pub mod superstore;
pub mod supervisor;

use std::sync::Arc;

use engine_core::error::Result;
use engine_core::model::InquiryEvent;

use crypto::pool::CryptoPool;
use index::SearchIndexClient;
use kafka::BatchConsumer;
use objectstore::{ObjectStoreClient, PgpEncryptor, SuperstoreAllowList};
use store::writer::RelationalWriter;

pub use replay::{JobTracker, ReplayCache};
pub use supervisor::{supervise, worker_index_from_env};

/// Runs the billing consumer loop forever (spec §4.8 "Billing handler").
pub async fn run_billing_consumer(
    consumer: BatchConsumer,
    crypto: Arc<CryptoPool>,
    writer: Arc<RelationalWriter>,
    owning_subsystem: String,
    calling_subsystem: String,
) -> Result<()> {
    consumer
        .run(move |events: Vec<InquiryEvent>| {
            let crypto = crypto.clone();
            let writer = writer.clone();
            let owning_subsystem = owning_subsystem.clone();
            let calling_subsystem = calling_subsystem.clone();
            async move {
                billing::billing_handler(events, &crypto, &writer, &owning_subsystem, &calling_subsystem)
                    .await
            }
        })
        .await
}

/// Runs the super-store consumer loop forever (spec §4.8 "Super-store
/// handler").
#[allow(clippy::too_many_arguments)]
pub async fn run_superstore_consumer(
    consumer: BatchConsumer,
    object_store: Arc<ObjectStoreClient>,
    allow_list: Arc<SuperstoreAllowList>,
    pgp: Arc<PgpEncryptor>,
    secrets: Arc<dyn engine_core::secrets::SecretProvider>,
    s3_path: String,
    kms_key_id: String,
) -> Result<()> {
    consumer
        .run(move |events: Vec<InquiryEvent>| {
            let object_store = object_store.clone();
            let allow_list = allow_list.clone();
            let pgp = pgp.clone();
            let secrets = secrets.clone();
            let s3_path = s3_path.clone();
            let kms_key_id = kms_key_id.clone();
            async move {
                superstore::superstore_handler(
                    events,
                    &object_store,
                    &allow_list,
                    &pgp,
                    secrets.as_ref(),
                    &s3_path,
                    &kms_key_id,
                )
                .await
            }
        })
        .await
}

/// Runs the audit-log/regression consumer loop forever (spec §4.9 "Audit-log
/// handler").
pub async fn run_auditlog_consumer(
    consumer: BatchConsumer,
    index_client: Arc<SearchIndexClient>,
    testcases_index: String,
) -> Result<()> {
    consumer
        .run(move |events: Vec<InquiryEvent>| {
            let index_client = index_client.clone();
            let testcases_index = testcases_index.clone();
            async move { auditlog::auditlog_handler(events, &index_client, &testcases_index).await }
        })
        .await
}
