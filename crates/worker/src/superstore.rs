//! Super-Store Pipeline Handler (C10).
//!
//! Grounded on `superstore_utils.py`'s `SuperStore.write_to_s3` /
//! `validate_message` and `superstore_consumer.py`'s `batch_handler`: skip
//! plain (header-less) records, check the allow-list, derive the
//! date-partitioned key from the inquiry request's own transaction id, PGP
//! encrypt, gzip, and upload with server-side KMS encryption. The
//! three-way exception split (missing-field -> swallow, object-store error
//! -> propagate so the batch is redelivered, anything else -> log and
//! swallow) is carried through as three distinct match arms (spec §3 of
//! `SPEC_FULL.md`, supplemented feature).

use std::io::Write;
use std::time::Instant;

use flate2::write::GzEncoder;
use flate2::Compression;

use engine_core::error::{Error, Result};
use engine_core::model::InquiryEvent;
use engine_core::secrets::SecretProvider;

use kafka::envelope::decode;
use objectstore::{ObjectStoreClient, PgpEncryptor, SuperstoreAllowList};

use engine_core::model::Envelope;
use telemetry::metrics;

/// `{bucket}/{prefix}` is stored as one config string (`SUPER_STORE_S3_PATH`,
/// spec §6), split on the first `/` exactly as `write_to_s3` does.
fn split_bucket_and_prefix(path: &str) -> Result<(&str, &str)> {
    path.split_once('/')
        .ok_or_else(|| Error::configuration(format!("invalid SUPER_STORE_S3_PATH: {path}")))
}

/// Processes one polled batch for the super-store topic (spec §4.8
/// "Super-store handler").
#[tracing::instrument(skip_all)]
pub async fn superstore_handler(
    events: Vec<InquiryEvent>,
    object_store: &ObjectStoreClient,
    allow_list: &SuperstoreAllowList,
    pgp: &PgpEncryptor,
    secrets: &dyn SecretProvider,
    s3_path: &str,
    kms_key_id: &str,
) -> Result<()> {
    let start = Instant::now();
    let (bucket, prefix) = split_bucket_and_prefix(s3_path)?;

    for event in events {
        if event.headers.is_empty() {
            continue;
        }

        let decoded = match decode(&event) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "super-store envelope failed to decode, skipping record");
                continue;
            }
        };

        let Envelope::Versioned { decoded, .. } = decoded else {
            continue;
        };

        let solution_id = decoded.flow_tags.solution_id.clone();
        match allow_list.is_allowed(object_store, &solution_id).await {
            Ok(false) => {
                tracing::debug!(solution_id = %solution_id, "solution id not allow-listed, skipping record");
                continue;
            }
            Err(e) => {
                tracing::error!(error = %e, "allow-list lookup failed, skipping record");
                continue;
            }
            Ok(true) => {}
        }

        let body = decoded.response_payload.clone();
        let transaction_id = body
            .get("INQUIRY")
            .and_then(|v| v.get("INQREQ"))
            .and_then(|v| v.get("transaction_id"))
            .and_then(|v| v.as_str());
        let inquiry_solution_id = body
            .get("INQUIRY")
            .and_then(|v| v.get("INQREQ"))
            .and_then(|v| v.get("solution_id"))
            .and_then(|v| v.as_str());

        let (transaction_id, inquiry_solution_id) = match (transaction_id, inquiry_solution_id) {
            (Some(t), Some(s)) => (t, s),
            _ => {
                tracing::warn!("super-store record missing transaction_id/solution_id, skipping");
                continue;
            }
        };

        let result = upload_one(
            object_store,
            pgp,
            secrets,
            bucket,
            prefix,
            inquiry_solution_id,
            transaction_id,
            &body,
            kms_key_id,
        )
        .await;

        match result {
            Ok(()) => {}
            Err(e @ Error::ObjectStoreUpload(_)) => {
                tracing::error!(transaction_id, error = %e, "super-store upload failed, batch will be redelivered");
                return Err(e);
            }
            Err(e) => {
                tracing::error!(transaction_id, error = %e, "super-store record failed, skipping");
            }
        }
    }

    metrics()
        .handler_latency_ms
        .observe(start.elapsed().as_millis() as u64);
    Ok(())
}

async fn upload_one(
    object_store: &ObjectStoreClient,
    pgp: &PgpEncryptor,
    secrets: &dyn SecretProvider,
    bucket: &str,
    prefix: &str,
    solution_id: &str,
    transaction_id: &str,
    body: &serde_json::Value,
    kms_key_id: &str,
) -> Result<()> {
    let key = objectstore::superstore_key(prefix, solution_id, transaction_id)?;

    let mut line = serde_json::to_vec(body)?;
    line.push(b'\n');

    let armored = pgp.encrypt(secrets, &line).await?;

    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(&armored)
        .map_err(|e| Error::object_store_upload(format!("gzip failed: {e}")))?;
    let compressed = gz
        .finish()
        .map_err(|e| Error::object_store_upload(format!("gzip finish failed: {e}")))?;

    object_store
        .put_object_kms(bucket, &key, compressed, kms_key_id)
        .await
}
