//! Unified error types for the ingestion engine.
//!
//! Variants line up 1:1 with the error-kind table the pipeline handlers are
//! written against: each carries enough of the policy decision (skip record,
//! fail transaction, fail batch) in its *kind*, so callers match on variants
//! rather than inspecting message strings.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Billing message failed schema validation. Policy: skip record, log WARNING.
    #[error("schema validation failed for key {key}: {reason}")]
    SchemaValidation { key: String, reason: String },

    /// Envelope payload could not be decompressed or parsed as JSON.
    /// Policy: skip record, log with any id extractable.
    #[error("decode failed: {0}")]
    Decode(String),

    /// A required field was absent from an otherwise-parseable payload.
    /// Policy: skip record, log with transaction id.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Encoded billing chunk did not land on exactly 785 bytes.
    /// Policy: fail the transaction, drop its rows, batch continues.
    #[error("billing record for transaction {transaction_id} was {actual} bytes, expected {expected}")]
    FixedWidthMismatch {
        transaction_id: String,
        expected: usize,
        actual: usize,
    },

    /// Crypto pool encrypt/decrypt call failed. Policy: drop transaction, log ERROR.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Relational bulk insert failed after the bulk attempt and per-row fallback.
    #[error("relational bulk write failed: {0}")]
    RelationalBulk(String),

    /// Object-store upload failed. Policy: propagate to C6, batch not committed.
    #[error("object store upload failed: {0}")]
    ObjectStoreUpload(String),

    /// Search-index upsert failed. Policy: log ERROR, record skipped, batch commits.
    #[error("index upsert failed: {0}")]
    IndexUpsert(String),

    /// Consumer shutting down mid-poll; never committed past the last success.
    #[error("cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn schema_validation(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaValidation {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub fn fixed_width_mismatch(transaction_id: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::FixedWidthMismatch {
            transaction_id: transaction_id.into(),
            expected,
            actual,
        }
    }

    pub fn encryption(msg: impl Into<String>) -> Self {
        Self::Encryption(msg.into())
    }

    pub fn relational_bulk(msg: impl Into<String>) -> Self {
        Self::RelationalBulk(msg.into())
    }

    pub fn object_store_upload(msg: impl Into<String>) -> Self {
        Self::ObjectStoreUpload(msg.into())
    }

    pub fn index_upsert(msg: impl Into<String>) -> Self {
        Self::IndexUpsert(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error, raised by a pipeline handler, should prevent the
    /// batch's offset from committing (per spec §7's per-record-vs-per-batch
    /// split). Per-record errors return `false`; infrastructure errors that
    /// must cause redelivery return `true`.
    pub fn blocks_batch_commit(&self) -> bool {
        matches!(self, Error::ObjectStoreUpload(_) | Error::Cancelled)
    }
}
