//! Billing Pipeline Handler (C10).
//!
//! Grounded on `billing_handler.py`'s `billing_handler`: walk the batch,
//! schema-validate each record (skip + log WARNING on failure, spec §7),
//! format PII (C9), encode the fixed-width record (C8), accumulate both row
//! sets, then submit one two-table bulk write (C3) for the whole batch.

use engine_core::error::Result;
use engine_core::model::{BillingMessage, BillingProductRow, BillingSummaryRow, InquiryEvent};
use engine_core::schema::validate_billing_message;

use crypto::encoder::encode_billing_message;
use crypto::pii::format_applicant_pii;
use crypto::pool::CryptoPool;
use store::writer::RelationalWriter;

/// Processes one polled batch for the billing topic (spec §4.8 "Billing
/// handler"). Per-record failures (schema validation, fixed-width mismatch)
/// are logged and skip that record only; the batch's offset still commits
/// unless the final bulk write itself fails.
pub async fn billing_handler(
    events: Vec<InquiryEvent>,
    crypto: &CryptoPool,
    writer: &RelationalWriter,
    owning_subsystem: &str,
    calling_subsystem: &str,
) -> Result<()> {
    let mut summary_rows: Vec<BillingSummaryRow> = Vec::new();
    let mut product_rows: Vec<BillingProductRow> = Vec::new();

    for event in &events {
        let key = event.key.clone().unwrap_or_default();

        let message: BillingMessage = match serde_json::from_slice(&event.payload) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "billing message failed to parse, skipping record");
                continue;
            }
        };

        if let Err(e) = validate_billing_message(&message, &key) {
            tracing::warn!(key = %key, error = %e, "billing schema validation failed, skipping record");
            continue;
        }

        let pii = format_applicant_pii(&message.applicant_pii);

        match encode_billing_message(&message, &pii, crypto, owning_subsystem, calling_subsystem).await {
            Ok(encoded) => {
                summary_rows.push(encoded.summary);
                product_rows.extend(encoded.products);
            }
            Err(e) => {
                tracing::error!(
                    transaction_id = %message.transaction_id,
                    error = %e,
                    "billing record encoding failed, dropping transaction"
                );
            }
        }
    }

    if !summary_rows.is_empty() && !product_rows.is_empty() {
        let outcome = writer.bulk_insert(&summary_rows, &product_rows).await?;
        tracing::info!(
            mode = ?outcome.mode,
            summary_inserted = outcome.summary_inserted,
            product_inserted = outcome.product_inserted,
            "billing batch written"
        );
    }

    Ok(())
}
