//! Schema validation for the billing pipeline's inbound messages.
//!
//! Grounded on `billing_handler.py`'s `BillingMessage.model_validate(...)`
//! call: a failing validation skips the record and logs at WARNING with the
//! message key (spec §7), it never fails the batch.

use crate::error::{Error, Result};
use crate::model::BillingMessage;
use validator::Validate;

/// Validates a billing message against the `BillingMessage` schema (spec §3).
///
/// Returns a `SchemaValidation` error carrying the offending key on failure;
/// callers skip the record and move on rather than propagating the error.
pub fn validate_billing_message(message: &BillingMessage, key: &str) -> Result<()> {
    message
        .validate()
        .map_err(|e| Error::schema_validation(key, e.to_string()))?;

    if message.product_codes.iter().filter(|p| p.is_base()).count() > 1 {
        return Err(Error::schema_validation(
            key,
            "more than one product code with index \"10\"",
        ));
    }

    Ok(())
}
