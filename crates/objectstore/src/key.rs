//! Super-store object key layout (spec §4.8 step 4, §6).
//!
//! Grounded on `superstore_utils.py`'s `write_to_s3`: the transaction id's
//! first 8 characters are `MMDDYYYY`; the date-partitioned prefix is
//! `{YYYY}/{MM}/{YYYYMMDD}`.

use engine_core::error::{Error, Result};

/// Builds the `raw_data/{transaction_id}.json.gz` object key under
/// `{prefix}/{solution_id}/{YYYY}/{MM}/{YYYYMMDD}/`.
pub fn superstore_key(base_prefix: &str, solution_id: &str, transaction_id: &str) -> Result<String> {
    if transaction_id.len() < 8 {
        return Err(Error::missing_field(format!(
            "transaction_id too short to derive a date partition: {transaction_id}"
        )));
    }
    let month = &transaction_id[0..2];
    let day = &transaction_id[2..4];
    let year = &transaction_id[4..8];
    let yyyymmdd = format!("{year}{month}{day}");

    let prefix = base_prefix.trim_matches('/');
    Ok(format!(
        "{prefix}/{solution_id}/{year}/{month}/{yyyymmdd}/raw_data/{transaction_id}.json.gz"
    ))
}
