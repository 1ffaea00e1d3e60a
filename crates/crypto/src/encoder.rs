//! Billing Record Encoder (C8).
//!
//! Grounded field-for-field on `billing_message_processor.py`
//! (`process_billing_message` / `create_transaction_billing_record`): the
//! 39-char prefix literal, the positional field list, product-code chunking
//! (cap 30, 10 per chunk, continuation-flag rule), the CST timing conversion,
//! and the chunk-dictionary JSON encryption with the `"SEncr:"` + base64
//! prefix (spec §4.4).

use chrono::{NaiveDateTime, TimeZone, Utc};
use std::collections::BTreeMap;

use engine_core::error::{Error, Result};
use engine_core::model::{BillingMessage, BillingProductRow, BillingSummaryRow};

use crate::pii::FormattedApplicantPii;
use crate::pool::CryptoPool;

const RECORD_PREFIX: &str = "GCRGOINQ   00                          ";
const BILLING_RECORD_LENGTH: usize = 785;
const PRODUCT_SLOT_LEN: usize = 70;
const CHUNK_SIZE: usize = 10;
const MAX_PRODUCT_CODES: usize = 30;

/// Output of encoding one billing message: the single summary row and one
/// product-code row per input product code (spec §4.4 "Produced row sets").
#[derive(Debug, Clone)]
pub struct EncodedBilling {
    pub summary: BillingSummaryRow,
    pub products: Vec<BillingProductRow>,
}

fn spaces(n: usize) -> String {
    " ".repeat(n)
}

fn pad_product_slot(joined: &str) -> Result<String> {
    if joined.len() > PRODUCT_SLOT_LEN {
        return Err(Error::internal(format!(
            "product code slot overflowed {PRODUCT_SLOT_LEN} chars: {joined}"
        )));
    }
    Ok(format!("{joined}{}", spaces(PRODUCT_SLOT_LEN - joined.len())))
}

/// Parses `transaction_id[0..14]` (`MMDDYYYYHHMMSS`, understood as UTC) and
/// returns the inquiry timestamp as a naive datetime for the relational rows.
fn parse_inquiry_timestamp(transaction_id: &str) -> Result<NaiveDateTime> {
    let prefix = transaction_id.get(0..14).ok_or_else(|| {
        Error::missing_field(format!(
            "transaction_id too short to carry a timestamp: {transaction_id}"
        ))
    })?;
    NaiveDateTime::parse_from_str(prefix, "%m%d%Y%H%M%S")
        .map_err(|e| Error::missing_field(format!("invalid transaction_id timestamp: {e}")))
}

/// Converts the UTC inquiry timestamp to US Central time and splits it into
/// `(date8, time8)` where `time8` is `HHMMSS00` (spec §4.4 "Timing
/// conversion"). Uses full IANA tz data so DST transitions are honored,
/// mirroring the source's `ZoneInfo("US/Central")` conversion rather than a
/// fixed UTC-6 offset.
fn convert_to_central(utc_naive: NaiveDateTime) -> (String, String) {
    let utc = Utc.from_utc_datetime(&utc_naive);
    let central = utc.with_timezone(&chrono_tz::US::Central);
    let date8 = central.format("%m%d%Y").to_string();
    let time6 = central.format("%H%M%S").to_string();
    (date8, format!("{time6}00"))
}

/// Reorders a transaction's product codes: the base product (`index ==
/// "10"`) first, then the optional codes in their original input order
/// (spec §4.4 "Product-code slot").
fn ordered_codes(message: &BillingMessage) -> Vec<String> {
    let base = message
        .product_codes
        .iter()
        .find(|p| p.is_base())
        .map(|p| p.product_code.clone())
        .unwrap_or_default();
    let mut out = vec![base];
    out.extend(
        message
            .product_codes
            .iter()
            .filter(|p| !p.is_base())
            .map(|p| p.product_code.clone()),
    );
    out
}

/// Builds the literal body shared by every chunk of a transaction, with the
/// product-code slot and continuation flag left as placeholders the caller
/// overwrites per chunk.
fn base_body(
    message: &BillingMessage,
    pii: &FormattedApplicantPii,
    cst_date: &str,
    cst_time: &str,
    owning_subsystem: &str,
    calling_subsystem: &str,
) -> Vec<String> {
    vec![
        "B".to_string(),
        "1.00".to_string(),
        message.transaction_id.chars().take(23).collect(),
        format!("GOINQ{}", spaces(3)),
        spaces(8),
        spaces(8),
        cst_date.to_string(),
        cst_time.to_string(),
        owning_subsystem.to_string(),
        spaces(PRODUCT_SLOT_LEN),   // [9] product-code slot, overwritten per chunk
        spaces(50),
        message.subcode.clone(),
        spaces(4),
        spaces(4),
        message.arf_version.clone(),
        spaces(53),
        pii.ssn.clone(),
        pii.year_of_birth.clone(),
        pii.consumer_name.clone(),
        pii.current_address.clone(),
        pii.first_previous_address.clone(),
        pii.second_previous_address.clone(),
        "0".to_string(),           // [21] continuation flag, overwritten per chunk
        calling_subsystem.to_string(),
        spaces(46),
    ]
}

const PRODUCT_SLOT_INDEX: usize = 9;
const CONTINUATION_INDEX: usize = 22;

/// Builds every 785-char chunk for a transaction (one per 10 product codes,
/// capped at 30 total), asserting the fixed-width invariant per chunk.
fn build_chunks(
    message: &BillingMessage,
    pii: &FormattedApplicantPii,
    owning_subsystem: &str,
    calling_subsystem: &str,
) -> Result<BTreeMap<usize, String>> {
    let inquiry_timestamp = parse_inquiry_timestamp(&message.transaction_id)?;
    let (cst_date, cst_time) = convert_to_central(inquiry_timestamp);
    let template = base_body(message, pii, &cst_date, &cst_time, owning_subsystem, calling_subsystem);

    let codes = ordered_codes(message);
    let product_codes_count = message.product_codes.len().min(MAX_PRODUCT_CODES);

    let mut chunks = BTreeMap::new();
    let mut record_index = 0usize;
    let mut counter = 0usize;
    while counter < product_codes_count {
        let end = (counter + CHUNK_SIZE).min(product_codes_count).min(codes.len());
        let joined: String = codes[counter..end].concat();
        let product_slot = pad_product_slot(&joined)?;

        let continuation = if (counter % CHUNK_SIZE == 0) && (product_codes_count - counter) > CHUNK_SIZE {
            "1"
        } else {
            "0"
        };

        let mut record = template.clone();
        record[PRODUCT_SLOT_INDEX] = product_slot;
        record[CONTINUATION_INDEX] = continuation.to_string();

        let raw = format!("{RECORD_PREFIX}{}", record.concat());
        if raw.len() != BILLING_RECORD_LENGTH {
            return Err(Error::fixed_width_mismatch(
                message.transaction_id.clone(),
                BILLING_RECORD_LENGTH,
                raw.len(),
            ));
        }

        chunks.insert(record_index, raw);
        record_index += 1;
        counter += CHUNK_SIZE;
    }

    Ok(chunks)
}

/// Encrypts the chunk dictionary and base64-encodes it with the `"SEncr:"`
/// prefix (spec §4.4 "Encryption").
async fn encrypt_chunks(chunks: &BTreeMap<usize, String>, crypto: &CryptoPool) -> Result<String> {
    // Serializes with string keys ("0", "1", ...) exactly as the source's
    // `json.dumps(record_data)` does for an int-keyed dict.
    let keyed: BTreeMap<String, &String> = chunks.iter().map(|(k, v)| (k.to_string(), v)).collect();
    let serialized = serde_json::to_vec(&keyed)?;

    let handle = crypto.acquire().await;
    let (ciphertext, _elapsed) = handle.encrypt(&serialized)?;

    use base64::Engine;
    let encoded = base64::engine::general_purpose::STANDARD.encode(ciphertext);
    Ok(format!("SEncr:{encoded}"))
}

/// Encodes a validated billing message into its summary row and product-code
/// rows, encrypting the fixed-width billing record chunks along the way.
pub async fn encode_billing_message(
    message: &BillingMessage,
    pii: &FormattedApplicantPii,
    crypto: &CryptoPool,
    owning_subsystem: &str,
    calling_subsystem: &str,
) -> Result<EncodedBilling> {
    let chunks = build_chunks(message, pii, owning_subsystem, calling_subsystem)?;
    let billing_record = encrypt_chunks(&chunks, crypto).await?;

    let transaction_id: String = message.transaction_id.chars().take(23).collect();
    let inquiry_timestamp = parse_inquiry_timestamp(&message.transaction_id)?;

    let summary = BillingSummaryRow {
        transaction_id: transaction_id.clone(),
        inquiry_timestamp,
        billing_record,
        silent_launch: message.is_silent_launch_enabled,
        solution_id: message.solution_id.clone(),
        subcode: message.subcode.clone(),
    };

    // Every input product code gets a row, independent of the 30-code chunk
    // cap applied above -- grounded on `process_billing_message`'s
    // `dashboard_billing_records` loop, which walks the full input list.
    let products = message
        .product_codes
        .iter()
        .map(|p| BillingProductRow {
            transaction_id: transaction_id.clone(),
            inquiry_timestamp,
            solution_id: message.solution_id.clone(),
            subcode: message.subcode.clone(),
            product_code: p.product_code.clone(),
            product_code_type: p.kind(),
            silent_launch: message.is_silent_launch_enabled,
        })
        .collect();

    Ok(EncodedBilling { summary, products })
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::model::{ApplicantPII, ProductCode};

    fn message_with_products(product_codes: Vec<ProductCode>) -> BillingMessage {
        BillingMessage {
            transaction_id: "10232024095207EPUJQINUP".to_string(),
            solution_id: "AOOMFDAT".to_string(),
            subcode: "2344867".to_string(),
            arf_version: "07".to_string(),
            is_silent_launch_enabled: false,
            applicant_pii: ApplicantPII::default(),
            product_codes,
        }
    }

    fn formatted_pii() -> FormattedApplicantPii {
        crate::pii::format_applicant_pii(&ApplicantPII::default())
    }

    #[tokio::test]
    async fn single_product_code_yields_one_chunk_with_no_continuation() {
        let message = message_with_products(vec![ProductCode {
            product_code: "PPC0001".to_string(),
            index: "10".to_string(),
        }]);
        let crypto = CryptoPool::new(1, [9u8; 32]);

        let encoded = encode_billing_message(&message, &formatted_pii(), &crypto, "GOCR", "GOXX")
            .await
            .unwrap();

        assert_eq!(encoded.products.len(), 1);
        assert!(encoded.summary.billing_record.starts_with("SEncr:"));
    }

    #[test]
    fn eleven_product_codes_split_into_two_chunks() {
        let mut codes = vec![ProductCode {
            product_code: "PPC0001".to_string(),
            index: "10".to_string(),
        }];
        for i in 0..10 {
            codes.push(ProductCode {
                product_code: format!("OPT{i:04}"),
                index: "20".to_string(),
            });
        }
        let message = message_with_products(codes);
        let chunks = build_chunks(&message, &formatted_pii(), "GOCR", "GOXX").unwrap();

        assert_eq!(chunks.len(), 2);
        for chunk in chunks.values() {
            assert_eq!(chunk.len(), BILLING_RECORD_LENGTH);
        }

        let product_slot_offset = 39 + 72;
        let first_slot = &chunks[&0][product_slot_offset..product_slot_offset + PRODUCT_SLOT_LEN];
        assert!(first_slot.starts_with("PPC0001OPT0000OPT0001OPT0002OPT0003OPT0004OPT0005OPT0006OPT0007OPT0008"));

        let second_slot = &chunks[&1][product_slot_offset..product_slot_offset + PRODUCT_SLOT_LEN];
        assert!(second_slot.starts_with("OPT0009"));
        assert!(second_slot[7..].chars().all(|c| c == ' '));
    }

    #[test]
    fn continuation_flag_set_only_on_non_final_chunk_boundary() {
        let mut codes = vec![ProductCode {
            product_code: "BASE001".to_string(),
            index: "10".to_string(),
        }];
        for i in 0..10 {
            codes.push(ProductCode {
                product_code: format!("O{i:06}"),
                index: "20".to_string(),
            });
        }
        let message = message_with_products(codes);
        let chunks = build_chunks(&message, &formatted_pii(), "GOCR", "GOXX").unwrap();

        let continuation_offset = 39 + 695;
        assert_eq!(
            &chunks[&0][continuation_offset..continuation_offset + 1],
            "1"
        );
        assert_eq!(
            &chunks[&1][continuation_offset..continuation_offset + 1],
            "0"
        );
    }

    #[test]
    fn more_than_thirty_product_codes_are_capped_in_the_chunk_encoding() {
        let mut codes = vec![ProductCode {
            product_code: "BASE001".to_string(),
            index: "10".to_string(),
        }];
        for i in 0..40 {
            codes.push(ProductCode {
                product_code: format!("O{i:06}"),
                index: "20".to_string(),
            });
        }
        let message = message_with_products(codes);
        let chunks = build_chunks(&message, &formatted_pii(), "GOCR", "GOXX").unwrap();
        // 30 codes total -> ceil(30/10) = 3 chunks.
        assert_eq!(chunks.len(), 3);
    }
}
