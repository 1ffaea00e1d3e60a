//! Fixtures for the three pipelines, mirroring the seed scenarios in spec
//! §8.

use std::io::Write;

use engine_core::model::{
    Address, ApplicantName, ApplicantPII, BillingMessage, InquiryEvent, PartitionCoordinate,
    ProductCode,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};

fn coordinate(partition: i32, offset: i64) -> PartitionCoordinate {
    PartitionCoordinate {
        topic_index: 0,
        partition,
        offset,
    }
}

/// Wraps a JSON payload as the `InquiryEvent` a billing/audit-log consumer
/// would hand to its handler.
pub fn event(key: &str, payload: &Value, headers: Vec<(String, Vec<u8>)>, offset: i64) -> InquiryEvent {
    InquiryEvent {
        key: Some(key.to_string()),
        payload: serde_json::to_vec(payload).unwrap(),
        headers,
        partition: coordinate(0, offset),
    }
}

/// Spec §8 scenario 1: minimal PII, one base product code.
pub fn billing_message_minimal_pii() -> BillingMessage {
    BillingMessage {
        transaction_id: "10232024095207EPUJQINUP".to_string(),
        solution_id: "AOOMFDAT".to_string(),
        subcode: "2344867".to_string(),
        arf_version: "07".to_string(),
        is_silent_launch_enabled: false,
        applicant_pii: ApplicantPII {
            name: Some(ApplicantName {
                last_name: Some("ANASTASIO".to_string()),
                first_name: Some("JESSE".to_string()),
                ..Default::default()
            }),
            inquiry_address: Some(Address {
                line1: Some("2752 SOLOMONS ISLAND RD".to_string()),
                city: Some("EDGEWATER".to_string()),
                state: Some("MD".to_string()),
                zip_code: Some("210371211".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
        product_codes: vec![ProductCode {
            product_code: "PPC0001".to_string(),
            index: "10".to_string(),
        }],
    }
}

/// Spec §8 scenario 2: full PII, two previous addresses.
pub fn billing_message_full_pii() -> BillingMessage {
    BillingMessage {
        transaction_id: "10232024095207EPUJQINUP".to_string(),
        solution_id: "AOOMFDAT".to_string(),
        subcode: "2344867".to_string(),
        arf_version: "07".to_string(),
        is_silent_launch_enabled: true,
        applicant_pii: ApplicantPII {
            name: Some(ApplicantName {
                last_name: Some("BARNETT".to_string()),
                first_name: Some("IRENE".to_string()),
                generation_code: Some("F".to_string()),
                ..Default::default()
            }),
            ssn: Some("666444255".to_string()),
            inquiry_address: Some(Address {
                line1: Some("2752 SOLOMONS ISLAND RD".to_string()),
                city: Some("EDGEWATER".to_string()),
                state: Some("MD".to_string()),
                zip_code: Some("210371211".to_string()),
                ..Default::default()
            }),
            previous_address: vec![
                Address {
                    line1: Some("999 Oak Street".to_string()),
                    city: Some("Orange".to_string()),
                    state: Some("CA".to_string()),
                    zip_code: Some("92544".to_string()),
                    ..Default::default()
                },
                Address {
                    line1: Some("1001 Oak Street".to_string()),
                    line2: Some("Apt 1122".to_string()),
                    city: Some("Orange".to_string()),
                    state: Some("CA".to_string()),
                    zip_code: Some("92544".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        },
        product_codes: vec![ProductCode {
            product_code: "PPC0001".to_string(),
            index: "10".to_string(),
        }],
    }
}

/// Spec §8 scenario 3: one base product plus 10 optional codes (11 total).
pub fn billing_message_eleven_products() -> BillingMessage {
    let mut product_codes = vec![ProductCode {
        product_code: "PPC0001".to_string(),
        index: "10".to_string(),
    }];
    for i in 0..10 {
        product_codes.push(ProductCode {
            product_code: format!("OPT{i:04}"),
            index: "20".to_string(),
        });
    }
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

/// Gzips `payload` the way a versioned envelope's value is produced on the
/// wire (spec §3 `Envelope`), returning the compressed bytes.
fn gzip(payload: &Value) -> Vec<u8> {
    let raw = serde_json::to_vec(payload).unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw).unwrap();
    encoder.finish().unwrap()
}

/// A versioned super-store record: non-empty headers, gzipped JSON payload
/// carrying `flow_tags.solution_id` and a nested `INQUIRY.INQREQ` block.
pub fn superstore_event(key: &str, solution_id: &str, transaction_id: &str, offset: i64) -> InquiryEvent {
    let payload = json!({
        "transaction_id": transaction_id,
        "services": [],
        "response_payload": {
            "INQUIRY": {
                "INQREQ": {
                    "transaction_id": transaction_id,
                    "solution_id": solution_id,
                }
            }
        },
        "is_testcase": false,
        "flow_tags": { "solution_id": solution_id },
    });
    InquiryEvent {
        key: Some(key.to_string()),
        payload: gzip(&payload),
        headers: vec![("v1".to_string(), vec![])],
        partition: coordinate(0, offset),
    }
}

/// A versioned audit-log record marked as a testcase, carrying one CCR
/// service snapshot.
pub fn auditlog_versioned_testcase(transaction_id: &str, offset: i64) -> InquiryEvent {
    let payload = json!({
        "transaction_id": transaction_id,
        "go_transaction_id": transaction_id,
        "services": [
            { "service_name": "CCR", "snapshot": { "content": { "request": { "payload": {"a": 1} } } } }
        ],
        "response_payload": { "decision": "ACCEPT" },
        "is_testcase": true,
        "flow_tags": { "solution_id": "AOEXETER" },
    });
    InquiryEvent {
        key: Some(transaction_id.to_string()),
        payload: gzip(&payload),
        headers: vec![("v1".to_string(), vec![])],
        partition: coordinate(0, offset),
    }
}

/// Spec §8 scenario 5: plain `INQUIRY_REQUEST` record carrying a
/// `Test-Engine: Record-<CASE_CODE>` header.
pub fn auditlog_plain_record_marker(go_transaction_id: &str, case_code: &str, offset: i64) -> InquiryEvent {
    let payload = json!({
        "service_name": "INQUIRY_REQUEST",
        "content": { "request_payload": { "solution_id": "AOEXETER" } },
        "go_transaction_id": go_transaction_id,
        "request_headers": { "Test-Engine": format!("Record-{case_code}") },
    });
    InquiryEvent {
        key: Some(go_transaction_id.to_string()),
        payload: serde_json::to_vec(&payload).unwrap(),
        headers: vec![],
        partition: coordinate(0, offset),
    }
}
