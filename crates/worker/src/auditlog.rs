//! Audit-Log / Regression Pipeline Handler (C10).
//!
//! Grounded on `audit_log_consumer_app/app.py`'s `RTSAuditLogConsumer.consume`:
//! a versioned record groups `services[]` by dispatch key and upserts the
//! consolidated snapshot under its `go_transaction_id`; a plain record is only
//! interesting when it is an `INQUIRY_REQUEST` carrying a `Test-Engine` (or
//! `test-engine`) header whose value matches the `Record-<CASE_CODE>`
//! pattern, and upserts a fresh test case under the request's transaction id.
//! Both forms skip and log on any field-extraction failure rather than fail
//! the batch (spec §7).

use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use engine_core::error::Result;
use engine_core::model::{Envelope, InquiryEvent, Service};

use index::SearchIndexClient;
use kafka::envelope::decode;

fn case_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^Record-([A-Z_]+(?:-[A-Z_]+)?)$").unwrap())
}

/// Extracts the regression case code from a `Test-Engine` header value
/// (spec §4.9 "case code extraction"), or `None` if it doesn't match.
fn extract_case_code(header_value: &str) -> Option<String> {
    case_code_pattern()
        .captures(header_value)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Processes one polled batch for the audit-log topic (spec §4.9 "Audit-log
/// handler").
pub async fn auditlog_handler(
    events: Vec<InquiryEvent>,
    index_client: &SearchIndexClient,
    testcases_index: &str,
) -> Result<()> {
    for event in events {
        let decoded = match decode(&event) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "audit-log envelope failed to decode, skipping record");
                continue;
            }
        };

        match decoded {
            Envelope::Versioned { decoded, .. } => {
                if let Err(e) = handle_versioned(&decoded, index_client, testcases_index).await {
                    tracing::error!(
                        transaction_id = %decoded.go_transaction_id,
                        error = %e,
                        "audit-log versioned upsert failed, skipping record"
                    );
                }
            }
            Envelope::Plain { decoded, .. } => {
                if let Err(e) = handle_plain(&decoded, index_client, testcases_index).await {
                    tracing::error!(
                        transaction_id = %decoded.go_transaction_id,
                        error = %e,
                        "audit-log plain upsert failed, skipping record"
                    );
                }
            }
        }
    }

    Ok(())
}

async fn handle_versioned(
    decoded: &engine_core::model::VersionedPayload,
    index_client: &SearchIndexClient,
    testcases_index: &str,
) -> Result<()> {
    if !decoded.is_testcase {
        return Ok(());
    }

    let mut service_data = serde_json::Map::with_capacity(decoded.services.len());
    for service in &decoded.services {
        let model_uid = model_uid_from_snapshot(&service.snapshot);
        let key = Service::from_snapshot(service.service_name.as_str(), model_uid.as_deref()).wire_key();
        service_data.insert(key, service.snapshot.clone());
    }

    let doc = json!({
        "services": service_data,
        "ao_response": decoded.response_payload,
    });

    index_client
        .upsert_document(testcases_index, &decoded.go_transaction_id, &doc)
        .await?;

    tracing::warn!(
        transaction_id = %decoded.go_transaction_id,
        "testcase services written to index"
    );
    Ok(())
}

/// A service snapshot's `model_uid` lives nested at `content.request.model_uid`,
/// not as a top-level sibling of `snapshot` (spec §4.8).
fn model_uid_from_snapshot(snapshot: &serde_json::Value) -> Option<String> {
    snapshot
        .pointer("/content/request/model_uid")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

async fn handle_plain(
    decoded: &engine_core::model::PlainPayload,
    index_client: &SearchIndexClient,
    testcases_index: &str,
) -> Result<()> {
    if decoded.service_name != "INQUIRY_REQUEST" {
        return Ok(());
    }

    let header_value = decoded
        .request_headers
        .get("Test-Engine")
        .or_else(|| decoded.request_headers.get("test-engine"));
    let Some(header_value) = header_value else {
        return Ok(());
    };

    let Some(case_code) = extract_case_code(header_value) else {
        return Ok(());
    };

    let request_payload = decoded.content.get("request_payload").cloned().unwrap_or_default();
    let solution_id = request_payload
        .get("solution_id")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    let doc = json!({
        "testcase_id": decoded.go_transaction_id,
        "ao_request": request_payload,
        "solution_id": solution_id,
        "case_code": case_code,
        "trade_date": chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
    });

    index_client
        .upsert_document(testcases_index, &decoded.go_transaction_id, &doc)
        .await?;

    tracing::warn!(
        transaction_id = %decoded.go_transaction_id,
        "testcase request written to index"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_case_code_from_record_header() {
        assert_eq!(
            extract_case_code("Record-CREDIT_FREEZE"),
            Some("CREDIT_FREEZE".to_string())
        );
        assert_eq!(
            extract_case_code("Record-CREDIT_FREEZE-RETRY"),
            Some("CREDIT_FREEZE-RETRY".to_string())
        );
    }

    #[test]
    fn rejects_header_without_record_prefix() {
        assert_eq!(extract_case_code("CREDIT_FREEZE"), None);
    }

    #[test]
    fn dispatch_key_disambiguates_sagemaker_by_model_uid() {
        let a = Service::from_snapshot("SAGEMAKER", Some("model-a")).wire_key();
        let b = Service::from_snapshot("SAGEMAKER-2", Some("model-b")).wire_key();
        assert_ne!(a, b);
        assert_eq!(a, "SAGEMAKER_model-a");
        assert_eq!(b, "SAGEMAKER-2_model-b");
    }

    #[test]
    fn model_uid_read_from_nested_snapshot_content() {
        let snapshot = json!({ "content": { "request": { "model_uid": "model-a" } } });
        assert_eq!(model_uid_from_snapshot(&snapshot), Some("model-a".to_string()));
        assert_eq!(model_uid_from_snapshot(&json!({})), None);
    }
}
