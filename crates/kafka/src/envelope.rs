//! Message Envelope Decoder (C7).
//!
//! Grounded on `super_store_app/code/api/superstore_utils.py`'s
//! `validate_message`: header presence, not any header value, is what
//! distinguishes a versioned gzip+JSON record from a plain JSON one. The
//! first header's key is carried forward as the envelope version string
//! (spec §3, §9 glossary "Envelope version").

use flate2::read::GzDecoder;
use std::io::Read;

use engine_core::error::{Error, Result};
use engine_core::model::{Envelope, EnvelopeVersion, InquiryEvent, PlainPayload, VersionedPayload};

/// Decodes one dequeued record into an `Envelope`, or an error describing why
/// it could not be decoded. Callers skip and log rather than fail the batch
/// (spec §4.2): a decode error here must never block offset advancement.
pub fn decode(event: &InquiryEvent) -> Result<Envelope> {
    if event.headers.is_empty() {
        let decoded: PlainPayload = serde_json::from_slice(&event.payload)?;
        return Ok(Envelope::Plain {
            key: event.key.clone(),
            decoded,
        });
    }

    let version = event
        .headers
        .first()
        .map(|(k, _)| k.clone())
        .unwrap_or_default();

    let mut gz = GzDecoder::new(&event.payload[..]);
    let mut plain = Vec::new();
    gz.read_to_end(&mut plain)
        .map_err(|e| Error::decode(format!("gzip decompress failed: {e}")))?;

    let decoded: VersionedPayload = serde_json::from_slice(&plain)?;

    Ok(Envelope::Versioned {
        version: EnvelopeVersion(version),
        key: event.key.clone(),
        decoded,
    })
}

/// Splits a fetched batch into its versioned and plain groups, skipping and
/// logging records that fail to decode (spec §4.2: "A single batch is
/// partitioned into the two groups; the handler is invoked once per
/// non-empty group").
pub fn partition_batch(
    events: &[InquiryEvent],
) -> (Vec<(InquiryEvent, EnvelopeVersion, VersionedPayload, Option<String>)>,
      Vec<(InquiryEvent, PlainPayload)>)
{
    let mut versioned = Vec::new();
    let mut plain = Vec::new();

    for event in events {
        match decode(event) {
            Ok(Envelope::Versioned { version, key, decoded }) => {
                versioned.push((event.clone(), version, decoded, key));
            }
            Ok(Envelope::Plain { decoded, .. }) => {
                plain.push((event.clone(), decoded));
            }
            Err(e) => {
                tracing::warn!(
                    key = ?event.key,
                    partition = event.partition.partition,
                    offset = event.partition.offset,
                    error = %e,
                    "failed to decode envelope, skipping record"
                );
            }
        }
    }

    (versioned, plain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::model::PartitionCoordinate;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn coord() -> PartitionCoordinate {
        PartitionCoordinate {
            topic_index: 0,
            partition: 0,
            offset: 10,
        }
    }

    #[test]
    fn plain_record_with_no_headers_decodes_directly() {
        let payload = serde_json::json!({
            "service_name": "INQUIRY_REQUEST",
            "content": {"a": 1},
            "go_transaction_id": "tx-1"
        });
        let event = InquiryEvent {
            key: Some("k1".to_string()),
            payload: serde_json::to_vec(&payload).unwrap(),
            headers: vec![],
            partition: coord(),
        };

        match decode(&event).unwrap() {
            Envelope::Plain { decoded, .. } => {
                assert_eq!(decoded.service_name, "INQUIRY_REQUEST");
                assert_eq!(decoded.go_transaction_id, "tx-1");
            }
            other => panic!("expected plain envelope, got {other:?}"),
        }
    }

    #[test]
    fn versioned_record_is_gunzipped_and_parsed() {
        let payload = serde_json::json!({
            "transaction_id": "tx-2",
            "services": [],
            "response_payload": {},
            "is_testcase": true,
            "flow_tags": {"solution_id": "AOEXETER"}
        });
        let raw = serde_json::to_vec(&payload).unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).unwrap();
        let compressed = encoder.finish().unwrap();

        let event = InquiryEvent {
            key: Some("k2".to_string()),
            payload: compressed,
            headers: vec![("v1".to_string(), vec![])],
            partition: coord(),
        };

        match decode(&event).unwrap() {
            Envelope::Versioned { version, decoded, .. } => {
                assert_eq!(version.0, "v1");
                assert!(decoded.is_testcase);
                assert_eq!(decoded.flow_tags.solution_id, "AOEXETER");
            }
            other => panic!("expected versioned envelope, got {other:?}"),
        }
    }

    #[test]
    fn malformed_gzip_is_a_decode_error_not_a_panic() {
        let event = InquiryEvent {
            key: None,
            payload: vec![1, 2, 3, 4],
            headers: vec![("v1".to_string(), vec![])],
            partition: coord(),
        };
        assert!(decode(&event).is_err());
    }
}
