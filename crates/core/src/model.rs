//! Domain model shared by the consumer engine and the three pipeline handlers.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// The input unit handed to a pipeline handler. Immutable once dequeued; its
/// lifetime ends when the handler completes and the offset is committed.
#[derive(Debug, Clone)]
pub struct InquiryEvent {
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub headers: Vec<(String, Vec<u8>)>,
    pub partition: PartitionCoordinate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionCoordinate {
    pub topic_index: u32,
    pub partition: i32,
    pub offset: i64,
}

/// The envelope version string carried as the first header key. Only one
/// codec exists today (gzip + JSON); the type still records the raw version
/// so a second version can be distinguished later without touching callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeVersion(pub String);

/// Discriminated union over the payload byte stream (spec §3's `Envelope`).
#[derive(Debug, Clone)]
pub enum Envelope {
    Versioned {
        version: EnvelopeVersion,
        key: Option<String>,
        decoded: VersionedPayload,
    },
    Plain {
        key: Option<String>,
        decoded: PlainPayload,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionedPayload {
    pub transaction_id: String,
    /// The identifier the audit-log index keys documents by (spec §4.8);
    /// distinct from `transaction_id`, which is the engine-local id.
    #[serde(default)]
    pub go_transaction_id: String,
    #[serde(default)]
    pub services: Vec<ServiceSnapshot>,
    #[serde(default)]
    pub response_payload: serde_json::Value,
    #[serde(default)]
    pub is_testcase: bool,
    #[serde(default)]
    pub flow_tags: FlowTags,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FlowTags {
    #[serde(default)]
    pub solution_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceSnapshot {
    pub service_name: String,
    /// Field literally named `snapshot` on the wire. A service's `model_uid`
    /// (for SageMaker) lives nested inside this value at
    /// `content.request.model_uid`, never as a top-level sibling field.
    #[serde(default)]
    pub snapshot: serde_json::Value,
}

/// External service dispatch key (spec §9). Most external services key their
/// snapshot by name alone; the SageMaker services key by name plus
/// `model_uid` so that two model deployments don't collide under one key.
/// `SAGEMAKER` and `SAGEMAKER-2` (primary vs. secondary bureau call) must
/// stay distinguishable, so the raw service name travels with the variant
/// rather than being collapsed away.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Service {
    Ccr,
    Proctor,
    Pinning,
    Clarity,
    Atb,
    Sagemaker { raw_name: String, model_uid: String },
    Other(String),
}

impl Service {
    /// Builds the dispatch key from a raw service name plus an optional
    /// model uid, mirroring the audit-log consumer's grouping rule: any
    /// `SAGEMAKER*` name combines with `model_uid`.
    pub fn from_snapshot(service_name: &str, model_uid: Option<&str>) -> Self {
        match service_name {
            "CCR" => Service::Ccr,
            "PROCTOR" => Service::Proctor,
            "PINNING" => Service::Pinning,
            "CLARITY" => Service::Clarity,
            "ATB" => Service::Atb,
            name if name.starts_with("SAGEMAKER") => Service::Sagemaker {
                raw_name: name.to_string(),
                model_uid: model_uid.unwrap_or_default().to_string(),
            },
            other => Service::Other(other.to_string()),
        }
    }

    /// The wire key used in the `service_data` map the audit-log handler
    /// upserts: `NAME` for ordinary services, `NAME_{model_uid}` for
    /// SageMaker snapshots.
    pub fn wire_key(&self) -> String {
        match self {
            Service::Ccr => "CCR".to_string(),
            Service::Proctor => "PROCTOR".to_string(),
            Service::Pinning => "PINNING".to_string(),
            Service::Clarity => "CLARITY".to_string(),
            Service::Atb => "ATB".to_string(),
            Service::Sagemaker { raw_name, model_uid } => format!("{raw_name}_{model_uid}"),
            Service::Other(name) => name.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlainPayload {
    pub service_name: String,
    #[serde(default)]
    pub content: serde_json::Value,
    pub go_transaction_id: String,
    #[serde(default)]
    pub request_headers: std::collections::HashMap<String, String>,
}

/// Validated input for the billing pipeline (spec §3 `BillingMessage`).
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct BillingMessage {
    #[validate(length(equal = 23))]
    pub transaction_id: String,
    #[validate(length(min = 1))]
    pub solution_id: String,
    #[validate(length(min = 1))]
    pub subcode: String,
    #[validate(length(min = 1))]
    pub arf_version: String,
    pub is_silent_launch_enabled: bool,
    #[validate(nested)]
    pub applicant_pii: ApplicantPII,
    #[validate(length(min = 1), nested)]
    pub product_codes: Vec<ProductCode>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ProductCode {
    #[validate(length(min = 1))]
    pub product_code: String,
    /// `"10"` marks the single base product; all others are optional.
    pub index: String,
}

impl ProductCode {
    pub fn is_base(&self) -> bool {
        self.index == "10"
    }

    pub fn kind(&self) -> ProductCodeType {
        if self.is_base() {
            ProductCodeType::Base
        } else {
            ProductCodeType::Optional
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct ApplicantPII {
    #[serde(default)]
    pub name: Option<ApplicantName>,
    #[serde(default)]
    pub ssn: Option<String>,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub inquiry_address: Option<Address>,
    #[serde(default)]
    pub previous_address: Vec<Address>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApplicantName {
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub second_last_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub generation_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Address {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub street_suffix: Option<String>,
    #[serde(default)]
    pub unit_id: Option<String>,
}

/// Opaque 785-byte fixed-width record produced by the billing encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingRecord(String);

impl BillingRecord {
    pub const LENGTH: usize = 785;

    /// Builds a record, asserting the fixed-width invariant from spec §4.4.
    pub fn new(raw: String) -> Result<Self, crate::error::Error> {
        if raw.len() != Self::LENGTH {
            return Err(crate::error::Error::internal(format!(
                "billing record length {} != {}",
                raw.len(),
                Self::LENGTH
            )));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// One row destined for the summary table.
#[derive(Debug, Clone)]
pub struct BillingSummaryRow {
    pub transaction_id: String,
    pub inquiry_timestamp: chrono::NaiveDateTime,
    pub billing_record: String,
    pub silent_launch: bool,
    pub solution_id: String,
    pub subcode: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductCodeType {
    Base,
    Optional,
}

impl ProductCodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCodeType::Base => "base",
            ProductCodeType::Optional => "optional",
        }
    }
}

/// One row destined for the product-code table.
#[derive(Debug, Clone)]
pub struct BillingProductRow {
    pub transaction_id: String,
    pub inquiry_timestamp: chrono::NaiveDateTime,
    pub solution_id: String,
    pub subcode: String,
    pub product_code: String,
    pub product_code_type: ProductCodeType,
    pub silent_launch: bool,
}

/// Regression harness document (spec §3 `TestCase`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TestCase {
    pub testcase_id: String,
    #[serde(default)]
    pub solution_id: String,
    #[serde(default)]
    pub case_code: String,
    #[serde(default)]
    pub trade_date: Option<String>,
    #[serde(default)]
    pub ao_request: serde_json::Value,
    #[serde(default)]
    pub ao_response: serde_json::Value,
    #[serde(default)]
    pub services: std::collections::HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Per-job execution state for regression runs (spec §3 `JobTracker entry`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    JobStarted,
    FetchedTestcases,
    FailedToGetTestcases,
    CreatedTestcases,
    FailedToCreateTestcases,
    JobDone,
    FailedToRunTestcases,
}

impl JobStatus {
    /// Non-terminal statuses: a job tracker entry in one of these states is
    /// still running and must not be silently evicted (spec §9).
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            JobStatus::JobStarted | JobStatus::CreatedTestcases | JobStatus::FetchedTestcases
        )
    }
}

#[derive(Debug, Clone)]
pub struct JobTrackerEntry {
    pub job_id: String,
    pub status: JobStatus,
    pub results: Option<serde_json::Value>,
}
