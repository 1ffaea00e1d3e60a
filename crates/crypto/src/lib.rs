//! Crypto Worker Pool (C5), Billing Record Encoder (C8), and Applicant-PII
//! Formatter (C9). Grouped in one crate because the encoder's only
//! suspension point is the crypto pool it hands its JSON payload to.

pub mod encoder;
pub mod pii;
pub mod pool;

pub use encoder::{encode_billing_message, EncodedBilling};
pub use pii::format_applicant_pii;
pub use pool::{CipherHandle, CryptoGuard, CryptoPool};
