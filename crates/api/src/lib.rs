//! HTTP surface for the ingestion engine.
//!
//! This crate carries no ingestion traffic — that travels over Kafka and is
//! handled entirely in `kafka`/`worker`. What lives here is the ambient
//! `/ping`/`/` health probe plus the regression replay mock endpoints that
//! back the replay harness described by C12.

pub mod response;
pub mod routes;
pub mod state;
pub mod validators;

pub use routes::router;
pub use state::AppState;
