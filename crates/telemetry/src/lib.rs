//! Internal telemetry for the ingestion engine: structured tracing setup,
//! in-process counters/gauges/histograms, and component health aggregation.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
