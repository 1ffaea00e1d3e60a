//! The engine's only health surface: `GET /ping` and `GET /`.
//!
//! Both return 200 with a short textual body regardless of downstream
//! component health (spec: "No other HTTP surface in the core"). Per-
//! component status is still tracked by `telemetry::health()` and surfaced
//! through structured logs, but there is no HTTP readiness/liveness split
//! to expose here.

pub async fn ping() -> &'static str {
    "pong"
}

pub async fn root() -> &'static str {
    "ingestion-engine"
}
