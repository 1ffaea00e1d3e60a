//! Shared test support for the ingestion engine's integration suite:
//! testcontainer bootstrap (Postgres for C3, Elasticsearch for C4), billing /
//! audit-log fixtures, and a `TestContext` that wires the real handler code
//! against those containers the same way `main.rs` wires it against
//! production infrastructure.

pub mod containers;
pub mod fixtures;
pub mod setup;
