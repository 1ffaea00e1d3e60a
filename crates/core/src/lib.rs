//! Core types, configuration, and validation shared by the ingestion engine's
//! consumer crates and pipeline handlers.

pub mod config;
pub mod error;
pub mod model;
pub mod schema;
pub mod secrets;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use model::*;
