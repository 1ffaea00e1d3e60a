//! Search-index client for the ingestion engine.

pub mod client;
pub mod health;

pub use client::{SearchIndexClient, StructuredError};
