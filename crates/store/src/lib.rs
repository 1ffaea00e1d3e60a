//! Relational Bulk Writer (C3).
//!
//! Given two row sets destined for two related tables, attempts one bulk
//! insert across both inside a single transaction; on any failure, rolls
//! back and falls back to inserting each row independently (its own
//! transaction) so that valid rows survive and bad rows are reported one by
//! one (spec §4.6).

pub mod writer;

pub use writer::{BulkInsertOutcome, BulkMode, RelationalWriter};
