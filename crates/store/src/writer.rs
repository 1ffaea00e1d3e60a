//! Grounded on `sql_util.py`'s `aio_mysql.bulk_insert_data`: one bulk attempt
//! inside a transaction, and on failure a per-row fallback where each row is
//! its own transaction so that good rows still land even when a handful are
//! malformed (spec §4.6, §9 Design Note "Observed ambiguity" -- the source's
//! `for _ in range(3)` loop body falls into per-row mode on the *first*
//! failure and never retries the bulk path again, so this writer codifies
//! the observed behavior: one bulk attempt, then fallback, not three retries).

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::{Duration, Instant};

use engine_core::config::RelationalConfig;
use engine_core::error::{Error, Result};
use engine_core::model::{BillingProductRow, BillingSummaryRow};
use telemetry::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkMode {
    Bulk,
    PerRowFallback,
}

/// Outcome of one two-table write (spec §4.6: "no cross-table atomicity
/// guarantee beyond the happy path"). Callers that need strict coupling
/// must check `summary_errors`/`product_errors` themselves.
#[derive(Debug, Clone)]
pub struct BulkInsertOutcome {
    pub mode: BulkMode,
    pub summary_inserted: usize,
    pub product_inserted: usize,
    pub summary_errors: Vec<String>,
    pub product_errors: Vec<String>,
}

impl BulkInsertOutcome {
    pub fn is_fully_successful(&self, expected_summary: usize, expected_products: usize) -> bool {
        self.summary_inserted == expected_summary
            && self.product_inserted == expected_products
            && self.summary_errors.is_empty()
            && self.product_errors.is_empty()
    }
}

/// Pooled connection to the relational store, bounded to the number of
/// consumer workers in this process (spec §4.6 "Pool").
pub struct RelationalWriter {
    pool: PgPool,
    summary_table: String,
    summary_columns: Vec<String>,
    product_table: String,
    product_columns: Vec<String>,
}

impl RelationalWriter {
    pub async fn connect(config: &RelationalConfig, pool_size: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size.max(1))
            .max_lifetime(Duration::from_secs(config.pool_recycle_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| Error::relational_bulk(format!("failed to connect: {e}")))?;

        Ok(Self {
            pool,
            summary_table: config.summary_table.clone(),
            summary_columns: config.summary_columns.clone(),
            product_table: config.product_table.clone(),
            product_columns: config.product_columns.clone(),
        })
    }

    fn summary_insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6)",
            self.summary_table,
            self.summary_columns.join(", ")
        )
    }

    fn product_insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            self.product_table,
            self.product_columns.join(", ")
        )
    }

    /// Attempts one bulk insert of both row sets inside a single
    /// transaction; on any failure, rolls back and falls back to per-row
    /// inserts for both tables (spec §4.6).
    pub async fn bulk_insert(
        &self,
        summary: &[BillingSummaryRow],
        products: &[BillingProductRow],
    ) -> Result<BulkInsertOutcome> {
        let start = Instant::now();
        metrics().relational_bulk_inserts.inc();

        match self.try_bulk(summary, products).await {
            Ok(()) => {
                metrics()
                    .relational_latency_ms
                    .observe(start.elapsed().as_millis() as u64);
                Ok(BulkInsertOutcome {
                    mode: BulkMode::Bulk,
                    summary_inserted: summary.len(),
                    product_inserted: products.len(),
                    summary_errors: Vec::new(),
                    product_errors: Vec::new(),
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "bulk insert failed, rolling back to per-row fallback");
                metrics().relational_bulk_insert_errors.inc();
                let outcome = self.per_row_fallback(summary, products).await;
                metrics()
                    .relational_latency_ms
                    .observe(start.elapsed().as_millis() as u64);
                Ok(outcome)
            }
        }
    }

    async fn try_bulk(
        &self,
        summary: &[BillingSummaryRow],
        products: &[BillingProductRow],
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::relational_bulk(format!("begin failed: {e}")))?;

        let summary_sql = self.summary_insert_sql();
        for row in summary {
            sqlx::query(&summary_sql)
                .bind(&row.transaction_id)
                .bind(row.inquiry_timestamp)
                .bind(&row.billing_record)
                .bind(row.silent_launch)
                .bind(&row.solution_id)
                .bind(&row.subcode)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::relational_bulk(format!("summary insert failed: {e}")))?;
        }

        let product_sql = self.product_insert_sql();
        for row in products {
            sqlx::query(&product_sql)
                .bind(&row.transaction_id)
                .bind(row.inquiry_timestamp)
                .bind(&row.solution_id)
                .bind(&row.subcode)
                .bind(&row.product_code)
                .bind(row.product_code_type.as_str())
                .bind(row.silent_launch)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::relational_bulk(format!("product insert failed: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| Error::relational_bulk(format!("commit failed: {e}")))?;
        Ok(())
    }

    async fn per_row_fallback(
        &self,
        summary: &[BillingSummaryRow],
        products: &[BillingProductRow],
    ) -> BulkInsertOutcome {
        metrics().relational_row_fallback_inserts.inc_by((summary.len() + products.len()) as u64);

        let summary_sql = self.summary_insert_sql();
        let mut summary_inserted = 0;
        let mut summary_errors = Vec::new();
        for row in summary {
            let result: sqlx::Result<_> = sqlx::query(&summary_sql)
                .bind(&row.transaction_id)
                .bind(row.inquiry_timestamp)
                .bind(&row.billing_record)
                .bind(row.silent_launch)
                .bind(&row.solution_id)
                .bind(&row.subcode)
                .execute(&self.pool)
                .await;
            match result {
                Ok(_) => summary_inserted += 1,
                Err(e) => {
                    tracing::error!(
                        transaction_id = %row.transaction_id,
                        error = %e,
                        "per-row summary insert failed"
                    );
                    summary_errors.push(format!("{}: {e}", row.transaction_id));
                }
            }
        }

        let product_sql = self.product_insert_sql();
        let mut product_inserted = 0;
        let mut product_errors = Vec::new();
        for row in products {
            let result: sqlx::Result<_> = sqlx::query(&product_sql)
                .bind(&row.transaction_id)
                .bind(row.inquiry_timestamp)
                .bind(&row.solution_id)
                .bind(&row.subcode)
                .bind(&row.product_code)
                .bind(row.product_code_type.as_str())
                .bind(row.silent_launch)
                .execute(&self.pool)
                .await;
            match result {
                Ok(_) => product_inserted += 1,
                Err(e) => {
                    tracing::error!(
                        transaction_id = %row.transaction_id,
                        product_code = %row.product_code,
                        error = %e,
                        "per-row product insert failed"
                    );
                    product_errors.push(format!("{}/{}: {e}", row.transaction_id, row.product_code));
                }
            }
        }

        BulkInsertOutcome {
            mode: BulkMode::PerRowFallback,
            summary_inserted,
            product_inserted,
            summary_errors,
            product_errors,
        }
    }

    /// Used by the health endpoint: a cheap `SELECT 1` against the pool.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_reports_full_success() {
        let outcome = BulkInsertOutcome {
            mode: BulkMode::Bulk,
            summary_inserted: 1,
            product_inserted: 2,
            summary_errors: Vec::new(),
            product_errors: Vec::new(),
        };
        assert!(outcome.is_fully_successful(1, 2));
    }

    #[test]
    fn outcome_reports_partial_failure() {
        let outcome = BulkInsertOutcome {
            mode: BulkMode::PerRowFallback,
            summary_inserted: 1,
            product_inserted: 1,
            summary_errors: Vec::new(),
            product_errors: vec!["tx-1/PPC0002: constraint violation".to_string()],
        };
        assert!(!outcome.is_fully_successful(1, 2));
    }
}
