//! Error-path and edge-case tests for the billing and relational-writer
//! collaborators. Super-store allow-list behavior and offset discipline are
//! covered by unit tests inside `objectstore`/`worker` and `kafka::consumer`
//! respectively (no S3-compatible container or live broker is started here,
//! per `containers.rs`'s test-tooling notes).
//!
//! Requires Docker to be running for testcontainers.

use crypto::pool::CryptoPool;
use engine_core::model::{BillingProductRow, BillingSummaryRow, ProductCodeType};
use integration_tests::{fixtures, setup::TestContext};
use sqlx::Row;
use store::writer::BulkMode;
use worker::billing::billing_handler;

fn crypto_pool() -> CryptoPool {
    CryptoPool::new(2, [21u8; 32])
}

#[tokio::test]
async fn billing_handler_skips_record_with_invalid_transaction_id_length() {
    let ctx = TestContext::new().await;
    let crypto = crypto_pool();

    let mut message = fixtures::billing_message_minimal_pii();
    message.transaction_id = "tooshort".to_string(); // spec requires exactly 23 chars

    let event = fixtures::event(
        &message.transaction_id,
        &serde_json::to_value(&message).unwrap(),
        vec![],
        1,
    );

    // Schema validation failure is skip-and-log, not a batch failure.
    billing_handler(vec![event], &crypto, &ctx.writer, "GOCR", "GOXX")
        .await
        .expect("handler must not fail the batch on a schema validation error");

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&ctx.relational_config.database_url)
        .await
        .unwrap();

    let count: i64 = sqlx::query(&format!(
        "SELECT COUNT(*) AS c FROM {}",
        ctx.relational_config.summary_table
    ))
    .fetch_one(&pool)
    .await
    .unwrap()
    .get("c");
    assert_eq!(count, 0, "invalid record must not reach the relational store");
}

#[tokio::test]
async fn billing_handler_skips_malformed_json_without_failing_the_batch() {
    let ctx = TestContext::new().await;
    let crypto = crypto_pool();

    let valid = fixtures::billing_message_minimal_pii();
    let valid_event = fixtures::event(
        &valid.transaction_id,
        &serde_json::to_value(&valid).unwrap(),
        vec![],
        1,
    );
    let garbage_event = fixtures::event(
        "garbage",
        &serde_json::json!("not a billing message"),
        vec![],
        2,
    );

    billing_handler(
        vec![garbage_event, valid_event],
        &crypto,
        &ctx.writer,
        "GOCR",
        "GOXX",
    )
    .await
    .expect("one malformed record must not fail the whole batch");

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&ctx.relational_config.database_url)
        .await
        .unwrap();

    let count: i64 = sqlx::query(&format!(
        "SELECT COUNT(*) AS c FROM {} WHERE transaction_id = $1",
        ctx.relational_config.summary_table
    ))
    .bind(&valid.transaction_id)
    .fetch_one(&pool)
    .await
    .unwrap()
    .get("c");
    assert_eq!(count, 1, "the valid record in the batch must still be written");
}

#[tokio::test]
async fn bulk_insert_falls_back_to_per_row_when_a_table_is_unavailable() {
    let ctx = TestContext::new().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&ctx.relational_config.database_url)
        .await
        .unwrap();
    sqlx::query(&format!(
        "DROP TABLE {}",
        ctx.relational_config.product_table
    ))
    .execute(&pool)
    .await
    .unwrap();

    let timestamp = chrono::NaiveDateTime::parse_from_str("10232024095207", "%m%d%Y%H%M%S").unwrap();
    let summary = vec![BillingSummaryRow {
        transaction_id: "10232024095207FALLBACK1".to_string(),
        inquiry_timestamp: timestamp,
        billing_record: "SEncr:deadbeef".to_string(),
        silent_launch: false,
        solution_id: "AOOMFDAT".to_string(),
        subcode: "2344867".to_string(),
    }];
    let products = vec![BillingProductRow {
        transaction_id: "10232024095207FALLBACK1".to_string(),
        inquiry_timestamp: timestamp,
        solution_id: "AOOMFDAT".to_string(),
        subcode: "2344867".to_string(),
        product_code: "PPC0001".to_string(),
        product_code_type: ProductCodeType::Base,
        silent_launch: false,
    }];

    let outcome = ctx.writer.bulk_insert(&summary, &products).await.unwrap();

    assert_eq!(outcome.mode, BulkMode::PerRowFallback);
    assert_eq!(outcome.summary_inserted, 1, "summary table is still writable");
    assert_eq!(outcome.product_inserted, 0);
    assert_eq!(outcome.product_errors.len(), 1);
}
