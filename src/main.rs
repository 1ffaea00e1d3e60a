//! Ingestion engine entry point.
//!
//! Wires the ambient stack (secrets, crypto pool, relational writer, object
//! store, search index) to three Kafka-driven pipelines (billing,
//! super-store, audit-log/regression) that all share the same batch-consumer
//! engine, plus the `/ping`/`/` health probe and replay-mock HTTP surface.
//! Process topology follows spec §4.9: a parent process with no
//! `WORKER_INDEX` re-execs itself into N worker children and hosts the HTTP
//! surface; each child runs the consumer loops for its shard.

use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine as _;
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use engine_core::config::EngineConfig;
use engine_core::secrets::{EnvSecretProvider, SecretProvider};
use crypto::pool::CryptoPool;
use index::SearchIndexClient;
use kafka::BatchConsumer;
use objectstore::{ObjectStoreClient, PgpEncryptor, SuperstoreAllowList};
use store::writer::RelationalWriter;
use telemetry::{health, init_tracing_from_env};
use worker::{run_auditlog_consumer, run_billing_consumer, run_superstore_consumer, ReplayCache};

/// Secret id whose plaintext is a base64-encoded 32-byte AES-256-GCM key for
/// the billing-record crypto pool (C5). The original Java NAE cipher
/// resolves its own key material internally; this stands in for that
/// resolution the way the rest of C1 treats secret ids as swappable.
const CRYPTO_KEY_SECRET_ID: &str = "BILLING_CRYPTO_KEY";

/// Relational pool size (C3); not exposed as a separate config knob because
/// the teacher's original sizing was driven by the same worker-count math as
/// the crypto pool.
const RELATIONAL_POOL_SIZE: u32 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    let _ = dotenvy::dotenv();
    init_tracing_from_env();

    info!("starting ingestion engine v{}", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::load().context("failed to load configuration")?;
    let secrets: Arc<dyn SecretProvider> = Arc::new(EnvSecretProvider);

    if let Some(worker_index) = worker::worker_index_from_env() {
        run_worker(config, secrets, worker_index).await
    } else {
        run_supervisor_and_server(config).await
    }
}

/// Parent process: re-execs into N worker children and hosts the HTTP
/// surface concurrently. The HTTP surface has no dependency on any one
/// worker child, so it runs here rather than being duplicated per child.
async fn run_supervisor_and_server(config: EngineConfig) -> Result<()> {
    let worker_count = config.supervisor.resolved_worker_count();
    info!(worker_count, "supervising worker processes");

    let index_client = Arc::new(
        SearchIndexClient::new(&config.index.url).context("failed to build search index client")?,
    );
    let replay_cache = Arc::new(ReplayCache::new(config.replay_cache.max_entries as u64));
    let testcases_index = config.index.testcases_index.clone();

    let state = AppState::new(replay_cache, index_client.clone(), testcases_index);
    let app = router(state);

    let http_port = config.http_port;
    let server = async move {
        let addr = format!("0.0.0.0:{http_port}");
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .context("failed to bind HTTP listener")?;
        info!(%addr, "listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server error")
    };

    tokio::select! {
        result = worker::supervise(worker_count) => {
            result.context("worker supervisor exited")?;
        }
        result = server => {
            result?;
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Worker child: connects every collaborator and runs the three pipeline
/// consumer loops for this shard until the process is signalled to stop.
async fn run_worker(config: EngineConfig, secrets: Arc<dyn SecretProvider>, worker_index: usize) -> Result<()> {
    info!(worker_index, "starting worker process");

    let crypto_key = load_crypto_key(secrets.as_ref())
        .await
        .context("failed to load billing crypto key")?;
    let crypto_pool = Arc::new(CryptoPool::new(config.crypto.pool_size, crypto_key));

    let writer = Arc::new(
        RelationalWriter::connect(&config.relational, RELATIONAL_POOL_SIZE)
            .await
            .context("failed to connect relational writer")?,
    );
    if writer.ping().await {
        health().store.set_healthy();
    } else {
        health().store.set_unhealthy("ping failed");
    }

    let object_store = Arc::new(ObjectStoreClient::from_env(config.objectstore.max_connections).await);
    health().objectstore.set_healthy();

    let (bucket, _) = config
        .objectstore
        .super_store_s3_path
        .split_once('/')
        .context("SUPER_STORE_S3_PATH must be of the form bucket/prefix")?;
    let allow_list = Arc::new(SuperstoreAllowList::new(
        bucket,
        config.objectstore.super_store_config_key.clone(),
    ));

    let pgp_secret_id = config
        .objectstore
        .pgp_secret_name
        .clone()
        .unwrap_or_else(|| "SUPERSTORE_PGP_KEY".to_string());
    let pgp = Arc::new(PgpEncryptor::new(pgp_secret_id));

    let kms_key_id = config
        .objectstore
        .snapshot_encryption_key
        .clone()
        .unwrap_or_default();

    let index_client = Arc::new(
        SearchIndexClient::new(&config.index.url).context("failed to build search index client")?,
    );
    if index::health::check_connection(&index_client).await {
        health().index.set_healthy();
    } else {
        health().index.set_unhealthy("connection check failed");
    }

    if kafka::health::check_connection(&config.kafka).await {
        health().kafka.set_healthy();
    } else {
        health().kafka.set_unhealthy("connection check failed");
        warn!("kafka connection check failed at startup, consumers will retry on first poll");
    }

    let consumers_per_instance = config.kafka.consumers_per_instance_clamped();
    let mut handles = Vec::new();

    for n in 0..consumers_per_instance {
        let topic_index = worker_index as u32 * consumers_per_instance as u32 + n as u32;

        let billing_consumer = BatchConsumer::new(
            config.kafka.clone(),
            config.kafka.billing_topic.clone(),
            topic_index,
        );
        handles.push(tokio::spawn(run_billing_consumer(
            billing_consumer,
            crypto_pool.clone(),
            writer.clone(),
            config.owning_subsystem_name.clone(),
            config.calling_subsystem_name.clone(),
        )));

        let superstore_consumer = BatchConsumer::new(
            config.kafka.clone(),
            config.kafka.super_store_topic.clone(),
            topic_index,
        );
        handles.push(tokio::spawn(run_superstore_consumer(
            superstore_consumer,
            object_store.clone(),
            allow_list.clone(),
            pgp.clone(),
            secrets.clone(),
            config.objectstore.super_store_s3_path.clone(),
            kms_key_id.clone(),
        )));

        let auditlog_consumer = BatchConsumer::new(
            config.kafka.clone(),
            config.kafka.audit_log_topic.clone(),
            topic_index,
        );
        handles.push(tokio::spawn(run_auditlog_consumer(
            auditlog_consumer,
            index_client.clone(),
            config.index.testcases_index.clone(),
        )));
    }

    tokio::select! {
        _ = shutdown_signal() => {
            info!(worker_index, "received shutdown signal");
        }
        _ = futures::future::join_all(handles) => {
            error!(worker_index, "all consumer loops exited unexpectedly");
        }
    }

    Ok(())
}

/// Resolves the billing crypto pool's AES-256-GCM key from the configured
/// secret id (a base64-encoded 32-byte value).
async fn load_crypto_key(secrets: &dyn SecretProvider) -> Result<[u8; 32]> {
    let encoded = secrets.get_secret(CRYPTO_KEY_SECRET_ID).await?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .context("crypto key secret is not valid base64")?;
    decoded
        .try_into()
        .map_err(|v: Vec<u8>| anyhow::anyhow!("crypto key must decode to 32 bytes, got {}", v.len()))
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C signal");
        }
        _ = terminate => {
            info!("received terminate signal");
        }
    }
}
