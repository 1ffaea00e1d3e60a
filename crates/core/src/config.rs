//! Layered configuration for the ingestion engine (spec §6).
//!
//! Defaults are compiled in, then overridden by an optional TOML file, then
//! by environment variables under the `ENGINE` prefix (double underscore as
//! the nesting separator) -- the same `config` crate layering the teacher's
//! `main.rs` used for its own settings. Fields that don't flatten cleanly
//! into `config`'s env parser (broker lists, table/column name lists) get a
//! manual post-load override.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityProtocol {
    Ssl,
    Local,
}

impl Default for SecurityProtocol {
    fn default() -> Self {
        SecurityProtocol::Local
    }
}

/// C6 transport settings (spec §4.1, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    #[serde(default)]
    pub security_protocol: SecurityProtocol,
    #[serde(default = "default_bootstrap_servers")]
    pub bootstrap_servers: Vec<String>,
    #[serde(default = "default_consumers_per_instance")]
    pub consumers_per_instance: u8,
    #[serde(default = "default_max_poll_records")]
    pub max_poll_records: usize,
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    pub cafile_path: Option<String>,
    pub certfile_path: Option<String>,
    pub keyfile_path: Option<String>,
    pub private_key_password: Option<String>,
    #[serde(default = "default_billing_topic")]
    pub billing_topic: String,
    #[serde(default = "default_super_store_topic")]
    pub super_store_topic: String,
    #[serde(default = "default_audit_log_topic")]
    pub audit_log_topic: String,
}

fn default_bootstrap_servers() -> Vec<String> {
    vec!["localhost:9092".to_string()]
}

fn default_consumers_per_instance() -> u8 {
    4
}

fn default_max_poll_records() -> usize {
    50
}

fn default_poll_timeout_ms() -> u64 {
    10_000
}

fn default_billing_topic() -> String {
    "refactored_billing".to_string()
}

fn default_super_store_topic() -> String {
    "reporting".to_string()
}

fn default_audit_log_topic() -> String {
    "audit_log".to_string()
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            security_protocol: SecurityProtocol::default(),
            bootstrap_servers: default_bootstrap_servers(),
            consumers_per_instance: default_consumers_per_instance(),
            max_poll_records: default_max_poll_records(),
            poll_timeout_ms: default_poll_timeout_ms(),
            cafile_path: None,
            certfile_path: None,
            keyfile_path: None,
            private_key_password: None,
            billing_topic: default_billing_topic(),
            super_store_topic: default_super_store_topic(),
            audit_log_topic: default_audit_log_topic(),
        }
    }
}

impl KafkaConfig {
    /// `KAFKA_NO_CONSUMER_PER_INSTANCE` is documented as 1..8 (spec §4.9); clamp
    /// rather than reject, since an operator typo shouldn't crash the process.
    pub fn consumers_per_instance_clamped(&self) -> u8 {
        self.consumers_per_instance.clamp(1, 8)
    }
}

/// C3 relational-writer table/column config (spec §4.6, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationalConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_pool_recycle_secs")]
    pub pool_recycle_secs: u64,
    #[serde(default = "default_summary_table")]
    pub summary_table: String,
    #[serde(default = "default_summary_columns")]
    pub summary_columns: Vec<String>,
    #[serde(default = "default_product_table")]
    pub product_table: String,
    #[serde(default = "default_product_columns")]
    pub product_columns: Vec<String>,
}

fn default_database_url() -> String {
    "postgres://localhost/billing".to_string()
}

fn default_pool_recycle_secs() -> u64 {
    10_800
}

fn default_summary_table() -> String {
    "allout_billing".to_string()
}

fn default_summary_columns() -> Vec<String> {
    vec![
        "transaction_id".to_string(),
        "inquiry_timestamp".to_string(),
        "billing_record".to_string(),
        "silent_launch".to_string(),
        "solution_id".to_string(),
        "subcode".to_string(),
    ]
}

fn default_product_table() -> String {
    "dashboard_billing".to_string()
}

fn default_product_columns() -> Vec<String> {
    vec![
        "transaction_id".to_string(),
        "inquiry_timestamp".to_string(),
        "solution_id".to_string(),
        "subcode".to_string(),
        "product_code".to_string(),
        "product_code_type".to_string(),
        "silent_launch".to_string(),
    ]
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_recycle_secs: default_pool_recycle_secs(),
            summary_table: default_summary_table(),
            summary_columns: default_summary_columns(),
            product_table: default_product_table(),
            product_columns: default_product_columns(),
        }
    }
}

/// C5 crypto pool config (spec §4.5, §6 `CRYPTO_*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    #[serde(default = "default_crypto_pool_size")]
    pub pool_size: usize,
    pub cipher_library_path: Option<String>,
    #[serde(default = "default_crypto_environment")]
    pub environment: String,
    pub aws_profile: Option<String>,
}

fn default_crypto_pool_size() -> usize {
    4
}

fn default_crypto_environment() -> String {
    "production".to_string()
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            pool_size: default_crypto_pool_size(),
            cipher_library_path: None,
            environment: default_crypto_environment(),
            aws_profile: None,
        }
    }
}

/// C2 object-store config (spec §4.8, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    #[serde(default = "default_super_store_s3_path")]
    pub super_store_s3_path: String,
    pub snapshot_encryption_key: Option<String>,
    #[serde(default = "default_super_store_config_key")]
    pub super_store_config_key: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    pub pgp_secret_vault: Option<String>,
    pub pgp_secret_name: Option<String>,
}

fn default_super_store_s3_path() -> String {
    "superstore-bucket/raw".to_string()
}

fn default_super_store_config_key() -> String {
    "superstore_config.json".to_string()
}

fn default_max_connections() -> usize {
    10
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            super_store_s3_path: default_super_store_s3_path(),
            snapshot_encryption_key: None,
            super_store_config_key: default_super_store_config_key(),
            max_connections: default_max_connections(),
            pgp_secret_vault: None,
            pgp_secret_name: None,
        }
    }
}

/// C4 search-index config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_url")]
    pub url: String,
    #[serde(default = "default_testcases_index")]
    pub testcases_index: String,
}

fn default_index_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_testcases_index() -> String {
    "rts_testcases".to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            testcases_index: default_testcases_index(),
        }
    }
}

/// C11 process supervisor config (spec §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    pub worker_processes: Option<usize>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            worker_processes: None,
        }
    }
}

impl SupervisorConfig {
    /// Default worker-process count: CPU count, minus one when >= 4 (spec §4.9).
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_processes {
            Some(n) => n.max(1),
            None => {
                let cpus = num_cpus::get();
                if cpus >= 4 {
                    cpus - 1
                } else {
                    cpus.max(1)
                }
            }
        }
    }
}

/// C12 replay cache config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayCacheConfig {
    #[serde(default = "default_replay_cache_size")]
    pub max_entries: usize,
    #[serde(default = "default_job_queue_size")]
    pub job_queue_size: usize,
}

fn default_replay_cache_size() -> usize {
    512
}

fn default_job_queue_size() -> usize {
    100
}

impl Default for ReplayCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_replay_cache_size(),
            job_queue_size: default_job_queue_size(),
        }
    }
}

/// Top-level engine configuration (spec §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub kafka: KafkaConfig,
    #[serde(default)]
    pub relational: RelationalConfig,
    #[serde(default)]
    pub crypto: CryptoConfig,
    #[serde(default)]
    pub objectstore: ObjectStoreConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub replay_cache: ReplayCacheConfig,
    /// `ANALYTICS_RDS_KEY_NAME` - secret id for relational credentials (C1).
    pub analytics_rds_key_name: Option<String>,
    #[serde(default = "default_owning_subsystem")]
    pub owning_subsystem_name: String,
    #[serde(default = "default_calling_subsystem")]
    pub calling_subsystem_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

fn default_owning_subsystem() -> String {
    "GOCR".to_string()
}

fn default_calling_subsystem() -> String {
    "GOXX".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_port() -> u16 {
    8080
}

impl EngineConfig {
    /// Loads configuration the way the teacher's `main.rs` does: compiled-in
    /// defaults, an optional `config.toml`, then `ENGINE__`-prefixed
    /// environment variables, with `dotenvy` populating the process
    /// environment from a local `.env` first (non-production convenience).
    pub fn load() -> crate::error::Result<Self> {
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("ENGINE")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: EngineConfig = builder
            .build()
            .map_err(|e| crate::error::Error::configuration(e.to_string()))?
            .try_deserialize()
            .map_err(|e| crate::error::Error::configuration(e.to_string()))?;

        if let Ok(brokers) = std::env::var("MSK_BOOTSTRAP_SERVERS") {
            cfg.kafka.bootstrap_servers =
                brokers.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(topic) = std::env::var("BILLING_TOPIC") {
            cfg.kafka.billing_topic = topic;
        }
        if let Ok(topic) = std::env::var("SUPER_STORE_TOPIC") {
            cfg.kafka.super_store_topic = topic;
        }
        if let Ok(path) = std::env::var("SUPER_STORE_S3_PATH") {
            cfg.objectstore.super_store_s3_path = path;
        }

        Ok(cfg)
    }
}
