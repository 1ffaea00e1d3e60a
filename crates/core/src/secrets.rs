//! Secret and certificate bootstrap (C1).
//!
//! The spec treats C1 as a named interface rather than a concrete vault
//! integration: callers ask for a secret id and get bytes back, and where
//! that id's plaintext comes from (AWS Secrets Manager, a mounted file, an
//! env var) is swappable. One production implementation reads from the
//! process environment the way the teacher's `config` loading does; one
//! in-memory implementation backs tests.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Fetches secret material by id. Implementations must not log the
/// retrieved value.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn get_secret(&self, secret_id: &str) -> Result<String>;
}

/// Resolves a secret id to an environment variable of the same name. Used
/// in production where secrets are injected into the process environment
/// ahead of time by the deployment platform.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretProvider;

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn get_secret(&self, secret_id: &str) -> Result<String> {
        std::env::var(secret_id)
            .map_err(|_| Error::configuration(format!("secret {secret_id} not set")))
    }
}

/// Fixed in-memory secret set, for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretProvider {
    secrets: HashMap<String, String>,
}

impl StaticSecretProvider {
    pub fn new(secrets: HashMap<String, String>) -> Self {
        Self { secrets }
    }

    pub fn with(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(id.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretProvider for StaticSecretProvider {
    async fn get_secret(&self, secret_id: &str) -> Result<String> {
        self.secrets
            .get(secret_id)
            .cloned()
            .ok_or_else(|| Error::configuration(format!("secret {secret_id} not set")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_returns_seeded_value() {
        let provider = StaticSecretProvider::default().with("PGP_KEY", "-----BEGIN-----");
        assert_eq!(provider.get_secret("PGP_KEY").await.unwrap(), "-----BEGIN-----");
    }

    #[tokio::test]
    async fn static_provider_errors_on_missing_id() {
        let provider = StaticSecretProvider::default();
        assert!(provider.get_secret("MISSING").await.is_err());
    }
}
