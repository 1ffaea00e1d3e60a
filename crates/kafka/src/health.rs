//! Connection health checks, grounded on the old producer's `check_connection`.

use rskafka::client::ClientBuilder;
use tracing::{debug, error};

use engine_core::config::KafkaConfig;

pub async fn check_connection(config: &KafkaConfig) -> bool {
    match ClientBuilder::new(config.bootstrap_servers.clone()).build().await {
        Ok(client) => match client.list_topics().await {
            Ok(topics) => {
                debug!(topics = topics.len(), "kafka connection healthy");
                true
            }
            Err(e) => {
                error!("failed to list kafka topics: {e}");
                false
            }
        },
        Err(e) => {
            error!("failed to connect to kafka: {e}");
            false
        }
    }
}

pub async fn verify_topics(config: &KafkaConfig, topics: &[&str]) -> Vec<String> {
    match ClientBuilder::new(config.bootstrap_servers.clone()).build().await {
        Ok(client) => match client.list_topics().await {
            Ok(existing_topics) => {
                let existing: std::collections::HashSet<_> =
                    existing_topics.iter().map(|t| t.name.as_str()).collect();
                topics
                    .iter()
                    .filter(|t| !existing.contains(*t))
                    .map(|t| t.to_string())
                    .collect()
            }
            Err(_) => topics.iter().map(|t| t.to_string()).collect(),
        },
        Err(_) => topics.iter().map(|t| t.to_string()).collect(),
    }
}
