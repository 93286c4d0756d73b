// Copyright ⓒ 2024-2026 Siloq Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CLI flags and environment variables, and the static topic list they
//! are paired with to build a [`siloq_broker::BrokerConfig`].
//!
//! Precedence: CLI flag > environment variable > built-in default.

use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;
use siloq_broker::{BrokerConfig, TopicConfig};

use crate::error::{Error, Result};

#[derive(Parser, Clone, Debug)]
#[command(name = "siloq", about = "A durable, topic-partitioned message broker")]
pub struct Cli {
    /// Port the HTTP collaborator listens on.
    #[arg(long, env = "PORT", default_value_t = 7420)]
    pub port: u16,

    #[arg(long, env = "BROKER_ID", default_value = "broker-1")]
    pub broker_id: String,

    #[arg(long, env = "DATA_STORAGE_VOLUME", default_value = "./data")]
    pub data_storage_volume: PathBuf,

    #[arg(long, env = "INGRESS_LOG_FILE", default_value = "ingress.log")]
    pub ingress_log_file: String,

    #[arg(long, env = "INGRESS_METADATA_FILE", default_value = "ingress_metadata.log")]
    pub ingress_metadata_file: String,

    /// Delete the data root before starting.
    #[arg(long, env = "REBOOT", default_value_t = false)]
    pub reboot: bool,

    /// Path to a JSON file listing `[{ "id": ..., "partitions": ... }]`.
    #[arg(long = "config", value_name = "PATH")]
    pub config_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
struct TopicConfigFile {
    id: String,
    partitions: u32,
}

impl Cli {
    /// Build the [`BrokerConfig`] this CLI invocation describes, reading
    /// the static topic list from `config_path` if given.
    pub async fn into_broker_config(self) -> Result<BrokerConfig> {
        let topics = match &self.config_path {
            Some(path) => load_topics(path).await?,
            None => Vec::new(),
        };

        if topics.is_empty() {
            return Err(Error::NoTopicsConfigured);
        }

        Ok(BrokerConfig {
            broker_id: self.broker_id,
            reboot: self.reboot,
            topics,
            data_root: self.data_storage_volume,
            ingress_log_file: self.ingress_log_file,
            ingress_metadata_file: self.ingress_metadata_file,
        })
    }
}

async fn load_topics(path: &std::path::Path) -> Result<Vec<TopicConfig>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|error| match error.kind() {
            std::io::ErrorKind::NotFound => Error::MissingConfigFile(path.to_path_buf()),
            _ => Error::from(error),
        })?;

    let parsed: Vec<TopicConfigFile> = serde_json::from_str(&contents)?;

    Ok(parsed
        .into_iter()
        .map(|topic| TopicConfig {
            id: topic.id,
            partitions: topic.partitions,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    fn cli(data_root: PathBuf, config_path: PathBuf) -> Cli {
        Cli {
            port: 7420,
            broker_id: "broker-1".to_owned(),
            data_storage_volume: data_root,
            ingress_log_file: "ingress.log".to_owned(),
            ingress_metadata_file: "ingress_metadata.log".to_owned(),
            reboot: false,
            config_path: Some(config_path),
        }
    }

    #[tokio::test]
    async fn loads_topics_from_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("topics.json");
        tokio::fs::write(&config_path, r#"[{"id":"orders","partitions":4}]"#)
            .await
            .unwrap();

        let cfg = cli(dir.path().to_path_buf(), config_path)
            .into_broker_config()
            .await
            .unwrap();

        assert_eq!(cfg.topics.len(), 1);
        assert_eq!(cfg.topics[0].id, "orders");
        assert_eq!(cfg.topics[0].partitions, 4);
    }

    #[tokio::test]
    async fn missing_config_file_is_an_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("missing.json");

        assert_matches!(
            cli(dir.path().to_path_buf(), config_path).into_broker_config().await,
            Err(Error::MissingConfigFile(_))
        );
    }

    #[tokio::test]
    async fn no_config_path_is_no_topics_configured() {
        let dir = tempdir().unwrap();
        let cli = Cli {
            port: 7420,
            broker_id: "broker-1".to_owned(),
            data_storage_volume: dir.path().to_path_buf(),
            ingress_log_file: "ingress.log".to_owned(),
            ingress_metadata_file: "ingress_metadata.log".to_owned(),
            reboot: false,
            config_path: None,
        };

        assert_matches!(cli.into_broker_config().await, Err(Error::NoTopicsConfigured));
    }
}
