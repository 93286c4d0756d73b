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

//! On-disk bootstrap. Runs once before [`siloq_broker::Broker::recover`]:
//! honours `reboot`, creates the directory tree `Partition::recover` and
//! `Broker::recover` expect to already exist, and writes `config.log`.

use siloq_broker::BrokerConfig;
use tokio::io::AsyncWriteExt;

use crate::error::Result;

/// Prepare `cfg.data_root` for the broker to recover from.
///
/// If `cfg.reboot` is set the data root is removed first, discarding any
/// prior WAL state. Otherwise existing files are left untouched; only
/// missing directories are created.
pub async fn prepare(cfg: &BrokerConfig) -> Result<()> {
    if cfg.reboot && tokio::fs::try_exists(&cfg.data_root).await? {
        tokio::fs::remove_dir_all(&cfg.data_root).await?;
    }

    tokio::fs::create_dir_all(&cfg.data_root).await?;

    for topic in &cfg.topics {
        let topic_dir = siloq_broker::config::topic_dir(&cfg.data_root, &topic.id);
        tokio::fs::create_dir_all(&topic_dir).await?;
    }

    write_config_log(cfg).await?;

    Ok(())
}

async fn write_config_log(cfg: &BrokerConfig) -> Result<()> {
    let path = siloq_broker::config::config_log_path(&cfg.data_root);

    let mut body = String::new();
    for topic in &cfg.topics {
        body.push_str(&format!("topic_config|{}|{}\n", topic.id, topic.partitions));
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)
        .await?;
    file.write_all(body.as_bytes()).await?;
    file.flush().await?;

    Ok(())
}
