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

//! The in-process async API every collaborator (HTTP layer, tests, a
//! future client SDK) programs against. The HTTP layer (`crate::http`)
//! is a thin translator over exactly these four calls.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use siloq_storage::{Committed, Extracted, IngressBuffer, Partition, Topic, ingress::DEFAULT_MAX_SIZE};
use siloq_wal::Message;
use tokio::sync::Mutex as AsyncMutex;

use crate::{
    config::{self, BrokerConfig},
    error::{Error, Result},
    tpc::TpcMap,
};

/// Messages pulled per `batchExtract` call on `/consume?b=t`, matching
/// the broker loop's own drain batch size.
const DEFAULT_CONSUME_BATCH_SIZE: usize = 100;

/// The result of `consume`, mirroring the two response shapes the HTTP
/// endpoint exposes depending on `b=t`.
#[derive(Clone, Debug)]
pub enum ConsumeResult {
    Batch(Extracted),
    Single { message: Option<Message>, offset: u64 },
}

struct Inner {
    broker_id: String,
    ingress: IngressBuffer,
    topics: HashMap<String, Topic>,
    tpc: AsyncMutex<TpcMap>,
    tpc_log_path: PathBuf,
}

/// The broker core: owns the ingress buffer and the set of topics, and
/// exposes the four operations the HTTP collaborator translates.
#[derive(Clone)]
pub struct Broker(Arc<Inner>);

impl Broker {
    /// Recover the full broker state from `data_root`: the ingress
    /// buffer, every configured topic's partitions, and the TPC map.
    /// Fatal on any structural failure (per the propagation policy,
    /// startup errors abort the process — the caller does that, this
    /// just returns `Err`).
    pub async fn recover(cfg: BrokerConfig) -> Result<Self> {
        let ingress = IngressBuffer::recover(
            config::ingress_log_path(&cfg.data_root, &cfg.ingress_log_file),
            config::ingress_metadata_path(&cfg.data_root, &cfg.ingress_metadata_file),
            cfg.broker_id.clone(),
            DEFAULT_MAX_SIZE,
        )
        .await?;

        let mut topics = HashMap::with_capacity(cfg.topics.len());
        for topic_cfg in &cfg.topics {
            let dir = config::topic_dir(&cfg.data_root, &topic_cfg.id);
            let topic = Topic::recover(topic_cfg.id.clone(), &dir, topic_cfg.partitions).await?;
            let _ = topics.insert(topic_cfg.id.clone(), topic);
        }

        let tpc_log_path = config::tpc_log_path(&cfg.data_root);
        let tpc = TpcMap::recover(&tpc_log_path, &cfg.topics).await?;

        Ok(Self(Arc::new(Inner {
            broker_id: cfg.broker_id,
            ingress,
            topics,
            tpc: AsyncMutex::new(tpc),
            tpc_log_path,
        })))
    }

    pub fn broker_id(&self) -> &str {
        &self.0.broker_id
    }

    /// `POST /ingress/:topicId` core call.
    pub async fn push(&self, message: Message) -> Result<()> {
        self.0.ingress.push(message).await.map_err(Error::from)
    }

    /// `POST /register/:topicId` core call.
    pub async fn register_consumer(&self, topic_id: &str, consumer_id: &str) -> Result<u32> {
        let mut tpc = self.0.tpc.lock().await;
        let partition_id = tpc.register(topic_id, consumer_id)?;
        tpc.write(&self.0.tpc_log_path).await?;
        Ok(partition_id)
    }

    fn topic(&self, topic_id: &str) -> Result<&Topic> {
        self.0
            .topics
            .get(topic_id)
            .ok_or_else(|| Error::TopicNotFound(topic_id.to_owned()))
    }

    fn partition(&self, topic_id: &str, partition_id: u32) -> Result<&Partition> {
        self.topic(topic_id)?
            .partition(partition_id)
            .ok_or_else(|| Error::PartitionNotFound {
                topic_id: topic_id.to_owned(),
                partition_id,
            })
    }

    /// `GET /consume/:brokerId/:topicId/:partitionId?b=t` core call. An
    /// empty partition is not an error at this boundary: it surfaces as
    /// a zero-length batch / `None` single message.
    pub async fn consume(&self, topic_id: &str, partition_id: u32, batch: bool) -> Result<ConsumeResult> {
        let partition = self.partition(topic_id, partition_id)?;
        let n = if batch { DEFAULT_CONSUME_BATCH_SIZE } else { 1 };

        match partition.batch_extract(n).await {
            Ok(extracted) if batch => Ok(ConsumeResult::Batch(extracted)),
            Ok(mut extracted) => Ok(ConsumeResult::Single {
                message: extracted.messages.pop(),
                offset: extracted.end_offset,
            }),
            Err(siloq_storage::Error::BufferEmpty) => {
                let offset = partition.read_offset().await;
                Ok(if batch {
                    ConsumeResult::Batch(Extracted {
                        messages: Vec::new(),
                        start_offset: offset,
                        end_offset: offset,
                    })
                } else {
                    ConsumeResult::Single { message: None, offset }
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    /// `POST /commit` core call.
    pub async fn commit(&self, topic_id: &str, partition_id: u32, offset: u64) -> Result<Committed> {
        self.partition(topic_id, partition_id)?
            .commit_offset(offset)
            .await
            .map_err(Error::from)
    }

    pub(crate) fn ingress(&self) -> &IngressBuffer {
        &self.0.ingress
    }

    pub(crate) fn topics(&self) -> &HashMap<String, Topic> {
        &self.0.topics
    }

    /// Drain up to `n` messages from the ingress buffer and route each to
    /// its topic, same as one iteration of [`crate::dispatch::run`].
    /// Returns the number of messages drained. A routing miss or
    /// partition push failure is logged and does not abort the drain
    /// (per the propagation policy).
    pub async fn drain_into_topics(&self, n: usize) -> Result<usize> {
        match self.0.ingress.batch_extract(n).await {
            Ok(batch) => {
                let drained = batch.len();
                for message in batch {
                    match self.0.topics.get(&message.topic_id) {
                        Some(topic) => {
                            if let Err(error) = topic.push(message).await {
                                tracing::warn!(%error, "partition push failed, message dropped from this batch");
                            }
                        }
                        None => tracing::warn!(
                            topic_id = %message.topic_id,
                            "no topic configured for message, dropping"
                        ),
                    }
                }
                Ok(drained)
            }
            Err(siloq_storage::Error::BufferEmpty) => Ok(0),
            Err(other) => Err(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopicConfig;
    use assert_matches::assert_matches;
    use serde_json::Value;
    use tempfile::tempdir;

    fn cfg(data_root: PathBuf) -> BrokerConfig {
        BrokerConfig {
            broker_id: "broker-1".to_owned(),
            reboot: false,
            topics: vec![TopicConfig {
                id: "t".to_owned(),
                partitions: 1,
            }],
            data_root,
            ingress_log_file: BrokerConfig::DEFAULT_INGRESS_LOG_FILE.to_owned(),
            ingress_metadata_file: BrokerConfig::DEFAULT_INGRESS_METADATA_FILE.to_owned(),
        }
    }

    #[tokio::test]
    async fn push_register_consume_commit_round_trip() {
        let dir = tempdir().unwrap();
        let broker = Broker::recover(cfg(dir.path().to_path_buf())).await.unwrap();

        broker
            .push(Message::new("t", "m1", Value::String("a".to_owned())))
            .await
            .unwrap();
        broker
            .push(Message::new("t", "m2", Value::String("b".to_owned())))
            .await
            .unwrap();

        // Drive the ingress -> topic hop manually; dispatch.rs does this
        // continuously in production.
        let drained = broker.ingress().batch_extract(10).await.unwrap();
        for message in drained {
            broker.topics().get("t").unwrap().push(message).await.unwrap();
        }

        let partition_id = broker.register_consumer("t", "c1").await.unwrap();
        assert_eq!(partition_id, 0);

        let ConsumeResult::Batch(extracted) = broker.consume("t", partition_id, true).await.unwrap() else {
            panic!("expected a batch result");
        };
        assert_eq!(extracted.messages.len(), 2);
        assert_eq!(extracted.start_offset, 0);
        assert_eq!(extracted.end_offset, 2);

        let committed = broker.commit("t", partition_id, extracted.end_offset).await.unwrap();
        assert_eq!(committed.new_read_offset, 2);
    }

    #[tokio::test]
    async fn consume_unknown_topic_is_not_found() {
        let dir = tempdir().unwrap();
        let broker = Broker::recover(cfg(dir.path().to_path_buf())).await.unwrap();

        assert_matches!(
            broker.consume("missing", 0, true).await,
            Err(Error::TopicNotFound(_))
        );
    }

    #[tokio::test]
    async fn consume_unknown_partition_is_not_found() {
        let dir = tempdir().unwrap();
        let broker = Broker::recover(cfg(dir.path().to_path_buf())).await.unwrap();

        assert_matches!(
            broker.consume("t", 7, true).await,
            Err(Error::PartitionNotFound { .. })
        );
    }

    #[tokio::test]
    async fn register_exhaustion_is_no_partition_available() {
        let dir = tempdir().unwrap();
        let broker = Broker::recover(cfg(dir.path().to_path_buf())).await.unwrap();

        let _ = broker.register_consumer("t", "c1").await.unwrap();
        assert_matches!(
            broker.register_consumer("t", "c2").await,
            Err(Error::NoPartitionAvailable(_))
        );
    }
}
