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

//! A topic: a fixed-size array of partitions, sharing one metadata file.

use std::path::{Path, PathBuf};

use siloq_wal::{Message, routing};

use crate::{
    error::{Error, Result},
    metadata,
    partition::{DEFAULT_PARTITION_MAX_SIZE, Partition},
};

/// A topic and its partitions. The partition count is fixed at creation:
/// growing it would break the routing guarantee that a given `messageId`
/// always lands on the same partition.
#[derive(Clone)]
pub struct Topic {
    topic_id: String,
    partitions: Vec<Partition>,
}

impl Topic {
    /// Recover every partition of `topic_id` under `topic_dir`, creating
    /// the on-disk layout if absent.
    ///
    /// `topic_dir` is expected to be `.../topics/topic_{topicId}/`; each
    /// partition's WAL lives at `partition_{k}.log` inside it, and all
    /// partitions share `{topicId}_partition_metadata.log`.
    pub async fn recover(
        topic_id: impl Into<String>,
        topic_dir: impl AsRef<Path>,
        partition_count: u32,
    ) -> Result<Self> {
        let topic_id = topic_id.into();
        let topic_dir = topic_dir.as_ref();

        if partition_count == 0 {
            return Err(Error::BufferBuildFailed(format!(
                "topic {topic_id} requires at least one partition"
            )));
        }

        let metadata_path = metadata::partition_metadata_path(topic_dir, &topic_id);

        let mut partitions = Vec::with_capacity(partition_count as usize);
        for partition_id in 0..partition_count {
            let wal_path = partition_log_path(topic_dir, partition_id);
            let partition = Partition::recover(
                topic_id.clone(),
                partition_id,
                wal_path,
                metadata_path.clone(),
                DEFAULT_PARTITION_MAX_SIZE,
            )
            .await?;
            partitions.push(partition);
        }

        Ok(Self { topic_id, partitions })
    }

    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }

    pub fn partition_count(&self) -> u32 {
        self.partitions.len() as u32
    }

    pub fn partition(&self, partition_id: u32) -> Option<&Partition> {
        self.partitions.get(partition_id as usize)
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Route `message` to its partition by `messageId` hash and push it
    /// there.
    pub async fn push(&self, message: Message) -> Result<u32> {
        let partition_id = routing::partition_for(&message.message_id, self.partition_count());
        let partition = self
            .partitions
            .get(partition_id as usize)
            .expect("partition_for is bounded by partition_count");

        partition.push(message).await?;
        Ok(partition_id)
    }
}

fn partition_log_path(topic_dir: &Path, partition_id: u32) -> PathBuf {
    topic_dir.join(format!("partition_{partition_id}.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::Value;
    use tempfile::tempdir;

    fn msg(id: &str) -> Message {
        Message::new("t", id, Value::String(format!("content-{id}")))
    }

    #[tokio::test]
    async fn push_routes_deterministically() {
        let dir = tempdir().unwrap();
        let topic = Topic::recover("t", dir.path(), 4).await.unwrap();

        let first = topic.push(msg("msg-0")).await.unwrap();
        let second = topic.push(msg("msg-0")).await.unwrap();
        assert_eq!(first, second);

        let partition = topic.partition(first).unwrap();
        assert_eq!(partition.size().await, 2);
    }

    #[tokio::test]
    async fn push_distributes_across_partitions() {
        let dir = tempdir().unwrap();
        let topic = Topic::recover("t", dir.path(), 4).await.unwrap();

        for i in 0..40 {
            let _ = topic.push(msg(&format!("msg-{i}"))).await.unwrap();
        }

        let total: usize = {
            let mut total = 0;
            for partition in topic.partitions() {
                total += partition.size().await;
            }
            total
        };
        assert_eq!(total, 40);
    }

    #[tokio::test]
    async fn zero_partitions_is_rejected() {
        let dir = tempdir().unwrap();
        assert_matches!(
            Topic::recover("t", dir.path(), 0).await,
            Err(Error::BufferBuildFailed(_))
        );
    }

    #[tokio::test]
    async fn recovery_preserves_per_partition_state() {
        let dir = tempdir().unwrap();

        let partition_id = {
            let topic = Topic::recover("t", dir.path(), 4).await.unwrap();
            topic.push(msg("msg-0")).await.unwrap()
        };

        let recovered = Topic::recover("t", dir.path(), 4).await.unwrap();
        let partition = recovered.partition(partition_id).unwrap();
        assert_eq!(partition.size().await, 1);
    }
}
