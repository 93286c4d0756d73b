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

//! A single `(topic, partition)` append-only buffer: the unit of consumer
//! assignment and FIFO ordering.

use std::{path::PathBuf, sync::Arc};

use siloq_queue::Fifo;
use siloq_wal::{Kind, LogHandle, Message, log as wal_log};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::{
    error::{Error, Result},
    ingress::DEFAULT_MAX_SIZE,
    metadata::{self, Offsets},
};

/// Result of [`Partition::batch_extract`]: a peeked (not removed) slice of
/// the in-memory queue plus the offset range it covers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Extracted {
    pub messages: Vec<Message>,
    pub start_offset: u64,
    pub end_offset: u64,
}

/// Result of [`Partition::commit_offset`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Committed {
    pub log_end_offset: u64,
    pub new_read_offset: u64,
}

struct State {
    queue: Fifo<Message>,
    log_end_offset: u64,
    read_offset: u64,
}

struct Inner {
    topic_id: String,
    partition_id: u32,
    wal: LogHandle,
    metadata_path: PathBuf,
    max_size: usize,
    state: AsyncMutex<State>,
}

/// One partition of a topic.
#[derive(Clone)]
pub struct Partition(Arc<Inner>);

impl Partition {
    /// Recover a partition from its WAL and its topic's shared metadata
    /// file, creating both if absent.
    pub async fn recover(
        topic_id: impl Into<String>,
        partition_id: u32,
        wal_path: impl Into<PathBuf>,
        metadata_path: impl Into<PathBuf>,
        max_size: usize,
    ) -> Result<Self> {
        let topic_id = topic_id.into();
        let wal = LogHandle::new(wal_path.into(), Kind::PartitionBuffer);
        wal.ensure_exists().await.map_err(Error::from)?;

        let metadata_path = metadata_path.into();
        let offsets = metadata::read_partition(&metadata_path, &topic_id, partition_id).await?;

        let lines = wal.read_lines().await.map_err(Error::from)?;
        let mut queue = Fifo::new();

        for line in lines.into_iter().skip(offsets.read_offset as usize) {
            let record = wal_log::parse_partition(&line).map_err(Error::from)?;
            queue.enqueue(Message::new(
                record.topic_id,
                record.message_id,
                record.content,
            ));
        }

        debug!(
            topic_id,
            partition_id,
            log_end_offset = offsets.log_end_offset,
            read_offset = offsets.read_offset,
            recovered = queue.len(),
            "partition recovered"
        );

        Ok(Self(Arc::new(Inner {
            topic_id,
            partition_id,
            wal,
            metadata_path,
            max_size,
            state: AsyncMutex::new(State {
                queue,
                log_end_offset: offsets.log_end_offset,
                read_offset: offsets.read_offset,
            }),
        })))
    }

    pub fn topic_id(&self) -> &str {
        &self.0.topic_id
    }

    pub fn partition_id(&self) -> u32 {
        self.0.partition_id
    }

    /// Append `message` to this partition's WAL, then enqueue it in
    /// memory. The WAL append happens first; on failure no in-memory
    /// state changes.
    pub async fn push(&self, message: Message) -> Result<()> {
        let mut state = self.0.state.lock().await;

        if state.queue.len() >= self.0.max_size {
            return Err(Error::BufferFull);
        }

        let offset = state.log_end_offset + 1;
        let line = wal_log::format_partition(
            &self.0.topic_id,
            self.0.partition_id,
            offset,
            &message.message_id,
            &message.content,
        );

        self.0
            .wal
            .append(&line)
            .await
            .map_err(|error| Error::AppendFailed(error.to_string()))?;

        state.log_end_offset = offset;
        state.queue.enqueue(message);

        let offsets = Offsets {
            log_end_offset: state.log_end_offset,
            read_offset: state.read_offset,
        };
        drop(state);

        metadata::write_partition(&self.0.metadata_path, &self.0.topic_id, self.0.partition_id, offsets)
            .await
    }

    /// Peek up to `n` messages without removing them. The consumer must
    /// call [`Partition::commit_offset`] with the returned `end_offset`
    /// to make the read effective.
    pub async fn batch_extract(&self, n: usize) -> Result<Extracted> {
        let state = self.0.state.lock().await;

        if state.queue.is_empty() {
            return Err(Error::BufferEmpty);
        }

        let messages = state.queue.peek_batch(n);
        let start_offset = state.read_offset;
        let end_offset = start_offset + messages.len() as u64;

        Ok(Extracted {
            messages,
            start_offset,
            end_offset,
        })
    }

    /// Advance `readOffset` to `offset`, dequeuing the newly committed
    /// prefix from the in-memory queue. Idempotent: committing the same
    /// offset twice in a row is a no-op the second time.
    pub async fn commit_offset(&self, offset: u64) -> Result<Committed> {
        let mut state = self.0.state.lock().await;

        if offset > state.log_end_offset || offset < state.read_offset {
            return Err(Error::InvalidOffset {
                requested: offset,
                log_end_offset: state.log_end_offset,
            });
        }

        let k = offset - state.read_offset;
        if k > 0 {
            let _ = state.queue.dequeue_batch(k as usize);
        }

        state.read_offset = offset;

        let offsets = Offsets {
            log_end_offset: state.log_end_offset,
            read_offset: state.read_offset,
        };
        let result = Committed {
            log_end_offset: state.log_end_offset,
            new_read_offset: state.read_offset,
        };
        drop(state);

        metadata::write_partition(&self.0.metadata_path, &self.0.topic_id, self.0.partition_id, offsets)
            .await?;

        Ok(result)
    }

    pub async fn log_end_offset(&self) -> u64 {
        self.0.state.lock().await.log_end_offset
    }

    pub async fn read_offset(&self) -> u64 {
        self.0.state.lock().await.read_offset
    }

    pub async fn size(&self) -> usize {
        self.0.state.lock().await.queue.len()
    }
}

/// Default per-partition in-memory size cap, matching the ingress
/// buffer's "large soft cap" default.
pub const DEFAULT_PARTITION_MAX_SIZE: usize = DEFAULT_MAX_SIZE;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::Value;
    use tempfile::tempdir;

    fn msg(id: &str) -> Message {
        Message::new("t", id, Value::String(format!("content-{id}")))
    }

    async fn partition(dir: &std::path::Path) -> Partition {
        Partition::recover(
            "t",
            0,
            dir.join("partition_0.log"),
            dir.join("t_partition_metadata.log"),
            DEFAULT_PARTITION_MAX_SIZE,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn push_extract_commit_round_trip() {
        let dir = tempdir().unwrap();
        let p = partition(dir.path()).await;

        p.push(msg("m1")).await.unwrap();
        p.push(msg("m2")).await.unwrap();

        let extracted = p.batch_extract(10).await.unwrap();
        assert_eq!(extracted.start_offset, 0);
        assert_eq!(extracted.end_offset, 2);
        assert_eq!(extracted.messages.len(), 2);
        assert_eq!(p.size().await, 2); // not yet committed

        let committed = p.commit_offset(extracted.end_offset).await.unwrap();
        assert_eq!(committed.new_read_offset, 2);
        assert_eq!(p.size().await, 0);
    }

    #[tokio::test]
    async fn commit_is_idempotent() {
        let dir = tempdir().unwrap();
        let p = partition(dir.path()).await;

        p.push(msg("m1")).await.unwrap();
        p.push(msg("m2")).await.unwrap();
        p.push(msg("m3")).await.unwrap();

        let extracted = p.batch_extract(10).await.unwrap();
        let first = p.commit_offset(extracted.end_offset).await.unwrap();
        let second = p.commit_offset(extracted.end_offset).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(p.read_offset().await, 3);
    }

    #[tokio::test]
    async fn commit_past_log_end_is_invalid_offset() {
        let dir = tempdir().unwrap();
        let p = partition(dir.path()).await;

        p.push(msg("m1")).await.unwrap();

        assert_matches!(
            p.commit_offset(99).await,
            Err(Error::InvalidOffset {
                requested: 99,
                log_end_offset: 1
            })
        );
        assert_eq!(p.read_offset().await, 0);
    }

    #[tokio::test]
    async fn batch_extract_on_empty_partition_errors() {
        let dir = tempdir().unwrap();
        let p = partition(dir.path()).await;
        assert_matches!(p.batch_extract(10).await, Err(Error::BufferEmpty));
    }

    #[tokio::test]
    async fn recovery_replays_uncommitted_suffix_without_consuming_it() {
        let dir = tempdir().unwrap();

        {
            let p = partition(dir.path()).await;
            p.push(msg("m1")).await.unwrap();
            p.push(msg("m2")).await.unwrap();
            let extracted = p.batch_extract(10).await.unwrap();
            // consume then commit is skipped here to simulate a crash
            // between extract and commit.
            let _ = extracted;
        }

        let recovered = partition(dir.path()).await;
        assert_eq!(recovered.size().await, 2);
        assert_eq!(recovered.read_offset().await, 0);

        let extracted = recovered.batch_extract(10).await.unwrap();
        assert_eq!(extracted.messages[0].message_id, "m1");
        assert_eq!(extracted.messages[1].message_id, "m2");
    }

    #[tokio::test]
    async fn buffer_full_rejects_push() {
        let dir = tempdir().unwrap();
        let p = Partition::recover(
            "t",
            0,
            dir.path().join("partition_0.log"),
            dir.path().join("t_partition_metadata.log"),
            1,
        )
        .await
        .unwrap();

        p.push(msg("m1")).await.unwrap();
        assert_matches!(p.push(msg("m2")).await, Err(Error::BufferFull));
    }
}
