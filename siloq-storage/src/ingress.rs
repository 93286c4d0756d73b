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

//! The entry point for every accepted message: a WAL-backed staging queue
//! between the producer and the broker's dispatch loop.

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use siloq_queue::Fifo;
use siloq_wal::{Kind, LogHandle, Message, log as wal_log};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    metadata::{self, Offsets},
};

/// Reject pushes once the in-memory queue reaches this many messages,
/// unless a smaller value is configured (a large soft cap, not a hard
/// memory budget).
pub const DEFAULT_MAX_SIZE: usize = 200_000_000;

/// Flush synchronously once this many writes are staged.
pub const DEFAULT_BATCH_SIZE: usize = 1_000;

/// Otherwise flush on this timer, started on the first staged write since
/// the last flush.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(200);

struct State {
    queue: Fifo<Message>,
    pending: Vec<(Message, u64)>,
    log_end_offset: u64,
    read_offset: u64,
}

struct Inner {
    wal: LogHandle,
    metadata_path: PathBuf,
    broker_id: String,
    max_size: usize,
    batch_size: usize,
    flush_interval: Duration,
    state: AsyncMutex<State>,
    flushing: AsyncMutex<()>,
    timer_armed: AtomicBool,
}

/// The ingress buffer: `push` stages a write and enqueues it in memory
/// immediately; `flush` batches staged writes to the WAL; `batch_extract`
/// is how the broker dispatch loop drains accepted messages.
#[derive(Clone)]
pub struct IngressBuffer(Arc<Inner>);

impl IngressBuffer {
    /// Recover an ingress buffer from its WAL and metadata file, creating
    /// both if absent.
    pub async fn recover(
        wal_path: impl Into<PathBuf>,
        metadata_path: impl Into<PathBuf>,
        broker_id: impl Into<String>,
        max_size: usize,
    ) -> Result<Self> {
        let wal = LogHandle::new(wal_path.into(), Kind::IngressBuffer);
        wal.ensure_exists().await.map_err(Error::from)?;

        let metadata_path = metadata_path.into();
        let offsets = metadata::read_ingress(&metadata_path).await?;

        let lines = wal.read_lines().await.map_err(Error::from)?;
        let mut queue = Fifo::new();

        for line in lines.into_iter().skip(offsets.read_offset as usize) {
            let record = wal_log::parse_ingress(&line).map_err(Error::from)?;
            queue.enqueue(Message::new(
                record.topic_id,
                record.message_id,
                record.content,
            ));
        }

        debug!(
            log_end_offset = offsets.log_end_offset,
            read_offset = offsets.read_offset,
            recovered = queue.len(),
            "ingress buffer recovered"
        );

        Ok(Self(Arc::new(Inner {
            wal,
            metadata_path,
            broker_id: broker_id.into(),
            max_size,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            state: AsyncMutex::new(State {
                queue,
                pending: Vec::new(),
                log_end_offset: offsets.log_end_offset,
                read_offset: offsets.read_offset,
            }),
            flushing: AsyncMutex::new(()),
            timer_armed: AtomicBool::new(false),
        })))
    }

    /// Stage `message` for the WAL and enqueue it in memory. Returns once
    /// the message is enqueued, not once it is durable — the flush that
    /// makes it durable may still be pending.
    pub async fn push(&self, message: Message) -> Result<()> {
        let should_flush_now = {
            let mut state = self.0.state.lock().await;

            if state.queue.len() >= self.0.max_size {
                return Err(Error::BufferFull);
            }

            let offset = state.log_end_offset + state.pending.len() as u64 + 1;
            state.pending.push((message.clone(), offset));
            state.queue.enqueue(message);

            state.pending.len() >= self.0.batch_size
        };

        if should_flush_now {
            self.flush().await
        } else {
            self.arm_flush_timer();
            Ok(())
        }
    }

    fn arm_flush_timer(&self) {
        if self
            .0
            .timer_armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let this = self.clone();
        let interval = self.0.flush_interval;

        let _ = tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            this.0.timer_armed.store(false, Ordering::Release);

            if let Err(error) = this.flush().await {
                warn!(%error, "ingress flush timer failed");
            }
        });
    }

    /// Flush any staged writes to the WAL in a single append, then
    /// rewrite the ingress metadata file.
    ///
    /// At most one flush runs at a time; a concurrent call that cannot
    /// acquire the flush guard returns immediately without doing work
    /// (its staged data is picked up by the flush already in progress, or
    /// by the next one).
    pub async fn flush(&self) -> Result<()> {
        let Ok(_guard) = self.0.flushing.try_lock() else {
            return Ok(());
        };

        let batch = {
            let mut state = self.0.state.lock().await;

            if state.pending.is_empty() {
                return Ok(());
            }

            std::mem::take(&mut state.pending)
        };

        let mut buf = String::new();
        for (message, offset) in &batch {
            buf.push_str(&wal_log::format_ingress(
                &self.0.broker_id,
                *offset,
                &message.topic_id,
                &message.message_id,
                &message.content,
            ));
        }

        let highest_offset = batch
            .last()
            .map(|(_, offset)| *offset)
            .expect("batch checked non-empty above");

        self.0
            .wal
            .append(&buf)
            .await
            .map_err(|error| Error::AppendFailed(error.to_string()))?;

        let offsets = {
            let mut state = self.0.state.lock().await;
            state.log_end_offset = highest_offset;
            Offsets {
                log_end_offset: state.log_end_offset,
                read_offset: state.read_offset,
            }
        };

        metadata::write_ingress(&self.0.metadata_path, offsets).await
    }

    /// Dequeue up to `n` messages in FIFO order and advance `readOffset`
    /// by however many were dequeued.
    pub async fn batch_extract(&self, n: usize) -> Result<Vec<Message>> {
        let (batch, offsets) = {
            let mut state = self.0.state.lock().await;

            if state.queue.is_empty() {
                return Err(Error::BufferEmpty);
            }

            let batch = state.queue.dequeue_batch(n);
            state.read_offset += batch.len() as u64;

            (
                batch,
                Offsets {
                    log_end_offset: state.log_end_offset,
                    read_offset: state.read_offset,
                },
            )
        };

        metadata::write_ingress(&self.0.metadata_path, offsets).await?;
        Ok(batch)
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
