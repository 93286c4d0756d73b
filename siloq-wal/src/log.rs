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

//! Append-only log file handler.
//!
//! Two record formats are distinguished by [`Kind`], set once at
//! construction:
//!
//! - [`Kind::IngressBuffer`]: `brokerId|offset|topicId|messageId|content\n`
//! - [`Kind::PartitionBuffer`]: `topicId|partitionId|offset|messageId|content\n`
//!
//! Fields are joined by a literal `|` and records are newline-terminated.
//! The `|` character inside `content` is **not** escaped: a payload
//! containing `|` will re-parse to the wrong field count on replay. This is
//! a known, carried-over hazard rather than a bug to fix here.

use std::{
    io::SeekFrom,
    path::{Path, PathBuf},
};

use serde_json::Value;
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader},
};
use tracing::debug;

use crate::error::{Error, Result};

/// Which record shape a [`LogHandle`] formats and parses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    IngressBuffer,
    PartitionBuffer,
}

/// A record decoded from an ingress WAL line.
#[derive(Clone, Debug, PartialEq)]
pub struct IngressRecord {
    pub broker_id: String,
    pub offset: u64,
    pub topic_id: String,
    pub message_id: String,
    pub content: Value,
}

/// A record decoded from a partition WAL line.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionRecord {
    pub topic_id: String,
    pub partition_id: u32,
    pub offset: u64,
    pub message_id: String,
    pub content: Value,
}

fn content_field(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn content_value(field: &str) -> Value {
    serde_json::from_str::<Value>(field).unwrap_or_else(|_| Value::String(field.to_owned()))
}

/// Format a single ingress record line (no trailing content escaping; see
/// module docs).
pub fn format_ingress(
    broker_id: &str,
    offset: u64,
    topic_id: &str,
    message_id: &str,
    content: &Value,
) -> String {
    format!(
        "{broker_id}|{offset}|{topic_id}|{message_id}|{}\n",
        content_field(content)
    )
}

/// Format a single partition record line.
pub fn format_partition(
    topic_id: &str,
    partition_id: u32,
    offset: u64,
    message_id: &str,
    content: &Value,
) -> String {
    format!(
        "{topic_id}|{partition_id}|{offset}|{message_id}|{}\n",
        content_field(content)
    )
}

/// Parse a single (already trimmed) ingress WAL line.
pub fn parse_ingress(line: &str) -> Result<IngressRecord> {
    let fields: Vec<&str> = line.splitn(5, '|').collect();

    let [broker_id, offset, topic_id, message_id, content] = fields.as_slice() else {
        return Err(Error::Malformed {
            line: line.to_owned(),
            expected_fields: 5,
        });
    };

    let offset = offset.parse::<u64>().map_err(|_| Error::Malformed {
        line: line.to_owned(),
        expected_fields: 5,
    })?;

    Ok(IngressRecord {
        broker_id: (*broker_id).to_owned(),
        offset,
        topic_id: (*topic_id).to_owned(),
        message_id: (*message_id).to_owned(),
        content: content_value(content),
    })
}

/// Parse a single (already trimmed) partition WAL line.
pub fn parse_partition(line: &str) -> Result<PartitionRecord> {
    let fields: Vec<&str> = line.splitn(5, '|').collect();

    let [topic_id, partition_id, offset, message_id, content] = fields.as_slice() else {
        return Err(Error::Malformed {
            line: line.to_owned(),
            expected_fields: 5,
        });
    };

    let partition_id = partition_id.parse::<u32>().map_err(|_| Error::Malformed {
        line: line.to_owned(),
        expected_fields: 5,
    })?;

    let offset = offset.parse::<u64>().map_err(|_| Error::Malformed {
        line: line.to_owned(),
        expected_fields: 5,
    })?;

    Ok(PartitionRecord {
        topic_id: (*topic_id).to_owned(),
        partition_id,
        offset,
        message_id: (*message_id).to_owned(),
        content: content_value(content),
    })
}

/// An append-only log file, identified by path and reopened for every
/// append (the path is cheap to hold; the file descriptor is not kept
/// across calls).
///
/// `LogHandle` does not fsync per record: callers that need a
/// durability boundary wait for the `Ok` return of [`LogHandle::append`],
/// which corresponds to the write syscall completing, not to the data
/// hitting stable storage.
#[derive(Debug)]
pub struct LogHandle {
    path: PathBuf,
    kind: Kind,
}

impl LogHandle {
    pub fn new(path: impl Into<PathBuf>, kind: Kind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the log file exists, creating an empty one if absent.
    pub async fn ensure_exists(&self) -> Result<()> {
        let _ = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        Ok(())
    }

    /// Append a single already-formatted buffer (one or more newline
    /// terminated records) in one write call.
    ///
    /// The caller must not advance any in-memory offset until this returns
    /// `Ok`.
    pub async fn append(&self, buf: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;

        debug!(path = %self.path.display(), bytes = buf.len(), "wal append");

        Ok(())
    }

    /// Read every non-empty line of the log file, in order.
    pub async fn read_lines(&self) -> Result<Vec<String>> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        read_all_lines(file).await
    }

    /// Read every non-empty line after skipping the first `skip` lines.
    pub async fn read_lines_from(&self, skip: usize) -> Result<Vec<String>> {
        Ok(self.read_lines().await?.into_iter().skip(skip).collect())
    }
}

async fn read_all_lines(file: File) -> Result<Vec<String>> {
    let mut file = file;
    let _ = file.seek(SeekFrom::Start(0)).await?;

    let mut contents = String::new();
    let _ = BufReader::new(file).read_to_string(&mut contents).await?;

    Ok(contents
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}
