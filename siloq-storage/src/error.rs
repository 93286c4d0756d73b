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

use std::{fmt, path::PathBuf, result};

use thiserror::Error;

/// Error taxonomy for the durability layer (ingress buffer + partitions).
///
/// `BufferEmpty` is not really an error in the exceptional sense: it is
/// reported through this type because `batchExtract` is a fallible
/// operation, but callers (the broker loop, `/consume`) treat it as a
/// normal empty batch rather than surfacing a failure.
#[derive(Error, Debug, Clone)]
pub enum Error {
    Wal(#[from] siloq_wal::Error),
    /// In-memory size is at or above the configured maximum.
    BufferFull,
    /// No pending messages to extract.
    BufferEmpty,
    /// The WAL append failed at the OS level; no in-memory offset was
    /// advanced.
    AppendFailed(String),
    /// WAL or metadata replay failed at startup. Fatal.
    BufferBuildFailed(String),
    /// `commitOffset(o)` was called with `o` greater than `logEndOffset`.
    InvalidOffset { requested: u64, log_end_offset: u64 },
    FileNotFound(PathBuf),
    InvalidFilePath(PathBuf),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wal(error) => write!(f, "{error}"),
            Self::BufferFull => write!(f, "buffer full"),
            Self::BufferEmpty => write!(f, "buffer empty"),
            Self::AppendFailed(reason) => write!(f, "append failed: {reason}"),
            Self::BufferBuildFailed(reason) => write!(f, "buffer build failed: {reason}"),
            Self::InvalidOffset {
                requested,
                log_end_offset,
            } => write!(
                f,
                "invalid offset {requested}, log end offset is {log_end_offset}"
            ),
            Self::FileNotFound(path) => write!(f, "file not found: {}", path.display()),
            Self::InvalidFilePath(path) => write!(f, "invalid file path: {}", path.display()),
        }
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;
