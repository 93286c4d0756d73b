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

use std::{fmt, result};

use thiserror::Error;

/// Error taxonomy for the broker layer: wraps the durability layer's
/// errors and adds lookup/registration/transport failures.
#[derive(Error, Debug, Clone)]
pub enum Error {
    Storage(#[from] siloq_storage::Error),
    /// `registerConsumer`/`consume`/`commit` against an unconfigured topic.
    TopicNotFound(String),
    /// `consume`/`commit` against a partition id the topic doesn't have.
    PartitionNotFound { topic_id: String, partition_id: u32 },
    /// Every partition of the topic already has an assigned consumer.
    NoPartitionAvailable(String),
    Hyper(String),
    Json(#[from] serde_json::Error),
    Custom(String),
    Unknown(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(error) => write!(f, "{error}"),
            Self::TopicNotFound(topic_id) => write!(f, "topic not found: {topic_id}"),
            Self::PartitionNotFound {
                topic_id,
                partition_id,
            } => write!(f, "partition not found: {topic_id}/{partition_id}"),
            Self::NoPartitionAvailable(topic_id) => {
                write!(f, "no partition available for topic {topic_id}")
            }
            Self::Hyper(reason) => write!(f, "http error: {reason}"),
            Self::Json(error) => write!(f, "{error}"),
            Self::Custom(message) => write!(f, "{message}"),
            Self::Unknown(message) => write!(f, "unknown error: {message}"),
        }
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;
