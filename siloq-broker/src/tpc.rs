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

//! The Topic–Partition–Consumer assignment map and its full-rewrite
//! persistence to `TPC.log`.

use std::{
    collections::BTreeMap,
    path::Path,
};

use tokio::fs;
use tracing::warn;

use crate::{
    config::TopicConfig,
    error::{Error, Result},
};

/// `topicId -> [consumerId; partitionCount]`, index is partition id.
/// Empty string means unassigned.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TpcMap {
    assignments: BTreeMap<String, Vec<String>>,
}

impl TpcMap {
    fn seeded(topics: &[TopicConfig]) -> Self {
        let assignments = topics
            .iter()
            .map(|topic| (topic.id.clone(), vec![String::new(); topic.partitions as usize]))
            .collect();

        Self { assignments }
    }

    /// Load `TPC.log` if it exists, applying its non-empty assignments
    /// over config-seeded defaults; otherwise seed from `topics` and
    /// write the log.
    pub async fn recover(path: &Path, topics: &[TopicConfig]) -> Result<Self> {
        let mut map = Self::seeded(topics);

        match fs::read_to_string(path).await {
            Ok(contents) => {
                for line in contents.lines().filter(|line| !line.is_empty()) {
                    let fields: Vec<&str> = line.splitn(3, '|').collect();
                    let [topic_id, partition_id, consumer_id] = fields.as_slice() else {
                        warn!(line, "malformed TPC.log line, skipping");
                        continue;
                    };

                    let Ok(partition_id) = partition_id.parse::<usize>() else {
                        warn!(line, "malformed partition id in TPC.log, skipping");
                        continue;
                    };

                    match map.assignments.get_mut(*topic_id) {
                        Some(slots) if partition_id < slots.len() => {
                            if !consumer_id.is_empty() {
                                slots[partition_id] = (*consumer_id).to_owned();
                            }
                        }
                        _ => warn!(
                            line,
                            "TPC.log entry references unknown topic/partition, skipping"
                        ),
                    }
                }
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                map.write(path).await?;
            }
            Err(error) => return Err(Error::Storage(error.into())),
        }

        Ok(map)
    }

    /// Assign the first unassigned partition of `topic_id` to
    /// `consumer_id`, or return the already-assigned partition if
    /// `consumer_id` is already registered there (idempotent).
    pub fn register(&mut self, topic_id: &str, consumer_id: &str) -> Result<u32> {
        let slots = self
            .assignments
            .get_mut(topic_id)
            .ok_or_else(|| Error::TopicNotFound(topic_id.to_owned()))?;

        if let Some(index) = slots.iter().position(|assigned| assigned == consumer_id) {
            return Ok(index as u32);
        }

        match slots.iter().position(String::is_empty) {
            Some(index) => {
                slots[index] = consumer_id.to_owned();
                Ok(index as u32)
            }
            None => Err(Error::NoPartitionAvailable(topic_id.to_owned())),
        }
    }

    pub fn partition_count(&self, topic_id: &str) -> Option<u32> {
        self.assignments.get(topic_id).map(|slots| slots.len() as u32)
    }

    pub fn consumer_of(&self, topic_id: &str, partition_id: u32) -> Option<&str> {
        self.assignments
            .get(topic_id)
            .and_then(|slots| slots.get(partition_id as usize))
            .map(String::as_str)
    }

    /// Rewrite `TPC.log` in full.
    pub async fn write(&self, path: &Path) -> Result<()> {
        let mut contents = String::new();
        for (topic_id, slots) in &self.assignments {
            for (partition_id, consumer_id) in slots.iter().enumerate() {
                contents.push_str(&format!("{topic_id}|{partition_id}|{consumer_id}\n"));
            }
        }

        fs::write(path, contents)
            .await
            .map_err(|error| Error::Storage(error.into()))
    }
}
