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

//! The configuration handed to the core by the bootstrap collaborator,
//! and the on-disk layout paths derived from it.

use std::path::{Path, PathBuf};

/// One configured topic: its id and fixed partition count.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TopicConfig {
    pub id: String,
    pub partitions: u32,
}

/// Static configuration the core is handed at startup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BrokerConfig {
    pub broker_id: String,
    /// If true, the bootstrap collaborator deletes the data root before
    /// the core starts.
    pub reboot: bool,
    pub topics: Vec<TopicConfig>,
    pub data_root: PathBuf,
    /// Filename of the ingress WAL, relative to `data_root`. Overridable
    /// via `INGRESS_LOG_FILE`.
    pub ingress_log_file: String,
    /// Filename of the ingress metadata file, relative to `data_root`.
    /// Overridable via `INGRESS_METADATA_FILE`.
    pub ingress_metadata_file: String,
}

impl BrokerConfig {
    pub const DEFAULT_INGRESS_LOG_FILE: &'static str = "ingress.log";
    pub const DEFAULT_INGRESS_METADATA_FILE: &'static str = "ingress_metadata.log";
}

/// File and directory paths rooted at `data_root`. Shared by
/// `Broker::recover` and the bootstrap collaborator so both agree on
/// where things live.
pub fn ingress_log_path(data_root: &Path, filename: &str) -> PathBuf {
    data_root.join(filename)
}

pub fn ingress_metadata_path(data_root: &Path, filename: &str) -> PathBuf {
    data_root.join(filename)
}

pub fn config_log_path(data_root: &Path) -> PathBuf {
    data_root.join("config.log")
}

pub fn tpc_log_path(data_root: &Path) -> PathBuf {
    data_root.join("TPC.log")
}

pub fn topics_dir(data_root: &Path) -> PathBuf {
    data_root.join("topics")
}

pub fn topic_dir(data_root: &Path, topic_id: &str) -> PathBuf {
    topics_dir(data_root).join(format!("topic_{topic_id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted_at_data_root() {
        let root = Path::new("/var/lib/siloq");
        assert_eq!(
            ingress_log_path(root, "ingress.log"),
            root.join("ingress.log")
        );
        assert_eq!(tpc_log_path(root), root.join("TPC.log"));
        assert_eq!(
            topic_dir(root, "orders"),
            root.join("topics").join("topic_orders")
        );
    }
}
