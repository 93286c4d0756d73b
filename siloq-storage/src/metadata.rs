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

//! Metadata file parsing and rewriting for the ingress buffer and
//! partitions.
//!
//! The ingress metadata file holds a single line, rewritten in full on
//! every flush: `ingress|logEndOffset|readOffset`. The partition metadata
//! file is shared by every partition of a topic: one line per partition,
//! `{topicId}_partition_{partitionId}|logEndOffset|readOffset`, and an
//! update rewrites only the matching line.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{Error, Result};

/// `(logEndOffset, readOffset)` pair shared by the ingress buffer and
/// partition offset tracking.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Offsets {
    pub log_end_offset: u64,
    pub read_offset: u64,
}

impl Offsets {
    pub fn validate(self) -> Result<Self> {
        if self.log_end_offset < self.read_offset {
            return Err(Error::BufferBuildFailed(format!(
                "logEndOffset ({}) < readOffset ({})",
                self.log_end_offset, self.read_offset
            )));
        }

        Ok(self)
    }
}

/// Read and validate the single-line ingress metadata file, creating it
/// with `ingress|0|0` if absent.
pub async fn read_ingress(path: &Path) -> Result<Offsets> {
    ensure_ingress_default(path).await?;

    let contents = fs::read_to_string(path)
        .await
        .map_err(|error| Error::BufferBuildFailed(error.to_string()))?;

    let line = contents
        .lines()
        .next()
        .ok_or_else(|| Error::BufferBuildFailed("empty ingress metadata".to_owned()))?;

    let fields: Vec<&str> = line.split('|').collect();

    let [token, log_end_offset, read_offset] = fields.as_slice() else {
        return Err(Error::BufferBuildFailed(format!(
            "malformed ingress metadata line: {line:?}"
        )));
    };

    if *token != "ingress" {
        return Err(Error::BufferBuildFailed(format!(
            "expected leading token 'ingress', found {token:?}"
        )));
    }

    let log_end_offset = log_end_offset
        .parse()
        .map_err(|_| Error::BufferBuildFailed(format!("bad logEndOffset in {line:?}")))?;
    let read_offset = read_offset
        .parse()
        .map_err(|_| Error::BufferBuildFailed(format!("bad readOffset in {line:?}")))?;

    Offsets {
        log_end_offset,
        read_offset,
    }
    .validate()
}

async fn ensure_ingress_default(path: &Path) -> Result<()> {
    if fs::try_exists(path)
        .await
        .map_err(|error| Error::BufferBuildFailed(error.to_string()))?
    {
        return Ok(());
    }

    write_ingress(
        path,
        Offsets {
            log_end_offset: 0,
            read_offset: 0,
        },
    )
    .await
}

/// Rewrite the ingress metadata file in full.
pub async fn write_ingress(path: &Path, offsets: Offsets) -> Result<()> {
    let line = format!("ingress|{}|{}\n", offsets.log_end_offset, offsets.read_offset);
    fs::write(path, line)
        .await
        .map_err(|error| Error::BufferBuildFailed(error.to_string()))
}

fn partition_key(topic_id: &str, partition_id: u32) -> String {
    format!("{topic_id}_partition_{partition_id}")
}

/// Read this partition's line from the shared metadata file, seeding a
/// default `0|0` entry if the file or the line is absent.
pub async fn read_partition(path: &Path, topic_id: &str, partition_id: u32) -> Result<Offsets> {
    let key = partition_key(topic_id, partition_id);
    let lines = read_lines(path).await?;

    for line in &lines {
        if let Some((found_key, rest)) = line.split_once('|') {
            if found_key == key {
                let fields: Vec<&str> = rest.split('|').collect();
                let [log_end_offset, read_offset] = fields.as_slice() else {
                    return Err(Error::BufferBuildFailed(format!(
                        "malformed partition metadata line: {line:?}"
                    )));
                };

                let log_end_offset = log_end_offset.parse().map_err(|_| {
                    Error::BufferBuildFailed(format!("bad logEndOffset in {line:?}"))
                })?;
                let read_offset = read_offset
                    .parse()
                    .map_err(|_| Error::BufferBuildFailed(format!("bad readOffset in {line:?}")))?;

                return Offsets {
                    log_end_offset,
                    read_offset,
                }
                .validate();
            }
        } else {
            return Err(Error::BufferBuildFailed(format!(
                "malformed partition metadata line: {line:?}"
            )));
        }
    }

    let defaults = Offsets::default();
    write_partition(path, topic_id, partition_id, defaults).await?;
    Ok(defaults)
}

/// Rewrite only this partition's line in the shared metadata file, or
/// append it if absent.
pub async fn write_partition(
    path: &Path,
    topic_id: &str,
    partition_id: u32,
    offsets: Offsets,
) -> Result<()> {
    let key = partition_key(topic_id, partition_id);
    let mut lines = read_lines(path).await?;

    let new_line = format!("{key}|{}|{}", offsets.log_end_offset, offsets.read_offset);

    match lines.iter().position(|line| {
        line.split_once('|')
            .map(|(found_key, _)| found_key == key)
            .unwrap_or(false)
    }) {
        Some(index) => lines[index] = new_line,
        None => lines.push(new_line),
    }

    let mut contents = lines.join("\n");
    contents.push('\n');

    fs::write(path, contents)
        .await
        .map_err(|error| Error::BufferBuildFailed(error.to_string()))
}

async fn read_lines(path: &Path) -> Result<Vec<String>> {
    match fs::read_to_string(path).await {
        Ok(contents) => Ok(contents
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(error) => Err(Error::BufferBuildFailed(error.to_string())),
    }
}

/// Resolve the shared partition metadata file path for a topic.
pub fn partition_metadata_path(topic_dir: &Path, topic_id: &str) -> PathBuf {
    topic_dir.join(format!("{topic_id}_partition_metadata.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[tokio::test]
    async fn ingress_seeds_default_when_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ingress_metadata.log");

        let offsets = read_ingress(&path).await.unwrap();
        assert_eq!(offsets, Offsets::default());
        assert!(fs::try_exists(&path).await.unwrap());
    }

    #[tokio::test]
    async fn ingress_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ingress_metadata.log");

        write_ingress(
            &path,
            Offsets {
                log_end_offset: 5,
                read_offset: 2,
            },
        )
        .await
        .unwrap();

        let offsets = read_ingress(&path).await.unwrap();
        assert_eq!(
            offsets,
            Offsets {
                log_end_offset: 5,
                read_offset: 2
            }
        );
    }

    #[tokio::test]
    async fn ingress_rejects_bad_token() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ingress_metadata.log");
        fs::write(&path, "bogus|1|1\n").await.unwrap();

        assert_matches!(read_ingress(&path).await, Err(Error::BufferBuildFailed(_)));
    }

    #[tokio::test]
    async fn ingress_rejects_log_end_before_read_offset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ingress_metadata.log");
        fs::write(&path, "ingress|1|5\n").await.unwrap();

        assert_matches!(read_ingress(&path).await, Err(Error::BufferBuildFailed(_)));
    }

    #[tokio::test]
    async fn partition_seeds_default_line_when_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t_partition_metadata.log");

        let offsets = read_partition(&path, "t", 0).await.unwrap();
        assert_eq!(offsets, Offsets::default());

        let contents = fs::read_to_string(&path).await.unwrap();
        assert!(contents.contains("t_partition_0|0|0"));
    }

    #[tokio::test]
    async fn partition_update_targets_only_matching_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t_partition_metadata.log");

        write_partition(&path, "t", 0, Offsets::default()).await.unwrap();
        write_partition(&path, "t", 1, Offsets::default()).await.unwrap();

        write_partition(
            &path,
            "t",
            1,
            Offsets {
                log_end_offset: 9,
                read_offset: 3,
            },
        )
        .await
        .unwrap();

        let p0 = read_partition(&path, "t", 0).await.unwrap();
        let p1 = read_partition(&path, "t", 1).await.unwrap();

        assert_eq!(p0, Offsets::default());
        assert_eq!(
            p1,
            Offsets {
                log_end_offset: 9,
                read_offset: 3
            }
        );
    }
}
