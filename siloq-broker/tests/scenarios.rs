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

//! End-to-end scenarios A-F against the core API, mirroring an HTTP
//! client's view of push / register / consume / commit.

use std::collections::HashMap;

use assert_matches::assert_matches;
use serde_json::Value;
use siloq_broker::{Broker, BrokerConfig, ConsumeResult, Error, TopicConfig};
use siloq_wal::{Message, routing};
use tempfile::tempdir;

fn config(data_root: std::path::PathBuf, topics: Vec<(&str, u32)>) -> BrokerConfig {
    BrokerConfig {
        broker_id: "broker-1".to_owned(),
        reboot: false,
        topics: topics
            .into_iter()
            .map(|(id, partitions)| TopicConfig {
                id: id.to_owned(),
                partitions,
            })
            .collect(),
        data_root,
        ingress_log_file: BrokerConfig::DEFAULT_INGRESS_LOG_FILE.to_owned(),
        ingress_metadata_file: BrokerConfig::DEFAULT_INGRESS_METADATA_FILE.to_owned(),
    }
}

async fn drain_into_topics(broker: &Broker) {
    while broker.drain_into_topics(1000).await.unwrap() > 0 {}
}

fn msg(topic: &str, id: &str) -> Message {
    Message::new(topic, id, Value::String(format!("content-{id}")))
}

#[tokio::test]
async fn scenario_a_single_partition_round_trip() {
    let dir = tempdir().unwrap();
    let broker = Broker::recover(config(dir.path().to_path_buf(), vec![("t", 1)]))
        .await
        .unwrap();

    broker.push(msg("t", "m1")).await.unwrap();
    broker.push(msg("t", "m2")).await.unwrap();
    drain_into_topics(&broker).await;

    let partition_id = broker.register_consumer("t", "c1").await.unwrap();

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
async fn scenario_b_routing_distributes_deterministically() {
    let dir = tempdir().unwrap();
    let broker = Broker::recover(config(dir.path().to_path_buf(), vec![("t", 4)]))
        .await
        .unwrap();

    let mut expected: HashMap<u32, Vec<String>> = HashMap::new();
    for i in 0..1000 {
        let id = format!("msg-{i}");
        let partition_id = routing::partition_for(&id, 4);
        expected.entry(partition_id).or_default().push(id.clone());
        broker.push(msg("t", &id)).await.unwrap();
    }
    drain_into_topics(&broker).await;

    let mut total = 0;
    for partition_id in 0..4u32 {
        let ids = expected.get(&partition_id).cloned().unwrap_or_default();
        if ids.is_empty() {
            continue;
        }

        let ConsumeResult::Batch(extracted) = broker.consume("t", partition_id, true).await.unwrap() else {
            panic!("expected a batch result");
        };

        let got: Vec<String> = extracted.messages.iter().map(|m| m.message_id.clone()).collect();
        assert_eq!(got, ids, "partition {partition_id} FIFO order mismatch");
        total += got.len();
    }

    assert_eq!(total, 1000);
}

#[tokio::test]
async fn scenario_c_uncommitted_batch_survives_restart() {
    let dir = tempdir().unwrap();
    let cfg = config(dir.path().to_path_buf(), vec![("t", 2)]);

    let before = {
        let broker = Broker::recover(cfg.clone()).await.unwrap();
        for i in 0..10 {
            broker.push(msg("t", &format!("m{i}"))).await.unwrap();
        }
        drain_into_topics(&broker).await;

        let mut all = Vec::new();
        for partition_id in 0..2 {
            if let ConsumeResult::Batch(extracted) = broker.consume("t", partition_id, true).await.unwrap() {
                all.push((partition_id, extracted.start_offset, extracted.messages.len()));
            }
        }
        all
    };

    let broker = Broker::recover(cfg).await.unwrap();
    let mut after = Vec::new();
    for partition_id in 0..2 {
        if let ConsumeResult::Batch(extracted) = broker.consume("t", partition_id, true).await.unwrap() {
            after.push((partition_id, extracted.start_offset, extracted.messages.len()));
        }
    }

    assert_eq!(before, after);
}

#[tokio::test]
async fn scenario_d_commit_is_idempotent() {
    let dir = tempdir().unwrap();
    let broker = Broker::recover(config(dir.path().to_path_buf(), vec![("t", 1)]))
        .await
        .unwrap();

    for i in 0..3 {
        broker.push(msg("t", &format!("m{i}"))).await.unwrap();
    }
    drain_into_topics(&broker).await;

    let ConsumeResult::Batch(extracted) = broker.consume("t", 0, true).await.unwrap() else {
        panic!("expected a batch result");
    };
    assert_eq!(extracted.end_offset, 3);

    let first = broker.commit("t", 0, 3).await.unwrap();
    let second = broker.commit("t", 0, 3).await.unwrap();
    assert_eq!(first.new_read_offset, 3);
    assert_eq!(second.new_read_offset, 3);
}

#[tokio::test]
async fn scenario_e_commit_past_log_end_is_invalid_offset() {
    let dir = tempdir().unwrap();
    let broker = Broker::recover(config(dir.path().to_path_buf(), vec![("t", 1)]))
        .await
        .unwrap();

    for i in 0..5 {
        broker.push(msg("t", &format!("m{i}"))).await.unwrap();
    }
    drain_into_topics(&broker).await;

    let ConsumeResult::Batch(extracted) = broker.consume("t", 0, true).await.unwrap() else {
        panic!("expected a batch result");
    };
    assert_eq!(extracted.end_offset, 5);

    assert_matches!(
        broker.commit("t", 0, 99).await,
        Err(Error::Storage(siloq_storage::Error::InvalidOffset {
            requested: 99,
            log_end_offset: 5
        }))
    );
}

#[tokio::test]
async fn scenario_f_registration_exhausts_partitions() {
    let dir = tempdir().unwrap();
    let broker = Broker::recover(config(dir.path().to_path_buf(), vec![("t", 2)]))
        .await
        .unwrap();

    let p0 = broker.register_consumer("t", "c1").await.unwrap();
    let p1 = broker.register_consumer("t", "c2").await.unwrap();
    assert_ne!(p0, p1);

    assert_matches!(
        broker.register_consumer("t", "c3").await,
        Err(Error::NoPartitionAvailable(_))
    );
}
