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

//! Request/response bodies for the four HTTP endpoints, matching the
//! wire shapes of the external interface table.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressRequest {
    pub broker_id: String,
    pub message: IngressMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressMessage {
    pub message_id: String,
    pub content: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressData {
    pub message_id: String,
    pub topic_id: String,
    pub timestamp: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub broker_id: String,
    pub consumer_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterData {
    pub topic_id: String,
    pub broker_id: String,
    pub consumer_id: String,
    pub partition_id: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub topic_id: String,
    pub message_id: String,
    pub content: Value,
}

impl From<siloq_wal::Message> for MessageDto {
    fn from(message: siloq_wal::Message) -> Self {
        Self {
            topic_id: message.topic_id,
            message_id: message.message_id,
            content: message.content,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeBatchData {
    pub messages: Vec<MessageDto>,
    pub count: usize,
    pub start_offset: u64,
    pub end_offset: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeSingleData {
    pub message: Option<MessageDto>,
    pub count: usize,
    pub offset: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub broker_id: String,
    pub topic_id: String,
    pub partition_id: u32,
    pub consumer_id: String,
    pub offset: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitData {
    pub committed: bool,
    pub offset: u64,
    pub topic_id: String,
    pub partition_id: u32,
    pub consumer_id: String,
    pub log_end_offset: u64,
    pub new_read_offset: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error_code: String,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
