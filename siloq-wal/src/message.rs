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

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single producer-accepted message.
///
/// `message_id` is producer-supplied and opaque to the broker beyond its
/// use as the routing hash key: the same `message_id` always routes to the
/// same partition of a topic (see [`crate::routing`]).
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Message {
    pub topic_id: String,
    pub message_id: String,
    pub content: Value,
}

impl Message {
    pub fn new(
        topic_id: impl Into<String>,
        message_id: impl Into<String>,
        content: impl Into<Value>,
    ) -> Self {
        Self {
            topic_id: topic_id.into(),
            message_id: message_id.into(),
            content: content.into(),
        }
    }

    /// The textual form of `content` as written to a log record: the raw
    /// string if `content` already is one, otherwise its JSON
    /// serialisation.
    pub fn content_field(&self) -> String {
        match &self.content {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_content_passes_through() {
        let message = Message::new("t", "m1", Value::String("hello".to_owned()));
        assert_eq!(message.content_field(), "hello");
    }

    #[test]
    fn object_content_is_serialised() {
        let message = Message::new("t", "m1", serde_json::json!({"a": 1}));
        assert_eq!(message.content_field(), r#"{"a":1}"#);
    }
}
