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

use std::{fmt, io, result, sync::Arc};

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Error {
    Io(Arc<io::Error>),
    Json(Arc<serde_json::Error>),
    /// A WAL line did not split into the expected number of `|`-delimited
    /// fields. Notably this is how an unescaped `|` in a message's content
    /// field (see the log record format docs) surfaces on replay.
    Malformed { line: String, expected_fields: usize },
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(Arc::new(value))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(error) => write!(f, "io error: {error}"),
            Self::Json(error) => write!(f, "json error: {error}"),
            Self::Malformed {
                line,
                expected_fields,
            } => write!(
                f,
                "malformed record, expected {expected_fields} fields: {line:?}"
            ),
        }
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;
