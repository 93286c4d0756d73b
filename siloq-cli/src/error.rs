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

use std::{fmt, io, path::PathBuf, result, sync::Arc};

use thiserror::Error;

/// Bootstrap-time errors. All fatal: the process exits on any of these.
#[derive(Error, Debug, Clone)]
pub enum Error {
    Io(Arc<io::Error>),
    Broker(#[from] siloq_broker::Error),
    Json(Arc<serde_json::Error>),
    MissingConfigFile(PathBuf),
    NoTopicsConfigured,
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
            Self::Io(error) => write!(f, "{error}"),
            Self::Broker(error) => write!(f, "{error}"),
            Self::Json(error) => write!(f, "{error}"),
            Self::MissingConfigFile(path) => {
                write!(f, "config file not found: {}", path.display())
            }
            Self::NoTopicsConfigured => write!(f, "no topics configured"),
        }
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;
