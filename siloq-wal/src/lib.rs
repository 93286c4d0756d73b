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

//! The record format and append-only log file handler shared by the
//! ingress buffer and every partition.

pub mod error;
pub mod log;
pub mod message;
pub mod routing;

pub use error::{Error, Result};
pub use log::{IngressRecord, Kind, LogHandle, PartitionRecord};
pub use message::Message;
