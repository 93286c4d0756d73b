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

//! The broker layer: dispatch loop, TPC assignment map, core-facing
//! async API, and the HTTP translation over it.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod tpc;

pub use api::{Broker, ConsumeResult};
pub use config::{BrokerConfig, TopicConfig};
pub use error::{Error, Result};
pub use tpc::TpcMap;
