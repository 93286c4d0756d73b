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

//! The durability layer: the ingress buffer every producer write lands
//! in first, and the per-topic partitions a consumer reads from.

pub mod error;
pub mod ingress;
pub mod metadata;
pub mod partition;
pub mod topic;

pub use error::{Error, Result};
pub use ingress::IngressBuffer;
pub use metadata::Offsets;
pub use partition::{Committed, Extracted, Partition};
pub use topic::Topic;
