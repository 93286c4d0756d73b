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

//! The broker dispatch loop: drains the ingress buffer in batches and
//! routes each message to its topic. Never aborts on a per-message
//! failure — it logs and continues, per the propagation policy.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::api::Broker;

const DRAIN_BATCH_SIZE: usize = 100;
const LOOP_PACE: Duration = Duration::from_millis(100);

/// Run the dispatch loop until `shutdown` is cancelled. Intended to run
/// as its own `tokio::spawn`-ed task for the lifetime of the process.
pub async fn run(broker: Broker, shutdown: CancellationToken) {
    while !shutdown.is_cancelled() {
        match broker.drain_into_topics(DRAIN_BATCH_SIZE).await {
            Ok(0) => {
                tokio::time::sleep(LOOP_PACE).await;
                continue;
            }
            Ok(_) => {}
            Err(error) => warn!(%error, "ingress drain failed"),
        }

        tokio::time::sleep(LOOP_PACE).await;
    }
}
