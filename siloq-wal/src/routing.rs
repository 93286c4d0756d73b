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

//! Deterministic `messageId -> partition index` routing.
//!
//! Stable across restarts and implementations: the hash is SHA-256 over the
//! raw `messageId` bytes, the first 8 hex characters (4 bytes) are read as a
//! big-endian `u32`, and the partition is that value modulo the topic's
//! partition count. Changing any part of this breaks on-disk compatibility
//! with WALs already partitioned under the old scheme.

use sha2::{Digest, Sha256};

/// Compute the partition index for `message_id` within a topic of
/// `partition_count` partitions.
///
/// # Panics
///
/// Panics if `partition_count` is zero; a topic always has at least one
/// partition (see the `Topic` invariants).
pub fn partition_for(message_id: &str, partition_count: u32) -> u32 {
    assert!(partition_count > 0, "partition_count must be >= 1");

    let digest = Sha256::digest(message_id.as_bytes());
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);

    prefix % partition_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        let a = partition_for("msg-1", 4);
        let b = partition_for("msg-1", 4);
        assert_eq!(a, b);
    }

    #[test]
    fn always_in_range() {
        for i in 0..1000 {
            let id = format!("msg-{i}");
            let p = partition_for(&id, 7);
            assert!(p < 7);
        }
    }

    #[test]
    fn matches_known_sha256_prefix() {
        // sha256("msg-0") = ca226b1595403371d332cbe167aba17c0b16c83e6e6989a97e18985ab5a80a2c
        // first 8 hex chars: ca226b15 -> 0xca226b15
        let expected = 0xca226b15u32 % 4;
        assert_eq!(partition_for("msg-0", 4), expected);
    }

    #[test]
    #[should_panic(expected = "partition_count must be >= 1")]
    fn zero_partitions_panics() {
        let _ = partition_for("msg", 0);
    }
}
