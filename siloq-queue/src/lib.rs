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

//! A generic single-producer/single-consumer in-memory FIFO.
//!
//! Used by the ingress buffer and by each partition to hold the in-memory
//! slice of messages that have been durably appended but not yet drained
//! (ingress) or committed (partition).

use std::collections::VecDeque;

/// A bounded-in-practice FIFO queue over opaque items.
///
/// `Fifo` never rejects a push on its own; callers enforce capacity by
/// checking [`Fifo::len`] against their own configured maximum before
/// calling [`Fifo::enqueue`] (see `BufferFull` in the ingress buffer and
/// partition contracts).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Fifo<T> {
    items: VecDeque<T>,
}

impl<T> Fifo<T> {
    /// An empty queue.
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Append an item to the back of the queue.
    pub fn enqueue(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Remove and return the item at the front of the queue, if any.
    pub fn dequeue(&mut self) -> Option<T> {
        let item = self.items.pop_front();

        if self.items.is_empty() {
            self.items.shrink_to_fit();
        }

        item
    }

    /// Return a reference to the item at the front of the queue without
    /// removing it.
    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    /// Return the number of items currently queued.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` if the queue holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop every queued item and release any excess capacity.
    pub fn clear(&mut self) {
        self.items.clear();
        self.items.shrink_to_fit();
    }

    /// Remove and return up to `n` items from the front, in FIFO order.
    ///
    /// Returns fewer than `n` items (possibly zero) if the queue is
    /// shorter than `n`.
    pub fn dequeue_batch(&mut self, n: usize) -> Vec<T> {
        let n = n.min(self.items.len());
        let batch = self.items.drain(..n).collect();

        if self.items.is_empty() {
            self.items.shrink_to_fit();
        }

        batch
    }
}

impl<T> Fifo<T>
where
    T: Clone,
{
    /// Return up to `n` items from the front **without** removing them,
    /// preserving order.
    ///
    /// Idempotent with respect to queue state: calling this any number of
    /// times in a row with the same `n` returns the same items.
    pub fn peek_batch(&self, n: usize) -> Vec<T> {
        self.items.iter().take(n).cloned().collect()
    }
}

impl<T> FromIterator<T> for Fifo<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
