// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-slot TTL cache.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct Entry<T> {
    value: T,
    captured: Instant,
}

/// Holds at most one value, valid for `ttl` after it was stored.
///
/// Validity and value are read under the same lock, so a reader never sees
/// a value that expired between the check and the read.
pub struct TtlCache<T> {
    slot: Mutex<Option<Entry<T>>>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { slot: Mutex::new(None), ttl }
    }

    /// The stored value if it is younger than the TTL.
    pub fn get(&self) -> Option<T> {
        let slot = self.slot.lock();
        match slot.as_ref() {
            Some(entry) if entry.captured.elapsed() < self.ttl => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Replace the slot and restart the TTL.
    pub fn set(&self, value: T) {
        *self.slot.lock() = Some(Entry { value, captured: Instant::now() });
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    /// Time since the last `set`, `None` when empty.
    pub fn age(&self) -> Option<Duration> {
        self.slot.lock().as_ref().map(|e| e.captured.elapsed())
    }

    pub fn is_valid(&self) -> bool {
        self.age().is_some_and(|age| age < self.ttl)
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
