// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Error Deduplication
//!
//! A small bounded map of `hash(level, message) -> last-emission-timestamp`
//! used to suppress repeated ERROR/CRITICAL emissions within a configured
//! window (spec §4.1). Capacity-bounded with LRU eviction so that a
//! misbehaving caller emitting many distinct messages cannot grow this map
//! without limit.

use crate::level::Level;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};

/// Hashes `(level, message)` into a fixed-size key. Collisions between
/// distinct messages are astronomically unlikely and, if they occurred,
/// would only cause an extra suppression — an acceptable failure mode for a
/// best-effort dedupe window.
pub fn dedupe_key(level: Level, message: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update([level as u8]);
    hasher.update(message.as_bytes());
    let digest = hasher.finalize();
    u64::from_le_bytes(digest[0..8].try_into().unwrap())
}

/// Bounded LRU map recording the last emission time per dedupe key.
pub struct DedupeMap {
    capacity: usize,
    entries: HashMap<u64, DateTime<Utc>>,
    /// Recency order, most-recently-touched at the back. May contain stale
    /// entries for keys already evicted from `entries`; these are skipped
    /// lazily on eviction.
    order: VecDeque<u64>,
}

impl DedupeMap {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Returns `true` if `key` was last seen within `window` of `now` (i.e.
    /// the caller should suppress this emission), and records `now` as the
    /// key's new last-seen time either way.
    pub fn check_and_record(&mut self, key: u64, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        let suppress = match self.entries.get(&key) {
            Some(last) if window > chrono::Duration::zero() => now.signed_duration_since(*last) < window,
            _ => false,
        };

        if !self.entries.contains_key(&key) {
            self.evict_if_full();
        }
        self.entries.insert(key, now);
        self.order.push_back(key);

        suppress
    }

    fn evict_if_full(&mut self) {
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn suppresses_repeat_within_window() {
        let mut map = DedupeMap::new(16);
        let key = dedupe_key(Level::Error, "db timeout");
        let t0 = Utc::now();

        assert!(!map.check_and_record(key, t0, Duration::seconds(5)));
        assert!(map.check_and_record(key, t0 + Duration::seconds(1), Duration::seconds(5)));
    }

    #[test]
    fn allows_repeat_after_window_elapses() {
        let mut map = DedupeMap::new(16);
        let key = dedupe_key(Level::Error, "db timeout");
        let t0 = Utc::now();

        assert!(!map.check_and_record(key, t0, Duration::seconds(5)));
        assert!(!map.check_and_record(key, t0 + Duration::seconds(6), Duration::seconds(5)));
    }

    #[test]
    fn zero_window_disables_dedupe() {
        let mut map = DedupeMap::new(16);
        let key = dedupe_key(Level::Error, "db timeout");
        let t0 = Utc::now();

        assert!(!map.check_and_record(key, t0, Duration::zero()));
        assert!(!map.check_and_record(key, t0, Duration::zero()));
    }

    #[test]
    fn capacity_bound_evicts_oldest() {
        let mut map = DedupeMap::new(2);
        let t0 = Utc::now();
        let k1 = dedupe_key(Level::Error, "one");
        let k2 = dedupe_key(Level::Error, "two");
        let k3 = dedupe_key(Level::Error, "three");

        map.check_and_record(k1, t0, Duration::seconds(5));
        map.check_and_record(k2, t0, Duration::seconds(5));
        map.check_and_record(k3, t0, Duration::seconds(5));

        assert!(map.len() <= 2);
    }
}
