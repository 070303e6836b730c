// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bounded Ring Queue
//!
//! The admission point between the emission facade and the pipeline worker
//! (spec §4.2). Backed by a `VecDeque` behind a `parking_lot::Mutex` rather
//! than a channel: admission needs to inspect and selectively evict items by
//! priority, which a standard mpsc channel cannot do.
//!
//! Admission never awaits sink I/O and never blocks the calling task for
//! more than the time it takes to acquire the lock and push/evict — the
//! "wait-for-space" mode named in spec §4.3 is accepted in configuration but
//! not honored, exactly as the worker's drop policy states.

use logcore_domain::{DropReason, Envelope, Level, ProtectedLevels};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Outcome of an admission attempt, used by the facade to update drop
/// accounting without the queue itself owning a metrics dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    Admitted,
    Dropped(DropReason),
}

struct Inner {
    items: VecDeque<Envelope>,
    high_watermark: usize,
}

/// A bounded queue that prioritizes protected severities (spec §4.3): when
/// full, an incoming protected-level envelope evicts the oldest
/// non-protected item rather than being dropped outright.
pub struct BoundedRingQueue {
    capacity: usize,
    protected: ProtectedLevels,
    inner: Mutex<Inner>,
    len: AtomicUsize,
    notify: Notify,
}

impl BoundedRingQueue {
    pub fn new(capacity: usize, protected: ProtectedLevels) -> Self {
        Self {
            capacity: capacity.max(1),
            protected,
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity.min(4096)),
                high_watermark: 0,
            }),
            len: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    /// Attempts to admit `envelope`. Never awaits; safe to call from a
    /// caller's own executor.
    pub fn try_admit(&self, envelope: Envelope) -> AdmitOutcome {
        let mut inner = self.inner.lock();

        if inner.items.len() < self.capacity {
            inner.items.push_back(envelope);
            self.record_len(&mut inner);
            drop(inner);
            self.notify.notify_one();
            return AdmitOutcome::Admitted;
        }

        if self.protected.contains(envelope.level) {
            if let Some(victim_idx) = inner.items.iter().position(|e| !self.protected.contains(e.level)) {
                inner.items.remove(victim_idx);
                inner.items.push_back(envelope);
                self.record_len(&mut inner);
                drop(inner);
                self.notify.notify_one();
                return AdmitOutcome::Admitted;
            }
            // Every resident item is itself protected: terminal case, spec §4.3.
            return AdmitOutcome::Dropped(DropReason::QueueFull);
        }

        AdmitOutcome::Dropped(DropReason::QueueFull)
    }

    /// Updates the cached length and bumps `high_watermark` whenever
    /// admission pushes the queue past its previous historical peak.
    fn record_len(&self, inner: &mut Inner) {
        let len = inner.items.len();
        if len > inner.high_watermark {
            inner.high_watermark = len;
        }
        self.len.store(len, Ordering::Relaxed);
    }

    /// Drains up to `max` items, waiting up to `timeout` for the first item
    /// if the queue is currently empty. Used by the worker's batch loop.
    pub async fn drain_batch(&self, max: usize, timeout: std::time::Duration) -> Vec<Envelope> {
        {
            let inner = self.inner.lock();
            if !inner.items.is_empty() {
                drop(inner);
                return self.drain_locked(max);
            }
        }

        let wait = self.notify.notified();
        tokio::select! {
            _ = wait => {}
            _ = tokio::time::sleep(timeout) => {}
        }
        self.drain_locked(max)
    }

    fn drain_locked(&self, max: usize) -> Vec<Envelope> {
        let mut inner = self.inner.lock();
        let take = max.min(inner.items.len());
        let batch: Vec<Envelope> = inner.items.drain(..take).collect();
        self.len.store(inner.items.len(), Ordering::Relaxed);
        batch
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn high_watermark(&self) -> usize {
        self.inner.lock().high_watermark
    }

    /// Drains everything remaining, used by `stop_and_drain` (spec §4.9).
    pub fn drain_all(&self) -> Vec<Envelope> {
        let mut inner = self.inner.lock();
        let batch: Vec<Envelope> = inner.items.drain(..).collect();
        self.len.store(0, Ordering::Relaxed);
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env(level: Level, msg: &str) -> Envelope {
        Envelope::new(0, level, "test", msg, BTreeMap::new())
    }

    #[test]
    fn admits_until_capacity() {
        let q = BoundedRingQueue::new(2, ProtectedLevels::default_protected());
        assert_eq!(q.try_admit(env(Level::Info, "a")), AdmitOutcome::Admitted);
        assert_eq!(q.try_admit(env(Level::Info, "b")), AdmitOutcome::Admitted);
        assert_eq!(q.try_admit(env(Level::Info, "c")), AdmitOutcome::Dropped(DropReason::QueueFull));
    }

    #[test]
    fn protected_level_evicts_oldest_non_protected() {
        let q = BoundedRingQueue::new(1, ProtectedLevels::default_protected());
        q.try_admit(env(Level::Info, "info"));
        let outcome = q.try_admit(env(Level::Error, "boom"));
        assert_eq!(outcome, AdmitOutcome::Admitted);
        let batch = q.drain_locked(10);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].message, "boom");
    }

    #[test]
    fn protected_over_protected_is_dropped() {
        let q = BoundedRingQueue::new(1, ProtectedLevels::default_protected());
        q.try_admit(env(Level::Error, "first"));
        let outcome = q.try_admit(env(Level::Critical, "second"));
        assert_eq!(outcome, AdmitOutcome::Dropped(DropReason::QueueFull));
    }

    #[tokio::test]
    async fn drain_batch_returns_immediately_when_nonempty() {
        let q = BoundedRingQueue::new(10, ProtectedLevels::default_protected());
        q.try_admit(env(Level::Info, "a"));
        let batch = q.drain_batch(10, std::time::Duration::from_secs(5)).await;
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn drain_batch_times_out_when_empty() {
        let q = BoundedRingQueue::new(10, ProtectedLevels::default_protected());
        let batch = q.drain_batch(10, std::time::Duration::from_millis(20)).await;
        assert!(batch.is_empty());
    }

    #[test]
    fn high_watermark_survives_drain() {
        let q = BoundedRingQueue::new(10, ProtectedLevels::default_protected());
        for i in 0..5 {
            q.try_admit(env(Level::Info, &format!("msg-{i}")));
        }
        assert_eq!(q.high_watermark(), 5);
        q.drain_locked(10);
        assert_eq!(q.len(), 0);
        assert_eq!(q.high_watermark(), 5);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn level_strategy() -> impl Strategy<Value = Level> {
        prop_oneof![
            Just(Level::Trace),
            Just(Level::Debug),
            Just(Level::Info),
            Just(Level::Warn),
            Just(Level::Error),
            Just(Level::Critical),
        ]
    }

    proptest! {
        #[test]
        fn queue_never_exceeds_capacity(capacity in 1usize..20, levels in prop::collection::vec(level_strategy(), 0..100)) {
            let q = BoundedRingQueue::new(capacity, ProtectedLevels::default_protected());
            for (i, level) in levels.into_iter().enumerate() {
                q.try_admit(Envelope::new(i as u64, level, "app", "msg", std::collections::BTreeMap::new()));
                prop_assert!(q.len() <= capacity);
            }
        }
    }
}
