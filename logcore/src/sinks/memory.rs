// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! In-memory sink used as a test double for fanout and circuit-breaker
//! behavior, analogous to the bootstrap crate's `CapturingLogger`.

use async_trait::async_trait;
use logcore_domain::{Envelope, Sink, WriteOutcome};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Captures every envelope offered to it. `fail_next` / `fail_always` let
/// tests script transient and permanent failures without a real I/O
/// dependency.
pub struct CapturingSink {
    name: String,
    captured: Mutex<Vec<Envelope>>,
    fail_always: AtomicBool,
    fail_next_n: Mutex<usize>,
    healthy: AtomicBool,
}

impl CapturingSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            captured: Mutex::new(Vec::new()),
            fail_always: AtomicBool::new(false),
            fail_next_n: Mutex::new(0),
            healthy: AtomicBool::new(true),
        }
    }

    pub fn set_fail_always(&self, fail: bool) {
        self.fail_always.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next(&self, n: usize) {
        *self.fail_next_n.lock() = n;
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn captured(&self) -> Vec<Envelope> {
        self.captured.lock().clone()
    }

    pub fn captured_count(&self) -> usize {
        self.captured.lock().len()
    }
}

#[async_trait]
impl Sink for CapturingSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, envelope: &Envelope) -> WriteOutcome {
        if self.fail_always.load(Ordering::SeqCst) {
            return WriteOutcome::Transient("capturing sink scripted failure".to_string());
        }
        {
            let mut remaining = self.fail_next_n.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return WriteOutcome::Transient("capturing sink scripted failure".to_string());
            }
        }
        self.captured.lock().push(envelope.clone());
        WriteOutcome::Ok
    }

    async fn health_check(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logcore_domain::Level;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn captures_successful_writes() {
        let sink = CapturingSink::new("mem");
        let env = Envelope::new(1, Level::Info, "app", "hi", BTreeMap::new());
        let outcome = sink.write(&env).await;
        assert!(outcome.is_ok());
        assert_eq!(sink.captured_count(), 1);
    }

    #[tokio::test]
    async fn scripted_failures_do_not_capture() {
        let sink = CapturingSink::new("mem");
        sink.fail_next(2);
        let env = Envelope::new(1, Level::Info, "app", "hi", BTreeMap::new());
        assert!(!sink.write(&env).await.is_ok());
        assert!(!sink.write(&env).await.is_ok());
        assert!(sink.write(&env).await.is_ok());
        assert_eq!(sink.captured_count(), 1);
    }
}
