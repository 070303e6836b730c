// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Reference sink writing canonical JSON lines to standard error. Distinct
//! from `crate::fallback::FallbackWriter`, which is the last-resort
//! emergency channel used when every configured sink fails or is open; this
//! is an ordinary, configurable sink that happens to target stderr.

use async_trait::async_trait;
use logcore_domain::{Envelope, Sink, WriteOutcome};
use std::io::Write;
use tokio::sync::Mutex as AsyncMutex;

pub struct StderrSink {
    name: String,
    lock: AsyncMutex<()>,
}

impl StderrSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lock: AsyncMutex::new(()),
        }
    }
}

#[async_trait]
impl Sink for StderrSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, envelope: &Envelope) -> WriteOutcome {
        let _guard = self.lock.lock().await;
        let json = envelope.to_canonical_json();
        let mut stderr = std::io::stderr();
        match writeln!(stderr, "{json}") {
            Ok(()) => WriteOutcome::Ok,
            Err(e) => WriteOutcome::Transient(e.to_string()),
        }
    }
}
