// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Reference sink writing canonical JSON lines to standard output.

use async_trait::async_trait;
use logcore_domain::{Envelope, Sink, WriteOutcome};
use std::io::Write;
use tokio::sync::Mutex as AsyncMutex;

pub struct StdoutSink {
    name: String,
    lock: AsyncMutex<()>,
}

impl StdoutSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lock: AsyncMutex::new(()),
        }
    }
}

#[async_trait]
impl Sink for StdoutSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, envelope: &Envelope) -> WriteOutcome {
        let _guard = self.lock.lock().await;
        let json = envelope.to_canonical_json();
        let mut stdout = std::io::stdout();
        match writeln!(stdout, "{json}") {
            Ok(()) => WriteOutcome::Ok,
            Err(e) => WriteOutcome::Transient(e.to_string()),
        }
    }
}
