// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Internal Diagnostics
//!
//! The runtime's own operational logging — worker errors, circuit
//! transitions, stage exceptions, drops due to dedupe or a full queue — is
//! emitted via `tracing`, exactly as the donor instruments
//! `BasicStageExecutor::execute`. This is distinct from the
//! application-level envelopes the runtime is built to carry: the runtime
//! logs about itself with `tracing`, while carrying other applications'
//! structured logs as its payload (spec §9's "avoid redefinition of
//! internal logging using the same system being built").
//!
//! A shared [`TokenBucket`] per diagnostic component keeps a storm of
//! repeated failures (a sink down for an hour) from flooding `tracing`
//! output; spec §4.9 calls this "a monotonically de-duplicated rate
//! limiter" keyed by `component`.

use crate::token_bucket::TokenBucket;
use parking_lot::Mutex;
use std::collections::HashMap;

pub struct DiagnosticsRateLimiter {
    enabled: bool,
    rate_per_sec: f64,
    burst: f64,
    buckets: Mutex<HashMap<&'static str, TokenBucket>>,
}

impl DiagnosticsRateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            rate_per_sec: 1.0,
            burst: 5.0,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn allow(&self, component: &'static str) -> bool {
        if !self.enabled {
            return false;
        }
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(component)
            .or_insert_with(|| TokenBucket::new(self.rate_per_sec, self.burst));
        bucket.try_take()
    }

    pub fn warn(&self, component: &'static str, message: &str) {
        if self.allow(component) {
            tracing::warn!(component, "{message}");
        }
    }

    pub fn error(&self, component: &'static str, message: &str) {
        if self.allow(component) {
            tracing::error!(component, "{message}");
        }
    }
}

impl Default for DiagnosticsRateLimiter {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_limiter_never_allows() {
        let limiter = DiagnosticsRateLimiter::new(false);
        assert!(!limiter.allow("worker"));
    }

    #[test]
    fn enabled_limiter_rate_limits_per_component() {
        let limiter = DiagnosticsRateLimiter::new(true);
        let mut allowed = 0;
        for _ in 0..20 {
            if limiter.allow("worker") {
                allowed += 1;
            }
        }
        assert!(allowed < 20);
        assert!(allowed >= 1);
    }
}
