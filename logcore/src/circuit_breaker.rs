// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Per-Sink Circuit Breaker (runtime implementation)
//!
//! Drives `logcore_domain::circuit`'s pure state machine with a real clock
//! and `parking_lot::Mutex`-protected counters, one instance per configured
//! sink (spec §4.4).

use logcore_domain::{CircuitConfig, CircuitState};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

struct Counters {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
}

pub struct CircuitBreaker {
    name: String,
    config: CircuitConfig,
    counters: Mutex<Counters>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitConfig) -> Self {
        Self {
            name: name.into(),
            config,
            counters: Mutex::new(Counters {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.counters.lock().state
    }

    /// Whether a write should be attempted right now. A `HalfOpen` breaker
    /// permits exactly one probe in flight at a time; this call consumes
    /// that slot if granted.
    pub fn allow_request(&self) -> bool {
        let mut counters = self.counters.lock();
        self.refresh_open_to_half_open(&mut counters);
        matches!(counters.state, CircuitState::Closed | CircuitState::HalfOpen)
    }

    fn refresh_open_to_half_open(&self, counters: &mut Counters) {
        if counters.state == CircuitState::Open {
            let elapsed = counters.opened_at.map(|t| t.elapsed());
            let next = logcore_domain::circuit::next_state_on_result(counters.state, &self.config, 0, 0, elapsed);
            if next == CircuitState::HalfOpen {
                counters.state = CircuitState::HalfOpen;
            }
        }
    }

    pub fn record_success(&self) {
        let mut counters = self.counters.lock();
        counters.consecutive_failures = 0;
        counters.consecutive_successes += 1;
        let next = logcore_domain::circuit::next_state_on_result(
            counters.state,
            &self.config,
            counters.consecutive_failures,
            counters.consecutive_successes,
            counters.opened_at.map(|t| t.elapsed()),
        );
        self.transition(&mut counters, next);
    }

    pub fn record_failure(&self) {
        let mut counters = self.counters.lock();
        counters.consecutive_successes = 0;
        counters.consecutive_failures += 1;
        let next = logcore_domain::circuit::next_state_on_result(
            counters.state,
            &self.config,
            counters.consecutive_failures,
            counters.consecutive_successes,
            counters.opened_at.map(|t| t.elapsed()),
        );
        self.transition(&mut counters, next);
    }

    fn transition(&self, counters: &mut Counters, next: CircuitState) {
        if next != counters.state {
            if next == CircuitState::Open {
                counters.opened_at = Some(Instant::now());
                tracing::warn!(sink = %self.name, "circuit breaker opened");
            } else if next == CircuitState::Closed {
                counters.opened_at = None;
                tracing::info!(sink = %self.name, "circuit breaker closed");
            } else if next == CircuitState::HalfOpen {
                tracing::debug!(sink = %self.name, "circuit breaker half-open, probing");
            }
            counters.state = next;
        }
    }

    pub fn open_duration(&self) -> Duration {
        self.config.open_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let cb = CircuitBreaker::new(
            "sink_a",
            CircuitConfig {
                failure_threshold: 3,
                ..Default::default()
            },
        );
        cb.record_failure();
        cb.record_failure();
        assert!(cb.allow_request());
        cb.record_failure();
        assert!(!cb.allow_request());
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_after_timeout_then_closes_on_success() {
        let cb = CircuitBreaker::new(
            "sink_a",
            CircuitConfig {
                failure_threshold: 1,
                open_duration: Duration::from_millis(1),
                half_open_success_threshold: 1,
            },
        );
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cb.allow_request());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
