// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Per-Sink Circuit Breaker
//!
//! Each sink gets its own three-state breaker (spec §4.6): `Closed` (normal
//! operation), `Open` (writes short-circuited without calling the sink),
//! `HalfOpen` (a single probe write is allowed through to test recovery).
//! This module defines the pure state machine; `logcore` owns the timer and
//! atomics needed to drive it from async code.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Tunables for one sink's breaker.
#[derive(Debug, Clone, Copy)]
pub struct CircuitConfig {
    /// Consecutive failures (transient or permanent) before tripping open.
    pub failure_threshold: u32,
    /// How long the breaker stays open before allowing a half-open probe.
    pub open_duration: Duration,
    /// Consecutive probe successes required in `HalfOpen` before closing.
    pub half_open_success_threshold: u32,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(30),
            half_open_success_threshold: 1,
        }
    }
}

/// Pure decision function: given the current state, counters, and elapsed
/// time since the breaker tripped, what should the next state be?
///
/// `elapsed_since_open` is only consulted when `state` is `Open`.
pub fn next_state_on_result(
    state: CircuitState,
    config: &CircuitConfig,
    consecutive_failures: u32,
    consecutive_successes: u32,
    elapsed_since_open: Option<Duration>,
) -> CircuitState {
    match state {
        CircuitState::Closed => {
            if consecutive_failures >= config.failure_threshold {
                CircuitState::Open
            } else {
                CircuitState::Closed
            }
        }
        CircuitState::Open => match elapsed_since_open {
            Some(elapsed) if elapsed >= config.open_duration => CircuitState::HalfOpen,
            _ => CircuitState::Open,
        },
        CircuitState::HalfOpen => {
            if consecutive_failures > 0 {
                CircuitState::Open
            } else if consecutive_successes >= config.half_open_success_threshold {
                CircuitState::Closed
            } else {
                CircuitState::HalfOpen
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_trips_open_after_threshold() {
        let cfg = CircuitConfig {
            failure_threshold: 3,
            ..Default::default()
        };
        let next = next_state_on_result(CircuitState::Closed, &cfg, 3, 0, None);
        assert_eq!(next, CircuitState::Open);
    }

    #[test]
    fn open_stays_open_before_timeout() {
        let cfg = CircuitConfig::default();
        let next = next_state_on_result(CircuitState::Open, &cfg, 0, 0, Some(Duration::from_secs(1)));
        assert_eq!(next, CircuitState::Open);
    }

    #[test]
    fn open_moves_to_half_open_after_timeout() {
        let cfg = CircuitConfig {
            open_duration: Duration::from_secs(10),
            ..Default::default()
        };
        let next = next_state_on_result(CircuitState::Open, &cfg, 0, 0, Some(Duration::from_secs(11)));
        assert_eq!(next, CircuitState::HalfOpen);
    }

    #[test]
    fn half_open_failure_reopens() {
        let cfg = CircuitConfig::default();
        let next = next_state_on_result(CircuitState::HalfOpen, &cfg, 1, 0, None);
        assert_eq!(next, CircuitState::Open);
    }

    #[test]
    fn half_open_success_closes() {
        let cfg = CircuitConfig {
            half_open_success_threshold: 1,
            ..Default::default()
        };
        let next = next_state_on_result(CircuitState::HalfOpen, &cfg, 0, 1, None);
        assert_eq!(next, CircuitState::Closed);
    }
}
