// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A single-key token bucket, shared by the rate-limit filter
//! (`crate::stages::filters::RateLimitFilter`) and the internal diagnostics
//! rate limiter (`crate::diagnostics`) so the two refill/consume algorithms
//! cannot drift apart.

use parking_lot::Mutex;
use std::time::Instant;

struct State {
    tokens: f64,
    last_refill: Instant,
}

pub struct TokenBucket {
    rate_per_sec: f64,
    burst: f64,
    state: Mutex<State>,
}

impl TokenBucket {
    pub fn new(rate_per_sec: f64, burst: f64) -> Self {
        Self {
            rate_per_sec,
            burst,
            state: Mutex::new(State {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Attempts to take one token, refilling first. Returns `true` if a
    /// token was available.
    pub fn try_take(&self) -> bool {
        let mut state = self.state.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate_per_sec).min(self.burst);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_and_refills() {
        let bucket = TokenBucket::new(1000.0, 1.0);
        assert!(bucket.try_take());
        assert!(!bucket.try_take());
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(bucket.try_take());
    }
}
