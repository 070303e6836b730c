// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Built-in filters (spec §4.6.1): level threshold, logger name allow/deny,
//! token-bucket rate limiting with optional per-key partitioning, fixed-rate
//! probabilistic sampling, and adaptive sampling that tracks observed
//! throughput to hold a target emission rate.

use crate::token_bucket::TokenBucket;
use logcore_domain::{Envelope, FieldValue, Filter, FilterDecision, Level};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Instant;

/// Drops envelopes below a minimum level. Synthesized at the head of the
/// filter chain when a caller configures a global level but no explicit
/// filters (spec §4.6.1).
pub struct LevelThresholdFilter {
    min_level: Level,
}

impl LevelThresholdFilter {
    pub fn new(min_level: Level) -> Self {
        Self { min_level }
    }
}

impl Filter for LevelThresholdFilter {
    fn name(&self) -> &str {
        "level_threshold"
    }

    fn decide(&self, envelope: Envelope) -> (FilterDecision, Envelope) {
        let decision = if envelope.level >= self.min_level { FilterDecision::Keep } else { FilterDecision::Drop };
        (decision, envelope)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListMode {
    Allow,
    Deny,
}

/// Keeps or drops envelopes based on an exact logger-name list.
pub struct LoggerNameFilter {
    mode: ListMode,
    names: Vec<String>,
}

impl LoggerNameFilter {
    pub fn allow(names: Vec<String>) -> Self {
        Self {
            mode: ListMode::Allow,
            names,
        }
    }

    pub fn deny(names: Vec<String>) -> Self {
        Self {
            mode: ListMode::Deny,
            names,
        }
    }
}

impl Filter for LoggerNameFilter {
    fn name(&self) -> &str {
        "logger_name_filter"
    }

    fn decide(&self, envelope: Envelope) -> (FilterDecision, Envelope) {
        let present = self.names.iter().any(|n| n == &envelope.logger);
        let keep = match self.mode {
            ListMode::Allow => present,
            ListMode::Deny => !present,
        };
        let decision = if keep { FilterDecision::Keep } else { FilterDecision::Drop };
        (decision, envelope)
    }
}

/// Token-bucket rate limiter, optionally partitioned by a key extracted
/// from the envelope (per-logger, per-field). Built on the same
/// [`TokenBucket`] the internal diagnostics rate limiter uses
/// (see `crate::diagnostics`).
pub struct RateLimitFilter {
    rate_per_sec: f64,
    burst: f64,
    key_fn: Option<Box<dyn Fn(&Envelope) -> String + Send + Sync>>,
    buckets: Mutex<HashMap<String, TokenBucket>>,
    max_buckets: usize,
}

impl RateLimitFilter {
    pub fn new(rate_per_sec: f64, burst: f64) -> Self {
        Self {
            rate_per_sec,
            burst,
            key_fn: None,
            buckets: Mutex::new(HashMap::new()),
            max_buckets: 10_000,
        }
    }

    pub fn keyed_by(mut self, max_buckets: usize, key_fn: impl Fn(&Envelope) -> String + Send + Sync + 'static) -> Self {
        self.key_fn = Some(Box::new(key_fn));
        self.max_buckets = max_buckets;
        self
    }

    fn take_token(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock();

        if !buckets.contains_key(key) && buckets.len() >= self.max_buckets {
            // Bounded bucket count: refuse new keys once the cap is hit
            // rather than growing unboundedly under a high-cardinality key fn.
            return true;
        }

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.rate_per_sec, self.burst));
        bucket.try_take()
    }
}

impl Filter for RateLimitFilter {
    fn name(&self) -> &str {
        "rate_limit"
    }

    fn decide(&self, envelope: Envelope) -> (FilterDecision, Envelope) {
        let key = self.key_fn.as_ref().map(|f| f(&envelope)).unwrap_or_default();
        let decision = if self.take_token(&key) { FilterDecision::Keep } else { FilterDecision::Drop };
        (decision, envelope)
    }
}

/// Fixed-rate probabilistic sampling (spec §4.6.1): keeps each envelope
/// independently with probability `rate`, annotating `stage_metadata` with
/// the rate applied so a downstream enricher could surface it if desired.
/// `rate >= 1.0` keeps everything without consulting the RNG.
pub struct ProbabilisticSamplingFilter {
    rate: f64,
}

impl ProbabilisticSamplingFilter {
    pub fn new(rate: f64) -> Self {
        Self { rate: rate.clamp(0.0, 1.0) }
    }
}

impl Filter for ProbabilisticSamplingFilter {
    fn name(&self) -> &str {
        "probabilistic_sampling"
    }

    fn decide(&self, mut envelope: Envelope) -> (FilterDecision, Envelope) {
        envelope.stage_metadata.insert("sampling_rate".to_string(), FieldValue::from(self.rate));
        let keep = self.rate >= 1.0 || rand::random::<f64>() < self.rate;
        let decision = if keep { FilterDecision::Keep } else { FilterDecision::Drop };
        (decision, envelope)
    }
}

struct AdaptiveState {
    observed_rate_per_sec: f64,
    last_arrival: Instant,
}

/// Adaptive sampling (spec §4.6.1): rather than a fixed rate, tracks an
/// exponentially-weighted moving average of the observed arrival rate and
/// keeps envelopes with just enough probability to hold emission near
/// `target_per_sec`. Below the target, every envelope is kept.
pub struct AdaptiveSamplingFilter {
    target_per_sec: f64,
    state: Mutex<AdaptiveState>,
}

const ADAPTIVE_EWMA_ALPHA: f64 = 0.1;

impl AdaptiveSamplingFilter {
    pub fn new(target_per_sec: f64) -> Self {
        Self {
            target_per_sec,
            state: Mutex::new(AdaptiveState {
                observed_rate_per_sec: target_per_sec,
                last_arrival: Instant::now(),
            }),
        }
    }

    fn keep_probability(&self) -> f64 {
        let mut state = self.state.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_arrival).as_secs_f64().max(1e-6);
        state.last_arrival = now;

        let instantaneous_rate = 1.0 / elapsed;
        state.observed_rate_per_sec = state.observed_rate_per_sec * (1.0 - ADAPTIVE_EWMA_ALPHA) + instantaneous_rate * ADAPTIVE_EWMA_ALPHA;

        if state.observed_rate_per_sec <= self.target_per_sec {
            1.0
        } else {
            self.target_per_sec / state.observed_rate_per_sec
        }
    }
}

impl Filter for AdaptiveSamplingFilter {
    fn name(&self) -> &str {
        "adaptive_sampling"
    }

    fn decide(&self, mut envelope: Envelope) -> (FilterDecision, Envelope) {
        let probability = self.keep_probability();
        envelope.stage_metadata.insert("adaptive_sample_rate".to_string(), FieldValue::from(probability));
        let keep = probability >= 1.0 || rand::random::<f64>() < probability;
        let decision = if keep { FilterDecision::Keep } else { FilterDecision::Drop };
        (decision, envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env(level: Level) -> Envelope {
        Envelope::new(0, level, "app", "msg", BTreeMap::new())
    }

    #[test]
    fn level_threshold_keeps_at_or_above() {
        let f = LevelThresholdFilter::new(Level::Warn);
        assert_eq!(f.decide(env(Level::Warn)).0, FilterDecision::Keep);
        assert_eq!(f.decide(env(Level::Info)).0, FilterDecision::Drop);
    }

    #[test]
    fn logger_name_allow_list() {
        let f = LoggerNameFilter::allow(vec!["app".to_string()]);
        assert_eq!(f.decide(env(Level::Info)).0, FilterDecision::Keep);
    }

    #[test]
    fn rate_limit_exhausts_burst_then_refills() {
        let limiter = RateLimitFilter::new(1000.0, 1.0);
        assert_eq!(limiter.decide(env(Level::Info)).0, FilterDecision::Keep);
        assert_eq!(limiter.decide(env(Level::Info)).0, FilterDecision::Drop);
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(limiter.decide(env(Level::Info)).0, FilterDecision::Keep);
    }

    #[test]
    fn probabilistic_sampling_zero_rate_always_drops() {
        let f = ProbabilisticSamplingFilter::new(0.0);
        let (decision, out) = f.decide(env(Level::Info));
        assert_eq!(decision, FilterDecision::Drop);
        assert_eq!(out.stage_metadata.get("sampling_rate"), Some(&FieldValue::from(0.0)));
    }

    #[test]
    fn probabilistic_sampling_full_rate_always_keeps() {
        let f = ProbabilisticSamplingFilter::new(1.0);
        for _ in 0..20 {
            assert_eq!(f.decide(env(Level::Info)).0, FilterDecision::Keep);
        }
    }

    #[test]
    fn adaptive_sampling_keeps_everything_below_target() {
        let f = AdaptiveSamplingFilter::new(1_000_000.0);
        let (decision, out) = f.decide(env(Level::Info));
        assert_eq!(decision, FilterDecision::Keep);
        assert_eq!(out.stage_metadata.get("adaptive_sample_rate"), Some(&FieldValue::from(1.0)));
    }

    #[test]
    fn adaptive_sampling_throttles_bursty_traffic() {
        let f = AdaptiveSamplingFilter::new(1.0);
        for _ in 0..50 {
            f.decide(env(Level::Info));
        }
        let probability = f.keep_probability();
        assert!(probability < 1.0);
    }
}
