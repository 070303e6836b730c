// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics
//!
//! A small `MetricsSink` trait plus a concrete Prometheus-backed
//! implementation and a no-op implementation for tests, modeled on the
//! donor's `infrastructure::metrics::generic_collector`/`service` split.
//! Counters track `events_emitted_total`, `events_dropped_total{reason}`,
//! `events_written_total{sink}`, `circuit_open_total{sink}`; a histogram
//! tracks batch size; a gauge tracks queue depth and high-watermark (spec
//! §8's testable properties reference these names directly).

use logcore_domain::DropReason;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

/// Behavior every metrics backend must provide. Hot-path calls (`record_*`)
/// never return `Result` — a metrics backend failing to record must never
/// affect emission.
pub trait MetricsSink: Send + Sync {
    fn record_emitted(&self);
    fn record_dropped(&self, reason: DropReason);
    fn record_written(&self, sink: &str);
    fn record_circuit_open(&self, sink: &str);
    fn record_batch_size(&self, size: usize);
    fn set_queue_depth(&self, depth: usize);
    fn set_queue_high_watermark(&self, watermark: usize);
}

/// Discards every call. Used in tests and wherever metrics are configured
/// off.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMetrics;

impl MetricsSink for NoOpMetrics {
    fn record_emitted(&self) {}
    fn record_dropped(&self, _reason: DropReason) {}
    fn record_written(&self, _sink: &str) {}
    fn record_circuit_open(&self, _sink: &str) {}
    fn record_batch_size(&self, _size: usize) {}
    fn set_queue_depth(&self, _depth: usize) {}
    fn set_queue_high_watermark(&self, _watermark: usize) {}
}

/// Prometheus-backed metrics collector.
pub struct PrometheusMetrics {
    registry: Registry,
    events_emitted_total: IntCounter,
    events_dropped_total: IntCounterVec,
    events_written_total: IntCounterVec,
    circuit_open_total: IntCounterVec,
    batch_size: Histogram,
    queue_depth: IntGauge,
    queue_high_watermark: IntGauge,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, logcore_domain::LogCoreError> {
        let registry = Registry::new();
        let namespace = "logcore";

        let events_emitted_total = IntCounter::with_opts(
            Opts::new("events_emitted_total", "Total envelopes admitted to the queue").namespace(namespace),
        )
        .map_err(|e| logcore_domain::LogCoreError::configuration(format!("events_emitted_total: {e}")))?;

        let events_dropped_total = IntCounterVec::new(
            Opts::new("events_dropped_total", "Total envelopes dropped, by reason").namespace(namespace),
            &["reason"],
        )
        .map_err(|e| logcore_domain::LogCoreError::configuration(format!("events_dropped_total: {e}")))?;

        let events_written_total = IntCounterVec::new(
            Opts::new("events_written_total", "Total envelopes successfully written, by sink").namespace(namespace),
            &["sink"],
        )
        .map_err(|e| logcore_domain::LogCoreError::configuration(format!("events_written_total: {e}")))?;

        let circuit_open_total = IntCounterVec::new(
            Opts::new("circuit_open_total", "Total circuit breaker open transitions, by sink").namespace(namespace),
            &["sink"],
        )
        .map_err(|e| logcore_domain::LogCoreError::configuration(format!("circuit_open_total: {e}")))?;

        let batch_size = Histogram::with_opts(
            HistogramOpts::new("batch_size", "Envelopes per flushed batch")
                .namespace(namespace)
                .buckets(vec![1.0, 8.0, 32.0, 64.0, 128.0, 256.0, 512.0]),
        )
        .map_err(|e| logcore_domain::LogCoreError::configuration(format!("batch_size: {e}")))?;

        let queue_depth = IntGauge::with_opts(Opts::new("queue_depth", "Current queue depth").namespace(namespace))
            .map_err(|e| logcore_domain::LogCoreError::configuration(format!("queue_depth: {e}")))?;

        let queue_high_watermark = IntGauge::with_opts(
            Opts::new("queue_high_watermark", "Highest observed queue depth").namespace(namespace),
        )
        .map_err(|e| logcore_domain::LogCoreError::configuration(format!("queue_high_watermark: {e}")))?;

        registry.register(Box::new(events_emitted_total.clone())).ok();
        registry.register(Box::new(events_dropped_total.clone())).ok();
        registry.register(Box::new(events_written_total.clone())).ok();
        registry.register(Box::new(circuit_open_total.clone())).ok();
        registry.register(Box::new(batch_size.clone())).ok();
        registry.register(Box::new(queue_depth.clone())).ok();
        registry.register(Box::new(queue_high_watermark.clone())).ok();

        Ok(Self {
            registry,
            events_emitted_total,
            events_dropped_total,
            events_written_total,
            circuit_open_total,
            batch_size,
            queue_depth,
            queue_high_watermark,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl MetricsSink for PrometheusMetrics {
    fn record_emitted(&self) {
        self.events_emitted_total.inc();
    }

    fn record_dropped(&self, reason: DropReason) {
        self.events_dropped_total.with_label_values(&[reason.as_str()]).inc();
    }

    fn record_written(&self, sink: &str) {
        self.events_written_total.with_label_values(&[sink]).inc();
    }

    fn record_circuit_open(&self, sink: &str) {
        self.circuit_open_total.with_label_values(&[sink]).inc();
    }

    fn record_batch_size(&self, size: usize) {
        self.batch_size.observe(size as f64);
    }

    fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.set(depth as i64);
    }

    fn set_queue_high_watermark(&self, watermark: usize) {
        self.queue_high_watermark.set(watermark as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_counters_without_panicking() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_emitted();
        metrics.record_dropped(DropReason::QueueFull);
        metrics.record_written("stdout");
        metrics.record_circuit_open("stdout");
        metrics.record_batch_size(42);
        metrics.set_queue_depth(10);
        metrics.set_queue_high_watermark(100);

        let families = metrics.registry().gather();
        assert!(!families.is_empty());
    }

    #[test]
    fn noop_never_panics() {
        let metrics = NoOpMetrics;
        metrics.record_emitted();
        metrics.record_dropped(DropReason::Deduplicated);
    }
}
