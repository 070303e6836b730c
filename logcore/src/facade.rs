// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Emission Facade
//!
//! `Logger` is the caller-facing surface (spec §4.9): `info`/`warn`/
//! `error`/`critical`/`debug` construct an envelope and `try_enqueue` it,
//! never awaiting sink I/O; `bind` acquires a scoped context; `drain` and
//! `stop_and_drain` coordinate an orderly shutdown. The worker always owns
//! its own Tokio task — the caller's task performs only envelope
//! construction and queue admission, which is the one invariant that holds
//! across every calling convention this facade supports.

use crate::context;
use crate::fallback::FallbackWriter;
use crate::fanout::{FanoutMode, SinkFanout};
use crate::metrics::MetricsSink;
use crate::queue::{AdmitOutcome, BoundedRingQueue};
use crate::worker::{PipelineStages, PipelineWorker};
use logcore_domain::dedupe::DedupeMap;
use logcore_domain::{dedupe_key, DropReason, Enricher, Envelope, Filter, Level, Processor, Redactor};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of a `drain`/`stop_and_drain` call (spec §4.9).
#[derive(Debug, Clone)]
pub struct DrainResult {
    pub flushed_count: u64,
    pub dropped_count: u64,
    pub queue_high_watermark: usize,
    pub flush_latency: Duration,
}

/// Aggregated per-sink circuit health (spec §7: "a sink whose circuit is
/// Open reports unhealthy").
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub healthy: bool,
    pub sink_states: Vec<(String, bool)>,
}

struct Counters {
    emitted: AtomicU64,
    dropped: AtomicU64,
    sequence: AtomicU64,
}

/// The caller-facing logger instance. Cheap to clone — internally `Arc`
/// shared — so callers may hold one per component without worrying about
/// duplicate workers.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    queue: Arc<BoundedRingQueue>,
    fanout: Arc<SinkFanout>,
    worker: Arc<PipelineWorker>,
    metrics: Arc<dyn MetricsSink>,
    counters: Arc<Counters>,
    stopped: Arc<AtomicBool>,
    exception_limits: logcore_domain::ExceptionCaptureLimits,
    /// Owned by the facade, not the worker (spec §4.1/§3): dedupe must
    /// suppress a repeated ERROR/CRITICAL emission before it ever consumes
    /// queue capacity, not after it has already been dequeued.
    dedupe: Option<Arc<Mutex<DedupeMap>>>,
    dedupe_window: chrono::Duration,
}

pub struct LoggerBuilder {
    name: String,
    config: crate::config::ValidatedConfig,
    filters: Vec<Box<dyn Filter>>,
    enrichers: Vec<Box<dyn Enricher>>,
    redactors: Vec<Box<dyn Redactor>>,
    processors: Vec<Box<dyn Processor>>,
    fanout_mode: FanoutMode,
    metrics: Arc<dyn MetricsSink>,
}

impl LoggerBuilder {
    pub fn new(name: impl Into<String>, config: crate::config::ValidatedConfig) -> Self {
        Self {
            name: name.into(),
            config,
            filters: Vec::new(),
            enrichers: Vec::new(),
            redactors: Vec::new(),
            processors: Vec::new(),
            fanout_mode: FanoutMode::Parallel,
            metrics: Arc::new(crate::metrics::NoOpMetrics),
        }
    }

    pub fn with_filter(mut self, filter: Box<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_enricher(mut self, enricher: Box<dyn Enricher>) -> Self {
        self.enrichers.push(enricher);
        self
    }

    pub fn with_redactor(mut self, redactor: Box<dyn Redactor>) -> Self {
        self.redactors.push(redactor);
        self
    }

    /// Registers a byte-level processor, run in order over the serialized
    /// view once `serialize_in_flush` is enabled (spec §4.6.4). A no-op
    /// when `serialize_in_flush` is off — processors are only invoked on
    /// the serialized path.
    pub fn with_processor(mut self, processor: Box<dyn Processor>) -> Self {
        self.processors.push(processor);
        self
    }

    pub fn with_fanout_mode(mut self, mode: FanoutMode) -> Self {
        self.fanout_mode = mode;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Registers a sink under its own circuit breaker, with an optional
    /// per-sink fallback sink name.
    pub fn with_sink(self, sink: Arc<dyn logcore_domain::Sink>, fallback_sink: Option<String>, fanout: &mut SinkFanout) -> Self {
        let name = sink.name().to_string();
        let circuit_config = self
            .config
            .raw
            .circuit_thresholds
            .get(&name)
            .map(|c| logcore_domain::CircuitConfig {
                failure_threshold: c.failure_threshold,
                open_duration: Duration::from_millis(c.recovery_timeout_ms),
                half_open_success_threshold: c.half_open_success_threshold,
            })
            .unwrap_or_default();
        fanout.register_sink(sink, circuit_config, fallback_sink);
        self
    }

    /// Finishes construction, starting the worker on its own Tokio task.
    pub fn build(self, mut fanout: SinkFanout) -> Logger {
        let raw = &self.config.raw;
        fanout.set_routing(logcore_domain::RoutingTable::from_config(&raw.routing));
        let queue = Arc::new(BoundedRingQueue::new(raw.max_queue_size, raw.protected_levels.clone()));
        let fanout = Arc::new(fanout);

        let mut filters = self.filters;
        if filters.is_empty() {
            filters.push(Box::new(crate::stages::filters::LevelThresholdFilter::new(raw.level_threshold)));
        }
        if raw.sampling_rate < 1.0 {
            filters.push(Box::new(crate::stages::filters::ProbabilisticSamplingFilter::new(raw.sampling_rate)));
        }
        if let Some(target) = raw.adaptive_sampling_target_per_sec {
            filters.push(Box::new(crate::stages::filters::AdaptiveSamplingFilter::new(target)));
        }

        let stages = PipelineStages {
            filters,
            enrichers: self.enrichers,
            redactors: self.redactors,
            processors: self.processors,
        };

        let diagnostics = Arc::new(crate::diagnostics::DiagnosticsRateLimiter::new(raw.internal_diagnostics_enabled));

        let worker = Arc::new(PipelineWorker::new(
            queue.clone(),
            fanout.clone(),
            stages,
            self.metrics.clone(),
            diagnostics,
            raw.batch_max_size,
            raw.batch_timeout(),
            raw.redaction_fail_mode,
            raw.serialize_in_flush,
            raw.strict_envelope_mode,
        ));

        let worker_handle = worker.clone();
        tokio::spawn(async move { worker_handle.run().await });

        let dedupe = if raw.error_dedupe_window_secs > 0 {
            Some(Arc::new(Mutex::new(DedupeMap::new(4096))))
        } else {
            None
        };

        Logger {
            name: Arc::from(self.name.as_str()),
            queue,
            fanout,
            worker,
            metrics: self.metrics,
            counters: Arc::new(Counters {
                emitted: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
                sequence: AtomicU64::new(0),
            }),
            stopped: Arc::new(AtomicBool::new(false)),
            exception_limits: logcore_domain::ExceptionCaptureLimits {
                max_frames: raw.exception_max_frames,
                max_total_chars: raw.exception_max_total_chars,
            },
            dedupe,
            dedupe_window: chrono::Duration::seconds(raw.error_dedupe_window_secs as i64),
        }
    }
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn next_sequence(&self) -> u64 {
        self.counters.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Acquires a scoped bound context. Intended to wrap a
    /// `context::with_context` future at the call site; this method exists
    /// as a documented entry point for callers coming from the facade
    /// rather than `crate::context` directly. Dropping the returned
    /// [`context::Scope`] restores whatever context was bound before this
    /// call (spec §4.1/§4.9).
    pub fn bind(&self, key: impl Into<String>, value: impl Into<logcore_domain::FieldValue>) -> context::Scope {
        context::bind(key, value)
    }

    fn build_envelope(&self, level: Level, message: impl Into<String>, fields: BTreeMap<String, logcore_domain::FieldValue>) -> Envelope {
        let merged = context::merged_with_current(fields);
        Envelope::new(self.next_sequence(), level, self.name.to_string(), message, merged)
    }

    /// Shared hot path for every severity helper. Never awaits sink I/O.
    /// Dedupe runs here, before the envelope ever consumes queue capacity
    /// (spec §4.1/§3) — a suppressed duplicate never reaches the queue, let
    /// alone the priority-eviction path.
    fn try_enqueue(&self, envelope: Envelope) {
        if self.stopped.load(Ordering::Acquire) {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            self.metrics.record_dropped(DropReason::ShutdownTimeout);
            return;
        }
        if self.is_duplicate(&envelope) {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            self.metrics.record_dropped(DropReason::Deduplicated);
            return;
        }
        match self.queue.try_admit(envelope) {
            AdmitOutcome::Admitted => {
                self.counters.emitted.fetch_add(1, Ordering::Relaxed);
                self.metrics.record_emitted();
            }
            AdmitOutcome::Dropped(reason) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                self.metrics.record_dropped(reason);
            }
        }
    }

    /// Restricted to ERROR/CRITICAL (spec: dedupe is an error-storm
    /// suppressor, not a general-purpose sampling mechanism).
    fn is_duplicate(&self, envelope: &Envelope) -> bool {
        let Some(dedupe) = &self.dedupe else {
            return false;
        };
        if !matches!(envelope.level, Level::Error | Level::Critical) {
            return false;
        }
        let key = dedupe_key(envelope.level, &envelope.message);
        dedupe.lock().check_and_record(key, envelope.timestamp, self.dedupe_window)
    }

    pub fn trace(&self, message: impl Into<String>, fields: BTreeMap<String, logcore_domain::FieldValue>) {
        let env = self.build_envelope(Level::Trace, message, fields);
        self.try_enqueue(env);
    }

    pub fn debug(&self, message: impl Into<String>, fields: BTreeMap<String, logcore_domain::FieldValue>) {
        let env = self.build_envelope(Level::Debug, message, fields);
        self.try_enqueue(env);
    }

    pub fn info(&self, message: impl Into<String>, fields: BTreeMap<String, logcore_domain::FieldValue>) {
        let env = self.build_envelope(Level::Info, message, fields);
        self.try_enqueue(env);
    }

    pub fn warn(&self, message: impl Into<String>, fields: BTreeMap<String, logcore_domain::FieldValue>) {
        let env = self.build_envelope(Level::Warn, message, fields);
        self.try_enqueue(env);
    }

    pub fn error(&self, message: impl Into<String>, fields: BTreeMap<String, logcore_domain::FieldValue>) {
        let env = self.build_envelope(Level::Error, message, fields);
        self.try_enqueue(env);
    }

    pub fn critical(&self, message: impl Into<String>, fields: BTreeMap<String, logcore_domain::FieldValue>) {
        let env = self.build_envelope(Level::Critical, message, fields);
        self.try_enqueue(env);
    }

    /// Attaches exception info captured under the configured frame/char
    /// limits, then enqueues at ERROR.
    pub fn error_with_exception(
        &self,
        message: impl Into<String>,
        fields: BTreeMap<String, logcore_domain::FieldValue>,
        kind: impl Into<String>,
        exc_message: impl Into<String>,
        frames: Vec<logcore_domain::StackFrame>,
    ) {
        let mut env = self.build_envelope(Level::Error, message, fields);
        env.exception = Some(logcore_domain::ExceptionInfo::capture(kind, exc_message, frames, self.exception_limits));
        self.try_enqueue(env);
    }

    /// Signals the worker to flush remaining items, waiting up to
    /// `timeout`. Idempotent; safe to call multiple times.
    pub async fn drain(&self, timeout: Duration) -> DrainResult {
        let started = Instant::now();
        let deadline = started + timeout;
        while self.queue.len() > 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        DrainResult {
            flushed_count: self.counters.emitted.load(Ordering::Relaxed),
            dropped_count: self.counters.dropped.load(Ordering::Relaxed),
            queue_high_watermark: self.queue.high_watermark(),
            flush_latency: started.elapsed(),
        }
    }

    /// Drains, then terminates the worker task. Subsequent emits are
    /// counted as `shutdown_timeout` drops rather than enqueued.
    pub async fn stop_and_drain(&self, timeout: Duration) -> DrainResult {
        let result = self.drain(timeout).await;
        self.worker.stop();
        self.stopped.store(true, Ordering::Release);
        result
    }

    pub async fn check_health(&self) -> HealthReport {
        let sink_states = self.fanout.sink_health().await;
        let healthy = sink_states.iter().all(|(_, ok)| *ok);
        HealthReport { healthy, sink_states }
    }

    /// Installs a SIGTERM/SIGINT listener (spec §4.9: "on process exit
    /// without `stop_and_drain`, the logger detects the uncleaned state and
    /// emits a one-shot warning; a best-effort drain with a short deadline is
    /// attempted"). Optional — binaries that manage their own shutdown
    /// sequence can call `stop_and_drain` directly instead.
    pub fn install_shutdown_guard(&self, drain_timeout: Duration) -> tokio::task::JoinHandle<()> {
        let coordinator = logcore_bootstrap::shutdown::ShutdownCoordinator::new(drain_timeout);
        logcore_bootstrap::signal::spawn_shutdown_listener(coordinator.clone());
        let logger = self.clone();
        tokio::spawn(async move {
            coordinator.token().cancelled().await;
            tracing::warn!(logger = %logger.name, "process terminating without stop_and_drain; draining best-effort");
            logger.stop_and_drain(drain_timeout).await;
            coordinator.complete_shutdown();
        })
    }
}
