// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sink Fan-out and Routing
//!
//! Resolves the routing table to a sink set for an envelope's level, then
//! offers the envelope to each resolved sink (spec §4.8): on success,
//! records the write; on failure, updates that sink's circuit breaker and
//! routes to the sink's configured fallback (another named sink) if any,
//! else to the global fallback writer. A sink's failure never cancels its
//! peers — each sink's outcome is independent.

use crate::circuit_breaker::CircuitBreaker;
use crate::fallback::FallbackWriter;
use crate::metrics::MetricsSink;
use logcore_domain::{CircuitConfig, DropReason, Envelope, RoutingTable, SerializedView, Sink, WriteOutcome};
use std::collections::HashMap;
use std::sync::Arc;

struct SinkEntry {
    sink: Arc<dyn Sink>,
    breaker: CircuitBreaker,
    fallback_sink: Option<String>,
}

/// Whether sinks within one fan-out are invoked concurrently (bounded) or
/// in configured order (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutMode {
    Parallel,
    Sequential,
}

pub struct SinkFanout {
    entries: HashMap<String, SinkEntry>,
    routing: RoutingTable,
    fallback_writer: Arc<FallbackWriter>,
    metrics: Arc<dyn MetricsSink>,
    mode: FanoutMode,
}

impl SinkFanout {
    pub fn new(routing: RoutingTable, fallback_writer: Arc<FallbackWriter>, metrics: Arc<dyn MetricsSink>, mode: FanoutMode) -> Self {
        Self {
            entries: HashMap::new(),
            routing,
            fallback_writer,
            metrics,
            mode,
        }
    }

    pub fn register_sink(&mut self, sink: Arc<dyn Sink>, circuit_config: CircuitConfig, fallback_sink: Option<String>) {
        let name = sink.name().to_string();
        let breaker = CircuitBreaker::new(name.clone(), circuit_config);
        self.entries.insert(name, SinkEntry { sink, breaker, fallback_sink });
    }

    /// Replaces the routing table driving `dispatch`. `LoggerBuilder::build`
    /// calls this with a table compiled from the validated config's routing
    /// rules, so a caller's `LoggerConfig.routing` actually governs fan-out
    /// rather than whatever table `SinkFanout::new` happened to be
    /// constructed with.
    pub fn set_routing(&mut self, routing: RoutingTable) {
        self.routing = routing;
    }

    pub async fn start_all(&self) {
        for entry in self.entries.values() {
            if let Err(e) = entry.sink.start().await {
                tracing::warn!(sink = entry.sink.name(), error = %e, "sink failed to start; continuing without it");
            }
        }
    }

    pub async fn stop_all(&self) {
        for entry in self.entries.values() {
            let _ = entry.sink.stop().await;
        }
    }

    /// Offers `envelope` to every sink its level resolves to. When `view` is
    /// present (`serialize_in_flush` is enabled for this batch), a sink that
    /// advertises `supports_serialized_write` is offered the pre-serialized
    /// bytes instead of re-encoding the envelope itself (spec §4.8 step 2).
    pub async fn dispatch(&self, envelope: &Envelope, view: Option<&SerializedView>) {
        let targets = self.routing.resolve(envelope.level);
        if targets.is_empty() {
            self.metrics.record_dropped(DropReason::SinkPermanentFailure);
            return;
        }

        match self.mode {
            FanoutMode::Parallel => {
                let futures = targets.iter().map(|name| self.dispatch_one(name, envelope, view));
                futures::future::join_all(futures).await;
            }
            FanoutMode::Sequential => {
                for name in &targets {
                    self.dispatch_one(name, envelope, view).await;
                }
            }
        }
    }

    async fn dispatch_one(&self, name: &str, envelope: &Envelope, view: Option<&SerializedView>) {
        let Some(entry) = self.entries.get(name) else {
            return;
        };

        if !entry.breaker.allow_request() {
            self.route_to_fallback(entry, envelope).await;
            return;
        }

        let outcome = match view {
            Some(view) if entry.sink.capabilities().supports_serialized_write => entry.sink.write_serialized(view).await,
            _ => entry.sink.write(envelope).await,
        };
        match outcome {
            WriteOutcome::Ok => {
                entry.breaker.record_success();
                self.metrics.record_written(name);
            }
            WriteOutcome::Transient(reason) => {
                tracing::debug!(sink = name, reason = %reason, "transient sink write failure");
                entry.breaker.record_failure();
                if entry.breaker.state() == logcore_domain::CircuitState::Open {
                    self.metrics.record_circuit_open(name);
                }
                self.route_to_fallback(entry, envelope).await;
            }
            WriteOutcome::Permanent(reason) => {
                tracing::warn!(sink = name, reason = %reason, "permanent sink write failure");
                entry.breaker.record_failure();
                if entry.breaker.state() == logcore_domain::CircuitState::Open {
                    self.metrics.record_circuit_open(name);
                }
                self.metrics.record_dropped(DropReason::SinkPermanentFailure);
                self.route_to_fallback(entry, envelope).await;
            }
        }
    }

    /// Per-sink health used by the facade's `check_health` (spec §4.9): a
    /// sink is reported unhealthy once its circuit is `Open`, independent of
    /// the sink's own `health_check()` result.
    pub async fn sink_health(&self) -> Vec<(String, bool)> {
        self.entries
            .values()
            .map(|entry| (entry.sink.name().to_string(), entry.breaker.state() != logcore_domain::CircuitState::Open))
            .collect()
    }

    async fn route_to_fallback(&self, entry: &SinkEntry, envelope: &Envelope) {
        if let Some(fallback_name) = &entry.fallback_sink {
            if let Some(fallback_entry) = self.entries.get(fallback_name) {
                // Box the recursive async call; fan-out depth is one level
                // (per-sink fallback names another configured sink, not a
                // chain) so this does not recurse further.
                let outcome = fallback_entry.sink.write(envelope).await;
                if outcome.is_ok() {
                    self.metrics.record_written(fallback_name);
                }
                return;
            }
        }
        self.fallback_writer.write_envelope(envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::CapturingSink;
    use logcore_domain::{Level, RoutingTable};
    use std::collections::BTreeMap;

    fn fanout(mode: FanoutMode) -> SinkFanout {
        SinkFanout::new(
            RoutingTable::new(["primary".to_string()]),
            Arc::new(FallbackWriter::new(None)),
            Arc::new(crate::metrics::NoOpMetrics),
            mode,
        )
    }

    #[tokio::test]
    async fn successful_write_is_recorded() {
        let mut fo = fanout(FanoutMode::Sequential);
        let sink = Arc::new(CapturingSink::new("primary"));
        fo.register_sink(sink.clone(), CircuitConfig::default(), None);

        let env = Envelope::new(1, Level::Info, "app", "hi", BTreeMap::new());
        fo.dispatch(&env, None).await;
        assert_eq!(sink.captured_count(), 1);
    }

    #[tokio::test]
    async fn failure_routes_to_per_sink_fallback() {
        let mut fo = fanout(FanoutMode::Sequential);
        let primary = Arc::new(CapturingSink::new("primary"));
        primary.set_fail_always(true);
        let backup = Arc::new(CapturingSink::new("backup"));

        fo.register_sink(primary, CircuitConfig::default(), Some("backup".to_string()));
        fo.register_sink(backup.clone(), CircuitConfig::default(), None);

        let env = Envelope::new(1, Level::Info, "app", "hi", BTreeMap::new());
        fo.dispatch(&env, None).await;
        assert_eq!(backup.captured_count(), 1);
    }

    #[tokio::test]
    async fn open_circuit_skips_sink_without_calling_it() {
        let mut fo = fanout(FanoutMode::Sequential);
        let primary = Arc::new(CapturingSink::new("primary"));
        primary.set_fail_always(true);

        fo.register_sink(
            primary.clone(),
            CircuitConfig {
                failure_threshold: 1,
                ..Default::default()
            },
            None,
        );

        let env = Envelope::new(1, Level::Info, "app", "hi", BTreeMap::new());
        fo.dispatch(&env, None).await;
        fo.dispatch(&env, None).await;
        fo.dispatch(&env, None).await;
        assert_eq!(primary.captured_count(), 0);
    }
}
