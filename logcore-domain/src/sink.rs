// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sink Contract
//!
//! A sink is an I/O-bound port (async, defined in the domain layer the same
//! way the donor workspace keeps `FileIOService`/repository ports async
//! despite the rest of the domain being sync). Concrete sinks — stdout,
//! rotating file, HTTP, cloud log ingests, SQL — are out of scope for this
//! crate (spec §1); only the contract, the result type, and the circuit
//! breaker's view of a sink live here.
//!
//! ## Canonical signaling contract
//!
//! Historically, sink implementations in systems like this either raise an
//! exception or return a boolean. That ambiguity is exactly the kind of
//! "exception-as-control-flow" pattern the architecture calls out for
//! re-design (spec §9): `WriteOutcome` gives every sink exactly one typed
//! way to report success, a transient failure, or a permanent failure.

use crate::envelope::Envelope;
use crate::serialized::SerializedView;
use async_trait::async_trait;
use std::fmt;

/// Result of a single sink write attempt.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    Ok,
    /// Looks retryable: timeout, disconnect, 5xx-equivalent. Counts toward
    /// the sink's circuit breaker.
    Transient(String),
    /// Looks unretryable: malformed envelope, permission denied. Still
    /// counts toward the circuit breaker, but is logged once per
    /// rate-limit window rather than on every occurrence.
    Permanent(String),
}

impl WriteOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, WriteOutcome::Ok)
    }
}

/// Result of a batch write attempt.
#[derive(Debug, Clone)]
pub enum BatchWriteOutcome {
    Ok,
    /// Some envelopes in the batch failed; `failed_indices` names their
    /// position within the batch that was offered.
    PartialFail { failed_indices: Vec<usize>, reason: String },
    Fail(String),
}

/// What a sink can do beyond the mandatory dict-shaped `write`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkCapabilities {
    pub supports_serialized_write: bool,
    pub supports_batch_write: bool,
}

/// The sink port. All methods other than `write` and `name` have sensible
/// defaults so a minimal sink needs to implement only two methods.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Unique sink name, used for routing rules, per-sink fallback
    /// references, and circuit breaker identity.
    fn name(&self) -> &str;

    fn capabilities(&self) -> SinkCapabilities {
        SinkCapabilities::default()
    }

    async fn start(&self) -> Result<(), String> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), String> {
        Ok(())
    }

    /// Mandatory dict-shaped write.
    async fn write(&self, envelope: &Envelope) -> WriteOutcome;

    /// Optional pre-serialized write; only called when
    /// [`SinkCapabilities::supports_serialized_write`] is true and the batch
    /// has a [`SerializedView`] available.
    async fn write_serialized(&self, _view: &SerializedView) -> WriteOutcome {
        WriteOutcome::Permanent("write_serialized not supported by this sink".to_string())
    }

    /// Optional batch-optimized write.
    async fn write_batch(&self, _envelopes: &[Envelope]) -> BatchWriteOutcome {
        BatchWriteOutcome::Fail("write_batch not supported by this sink".to_string())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

impl fmt::Debug for dyn Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink").field("name", &self.name()).finish()
    }
}
