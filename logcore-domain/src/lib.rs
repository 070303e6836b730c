// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # logcore-domain
//!
//! Pure, synchronous domain types for an async-first structured logging
//! runtime: the envelope and its bound context, severity levels, the staged
//! pipeline's stage contracts, the sink port and its circuit breaker state
//! machine, routing rules, dedupe accounting, drop accounting, and the
//! shared error taxonomy.
//!
//! This crate has no tokio dependency and performs no I/O itself. The two
//! ports that are inherently I/O-shaped — [`sink::Sink`] — are still defined
//! here as `async_trait` traits, mirroring the donor's own split between a
//! sync domain and the async ports (`FileIOService`, repository traits) that
//! the domain layer declares but does not implement. Everything else in
//! this crate is plain data and pure functions so it can be exhaustively
//! unit- and property-tested without a runtime.

pub mod circuit;
pub mod config;
pub mod context;
pub mod dedupe;
pub mod envelope;
pub mod error;
pub mod level;
pub mod metrics;
pub mod routing;
pub mod serialized;
pub mod sink;
pub mod stage;

pub use circuit::{CircuitConfig, CircuitState};
pub use config::LoggerConfig;
pub use context::{BoundContext, FieldValue};
pub use dedupe::{dedupe_key, DedupeMap};
pub use envelope::{Envelope, ExceptionCaptureLimits, ExceptionInfo, StackFrame};
pub use error::LogCoreError;
pub use level::{Level, ProtectedLevels};
pub use metrics::{DropAccounting, DropReason};
pub use routing::{RoutingRule, RoutingTable};
pub use serialized::SerializedView;
pub use sink::{BatchWriteOutcome, Sink, SinkCapabilities, WriteOutcome};
pub use stage::{Enricher, Filter, FilterDecision, Processor, Redactor, StageOutcome};
