// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # logcore
//!
//! The async runtime half of the logging core: the bounded admission queue,
//! the pipeline worker that drains and transforms batches, built-in filter/
//! enricher/redactor/processor stages, reference sinks, the sink fan-out
//! with per-sink circuit breakers, the process-level fallback writer, and
//! the `Logger` facade callers actually construct.
//!
//! `logcore-domain` defines the pure types and traits this crate drives;
//! `logcore-bootstrap` wires a `Logger` into a process's startup and
//! shutdown sequence. See each module's own documentation for how it maps
//! to the architecture's module boundaries.

pub mod circuit_breaker;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod facade;
pub mod fallback;
pub mod fanout;
pub mod logger_registry;
pub mod metrics;
pub mod queue;
pub mod sinks;
pub mod stages;
pub mod token_bucket;
pub mod worker;

pub use config::{validate, ValidatedConfig};
pub use facade::{DrainResult, HealthReport, Logger, LoggerBuilder};
pub use fanout::{FanoutMode, SinkFanout};
pub use logger_registry::LoggerRegistry;
pub use metrics::{MetricsSink, NoOpMetrics, PrometheusMetrics};
pub use queue::{AdmitOutcome, BoundedRingQueue};

pub use logcore_domain::*;
