// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A single error taxonomy shared by the whole runtime, following the error
//! categories from the architecture's error handling design: configuration
//! errors are fatal at construction time, sink/stage failures are contained
//! and counted rather than propagated, and admission/serialization failures
//! become drop accounting rather than exceptions on the hot path.
//!
//! ## Design Principles
//!
//! - **Specific**: each variant names one failure mode.
//! - **Non-propagating on the hot path**: `emit()` never returns `Err` to the
//!   caller; only logger *construction* and plugin *registration* can fail
//!   synchronously with [`LogCoreError`].
//! - **Cloneable**: errors are cloned into diagnostics events without extra
//!   allocation pressure beyond the original message.

use thiserror::Error;

/// Errors surfaced by `logcore` — fatal at construction time, or carried as
/// data into diagnostics/metrics rather than propagated from the hot path.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum LogCoreError {
    /// Invalid or conflicting configuration discovered at logger
    /// construction time (bad regex, conflicting routing rules, unknown
    /// sink name in a fallback reference). Fatal for that logger instance.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A sink write failed in a way that looks transient (timeout,
    /// disconnect, 5xx-equivalent). Contributes to circuit breaker state.
    #[error("transient sink failure in '{sink}': {reason}")]
    TransientSinkFailure { sink: String, reason: String },

    /// A sink write failed in a way that looks permanent (malformed
    /// envelope, permission denied). Routed to fallback; rate-limited in
    /// diagnostics.
    #[error("permanent sink failure in '{sink}': {reason}")]
    PermanentSinkFailure { sink: String, reason: String },

    /// A filter/enricher/redactor/processor raised during stage execution.
    /// Contained by the worker; the envelope proceeds unless the stage is a
    /// redactor running in strict (`closed`) mode.
    #[error("stage '{stage}' failed: {reason}")]
    StageFailure { stage: String, reason: String },

    /// Canonical JSON encoding failed for an envelope.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Emission attempted after `stop_and_drain` completed.
    #[error("logger has been stopped")]
    Shutdown,
}

impl LogCoreError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn stage_failure(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StageFailure {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying this sink soon is plausible — used to decide whether
    /// a failure should count toward the circuit breaker as a transient blip
    /// versus a permanent routing decision.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientSinkFailure { .. })
    }

    /// Coarse category used for metrics labeling.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::TransientSinkFailure { .. } => "transient_sink",
            Self::PermanentSinkFailure { .. } => "permanent_sink",
            Self::StageFailure { .. } => "stage",
            Self::Serialization(_) => "serialization",
            Self::Shutdown => "shutdown",
        }
    }
}

impl From<serde_json::Error> for LogCoreError {
    fn from(err: serde_json::Error) -> Self {
        LogCoreError::Serialization(err.to_string())
    }
}

impl From<regex::Error> for LogCoreError {
    fn from(err: regex::Error) -> Self {
        LogCoreError::Configuration(format!("invalid regex: {err}"))
    }
}
