// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logger Configuration (value objects)
//!
//! `LoggerConfig` is the fully-resolved configuration surface a logger is
//! constructed with (spec §4.9). This crate does not load configuration
//! from environment or files — the donor's `GenericConfigManager` wraps an
//! already-resolved value rather than re-implementing env/file parsing in
//! the hot path, and this config layer follows the same split: `logcore`
//! (the runtime crate) owns any env/file loading, this module owns only the
//! validated shape and its defaults.

use crate::level::{Level, ProtectedLevels};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// What happens when the bounded queue is full and priority eviction
/// cannot make room (spec §4.3). `DropAfterWaitMs` is accepted for
/// compatibility but never honored — the worker treats it identically to
/// `Drop` and emits a one-shot startup diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    Drop,
    DropAfterWaitMs,
}

impl Default for DropPolicy {
    fn default() -> Self {
        DropPolicy::Drop
    }
}

/// What a redactor failure does to the envelope (spec §4.6.3). `Warn` (the
/// default) passes the envelope through unchanged with a diagnostic;
/// `Closed` drops it instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionFailMode {
    Warn,
    Closed,
}

impl Default for RedactionFailMode {
    fn default() -> Self {
        RedactionFailMode::Warn
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMaskRule {
    /// Dot-path, supporting `*` at a single key and `[*]` for array traversal.
    pub path: String,
    #[serde(default = "default_mask")]
    pub mask: String,
}

fn default_mask() -> String {
    "***".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexMaskRule {
    pub pattern: String,
    #[serde(default = "default_mask")]
    pub mask: String,
    /// Bypasses the ReDoS pre-validation check (spec §4.6.3).
    #[serde(default)]
    pub allow_unsafe: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionGuardrails {
    pub max_depth: usize,
    pub max_keys_scanned: usize,
}

impl Default for RedactionGuardrails {
    fn default() -> Self {
        Self {
            max_depth: 16,
            max_keys_scanned: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitThresholds {
    pub failure_threshold: u32,
    pub recovery_timeout_ms: u64,
    pub half_open_success_threshold: u32,
}

impl Default for CircuitThresholds {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_ms: 30_000,
            half_open_success_threshold: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkRoutingEntry {
    pub min_level: Level,
    pub sinks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub rules: Vec<SinkRoutingEntry>,
    #[serde(default)]
    pub default_sinks: Vec<String>,
    /// When true, overlapping rules union their sink sets; when false,
    /// first match wins (spec §4.8).
    #[serde(default = "default_true")]
    pub union_on_overlap: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default_sinks: Vec::new(),
            union_on_overlap: true,
        }
    }
}

/// The fully validated, immutable configuration a `Logger` is constructed
/// with (spec §4.9's "configuration surface"). Validation (regex
/// compilation, rule sanity) happens once, outside this struct, at logger
/// construction; this type only carries already-sane values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_level")]
    pub level_threshold: Level,
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    #[serde(default = "default_batch_max_size")]
    pub batch_max_size: usize,
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,
    #[serde(default)]
    pub drop_policy: DropPolicy,
    #[serde(default)]
    pub protected_levels: ProtectedLevels,
    #[serde(default)]
    pub field_mask_rules: Vec<FieldMaskRule>,
    #[serde(default)]
    pub regex_mask_rules: Vec<RegexMaskRule>,
    #[serde(default)]
    pub redaction_guardrails: RedactionGuardrails,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub circuit_thresholds: BTreeMap<String, CircuitThresholds>,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub internal_diagnostics_enabled: bool,
    #[serde(default)]
    pub serialize_in_flush: bool,
    /// When `serialize_in_flush` is enabled and canonical-JSON encoding
    /// fails for an envelope: drop it (`true`) rather than falling back to
    /// a best-effort unserialized write (`false`, the default).
    #[serde(default)]
    pub strict_envelope_mode: bool,
    #[serde(default)]
    pub redaction_fail_mode: RedactionFailMode,
    #[serde(default = "default_error_dedupe_window_secs")]
    pub error_dedupe_window_secs: u64,
    #[serde(default = "default_max_frames")]
    pub exception_max_frames: usize,
    #[serde(default = "default_max_total_chars")]
    pub exception_max_total_chars: usize,
    /// Fixed-rate probabilistic sampling applied after the level and name
    /// filters (spec §4.6.1). `1.0` (the default) keeps every envelope and
    /// synthesizes no sampling filter at all.
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    /// When set, an adaptive sampling filter is synthesized targeting this
    /// emission rate instead of (or in addition to) `sampling_rate` (spec
    /// §4.6.1). `None` (the default) disables adaptive sampling.
    #[serde(default)]
    pub adaptive_sampling_target_per_sec: Option<f64>,
}

fn default_level() -> Level {
    Level::Info
}
fn default_max_queue_size() -> usize {
    10_000
}
fn default_batch_max_size() -> usize {
    256
}
fn default_batch_timeout_ms() -> u64 {
    250
}
fn default_shutdown_timeout_ms() -> u64 {
    3_000
}
fn default_error_dedupe_window_secs() -> u64 {
    0
}
fn default_max_frames() -> usize {
    50
}
fn default_max_total_chars() -> usize {
    20_000
}
fn default_sampling_rate() -> f64 {
    1.0
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level_threshold: default_level(),
            max_queue_size: default_max_queue_size(),
            batch_max_size: default_batch_max_size(),
            batch_timeout_ms: default_batch_timeout_ms(),
            drop_policy: DropPolicy::default(),
            protected_levels: ProtectedLevels::default_protected(),
            field_mask_rules: Vec::new(),
            regex_mask_rules: Vec::new(),
            redaction_guardrails: RedactionGuardrails::default(),
            routing: RoutingConfig::default(),
            circuit_thresholds: BTreeMap::new(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            internal_diagnostics_enabled: true,
            serialize_in_flush: false,
            strict_envelope_mode: false,
            redaction_fail_mode: RedactionFailMode::default(),
            error_dedupe_window_secs: default_error_dedupe_window_secs(),
            exception_max_frames: default_max_frames(),
            exception_max_total_chars: default_max_total_chars(),
            sampling_rate: default_sampling_rate(),
            adaptive_sampling_target_per_sec: None,
        }
    }
}

impl LoggerConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = LoggerConfig::default();
        assert_eq!(cfg.max_queue_size, 10_000);
        assert_eq!(cfg.batch_max_size, 256);
        assert_eq!(cfg.batch_timeout_ms, 250);
        assert_eq!(cfg.shutdown_timeout_ms, 3_000);
        assert!(cfg.protected_levels.contains(Level::Error));
        assert!(cfg.protected_levels.contains(Level::Critical));
    }

    #[test]
    fn deserializes_from_json_with_partial_overrides() {
        let json = r#"{"max_queue_size": 500}"#;
        let cfg: LoggerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.max_queue_size, 500);
        assert_eq!(cfg.batch_max_size, 256);
    }
}
