// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Envelope
//!
//! The fully-formed log record produced at emission time — the unit of work
//! that travels through filters, enrichers, redactors, processors, and
//! finally the sink fan-out. An envelope is owned end-to-end by exactly one
//! pipeline traversal (spec §3): stages may replace it, but never clone it
//! into parallel traversals.

use crate::context::FieldValue;
use crate::level::Level;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single captured stack frame, bounded at emission time (spec §4.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

/// Exception information attached to an ERROR/CRITICAL envelope.
///
/// Captured at emission time, not at flush, so that stack fidelity survives
/// whatever batching delay the pipeline worker introduces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub stack: Vec<StackFrame>,
    /// True if `stack` was truncated against `max_frames` or
    /// `max_stack_chars` (spec §4.1).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

/// Limits applied when capturing [`ExceptionInfo`] (spec §4.1 defaults).
#[derive(Debug, Clone, Copy)]
pub struct ExceptionCaptureLimits {
    pub max_frames: usize,
    pub max_total_chars: usize,
}

impl Default for ExceptionCaptureLimits {
    fn default() -> Self {
        Self {
            max_frames: 50,
            max_total_chars: 20_000,
        }
    }
}

impl ExceptionInfo {
    /// Builds exception info from a raw frame list, applying the frame-count
    /// and total-character caps. `frames` is assumed to already be ordered
    /// innermost-first.
    pub fn capture(kind: impl Into<String>, message: impl Into<String>, frames: Vec<StackFrame>, limits: ExceptionCaptureLimits) -> Self {
        let mut truncated = frames.len() > limits.max_frames;
        let mut stack: Vec<StackFrame> = frames.into_iter().take(limits.max_frames).collect();

        let mut total_chars = 0usize;
        let mut cut_at = stack.len();
        for (i, frame) in stack.iter().enumerate() {
            total_chars += frame.function.len() + frame.file.as_deref().map(str::len).unwrap_or(0);
            if total_chars > limits.max_total_chars {
                cut_at = i;
                truncated = true;
                break;
            }
        }
        stack.truncate(cut_at);

        Self {
            kind: kind.into(),
            message: message.into(),
            stack,
            truncated,
        }
    }
}

/// A fully-formed log record.
///
/// `sequence` is strictly increasing within one logger instance and is
/// never reused; the worker relies on admission order, not on `sequence`
/// itself, to preserve ordering, but `sequence` is exposed for diagnostics
/// and for detecting drops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    /// Monotonic capture instant, used internally for latency measurement;
    /// not part of the external JSON form.
    #[serde(skip)]
    pub monotonic_nanos: u64,
    pub level: Level,
    pub logger: String,
    pub message: String,
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionInfo>,
    /// Stage annotations not meant for the external wire form (sampling
    /// decisions, adaptive-sampling weight) — kept separate from `fields`
    /// so redactors/field-mask rules never accidentally touch them.
    #[serde(skip)]
    pub stage_metadata: BTreeMap<String, FieldValue>,
}

impl Envelope {
    pub fn new(sequence: u64, level: Level, logger: impl Into<String>, message: impl Into<String>, fields: BTreeMap<String, FieldValue>) -> Self {
        Self {
            sequence,
            timestamp: Utc::now(),
            monotonic_nanos: 0,
            level,
            logger: logger.into(),
            message: message.into(),
            fields,
            exception: None,
            stage_metadata: BTreeMap::new(),
        }
    }

    /// Canonical external JSON form (spec §6): required fields plus every
    /// merged context/metadata field, all flattened into one top-level
    /// object rather than nested under a generic `fields` key.
    pub fn to_canonical_json(&self) -> serde_json::Value {
        use serde_json::{Map, Value};

        let mut obj = Map::new();
        obj.insert(
            "timestamp".to_string(),
            Value::String(self.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()),
        );
        obj.insert("level".to_string(), Value::String(self.level.as_str().to_string()));
        obj.insert("logger".to_string(), Value::String(self.logger.clone()));
        obj.insert("message".to_string(), Value::String(self.message.clone()));

        for (key, value) in &self.fields {
            let json_value = serde_json::to_value(value).unwrap_or(Value::Null);
            obj.insert(key.clone(), json_value);
        }

        if let Some(exception) = &self.exception {
            obj.insert("exception".to_string(), serde_json::to_value(exception).unwrap_or(Value::Null));
        }

        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_json_has_required_fields() {
        let env = Envelope::new(1, Level::Info, "app", "hello", BTreeMap::new());
        let json = env.to_canonical_json();
        assert!(json.get("timestamp").is_some());
        assert_eq!(json.get("level").unwrap(), "INFO");
        assert_eq!(json.get("logger").unwrap(), "app");
        assert_eq!(json.get("message").unwrap(), "hello");
    }

    #[test]
    fn exception_capture_truncates_by_frame_count() {
        let frames: Vec<StackFrame> = (0..100)
            .map(|i| StackFrame {
                function: format!("fn_{i}"),
                file: None,
                line: Some(i),
            })
            .collect();
        let limits = ExceptionCaptureLimits {
            max_frames: 50,
            max_total_chars: 1_000_000,
        };
        let exc = ExceptionInfo::capture("ValueError", "bad value", frames, limits);
        assert_eq!(exc.stack.len(), 50);
        assert!(exc.truncated);
    }

    #[test]
    fn exception_capture_truncates_by_total_chars() {
        let long_name = "x".repeat(100);
        let frames: Vec<StackFrame> = (0..10)
            .map(|_| StackFrame {
                function: long_name.clone(),
                file: None,
                line: None,
            })
            .collect();
        let limits = ExceptionCaptureLimits {
            max_frames: 50,
            max_total_chars: 250,
        };
        let exc = ExceptionInfo::capture("ValueError", "bad value", frames, limits);
        assert!(exc.stack.len() < 10);
        assert!(exc.truncated);
    }

    #[test]
    fn round_trip_preserves_non_reserved_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("user_id".to_string(), FieldValue::from(42));
        let env = Envelope::new(7, Level::Warn, "svc", "watch out", fields);
        let json = serde_json::to_string(&env.to_canonical_json()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["user_id"], 42);
        assert_eq!(parsed["message"], "watch out");
    }
}
