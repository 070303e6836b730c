// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Fallback Writer
//!
//! The process-level emergency channel (spec §4.5): a best-effort write to
//! standard error when every configured sink for an envelope has failed or
//! is open. Every line is prefixed with `[fallback]` so downstream log
//! collectors can tell this emergency path apart from a sink's normal
//! output. Applies its own minimal, self-contained redaction independent of
//! the configured redactor pipeline, so a misconfigured or disabled
//! redactor can never result in raw secrets reaching this channel.

use logcore_domain::{Envelope, FieldValue};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;

/// Baseline key set masked case-insensitively, anywhere they appear, nested
/// (spec §4.5).
const BASELINE_SENSITIVE_KEYS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "api_key",
    "apikey",
    "api_secret",
    "authorization",
    "auth",
    "credential",
    "credentials",
    "private_key",
    "access_token",
    "refresh_token",
];

static KV_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(password|passwd|secret|token|api_key|apikey|api_secret|authorization|auth|credential|credentials|private_key|access_token|refresh_token)\s*[:=]\s*("[^"]*"|'[^']*'|\S+)"#)
        .expect("static regex is valid")
});

static BEARER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)Authorization:\s*Bearer\s+\S+"#).expect("static regex is valid"));

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    BASELINE_SENSITIVE_KEYS.iter().any(|k| *k == lower)
}

fn scrub_value(value: &mut FieldValue) {
    match value {
        FieldValue::Map(map) => {
            for (k, v) in map.iter_mut() {
                if is_sensitive_key(k) {
                    *v = FieldValue::String("***".to_string());
                } else {
                    scrub_value(v);
                }
            }
        }
        FieldValue::Array(items) => {
            for v in items.iter_mut() {
                scrub_value(v);
            }
        }
        _ => {}
    }
}

/// Applies the baseline key-mask to a structured envelope's fields,
/// returning a scrubbed copy for serialization. Does not mutate the
/// original, since the fallback path runs after the sink fan-out already
/// consumed the envelope.
fn scrub_envelope(envelope: &Envelope) -> Envelope {
    let mut copy = envelope.clone();
    for (k, v) in copy.fields.iter_mut() {
        if is_sensitive_key(k) {
            *v = FieldValue::String("***".to_string());
        } else {
            scrub_value(v);
        }
    }
    copy
}

/// Outcome of a fallback write, including the diagnostic annotations the
/// spec requires (`scrubbed`, `truncated`, `original_size`).
#[derive(Debug, Clone)]
pub struct FallbackWriteReport {
    pub scrubbed: bool,
    pub truncated: bool,
    pub original_size: usize,
}

pub struct FallbackWriter {
    max_bytes: Option<usize>,
}

impl FallbackWriter {
    pub fn new(max_bytes: Option<usize>) -> Self {
        Self { max_bytes }
    }

    /// Writes a structured envelope to standard error with baseline
    /// key-masking applied.
    pub fn write_envelope(&self, envelope: &Envelope) -> FallbackWriteReport {
        let scrubbed = scrub_envelope(envelope);
        let json = scrubbed.to_canonical_json().to_string();
        let original_size = json.len();
        let (payload, truncated) = self.truncate(json.into_bytes());

        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "[fallback] {}", String::from_utf8_lossy(&payload));

        FallbackWriteReport {
            scrubbed: true,
            truncated,
            original_size,
        }
    }

    /// Best-effort write for a raw byte payload that could not be parsed
    /// back into structured fields: applies regex scrubbing of `key=value`
    /// and `Authorization: Bearer ...` patterns instead of key-aware
    /// masking.
    pub fn write_raw(&self, bytes: &[u8]) -> FallbackWriteReport {
        let original_size = bytes.len();
        let text = String::from_utf8_lossy(bytes);
        let scrubbed_text = KV_PATTERN.replace_all(&text, "$1=***");
        let scrubbed_text = BEARER_PATTERN.replace_all(&scrubbed_text, "Authorization: Bearer ***");

        let (payload, truncated) = self.truncate(scrubbed_text.into_owned().into_bytes());

        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "[fallback] {}", String::from_utf8_lossy(&payload));

        FallbackWriteReport {
            scrubbed: true,
            truncated,
            original_size,
        }
    }

    fn truncate(&self, mut bytes: Vec<u8>) -> (Vec<u8>, bool) {
        match self.max_bytes {
            Some(cap) if bytes.len() > cap => {
                bytes.truncate(cap);
                (bytes, true)
            }
            _ => {
                let truncated = false;
                (bytes, truncated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logcore_domain::Level;
    use std::collections::BTreeMap;

    #[test]
    fn masks_baseline_keys_case_insensitively() {
        let mut fields = BTreeMap::new();
        fields.insert("Password".to_string(), FieldValue::from("hunter2"));
        fields.insert("user_id".to_string(), FieldValue::from(42));
        let env = Envelope::new(1, Level::Error, "app", "login failed", fields);

        let scrubbed = scrub_envelope(&env);
        assert_eq!(scrubbed.fields.get("Password"), Some(&FieldValue::from("***")));
        assert_eq!(scrubbed.fields.get("user_id"), Some(&FieldValue::from(42)));
    }

    #[test]
    fn raw_payload_scrubs_kv_and_bearer_patterns() {
        let writer = FallbackWriter::new(None);
        let raw = b"token=abc123 Authorization: Bearer zzz.yyy.xxx";
        let report = writer.write_raw(raw);
        assert!(report.scrubbed);
        assert!(!report.truncated);
    }

    #[test]
    fn truncates_to_configured_cap() {
        let writer = FallbackWriter::new(Some(10));
        let (payload, truncated) = writer.truncate(vec![b'x'; 100]);
        assert_eq!(payload.len(), 10);
        assert!(truncated);
    }
}
