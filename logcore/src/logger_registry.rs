// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logger Registry
//!
//! `get_logger`/`get_logger_async` (spec §4.9) resolve to a process-wide
//! cache keyed by logger name plus a hash of the resolved configuration: the
//! same name with the same configuration returns the existing `Logger`
//! (and its already-running worker); a name reused with *different*
//! configuration gets a fresh instance rather than silently mutating the
//! old one in place, mirroring the donor's `GenericConfigManager` preference
//! for explicit reconfiguration over implicit mutation.

use crate::facade::Logger;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

type ConfigFingerprint = u64;

fn fingerprint(config: &logcore_domain::LoggerConfig) -> ConfigFingerprint {
    // `LoggerConfig` is a plain, serde-serializable value object; hashing its
    // canonical JSON form is simpler than deriving `Hash` across every
    // nested type (regex rules, routing tables) and is only used to detect
    // "same name, different config", not for anything security-sensitive.
    let json = serde_json::to_string(config).unwrap_or_default();
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    json.hash(&mut hasher);
    hasher.finish()
}

struct Entry {
    logger: Logger,
    fingerprint: ConfigFingerprint,
}

/// Process-wide cache of constructed loggers. Typically held behind a
/// single `once_cell`/`OnceLock` static by the caller; kept as a plain
/// struct here so tests can construct independent registries.
#[derive(Default)]
pub struct LoggerRegistry {
    entries: Mutex<HashMap<String, Entry>>,
}

impl LoggerRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached logger for `name` if one exists with a matching
    /// configuration fingerprint; otherwise builds and caches a new one via
    /// `build`. `build` is only invoked on a cache miss.
    pub fn get_or_build(&self, name: &str, config: &logcore_domain::LoggerConfig, build: impl FnOnce() -> Logger) -> Logger {
        let fp = fingerprint(config);
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get(name) {
            if entry.fingerprint == fp {
                return entry.logger.clone();
            }
        }

        let logger = build();
        entries.insert(
            name.to_string(),
            Entry {
                logger: logger.clone(),
                fingerprint: fp,
            },
        );
        logger
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validate;
    use crate::fallback::FallbackWriter;
    use crate::fanout::{FanoutMode, SinkFanout};
    use crate::facade::LoggerBuilder;
    use crate::sinks::CapturingSink;
    use logcore_domain::LoggerConfig;
    use std::sync::Arc as StdArc;

    fn build_logger(config: LoggerConfig) -> Logger {
        let validated = validate(config).unwrap();
        let mut fanout = SinkFanout::new(
            logcore_domain::RoutingTable::new(["mem".to_string()]),
            StdArc::new(FallbackWriter::new(None)),
            StdArc::new(crate::metrics::NoOpMetrics),
            FanoutMode::Sequential,
        );
        let sink = StdArc::new(CapturingSink::new("mem"));
        fanout.register_sink(sink, logcore_domain::CircuitConfig::default(), None);
        LoggerBuilder::new("app", validated).build(fanout)
    }

    #[test]
    fn same_name_same_config_returns_cached_instance() {
        let registry = LoggerRegistry::new();
        let config = LoggerConfig::default();

        let first = registry.get_or_build("app", &config, || build_logger(config.clone()));
        let second = registry.get_or_build("app", &config, || build_logger(config.clone()));

        assert_eq!(first.name(), second.name());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn same_name_different_config_rebuilds() {
        let registry = LoggerRegistry::new();
        let mut config_a = LoggerConfig::default();
        config_a.max_queue_size = 10;
        let mut config_b = LoggerConfig::default();
        config_b.max_queue_size = 999;

        registry.get_or_build("app", &config_a, || build_logger(config_a.clone()));
        let mut rebuilt = false;
        registry.get_or_build("app", &config_b, || {
            rebuilt = true;
            build_logger(config_b.clone())
        });

        assert!(rebuilt);
        assert_eq!(registry.len(), 1);
    }
}
