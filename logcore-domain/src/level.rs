// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Log severity levels, ordered so that `Level::Error < Level::Critical`
//! reads naturally with `Ord`/`PartialOrd` for threshold comparisons.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Severity of a log envelope.
///
/// Ordering is significant: `Level::Trace` is the least severe and
/// `Level::Critical` the most. Threshold filters compare with `>=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl Level {
    /// Uppercase canonical name, used for the `level` field in the external
    /// JSON form (spec §6).
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// All levels, least to most severe.
    pub const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Critical,
    ];
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Level::Trace),
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" | "FATAL" => Ok(Level::Critical),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// A configured set of "protected" severities. Protected levels bypass
/// probabilistic sampling (spec §4.6.1) and receive priority eviction on a
/// full queue (spec §4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtectedLevels(BTreeSet<Level>);

impl ProtectedLevels {
    pub fn new(levels: impl IntoIterator<Item = Level>) -> Self {
        Self(levels.into_iter().collect())
    }

    /// The spec's default protected set.
    pub fn default_protected() -> Self {
        Self::new([Level::Error, Level::Critical])
    }

    pub fn contains(&self, level: Level) -> bool {
        self.0.contains(&level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_places_critical_above_error() {
        assert!(Level::Critical > Level::Error);
        assert!(Level::Error > Level::Warn);
        assert!(Level::Trace < Level::Debug);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("error".parse::<Level>().unwrap(), Level::Error);
        assert_eq!("WARNING".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("fatal".parse::<Level>().unwrap(), Level::Critical);
        assert!("bogus".parse::<Level>().is_err());
    }

    #[test]
    fn default_protected_set_contains_error_and_critical() {
        let protected = ProtectedLevels::default_protected();
        assert!(protected.contains(Level::Error));
        assert!(protected.contains(Level::Critical));
        assert!(!protected.contains(Level::Info));
    }
}
