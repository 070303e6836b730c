// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sink Routing
//!
//! Level-based fan-out rules (spec §4.6/§4.8): each rule names a minimum
//! level and the set of sink names that should receive envelopes at or
//! above it. A single envelope may match several rules; whether it is
//! fanned out to the union of their sink sets or only the first matching
//! rule's sinks is controlled by `union_on_overlap`.

use crate::config::RoutingConfig;
use crate::level::Level;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct RoutingRule {
    pub min_level: Level,
    pub sinks: BTreeSet<String>,
}

impl RoutingRule {
    pub fn new(min_level: Level, sinks: impl IntoIterator<Item = String>) -> Self {
        Self {
            min_level,
            sinks: sinks.into_iter().collect(),
        }
    }

    pub fn matches(&self, level: Level) -> bool {
        level >= self.min_level
    }
}

/// An ordered set of routing rules plus a default fan-out set applied when
/// no rule matches.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    rules: Vec<RoutingRule>,
    default_sinks: BTreeSet<String>,
    /// When true, every matching rule's sinks are unioned; when false, only
    /// the first matching rule (in registration order) contributes its
    /// sinks (spec §4.8).
    union_on_overlap: bool,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default_sinks: BTreeSet::new(),
            union_on_overlap: true,
        }
    }
}

impl RoutingTable {
    pub fn new(default_sinks: impl IntoIterator<Item = String>) -> Self {
        Self {
            rules: Vec::new(),
            default_sinks: default_sinks.into_iter().collect(),
            union_on_overlap: true,
        }
    }

    /// Builds a table from a resolved `RoutingConfig` (spec §4.8/§6): the
    /// one path that turns `LoggerConfig.routing`'s declarative rules and
    /// default sinks into the table `SinkFanout::dispatch` actually resolves
    /// against.
    pub fn from_config(config: &RoutingConfig) -> Self {
        let mut table = Self {
            rules: Vec::with_capacity(config.rules.len()),
            default_sinks: config.default_sinks.iter().cloned().collect(),
            union_on_overlap: config.union_on_overlap,
        };
        for entry in &config.rules {
            table.add_rule(RoutingRule::new(entry.min_level, entry.sinks.iter().cloned()));
        }
        table
    }

    pub fn add_rule(&mut self, rule: RoutingRule) {
        self.rules.push(rule);
    }

    /// Resolves the sink set for `level`: the union of every matching
    /// rule's sinks when `union_on_overlap` is true, otherwise only the
    /// first matching rule's sinks. Falls back to `default_sinks` when
    /// nothing matches (spec §4.8).
    pub fn resolve(&self, level: Level) -> BTreeSet<String> {
        if self.union_on_overlap {
            let mut matched: BTreeSet<String> = self
                .rules
                .iter()
                .filter(|r| r.matches(level))
                .flat_map(|r| r.sinks.iter().cloned())
                .collect();

            if matched.is_empty() {
                matched = self.default_sinks.clone();
            }
            matched
        } else {
            match self.rules.iter().find(|r| r.matches(level)) {
                Some(rule) => rule.sinks.clone(),
                None => self.default_sinks.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_when_no_rule_matches() {
        let table = RoutingTable::new(["stdout".to_string()]);
        let sinks = table.resolve(Level::Info);
        assert_eq!(sinks, ["stdout".to_string()].into_iter().collect());
    }

    #[test]
    fn union_of_matching_rules() {
        let mut table = RoutingTable::new(Vec::<String>::new());
        table.add_rule(RoutingRule::new(Level::Info, ["stdout".to_string()]));
        table.add_rule(RoutingRule::new(Level::Error, ["pager".to_string()]));

        let sinks = table.resolve(Level::Error);
        assert!(sinks.contains("stdout"));
        assert!(sinks.contains("pager"));
    }

    #[test]
    fn below_all_thresholds_uses_default() {
        let mut table = RoutingTable::new(["fallback".to_string()]);
        table.add_rule(RoutingRule::new(Level::Warn, ["stdout".to_string()]));

        let sinks = table.resolve(Level::Debug);
        assert_eq!(sinks, ["fallback".to_string()].into_iter().collect());
    }

    #[test]
    fn first_match_wins_when_overlap_disabled() {
        let mut table = RoutingTable::new(Vec::<String>::new());
        table.add_rule(RoutingRule::new(Level::Info, ["stdout".to_string()]));
        table.add_rule(RoutingRule::new(Level::Error, ["pager".to_string()]));
        table.union_on_overlap = false;

        let sinks = table.resolve(Level::Error);
        assert_eq!(sinks, ["stdout".to_string()].into_iter().collect());
    }

    #[test]
    fn from_config_builds_rules_and_overlap_flag() {
        let config = RoutingConfig {
            rules: vec![crate::config::SinkRoutingEntry {
                min_level: Level::Error,
                sinks: vec!["pager".to_string()],
            }],
            default_sinks: vec!["stdout".to_string()],
            union_on_overlap: false,
        };
        let table = RoutingTable::from_config(&config);
        assert_eq!(table.resolve(Level::Error), ["pager".to_string()].into_iter().collect());
        assert_eq!(table.resolve(Level::Info), ["stdout".to_string()].into_iter().collect());
    }
}
