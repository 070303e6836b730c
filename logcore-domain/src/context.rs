// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bound Context
//!
//! `BoundContext` is the ordered field map that `bind`/`unbind`/`clear`
//! mutate per task or thread (spec §4.1). This module owns only the data
//! structure and merge semantics; *where* a context snapshot lives (a Tokio
//! task-local versus a `thread_local!`) is a facade concern in `logcore`,
//! since the domain layer must not depend on a specific async runtime.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A structured field value. Nested maps let enrichers attach structured
/// metadata (e.g. `host: { name, region }`) without flattening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Map(BTreeMap<String, FieldValue>),
    Array(Vec<FieldValue>),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => f.write_str(s),
            FieldValue::Int(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Null => f.write_str("null"),
            FieldValue::Map(_) | FieldValue::Array(_) => {
                write!(f, "{}", serde_json::to_string(self).unwrap_or_default())
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(v: $t) -> Self {
                FieldValue::Int(v as i64)
            }
        })*
    };
}
impl_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

/// An ordered field map carried implicitly by every envelope emitted within
/// a `bind` scope.
///
/// Keys are kept in a `BTreeMap` so that snapshots are deterministic
/// (important for tests asserting on serialized output), at the cost of
/// losing caller insertion order — the spec does not require the external
/// form to preserve bind order, only that the bound fields are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundContext {
    fields: BTreeMap<String, FieldValue>,
}

impl BoundContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn unbind(&mut self, key: &str) {
        self.fields.remove(key);
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Merges `other` on top of `self`, with `other` winning on key
    /// collision. Used to merge a caller's per-call fields over the bound
    /// context snapshot (spec §4.1: "caller fields override context fields
    /// on key collision").
    pub fn merged_over(mut self, other: &BTreeMap<String, FieldValue>) -> BTreeMap<String, FieldValue> {
        for (k, v) in other {
            self.fields.insert(k.clone(), v.clone());
        }
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_fields_override_context_on_collision() {
        let mut ctx = BoundContext::new();
        ctx.bind("request_id", "ctx-value");
        ctx.bind("region", "us-east-1");

        let mut caller_fields = BTreeMap::new();
        caller_fields.insert("request_id".to_string(), FieldValue::from("caller-value"));

        let merged = ctx.merged_over(&caller_fields);
        assert_eq!(merged.get("request_id"), Some(&FieldValue::from("caller-value")));
        assert_eq!(merged.get("region"), Some(&FieldValue::from("us-east-1")));
    }

    #[test]
    fn unbind_removes_single_key() {
        let mut ctx = BoundContext::new();
        ctx.bind("a", 1);
        ctx.bind("b", 2);
        ctx.unbind("a");
        assert!(ctx.iter().all(|(k, _)| k != "a"));
    }

    #[test]
    fn clear_empties_context() {
        let mut ctx = BoundContext::new();
        ctx.bind("a", 1);
        ctx.clear();
        assert!(ctx.is_empty());
    }
}
