// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Built-in enrichers (spec §4.6.2): each contributes a map of fields to
//! merge into the envelope. The worker runs enrichers with bounded
//! concurrency and merges their outputs with "later enricher in configured
//! order wins" tie-breaking; this module only supplies the per-enricher
//! `enrich` contract, not the merge/concurrency orchestration (owned by
//! `crate::worker`).

use logcore_domain::{BoundContext, Enricher, Envelope, FieldValue, StageOutcome};
use std::collections::BTreeMap;

/// Attaches static process-wide metadata (hostname, process id) captured
/// once at construction.
pub struct HostMetadataEnricher {
    fields: BTreeMap<String, FieldValue>,
}

impl HostMetadataEnricher {
    pub fn new() -> Self {
        let mut fields = BTreeMap::new();
        if let Ok(hostname) = hostname_best_effort() {
            fields.insert("host".to_string(), FieldValue::from(hostname));
        }
        fields.insert("pid".to_string(), FieldValue::from(std::process::id()));
        Self { fields }
    }
}

impl Default for HostMetadataEnricher {
    fn default() -> Self {
        Self::new()
    }
}

fn hostname_best_effort() -> Result<String, std::io::Error> {
    std::env::var("HOSTNAME").or_else(|_| std::env::var("COMPUTERNAME")).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "hostname unavailable")
    })
}

impl Enricher for HostMetadataEnricher {
    fn name(&self) -> &str {
        "host_metadata"
    }

    fn enrich(&self, mut envelope: Envelope) -> StageOutcome {
        for (k, v) in &self.fields {
            envelope.fields.insert(k.clone(), v.clone());
        }
        StageOutcome::Continue(envelope)
    }
}

/// Merges a snapshot of the caller's bound context into the envelope,
/// without overwriting fields the caller passed explicitly at the call
/// site (spec §4.1: caller fields win on collision; the snapshot is merged
/// in first so that later per-call fields still take precedence when the
/// worker applies them).
pub struct ContextSnapshotEnricher {
    snapshot: BoundContext,
}

impl ContextSnapshotEnricher {
    pub fn new(snapshot: BoundContext) -> Self {
        Self { snapshot }
    }
}

impl Enricher for ContextSnapshotEnricher {
    fn name(&self) -> &str {
        "context_snapshot"
    }

    fn enrich(&self, mut envelope: Envelope) -> StageOutcome {
        for (k, v) in self.snapshot.iter() {
            envelope.fields.entry(k.clone()).or_insert_with(|| v.clone());
        }
        StageOutcome::Continue(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_metadata_adds_pid() {
        let enricher = HostMetadataEnricher::new();
        let env = Envelope::new(0, logcore_domain::Level::Info, "app", "hi", BTreeMap::new());
        let out = enricher.enrich(env).into_envelope();
        assert!(out.fields.contains_key("pid"));
    }

    #[test]
    fn context_snapshot_does_not_override_existing_fields() {
        let mut ctx = BoundContext::new();
        ctx.bind("region", "us-east-1");
        let enricher = ContextSnapshotEnricher::new(ctx);

        let mut fields = BTreeMap::new();
        fields.insert("region".to_string(), FieldValue::from("eu-west-1"));
        let env = Envelope::new(0, logcore_domain::Level::Info, "app", "hi", fields);

        let out = enricher.enrich(env).into_envelope();
        assert_eq!(out.fields.get("region"), Some(&FieldValue::from("eu-west-1")));
    }
}
