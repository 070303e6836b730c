// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Stage Contracts
//!
//! The staged transformation pipeline (spec §4.3) is a fixed ordering of
//! four stage kinds — filters, enrichers, redactors, processors — each with
//! its own narrow trait so a misplaced implementation (a redactor that tries
//! to drop an envelope, say) doesn't typecheck. All four are synchronous and
//! pure with respect to the envelope: a stage may read process-wide state
//! (a clock, a static allow-list) but must not perform its own I/O — that is
//! the sink's job.
//!
//! Every stage method returns a [`StageOutcome`] (or, for filters, a
//! [`FilterDecision`]) rather than panicking; the worker contains a failing
//! stage to a single envelope and continues the pipeline with the
//! envelope unchanged (spec §4.3 "per-stage error containment").

use crate::envelope::Envelope;
use crate::serialized::SerializedView;

/// What a filter decides about one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Keep,
    Drop,
}

/// Outcome of a non-filter stage: either the (possibly mutated) envelope
/// continues, or the stage failed and the envelope continues unmodified.
#[derive(Debug)]
pub enum StageOutcome {
    Continue(Envelope),
    Failed { envelope: Envelope, reason: String },
}

impl StageOutcome {
    /// Unwraps to the envelope regardless of whether the stage failed,
    /// implementing "continue with envelope unchanged" containment.
    pub fn into_envelope(self) -> Envelope {
        match self {
            StageOutcome::Continue(e) => e,
            StageOutcome::Failed { envelope, .. } => envelope,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            StageOutcome::Continue(_) => None,
            StageOutcome::Failed { reason, .. } => Some(reason),
        }
    }
}

/// Decides whether an envelope proceeds past admission (level threshold,
/// logger allow/deny list, sampling). Takes the envelope by value and hands
/// it back so a sampling filter can annotate `stage_metadata` (the sampling
/// rate applied, the adaptive weight) before the decision is acted on,
/// without a separate mutation pass over envelopes that get dropped anyway.
pub trait Filter: Send + Sync {
    fn name(&self) -> &str;
    fn decide(&self, envelope: Envelope) -> (FilterDecision, Envelope);
}

/// Attaches derived fields (hostname, process id, sampling rate) without
/// removing any existing field.
pub trait Enricher: Send + Sync {
    fn name(&self) -> &str;
    fn enrich(&self, envelope: Envelope) -> StageOutcome;
}

/// Masks or removes sensitive field values (spec §4.5). Runs after
/// enrichment so that derived fields are also subject to redaction.
pub trait Redactor: Send + Sync {
    fn name(&self) -> &str;
    fn redact(&self, envelope: Envelope) -> StageOutcome;
}

/// Byte-level transform over an already-serialized envelope (compression,
/// binary framing). Runs last, only when `serialize_in_flight` is enabled
/// (spec §4.7); most pipelines have zero processors.
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;
    fn process(&self, view: SerializedView) -> Result<SerializedView, String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use std::collections::BTreeMap;

    struct LevelFilter(Level);
    impl Filter for LevelFilter {
        fn name(&self) -> &str {
            "level_filter"
        }
        fn decide(&self, envelope: Envelope) -> (FilterDecision, Envelope) {
            let decision = if envelope.level >= self.0 { FilterDecision::Keep } else { FilterDecision::Drop };
            (decision, envelope)
        }
    }

    #[test]
    fn filter_drops_below_threshold() {
        let filter = LevelFilter(Level::Warn);
        let env = Envelope::new(1, Level::Debug, "app", "noise", BTreeMap::new());
        assert_eq!(filter.decide(env).0, FilterDecision::Drop);
    }

    #[test]
    fn stage_outcome_preserves_envelope_on_failure() {
        let env = Envelope::new(2, Level::Info, "app", "hi", BTreeMap::new());
        let outcome = StageOutcome::Failed {
            envelope: env,
            reason: "boom".to_string(),
        };
        assert_eq!(outcome.failure_reason(), Some("boom"));
        let recovered = outcome.into_envelope();
        assert_eq!(recovered.message, "hi");
    }
}
