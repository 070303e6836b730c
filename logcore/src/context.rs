// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bound Context Storage
//!
//! Where `logcore_domain::BoundContext` actually lives per task (spec
//! §4.1). A Tokio task-local is the natural fit for "binds fields for the
//! lifetime of the current async task" — it survives `.await` points within
//! the same task. Task-locals are *not* inherited by a plain `tokio::spawn`:
//! a spawned child runs as its own task with its own (empty) task-local
//! slot, regardless of whether the spawn happens inside a `with_context`
//! scope. Callers who need a child task to see the parent's bound fields
//! must propagate them explicitly — [`spawn_with_context`] does this by
//! snapshotting the parent's context and re-scoping it into the child.

use logcore_domain::{BoundContext, FieldValue};
use std::cell::RefCell;
use std::collections::BTreeMap;

tokio::task_local! {
    static CURRENT_CONTEXT: RefCell<BoundContext>;
}

/// Restores the bound context to whatever it was before the `bind`/`unbind`/
/// `clear` call that produced this guard, once dropped (spec §4.1/§4.9:
/// `bind` returns a scope whose drop restores the prior context atomically).
/// Outside of a `with_context` scope there is nothing to restore, so drop is
/// a no-op.
#[must_use = "context reverts when this guard is dropped"]
pub struct Scope {
    previous: Option<BoundContext>,
}

impl Drop for Scope {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            let _ = CURRENT_CONTEXT.try_with(|ctx| *ctx.borrow_mut() = previous);
        }
    }
}

/// Runs `f` with a fresh bound context scope. Binds made inside `f` (via
/// [`bind`]) are only visible for the duration of this scope.
pub async fn with_context<F, Fut, T>(f: F) -> T
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = T>,
{
    CURRENT_CONTEXT.scope(RefCell::new(BoundContext::new()), f()).await
}

/// Spawns `f` as a new Tokio task, explicitly propagating a snapshot of the
/// calling task's bound context into it. Unlike a bare `tokio::spawn`, the
/// child observes whatever fields are currently bound in the parent at the
/// moment of the call; later binds in either task are independent of each
/// other from that point on.
pub fn spawn_with_context<F, Fut>(f: F) -> tokio::task::JoinHandle<Fut::Output>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: std::future::Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    let snapshot = CURRENT_CONTEXT.try_with(|ctx| ctx.borrow().clone()).unwrap_or_default();
    tokio::spawn(CURRENT_CONTEXT.scope(RefCell::new(snapshot), f()))
}

/// Binds a field into the current task's context, if one is active.
/// Outside of a `with_context` scope, this is a no-op — mirroring the
/// donor's own preference for graceful degradation over panicking on
/// missing ambient state. The returned [`Scope`] restores the prior context
/// when dropped.
#[must_use = "context reverts when the returned Scope is dropped"]
pub fn bind(key: impl Into<String>, value: impl Into<FieldValue>) -> Scope {
    let previous = CURRENT_CONTEXT.try_with(|ctx| {
        let previous = ctx.borrow().clone();
        ctx.borrow_mut().bind(key, value);
        previous
    });
    Scope { previous: previous.ok() }
}

#[must_use = "context reverts when the returned Scope is dropped"]
pub fn unbind(key: &str) -> Scope {
    let previous = CURRENT_CONTEXT.try_with(|ctx| {
        let previous = ctx.borrow().clone();
        ctx.borrow_mut().unbind(key);
        previous
    });
    Scope { previous: previous.ok() }
}

#[must_use = "context reverts when the returned Scope is dropped"]
pub fn clear() -> Scope {
    let previous = CURRENT_CONTEXT.try_with(|ctx| {
        let previous = ctx.borrow().clone();
        ctx.borrow_mut().clear();
        previous
    });
    Scope { previous: previous.ok() }
}

/// Returns the fields merged over `caller_fields`, with caller fields
/// winning on collision (spec §4.1). Returns `caller_fields` unchanged when
/// no context scope is active.
pub fn merged_with_current(caller_fields: BTreeMap<String, FieldValue>) -> BTreeMap<String, FieldValue> {
    CURRENT_CONTEXT
        .try_with(|ctx| ctx.borrow().clone().merged_over(&caller_fields))
        .unwrap_or(caller_fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_is_visible_within_scope_and_merges() {
        with_context(|| async {
            bind("request_id", "abc-123");
            let merged = merged_with_current(BTreeMap::new());
            assert_eq!(merged.get("request_id"), Some(&FieldValue::from("abc-123")));
        })
        .await;
    }

    #[tokio::test]
    async fn caller_fields_win_on_collision() {
        with_context(|| async {
            bind("region", "us-east-1");
            let mut caller = BTreeMap::new();
            caller.insert("region".to_string(), FieldValue::from("eu-west-1"));
            let merged = merged_with_current(caller);
            assert_eq!(merged.get("region"), Some(&FieldValue::from("eu-west-1")));
        })
        .await;
    }

    #[tokio::test]
    async fn bind_outside_scope_is_noop() {
        bind("x", "y");
        let merged = merged_with_current(BTreeMap::new());
        assert!(merged.is_empty());
    }
}
