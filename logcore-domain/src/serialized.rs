// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Serialized View
//!
//! An immutable byte window of an envelope's canonical JSON form, produced
//! once per batch when `serialize_in_flush` is enabled (spec §4.7). Shared
//! by the processor stage (which transforms bytes) and by sinks that prefer
//! pre-serialized writes.

use std::sync::Arc;

/// Opaque immutable byte window. Cheap to clone (`Arc`-backed) since a
/// batch may hand the same view to several sinks concurrently.
#[derive(Debug, Clone)]
pub struct SerializedView {
    bytes: Arc<[u8]>,
}

impl SerializedView {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes: bytes.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for SerializedView {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}
