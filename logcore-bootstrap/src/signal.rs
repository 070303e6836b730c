// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Process Signal Handling
//!
//! Installs SIGTERM/SIGINT handlers (and, on Unix, SIGHUP) that initiate
//! [`ShutdownCoordinator`] shutdown. This exists to satisfy spec §4.9: "On
//! process exit without `stop_and_drain`, the logger detects the uncleaned
//! state and emits a one-shot warning; a best-effort drain with a short
//! deadline is attempted." A facade that never calls this module still
//! behaves correctly; this is an optional convenience for binaries that want
//! the runtime to drain itself on Ctrl-C.
//!
//! ## Usage
//!
//! ```no_run
//! use logcore_bootstrap::shutdown::ShutdownCoordinator;
//! use logcore_bootstrap::signal;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let coordinator = ShutdownCoordinator::new(Duration::from_secs(3));
//!     signal::spawn_shutdown_listener(coordinator.clone());
//!
//!     coordinator.token().cancelled().await;
//!     // drain and exit
//! }
//! ```

use crate::shutdown::ShutdownCoordinator;

/// Spawns a background task that waits for SIGTERM/SIGINT (SIGHUP on Unix)
/// and calls [`ShutdownCoordinator::initiate_shutdown`] exactly once.
///
/// Returns the `JoinHandle` so callers may await it during their own
/// shutdown sequence, though this is optional — the coordinator's token is
/// the primary signal other tasks should observe.
pub fn spawn_shutdown_listener(coordinator: ShutdownCoordinator) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::warn!("received termination signal, initiating graceful shutdown");
        coordinator.initiate_shutdown();
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut int = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut hup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    tokio::select! {
        _ = term.recv() => {}
        _ = int.recv() => {}
        _ = hup.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn listener_does_not_fire_without_signal() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
        let _handle = spawn_shutdown_listener(coordinator.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!coordinator.is_shutting_down());
    }
}
