//! Running → ShuttingDown lifecycle of a conversion unit.
//!
//! The transition happens exactly once, triggered either by the host or by a
//! process signal. All clones of a [`Lifecycle`] share the same state, so a
//! host can hand one to a signal watcher and keep another for its main loop.

use serde::Serialize;
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Running,
    ShuttingDown,
}

/// What triggered the shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownReason {
    /// The host asked the unit to unload
    HostRequest,
    /// The process received an interrupt
    Signal,
}

/// Shared lifecycle handle.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    token: CancellationToken,
    reason: Arc<OnceLock<ShutdownReason>>,
}

impl Lifecycle {
    /// Create a lifecycle in the running state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        if self.token.is_cancelled() {
            LifecycleState::ShuttingDown
        } else {
            LifecycleState::Running
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Reason recorded by the first shutdown, if any.
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    /// Move to ShuttingDown.
    ///
    /// Returns `true` only for the call that performed the transition; later
    /// calls are no-ops and keep the original reason.
    pub fn shutdown(&self, reason: ShutdownReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        if first {
            tracing::info!("Shutting down ({:?})", reason);
        }
        self.token.cancel();
        first
    }

    /// Resolves once the unit has left the running state.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Wait for an interrupt and shut down on it.
    ///
    /// Returns early if something else shuts the unit down first. The reason
    /// returned is whichever transition won.
    pub async fn watch_signals(&self) -> ShutdownReason {
        tokio::select! {
            _ = self.token.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => {
                        self.shutdown(ShutdownReason::Signal);
                    }
                    Err(e) => {
                        tracing::warn!("Cannot listen for interrupt: {}", e);
                        self.token.cancelled().await;
                    }
                }
            }
        }
        self.reason().unwrap_or(ShutdownReason::Signal)
    }
}
