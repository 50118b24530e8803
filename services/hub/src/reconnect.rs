//! Reconnection state machine pieces
//!
//! Per-adapter attempt tracking and the fixed backoff schedule. The loop
//! that drives recovery lives in the hub, which owns the sessions and the
//! subscription table; this module keeps the state transitions and delay
//! arithmetic testable on their own.

use serde::Serialize;
use std::time::Duration;

/// Observable connection state for one adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    /// Session established and expected to deliver data
    Connected,
    /// No session, no recovery in progress
    Disconnected,
    /// Recovery loop running
    Reconnecting,
    /// Recovery exhausted or connect failed; manual intervention required
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
            ConnectionState::Error => write!(f, "error"),
        }
    }
}

/// Per-adapter reconnection bookkeeping
///
/// `is_reconnecting` is the re-entrancy guard: at most one recovery loop per
/// adapter, no matter how many disconnect events or heartbeat timeouts fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconnectionState {
    /// Attempts made in the current recovery episode
    pub attempt: u32,
    /// Whether a recovery loop is currently running
    pub is_reconnecting: bool,
}

impl ReconnectionState {
    /// Reset after a successful (re)connect
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.is_reconnecting = false;
    }
}

/// Delay before the given attempt (0-based), clamped to the schedule's last
/// entry so late attempts wait the maximum rather than an ever-growing delay
pub fn backoff_delay(schedule_ms: &[u64], attempt: u32) -> Duration {
    debug_assert!(!schedule_ms.is_empty());
    let index = (attempt as usize).min(schedule_ms.len().saturating_sub(1));
    Duration::from_millis(schedule_ms.get(index).copied().unwrap_or(1_000))
}
