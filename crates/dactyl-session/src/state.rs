//! Session lifecycle states and transition records.
//!
//! # Valid Transitions
//!
//! - Uninitialized → PermissionPending → Ready
//! - Uninitialized → Ready
//! - Ready → Capturing → Ready
//! - any → Error
//! - any → Uninitialized (close)
//!
//! # Examples
//!
//! ```
//! use dactyl_session::SessionState;
//!
//! assert!(SessionState::Uninitialized.can_transition_to(&SessionState::PermissionPending));
//! assert!(!SessionState::Uninitialized.can_transition_to(&SessionState::Capturing));
//! assert!(SessionState::Capturing.can_transition_to(&SessionState::Uninitialized));
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Lifecycle state of a device session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No device handle held; geometry is zero.
    #[default]
    Uninitialized,

    /// USB permission was requested; `initialize()` must be retried.
    PermissionPending,

    /// Device open, geometry known, ready for commands.
    Ready,

    /// An acquisition is in flight.
    Capturing,

    /// Setup failed after the device was opened. Only `close()` is defined.
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            SessionState::Uninitialized => "Uninitialized",
            SessionState::PermissionPending => "PermissionPending",
            SessionState::Ready => "Ready",
            SessionState::Capturing => "Capturing",
            SessionState::Error => "Error",
        };
        write!(f, "{}", state_str)
    }
}

impl SessionState {
    /// Check if transition to target state is valid from this state.
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        matches!(
            (self, target),
            // Teardown and failure are reachable from everywhere
            (_, SessionState::Uninitialized)
            | (_, SessionState::Error)
            // From Uninitialized
            | (SessionState::Uninitialized, SessionState::PermissionPending | SessionState::Ready)
            // From PermissionPending (retry after grant)
            | (SessionState::PermissionPending, SessionState::Ready)
            // Capture loop
            | (SessionState::Ready, SessionState::Capturing)
            | (SessionState::Capturing, SessionState::Ready)
        )
    }

    /// True for `Ready` and `Capturing`, the states with an open device.
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready | SessionState::Capturing)
    }
}

/// Represents a single state transition with timestamp.
///
/// The `timestamp` field is not serialized as `Instant` is process-specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: SessionState,
    pub to: SessionState,

    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl StateTransition {
    pub fn new(from: SessionState, to: SessionState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    /// Get the duration since this transition occurred.
    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}
