//! Connection lifecycle state machine.
//!
//! ```text
//! Idle ─► Discovering ─► Launching ─► Handshaking ─► ToolDiscovery ─► SourceBinding ─► Ready
//!  ▲                        ▲  │           │                                            │
//!  │                        └──┴───retry───┘                                            ▼
//!  │        (any in-progress state) ─► Failed ─────────────────────────────────────► Closing ─► Closed
//!  └────────────────────────────────────────── reload ◄──────────────────────────────────────┘
//! ```

use std::fmt;

use serde::Serialize;

use crate::error::{EngineError, EngineResult};

/// Where an engine's connection currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Idle,
    Discovering,
    Launching,
    Handshaking,
    ToolDiscovery,
    SourceBinding,
    Ready,
    Closing,
    Closed,
    Failed,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Discovering => "discovering",
            LifecycleState::Launching => "launching",
            LifecycleState::Handshaking => "handshaking",
            LifecycleState::ToolDiscovery => "tool-discovery",
            LifecycleState::SourceBinding => "source-binding",
            LifecycleState::Ready => "ready",
            LifecycleState::Closing => "closing",
            LifecycleState::Closed => "closed",
            LifecycleState::Failed => "failed",
        }
    }

    /// A load is underway and has not yet reached `Ready` or `Failed`.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            LifecycleState::Discovering
                | LifecycleState::Launching
                | LifecycleState::Handshaking
                | LifecycleState::ToolDiscovery
                | LifecycleState::SourceBinding
        )
    }

    /// Whether `self -> to` is a legal transition.
    pub fn can_transition_to(&self, to: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, to) {
            (Idle | Closed, Discovering) => true,
            (Discovering, Launching) => true,
            (Launching, Handshaking | Launching) => true,
            (Handshaking, ToolDiscovery | Launching) => true,
            (ToolDiscovery, SourceBinding) => true,
            (SourceBinding, Ready) => true,
            (from, Failed) => from.is_in_progress() || *from == Ready,
            (from, Closing) => from.is_in_progress() || matches!(from, Ready | Failed),
            (Closing, Closed) => true,
            _ => false,
        }
    }

    /// Human-readable description of the states `to` may be entered from.
    fn sources_of(to: LifecycleState) -> &'static str {
        use LifecycleState::*;
        match to {
            Idle => "nothing",
            Discovering => "idle or closed",
            Launching => "discovering, launching or handshaking",
            Handshaking => "launching",
            ToolDiscovery => "handshaking",
            SourceBinding => "tool-discovery",
            Ready => "source-binding",
            Closing => "a loading, ready or failed state",
            Closed => "closing",
            Failed => "a loading or ready state",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated lifecycle state holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    state: LifecycleState,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Idle,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Move to `to`, rejecting illegal transitions.
    pub fn transition(&mut self, to: LifecycleState, operation: &'static str) -> EngineResult<()> {
        if !self.state.can_transition_to(to) {
            return Err(EngineError::state(
                operation,
                LifecycleState::sources_of(to),
                self.state,
            ));
        }
        tracing::trace!(from = %self.state, to = %to, "lifecycle transition");
        self.state = to;
        Ok(())
    }

    /// Enter `Failed`. No-op if the current state can't fail.
    pub fn fail(&mut self) {
        if self.state.can_transition_to(LifecycleState::Failed) {
            tracing::debug!(from = %self.state, "lifecycle failed");
            self.state = LifecycleState::Failed;
        }
    }

    /// Check the current state is `expected` before `operation`.
    pub fn require(&self, expected: LifecycleState, operation: &'static str) -> EngineResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EngineError::state(operation, expected.as_str(), self.state))
        }
    }
}
