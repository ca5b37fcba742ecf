//! Typed session events published by the orchestrator.
//!
//! A fixed enum of event kinds with strongly typed payloads replaces
//! callback-style hooks; subscribers receive every event for every session.

use super::session::{OsFamily, SessionId, SessionProfile};

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// `Session::close` was called
    Requested,
    /// The channel reported a fault or EOF
    ChannelFault,
}

/// Events emitted over the orchestrator's event bus
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A session finished connecting and probing
    Opened {
        id: SessionId,
        profile: SessionProfile,
        os: OsFamily,
    },
    /// A command resolved (normally or by timeout)
    CommandCompleted {
        id: SessionId,
        command: String,
        timed_out: bool,
    },
    /// A session reached its terminal state
    Closed { id: SessionId, reason: CloseReason },
}
