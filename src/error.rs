//! Error taxonomy for the session core.
//!
//! Command timeouts are deliberately absent here: a timeout is data
//! (`CommandOutcome.timed_out`), not an error, so callers can render it
//! without string-matching. Ledger write failures are logged and swallowed
//! by the writer task and never surface as errors either.

use thiserror::Error;

/// Faults raised by the channel adapter. All of them are fatal to the
/// owning session; reconnection is the caller's policy decision.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ssh error: {0}")]
    Ssh(String),

    #[error("authentication failed for {user}@{host}")]
    AuthFailed { user: String, host: String },

    #[error("connect to {0} timed out")]
    ConnectTimeout(String),

    #[error("channel closed")]
    ChannelClosed,
}

impl From<ssh2::Error> for ChannelError {
    fn from(err: ssh2::Error) -> Self {
        ChannelError::Ssh(err.to_string())
    }
}

/// Errors surfaced by `Session` operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// A command is already in flight; commands are never queued
    #[error("a command is already in flight")]
    Busy,

    /// The session has ended; a closed session is never resurrected
    #[error("session is closed")]
    Closed,

    /// The credential provider cancelled a sudo password request
    #[error("credential prompt cancelled")]
    CredentialCancelled,

    #[error(transparent)]
    Channel(#[from] ChannelError),
}
