//! Core domain types for Aerie

mod command;
mod event;
mod session;

pub use command::{CommandOutcome, RiskTier};
pub use event::{CloseReason, SessionEvent};
pub use session::{AuthMethod, OsFamily, SessionId, SessionPhase, SessionProfile};
