//! Session state machine and the caller-facing `Session` handle

mod engine;

pub use engine::{CredentialPrompt, Session, SessionContext};
