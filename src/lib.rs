//! Aerie - adaptive remote-shell session engine
//!
//! Aerie turns a blocking, chunked, ANSI-polluted SSH shell channel into a
//! clean command/response protocol, and layers a learning assistant on top:
//! every completed command is recorded into a frequency ledger bucketed by
//! context, and ranked suggestions, canned output analysis, and risk tiers
//! are served back without ever blocking the session.
//!
//! ## Architecture
//!
//! One [`orchestrator::Orchestrator`] owns the shared ledger and event bus
//! and hands out [`session::Session`] handles. Each session runs two
//! long-lived workers: a pump thread that owns the blocking channel, and an
//! engine task that normalizes output, drives the state machine, and
//! resolves the single in-flight command.

pub mod channel;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod intel;
pub mod ledger;
pub mod normalize;
pub mod orchestrator;
pub mod session;

pub use domain::*;
pub use error::{ChannelError, SessionError};
