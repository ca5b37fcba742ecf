//! CLI command implementations

pub mod cleanup;
pub mod connect;
pub mod init;
pub mod suggest;
