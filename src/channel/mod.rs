//! Channel adapter: the only module that touches the network primitive.
//!
//! A `ShellChannel` is a duplex byte stream for one remote shell. Reads are
//! cooperative polls bounded by a timeout; "no data yet" is `Empty`, not an
//! error. Writes are fire-and-forget: a delivery failure surfaces on the
//! next read as `Closed`.

mod pump;
mod ssh;

pub use pump::{spawn_pump, ChannelHandle, ChunkEvent};
pub use ssh::SshConnector;

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{AuthMethod, SessionProfile};
use crate::error::ChannelError;

/// Outcome of one bounded read attempt
#[derive(Debug)]
pub enum ChannelRead {
    Data(Vec<u8>),
    /// Nothing arrived within the timeout
    Empty,
    /// Remote side is gone; fatal to the owning session
    Closed,
}

/// Raw bytes-in/bytes-out shell channel.
///
/// `read_chunk` must never block longer than `timeout`.
pub trait ShellChannel: Send {
    fn read_chunk(&mut self, timeout: Duration) -> Result<ChannelRead, ChannelError>;
    fn write(&mut self, bytes: &[u8]) -> Result<(), ChannelError>;
    fn close(&mut self);
}

/// Opens shell channels. Implemented over ssh2 in production and by
/// scripted fakes in tests.
#[async_trait]
pub trait ShellConnector: Send + Sync {
    async fn connect(
        &self,
        profile: &SessionProfile,
        auth: &AuthMethod,
    ) -> Result<Box<dyn ShellChannel>, ChannelError>;
}
