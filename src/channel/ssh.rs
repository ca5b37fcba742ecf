//! ssh2-backed shell channel.
//!
//! All blocking libssh2 calls happen either inside `spawn_blocking`
//! (connect/handshake/auth) or on the pump thread that owns the channel.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{ChannelRead, ShellChannel, ShellConnector};
use crate::domain::{AuthMethod, SessionProfile};
use crate::error::ChannelError;

const READ_BUF_SIZE: usize = 4096;
const WRITE_TIMEOUT_MS: u32 = 5_000;

/// Connects interactive shell channels over SSH
pub struct SshConnector {
    connect_timeout: Duration,
}

impl SshConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl ShellConnector for SshConnector {
    async fn connect(
        &self,
        profile: &SessionProfile,
        auth: &AuthMethod,
    ) -> Result<Box<dyn ShellChannel>, ChannelError> {
        let profile = profile.clone();
        let auth = auth.clone();
        let timeout = self.connect_timeout;

        tokio::task::spawn_blocking(move || connect_blocking(&profile, &auth, timeout))
            .await
            .map_err(|e| ChannelError::Ssh(format!("connect task panicked: {e}")))?
    }
}

fn connect_blocking(
    profile: &SessionProfile,
    auth: &AuthMethod,
    timeout: Duration,
) -> Result<Box<dyn ShellChannel>, ChannelError> {
    let addr = profile
        .addr()
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| ChannelError::Ssh(format!("no address for {}", profile.addr())))?;

    let tcp = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
        if e.kind() == std::io::ErrorKind::TimedOut {
            ChannelError::ConnectTimeout(profile.addr())
        } else {
            ChannelError::Io(e)
        }
    })?;

    let mut session = ssh2::Session::new()?;
    session.set_tcp_stream(tcp);
    session.set_timeout(timeout.as_millis() as u32);
    session.handshake()?;

    match auth {
        AuthMethod::Password(password) => {
            session.userauth_password(&profile.username, password)?
        }
        AuthMethod::KeyFile(path) => {
            session.userauth_pubkey_file(&profile.username, None, path, None)?
        }
        AuthMethod::Agent => session.userauth_agent(&profile.username)?,
    }
    if !session.authenticated() {
        return Err(ChannelError::AuthFailed {
            user: profile.username.clone(),
            host: profile.hostname.clone(),
        });
    }

    let mut channel = session.channel_session()?;
    channel.request_pty("xterm", None, None)?;
    channel.shell()?;

    debug!("Opened shell channel to {}", profile);
    Ok(Box::new(SshChannel { session, channel }))
}

/// An interactive shell over one ssh2 channel
struct SshChannel {
    /// Kept for per-call timeout control; the channel borrows it internally
    session: ssh2::Session,
    channel: ssh2::Channel,
}

impl ShellChannel for SshChannel {
    fn read_chunk(&mut self, timeout: Duration) -> Result<ChannelRead, ChannelError> {
        self.session.set_timeout(timeout.as_millis() as u32);

        let mut buf = [0u8; READ_BUF_SIZE];
        match self.channel.read(&mut buf) {
            Ok(0) => Ok(ChannelRead::Closed),
            Ok(n) => Ok(ChannelRead::Data(buf[..n].to_vec())),
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                Ok(ChannelRead::Empty)
            }
            Err(_) if self.channel.eof() => Ok(ChannelRead::Closed),
            Err(e) => Err(ChannelError::Io(e)),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        self.session.set_timeout(WRITE_TIMEOUT_MS);
        self.channel.write_all(bytes)?;
        self.channel.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        let _ = self.channel.close();
    }
}
