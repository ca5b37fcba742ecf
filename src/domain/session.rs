//! Session identity and connection profile types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for an open session
pub type SessionId = Uuid;

/// Connection parameters for a remote shell session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionProfile {
    pub hostname: String,
    pub port: u16,
    pub username: String,
}

impl SessionProfile {
    pub fn new(hostname: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            username: username.into(),
        }
    }

    /// Socket address string (`host:port`)
    pub fn addr(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

impl fmt::Display for SessionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.hostname, self.port)
    }
}

/// How to authenticate against the remote host
#[derive(Debug, Clone)]
pub enum AuthMethod {
    Password(String),
    KeyFile(PathBuf),
    Agent,
}

/// OS family of the remote host, inferred by probing the shell post-connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    Macos,
    Cisco,
    Windows,
    #[default]
    Unknown,
}

impl OsFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Linux => "linux",
            OsFamily::Macos => "macos",
            OsFamily::Cisco => "cisco",
            OsFamily::Windows => "windows",
            OsFamily::Unknown => "unknown",
        }
    }

    /// Classify the reply of a one-shot `uname -s` probe.
    ///
    /// Cisco IOS and Windows shells reject `uname` with recognizable
    /// error text, which is itself a useful fingerprint.
    pub fn from_probe(output: &str) -> Self {
        let lower = output.to_lowercase();
        if lower.contains("linux") {
            OsFamily::Linux
        } else if lower.contains("darwin") {
            OsFamily::Macos
        } else if lower.contains("invalid input") || lower.contains("incomplete command") {
            OsFamily::Cisco
        } else if lower.contains("is not recognized") || lower.contains("windows") {
            OsFamily::Windows
        } else {
            OsFamily::Unknown
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle phase of a session's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Channel opened, waiting for the login prompt and OS probe
    Connecting,
    /// Idle, ready to accept a command
    Ready,
    /// A command is in flight, collecting output until the prompt returns
    AwaitingOutput,
    /// A sudo password prompt was detected; waiting on the credential provider
    SudoPassword,
    /// Terminal state; a closed session is never resurrected
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_classifies_common_replies() {
        assert_eq!(OsFamily::from_probe("Linux\n"), OsFamily::Linux);
        assert_eq!(OsFamily::from_probe("Darwin\n"), OsFamily::Macos);
        assert_eq!(
            OsFamily::from_probe("% Invalid input detected at '^' marker."),
            OsFamily::Cisco
        );
        assert_eq!(
            OsFamily::from_probe("'uname' is not recognized as an internal or external command"),
            OsFamily::Windows
        );
        assert_eq!(OsFamily::from_probe(""), OsFamily::Unknown);
    }
}
