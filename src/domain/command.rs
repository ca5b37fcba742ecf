//! Command result and risk classification types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a completed `Session::send` call.
///
/// A timed-out command is not an error: the session returns whatever
/// output was buffered and stays usable for the next command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Normalized output with echo and trailing prompt stripped
    pub output: String,
    /// True when no prompt arrived within the command timeout
    pub timed_out: bool,
}

impl CommandOutcome {
    pub fn complete(output: String) -> Self {
        Self {
            output,
            timed_out: false,
        }
    }

    pub fn timed_out(partial: String) -> Self {
        Self {
            output: partial,
            timed_out: true,
        }
    }
}

/// Coarse classification of how destructive a suggested command may be
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
