//! Risk tiering for suggested commands.
//!
//! A fixed keyword vocabulary, matched against whole tokens of the
//! command. Token matching keeps words that merely contain a keyword
//! (e.g. "confirm") out of the High tier.

use crate::domain::RiskTier;

/// Destructive filesystem and disk operations
const HIGH_RISK: &[&str] = &["rm", "mkfs", "dd", "fdisk", "format", "shred"];

/// Permission, mount, and process-control operations
const MEDIUM_RISK: &[&str] = &["chmod", "chown", "mount", "umount", "kill", "killall"];

/// Classify how destructive a command may be. Unmatched commands are Low.
pub fn assess_risk(command: &str) -> RiskTier {
    let lower = command.to_lowercase();
    let tokens: Vec<&str> = lower.split_whitespace().collect();

    let hits = |vocab: &[&str]| {
        tokens
            .iter()
            .any(|t| vocab.contains(t) || (t.starts_with("mkfs.") && vocab.contains(&"mkfs")))
    };

    if hits(HIGH_RISK) {
        RiskTier::High
    } else if hits(MEDIUM_RISK) {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destructive_commands_are_high() {
        assert_eq!(assess_risk("rm -rf /data"), RiskTier::High);
        assert_eq!(assess_risk("mkfs.ext4 /dev/sda1"), RiskTier::High);
        assert_eq!(assess_risk("dd if=/dev/zero of=/dev/sda"), RiskTier::High);
        assert_eq!(assess_risk("sudo rm file.txt"), RiskTier::High);
    }

    #[test]
    fn permission_changes_are_medium() {
        assert_eq!(assess_risk("chmod 777 /etc/passwd"), RiskTier::Medium);
        assert_eq!(assess_risk("kill -9 1234"), RiskTier::Medium);
        assert_eq!(assess_risk("umount /mnt"), RiskTier::Medium);
    }

    #[test]
    fn everything_else_is_low() {
        assert_eq!(assess_risk("ls -la"), RiskTier::Low);
        assert_eq!(assess_risk("df -h"), RiskTier::Low);
        assert_eq!(assess_risk(""), RiskTier::Low);
    }

    #[test]
    fn containing_a_keyword_is_not_matching_it() {
        assert_eq!(assess_risk("confirm"), RiskTier::Low);
        assert_eq!(assess_risk("echo formatted"), RiskTier::Low);
        assert_eq!(assess_risk("ddrescue --help"), RiskTier::Low);
    }
}
