//! Output normalization for the raw shell byte stream.
//!
//! The session engine keeps the raw bytes it has received as an append-only
//! buffer and re-runs these pure functions over the whole accumulation on
//! every chunk. That makes each pass idempotent: no partial-match state
//! survives a chunk boundary, so a prompt or escape sequence split across
//! chunks is handled the same as one that arrived whole.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Substring printed by sudo when it wants a password. Checked before
/// prompt detection so the sudo sub-state wins.
pub const SUDO_PROMPT_MARKER: &str = "[sudo] password for";

/// Terminal control sequences: CSI (cursor moves, colors), OSC (title
/// changes, BEL- or ST-terminated), and the remaining 7-bit C1 escapes.
static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b(?:\[[0-?]*[ -/]*[@-~]|\][^\x07\x1b]*(?:\x07|\x1b\\)|[@-Z\\^_])")
        .expect("ANSI escape pattern is valid")
});

/// Remove terminal control sequences and carriage returns from `text`
pub fn strip_ansi(text: &str) -> String {
    let stripped = ANSI_ESCAPE.replace_all(text, "");
    let mut result = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        if c == '\r' {
            continue;
        }
        if c.is_ascii_control() && c != '\n' && c != '\t' {
            continue;
        }
        result.push(c);
    }
    result
}

/// Remove the locally-echoed copy of the just-sent command.
///
/// Only a leading `command` + newline is removed, and only once, so
/// legitimate repetitions of the command text inside real output survive.
pub fn suppress_echo(text: &str, command: &str) -> String {
    if command.is_empty() {
        return text.to_string();
    }
    if let Some(rest) = text.strip_prefix(command) {
        if let Some(rest) = rest.strip_prefix('\n') {
            return rest.to_string();
        }
    }
    text.to_string()
}

/// Detects shell readiness by matching the buffer tail against a prompt
/// pattern. The default pattern is derived from the session's username and
/// hostname; operators can override it for non-standard shells.
#[derive(Debug, Clone)]
pub struct PromptMatcher {
    re: Regex,
}

impl PromptMatcher {
    /// Build the standard `user@host:<path>$` / `#` matcher
    pub fn for_user_host(username: &str, hostname: &str) -> Result<Self> {
        let pattern = format!(
            r"{}@{}:[^\r\n]*[$#] ?$",
            regex::escape(username),
            regex::escape(hostname)
        );
        Self::from_pattern(&pattern)
    }

    /// Build a matcher from an operator-supplied pattern. The pattern is
    /// applied to the normalized buffer and should anchor on `$` itself.
    pub fn from_pattern(pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern)
            .with_context(|| format!("Invalid prompt pattern: {pattern}"))?;
        Ok(Self { re })
    }

    /// True when the buffer currently ends in a prompt. Re-run on every
    /// chunk; false on partial prompts still being received.
    pub fn matches_tail(&self, text: &str) -> bool {
        self.re.is_match(text)
    }

    /// Cut the trailing prompt (and nothing else) off the buffer
    pub fn strip_trailing_prompt<'a>(&self, text: &'a str) -> &'a str {
        match self.re.find(text) {
            Some(m) if m.end() == text.len() => &text[..m.start()],
            _ => text,
        }
    }
}

/// True when the buffer contains a sudo password request
pub fn is_sudo_prompt(text: &str) -> bool {
    text.contains(SUDO_PROMPT_MARKER)
}

/// Replace every occurrence of `secret` with masking characters
pub fn mask_secret(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, &"*".repeat(secret.chars().count()))
}

/// Full normalization pass: strip escapes, drop the echo, cut the trailing
/// prompt, and trim surrounding whitespace.
pub fn clean_output(raw: &str, command: &str, matcher: &PromptMatcher) -> String {
    let stripped = strip_ansi(raw);
    let without_echo = suppress_echo(&stripped, command);
    matcher.strip_trailing_prompt(&without_echo).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_color_and_cursor_sequences() {
        let raw = "\x1b[31merror\x1b[0m and \x1b[2Jdone";
        assert_eq!(strip_ansi(raw), "error and done");
    }

    #[test]
    fn strips_osc_title_sequences() {
        let raw = "\x1b]0;user@host: ~\x07real output";
        assert_eq!(strip_ansi(raw), "real output");
    }

    #[test]
    fn drops_carriage_returns() {
        assert_eq!(strip_ansi("line1\r\nline2\r"), "line1\nline2");
    }

    #[test]
    fn echo_removed_only_at_start() {
        let text = "ls -la\ntotal 4\nls -la appears here too\n";
        let cleaned = suppress_echo(text, "ls -la");
        assert_eq!(cleaned, "total 4\nls -la appears here too\n");
    }

    #[test]
    fn echo_not_removed_mid_buffer() {
        let text = "some output\nls -la\n";
        assert_eq!(suppress_echo(text, "ls -la"), text);
    }

    #[test]
    fn echo_removed_at_most_once() {
        let text = "pwd\npwd\n/home/user\n";
        assert_eq!(suppress_echo(text, "pwd"), "pwd\n/home/user\n");
    }

    #[test]
    fn prompt_detection_fires_once_across_chunk_boundaries() {
        let matcher = PromptMatcher::for_user_host("user", "host").unwrap();
        let chunks = ["/home/", "user\nuser@ho", "st:~", "$ "];

        let mut buffer = String::new();
        let mut detections = 0;
        for chunk in chunks {
            buffer.push_str(chunk);
            if matcher.matches_tail(&strip_ansi(&buffer)) {
                detections += 1;
            }
        }
        assert_eq!(detections, 1);
    }

    #[test]
    fn prompt_must_be_at_tail() {
        let matcher = PromptMatcher::for_user_host("user", "host").unwrap();
        assert!(!matcher.matches_tail("user@host:~$ ls\nsome output\n"));
        assert!(matcher.matches_tail("output\nuser@host:~$ "));
        assert!(matcher.matches_tail("output\nuser@host:/var/log# "));
    }

    #[test]
    fn custom_pattern_overrides_default() {
        let matcher = PromptMatcher::from_pattern(r"\S+[>#] ?$").unwrap();
        assert!(matcher.matches_tail("router1> "));
        assert!(matcher.matches_tail("switch#"));
        assert!(!matcher.matches_tail("show version\noutput"));
    }

    #[test]
    fn sudo_marker_detected() {
        assert!(is_sudo_prompt("[sudo] password for alice: "));
        assert!(!is_sudo_prompt("alice@host:~$ "));
    }

    #[test]
    fn masks_every_secret_occurrence() {
        let masked = mask_secret("hunter2\nretry: hunter2\n", "hunter2");
        assert_eq!(masked, "*******\nretry: *******\n");
    }

    #[test]
    fn clean_output_pwd_scenario() {
        let matcher = PromptMatcher::for_user_host("user", "host").unwrap();
        let raw = "pwd\r\n/home/user\r\nuser@host:~$ ";
        assert_eq!(clean_output(raw, "pwd", &matcher), "/home/user");
    }
}
