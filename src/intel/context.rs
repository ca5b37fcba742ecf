//! Context derivation for ledger bucketing.
//!
//! A context is `"<os family>:<snippet>"` where the snippet is a bounded
//! slice of the prior command's output. The bound keeps the ledger from
//! retaining raw output wholesale.

use crate::domain::OsFamily;

/// Derive the bounded context string for a ledger row
pub fn derive_context(os: OsFamily, prior_output: &str, max_chars: usize) -> String {
    let collapsed = prior_output.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("{}:{}", os.as_str(), truncate_chars(&collapsed, max_chars))
}

/// Truncate a string to a maximum length (char-safe)
fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_os_prefixed_and_bounded() {
        let ctx = derive_context(OsFamily::Linux, "a".repeat(500).as_str(), 100);
        assert!(ctx.starts_with("linux:"));
        assert_eq!(ctx.chars().count(), "linux:".len() + 100);
    }

    #[test]
    fn newlines_collapse_to_spaces() {
        let ctx = derive_context(OsFamily::Unknown, "line one\nline two\n", 100);
        assert_eq!(ctx, "unknown:line one line two");
    }

    #[test]
    fn multibyte_output_truncates_on_char_boundary() {
        let ctx = derive_context(OsFamily::Linux, &"é".repeat(200), 100);
        assert_eq!(ctx.chars().count(), "linux:".len() + 100);
    }
}
