//! Helpers for putting player-typed text into log lines.
//!
//! Player input is arbitrary: it can contain newlines, terminal escape
//! sequences or be pasted pages long. Everything typed at the prompt goes
//! through [`escape_log`] before it reaches a log record.

use std::fmt::Write;

/// Longest preview kept from a single input.
pub const LOG_PREVIEW_CHARS: usize = 160;

/// Escape `s` onto one line, truncated to [`LOG_PREVIEW_CHARS`] characters.
pub fn escape_log(s: &str) -> String {
    escape_log_limited(s, LOG_PREVIEW_CHARS)
}

/// Like [`escape_log`] with an explicit character limit. Truncation is marked with `…`.
pub fn escape_log_limited(s: &str, limit: usize) -> String {
    let mut out = String::with_capacity(s.len().min(limit) + 4);
    let mut taken = 0;
    for ch in s.chars() {
        if taken == limit {
            out.push('…');
            return out;
        }
        taken += 1;
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '\u{1b}' => out.push_str("\\e"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
