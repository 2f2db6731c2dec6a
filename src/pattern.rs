//! Pattern Lowering (SPEC_FULL.md §4.1).
//!
//! Converts one filter's Adblock Plus wildcard pattern into a regular
//! expression fragment plus metadata used by the emitter: the
//! extracted hostname (punycoded), whether the pattern is
//! hostname-only, whether case-insensitive matching is safe, and
//! (indirectly, via the caller-supplied `primary_scheme`) which URL
//! scheme the pattern was lowered against.
//!
//! Hostname extraction is split into two passes, per the design note
//! in SPEC_FULL.md §9: a first pass over the raw `char` sequence finds
//! the hostname span's start/end indices; a second pass lowers the
//! whole pattern, substituting the pre-computed span with a single
//! escaped-and-punycoded chunk when it reaches it. Separating the
//! passes avoids threading "am I inside the hostname" state through
//! the same loop that also decides anchors and escaping.

use crate::domain::normalize_host;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Any byte the source grammar's `^` separator matches: everything
/// outside `[-_.%A-Za-z0-9]`. The hyphen is placed first inside the
/// bracket expression so it is never read as a range.
const SEPARATOR_CLASS: &str = "[^-_.%A-Za-z0-9]";

/// Bytes we never leave unescaped when percent-encoding a single
/// non-ASCII character. Since `utf8_percent_encode` always escapes
/// non-ASCII bytes regardless of the set passed in, the exact
/// membership here only matters for ASCII input, which this helper
/// never receives.
const NON_ASCII_ESCAPE: &AsciiSet = &CONTROLS;

/// A filter pattern lowered into the target regex dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweredPattern {
    pub regexp: String,
    pub case_insensitive_safe: bool,
    pub hostname: Option<String>,
    pub hostname_only: bool,
}

/// (start, end, via_double_pipe) char-index span of the hostname, if any.
type HostSpan = (usize, usize, bool);

fn find_host_span(chars: &[char]) -> Option<HostSpan> {
    let n = chars.len();
    if n >= 2 && chars[0] == '|' && chars[1] == '|' {
        let end = host_span_end(chars, 2);
        return Some((2, end, true));
    }
    if n >= 3 {
        for i in 0..=n - 3 {
            if chars[i] == ':' && chars[i + 1] == '/' && chars[i + 2] == '/' {
                let start = i + 3;
                let end = host_span_end(chars, start);
                return Some((start, end, false));
            }
        }
    }
    None
}

fn host_span_end(chars: &[char], start: usize) -> usize {
    let n = chars.len();
    let mut i = start;
    while i < n {
        if matches!(chars[i], '*' | '^' | '?' | '/' | '|') {
            break;
        }
        i += 1;
    }
    i
}

/// Whether everything after the hostname span is either nothing or one
/// of the anchor/separator tokens the source grammar allows to trail a
/// bare hostname (`^`, `|`, `^|`).
fn is_bare_hostname_suffix(suffix: &[char]) -> bool {
    matches!(suffix, [] | ['^'] | ['|'] | ['^', '|'])
}

fn percent_encode_char(ch: char) -> String {
    utf8_percent_encode(ch.encode_utf8(&mut [0u8; 4]), NON_ASCII_ESCAPE).to_string()
}

fn escape_metachar(out: &mut String, ch: char) {
    out.push('\\');
    out.push(ch);
}

/// Lower one source pattern against a primary URL scheme fragment
/// (e.g. `"https?://"`, `"[^:]+:(//)?"`, `"wss?://"`).
///
/// Lowering never fails: malformed filter options are rejected
/// upstream by the parser adapter (SPEC_FULL.md §4.8), so any pattern
/// reaching this function is, by construction, representable.
pub fn lower_pattern(pattern: &str, primary_scheme: &str) -> LoweredPattern {
    let chars: Vec<char> = pattern.chars().collect();
    let n = chars.len();
    let host_span = find_host_span(&chars);

    let mut out = String::new();
    let mut case_insensitive_safe = false;
    let mut hostname: Option<String> = None;
    let mut hostname_only = false;
    let mut prev_raw: Option<char> = None;
    let mut i = 0usize;

    if let Some((start, end, true)) = host_span {
        out.push('^');
        out.push_str(primary_scheme);
        out.push_str("([^/]+\\.)?");
        let raw: String = chars[start..end].iter().collect();
        let normalized = normalize_host(&raw);
        out.push_str(&regex::escape(&normalized));
        hostname = Some(normalized);
        case_insensitive_safe = true;
        hostname_only = is_bare_hostname_suffix(&chars[end..]);
        i = end;
        prev_raw = None;
    } else if chars.first() == Some(&'|') {
        out.push('^');
        i = 1;
    }

    let host_end = host_span.map(|(_, end, _)| end);

    while i < n {
        if let Some((start, end, false)) = host_span {
            if i == start {
                let raw: String = chars[start..end].iter().collect();
                let normalized = normalize_host(&raw);
                out.push_str(&regex::escape(&normalized));
                hostname = Some(normalized);
                case_insensitive_safe = true;
                i = end;
                prev_raw = None;
                continue;
            }
        }

        let ch = chars[i];
        let is_last = i == n - 1;
        let is_first = i == 0;

        match ch {
            '*' => {
                if !(out.is_empty() || prev_raw == Some('*')) {
                    out.push_str(".*");
                }
            }
            '^' if is_first => {
                out.push('^');
                out.push_str(primary_scheme);
                out.push_str("(.*");
                out.push_str(SEPARATOR_CLASS);
                out.push_str(")?");
            }
            '^' if is_last => {
                out.push('(');
                out.push_str(SEPARATOR_CLASS);
                out.push_str(".*)?$");
            }
            '^' => out.push_str(SEPARATOR_CLASS),
            '.' | '+' | '?' | '$' | '{' | '}' | '(' | ')' | '[' | ']' | '\\' => {
                escape_metachar(&mut out, ch)
            }
            '|' if is_last => out.push('$'),
            '|' => escape_metachar(&mut out, ch),
            _ => {
                if let Some(he) = host_end {
                    if i >= he && ch.is_ascii_alphabetic() {
                        case_insensitive_safe = false;
                    }
                }
                if ch.is_ascii() {
                    out.push(ch);
                } else {
                    out.push_str(&percent_encode_char(ch));
                }
            }
        }

        prev_raw = Some(ch);
        i += 1;
    }

    LoweredPattern {
        regexp: out,
        case_insensitive_safe,
        hostname,
        hostname_only,
    }
}
