//! Incremental scanning of string/number/literal tokens across chunk
//! boundaries, plus the conversions that turn finished token text into a
//! typed value.
//!
//! Grounded on `examples/original_source/ltjson.c`'s `store_strnum`,
//! `convert_to_number` and `convert_to_logic`, and on `lttext.c`'s escape
//! handling (`unescape_string`, `codepoint_to_utf8`, the Pike & Thompson
//! `utf8tab`). The C version tells strings/numbers/literals apart by a tag
//! byte (`"`, `!`, or nothing) prepended to its `workstr` buffer, because
//! `workstr` is the only state that survives a suspend; this version keeps
//! the in-progress [`TokenKind`] as an explicit field instead, so no tag
//! byte is needed.

use crate::error::{JsonError, SequenceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Str,
    Num,
    Logic,
}

/// Classify a lexeme purely from its opening byte, the way
/// `process_json_alnum` dispatches on `firstch`.
pub fn classify(first: u8) -> TokenKind {
    if first == b'"' {
        TokenKind::Str
    } else if first == b'-' || first.is_ascii_digit() {
        TokenKind::Num
    } else {
        TokenKind::Logic
    }
}

/// Accumulates a string/number/literal lexeme across any number of
/// `feed` calls. Mirrors `jsoninfo->workstr` plus `jsoninfo->incomplete`.
#[derive(Default)]
pub struct Lexer {
    buf: Vec<u8>,
    kind: Option<TokenKind>,
}

impl Lexer {
    pub fn new() -> Self {
        Lexer::default()
    }

    pub fn is_pending(&self) -> bool {
        self.kind.is_some()
    }

    /// The kind of lexeme in progress, if a suspend left one half-read.
    pub fn pending_kind(&self) -> Option<TokenKind> {
        self.kind
    }

    /// Feed more input in. `text` is advanced past whatever was consumed,
    /// whether or not a full token was found. On `Ok`, the accumulated raw
    /// (still-escaped, for strings) token text is available via
    /// [`Lexer::take_raw`]. On `Err(JsonError::NeedMore)`, all of `text`
    /// was consumed and the lexer remembers its place for the next call.
    pub fn feed<'t>(&mut self, text: &mut &'t str) -> Result<TokenKind, JsonError> {
        let bytes = text.as_bytes();

        let (kind, start) = match self.kind {
            Some(kind) => (kind, 0),
            None => {
                debug_assert!(!bytes.is_empty());
                let kind = classify(bytes[0]);
                if kind == TokenKind::Str {
                    (kind, 1) // opening quote is not stored
                } else {
                    (kind, 0)
                }
            }
        };
        let mut idx = start;

        // Last byte seen so far (from this call's progress or a previous
        // call's tail), used for the single-character-lookback escape
        // check below — exactly as `store_strnum`'s `prev != '\\'` does
        // it. A run of `\\\"` (escaped backslash then a real closing
        // quote) is as ambiguous here as it is in the original.
        let mut prev = self.buf.last().copied();

        loop {
            if idx >= bytes.len() {
                self.buf.extend_from_slice(&bytes[start..idx]);
                *text = &text[idx..];
                self.kind = Some(kind);
                return Err(JsonError::NeedMore);
            }

            let c = bytes[idx];

            let done = match kind {
                TokenKind::Str => c == b'"' && prev != Some(b'\\'),
                TokenKind::Num => {
                    !(c.is_ascii_digit() || matches!(c, b'-' | b'+' | b'e' | b'E' | b'.'))
                }
                TokenKind::Logic => !c.is_ascii_alphabetic(),
            };

            if done {
                self.buf.extend_from_slice(&bytes[start..idx]);
                if kind == TokenKind::Str {
                    idx += 1; // consume the closing quote
                }
                *text = &text[idx..];
                self.kind = None;
                return Ok(kind);
            }

            prev = Some(c);
            idx += 1;
        }
    }

    /// Take the raw accumulated bytes (escapes not yet decoded for
    /// strings) and reset for the next lexeme.
    pub fn take_raw(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

/// Walk the lexeme against the strict JSON number grammar (RFC 8259's
/// `int frac? exp?`) before handing it to `str::parse`, which on its own is
/// more lenient than JSON allows — `"1."` and `"1e"` both parse fine as
/// Rust floats but neither is a legal JSON number (`frac`/`exp` both require
/// at least one digit after the `.`/`e`). Returns the index one past the
/// last byte matched; callers reject unless that covers the whole string.
fn json_number_len(bytes: &[u8]) -> Option<usize> {
    let mut i = 0;
    if bytes.first() == Some(&b'-') {
        i += 1;
    }

    match bytes.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => {
            i += 1;
            while bytes.get(i).is_some_and(u8::is_ascii_digit) {
                i += 1;
            }
        }
        _ => return None,
    }

    if bytes.get(i) == Some(&b'.') {
        i += 1;
        let start = i;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            return None;
        }
    }

    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let start = i;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            return None;
        }
    }

    Some(i)
}

/// Validate against the JSON number grammar, then dispatch to integer or
/// float parsing based on whether the text looks like a float. Mirrors
/// `convert_to_number`'s leading-zero rejection plus the original's
/// specific quirk of also rejecting a bare `-0` with no fraction (§8).
pub fn convert_to_number(s: &str) -> Option<Number> {
    let bytes = s.as_bytes();
    if json_number_len(bytes) != Some(bytes.len()) {
        return None;
    }

    if bytes == b"-0" {
        return None;
    }

    if s.bytes().any(|b| matches!(b, b'e' | b'E' | b'.')) {
        s.parse::<f64>().ok().map(Number::Float)
    } else {
        s.parse::<i64>().ok().map(Number::Int)
    }
}

pub enum Number {
    Int(i64),
    Float(f64),
}

/// `true`/`false`/`null`, case-insensitively, as `convert_to_logic` accepts.
pub enum Logic {
    Null,
    Bool(bool),
}

pub fn convert_to_logic(s: &str) -> Option<Logic> {
    if s.eq_ignore_ascii_case("null") {
        Some(Logic::Null)
    } else if s.eq_ignore_ascii_case("true") {
        Some(Logic::Bool(true))
    } else if s.eq_ignore_ascii_case("false") {
        Some(Logic::Bool(false))
    } else {
        None
    }
}

/// Classic UTF-8 lookup table (Pike & Thompson), ported from `lttext.c`'s
/// `utf8tab`/`codepoint_to_utf8`. `\u` escapes are limited to the Basic
/// Multilingual Plane; no surrogate-pair composition is attempted (an
/// explicit non-goal, matching the original's own limitation).
fn codepoint_to_utf8(codepoint: u32, out: &mut Vec<u8>) -> bool {
    if codepoint == 0 || codepoint > 0xFFFF {
        return false;
    }

    if let Some(ch) = char::from_u32(codepoint) {
        let mut buf = [0u8; 4];
        out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        true
    } else {
        false
    }
}

fn hex_to_dec(c: u8) -> Option<u32> {
    match c {
        b'0'..=b'9' => Some((c - b'0') as u32),
        b'a'..=b'f' => Some((c - b'a' + 10) as u32),
        b'A'..=b'F' => Some((c - b'A' + 10) as u32),
        _ => None,
    }
}

/// Decode `\\`, `\/`, `\"`, `\t`, `\f`, `\r`, `\n` and `\uXXXX` escapes in
/// place. Mirrors `unescape_string`.
pub fn unescape_string(raw: &[u8]) -> Result<String, SequenceError> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if raw[i] != b'\\' {
            out.push(raw[i]);
            i += 1;
            continue;
        }

        i += 1;
        let Some(&esc) = raw.get(i) else {
            return Err(SequenceError::BadEscape);
        };

        match esc {
            b'\\' => out.push(b'\\'),
            b'/' => out.push(b'/'),
            b'"' => out.push(b'"'),
            b't' => out.push(b'\t'),
            b'f' => out.push(0x0c),
            b'r' => out.push(b'\r'),
            b'n' => out.push(b'\n'),
            b'u' => {
                if i + 4 >= raw.len() {
                    return Err(SequenceError::BadEscape);
                }
                let digits = &raw[i + 1..i + 5];
                let mut codepoint = 0u32;
                for &d in digits {
                    let v = hex_to_dec(d).ok_or(SequenceError::BadEscape)?;
                    codepoint = codepoint * 16 + v;
                }
                if !codepoint_to_utf8(codepoint, &mut out) {
                    return Err(SequenceError::BadEscape);
                }
                i += 4;
            }
            _ => return Err(SequenceError::BadEscape),
        }

        i += 1;
    }

    String::from_utf8(out).map_err(|_| SequenceError::BadEscape)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(lexer: &mut Lexer, mut s: &str) -> Result<(TokenKind, Vec<u8>), JsonError> {
        let kind = lexer.feed(&mut s)?;
        Ok((kind, lexer.take_raw()))
    }

    #[test]
    fn number_stops_at_comma() {
        let mut lexer = Lexer::new();
        let mut s = "-12.5e2,rest";
        let kind = lexer.feed(&mut s).unwrap();
        assert_eq!(kind, TokenKind::Num);
        assert_eq!(s, ",rest");
        assert_eq!(lexer.take_raw(), b"-12.5e2");
    }

    #[test]
    fn string_consumes_closing_quote() {
        let mut lexer = Lexer::new();
        let mut s = "\"hi\"rest";
        let kind = lexer.feed(&mut s).unwrap();
        assert_eq!(kind, TokenKind::Str);
        assert_eq!(s, "rest");
        assert_eq!(lexer.take_raw(), b"hi");
    }

    #[test]
    fn string_suspends_mid_token() {
        let mut lexer = Lexer::new();
        let mut s = "\"abc";
        let err = lexer.feed(&mut s).unwrap_err();
        assert!(matches!(err, JsonError::NeedMore));
        assert!(lexer.is_pending());

        let mut rest = "def\"tail";
        let kind = lexer.feed(&mut rest).unwrap();
        assert_eq!(kind, TokenKind::Str);
        assert_eq!(rest, "tail");
        assert_eq!(lexer.take_raw(), b"abcdef");
    }

    #[test]
    fn logic_literal() {
        let mut lexer = Lexer::new();
        let mut s = "true,";
        let kind = lexer.feed(&mut s).unwrap();
        assert_eq!(kind, TokenKind::Logic);
        assert_eq!(lexer.take_raw(), b"true");
    }

    #[test]
    fn leading_zero_rejected() {
        assert!(convert_to_number("0123").is_none());
        assert!(matches!(convert_to_number("0.5"), Some(Number::Float(_))));
        assert!(convert_to_number("-01").is_none());
    }

    #[test]
    fn negative_zero_without_fraction_rejected() {
        assert!(convert_to_number("-0").is_none());
        assert!(matches!(convert_to_number("-0.5"), Some(Number::Float(_))));
    }

    #[test]
    fn trailing_dot_with_no_digits_is_rejected() {
        assert!(convert_to_number("1.").is_none());
        assert!(convert_to_number("-1.").is_none());
    }

    #[test]
    fn dot_with_no_leading_digit_is_rejected() {
        assert!(convert_to_number("-.5").is_none());
    }

    #[test]
    fn exponent_with_no_digits_is_rejected() {
        assert!(convert_to_number("1e").is_none());
        assert!(convert_to_number("1e+").is_none());
    }

    #[test]
    fn exponent_accepted() {
        assert!(matches!(convert_to_number("1e10"), Some(Number::Float(_))));
        assert!(matches!(convert_to_number("-0e5"), Some(Number::Float(_))));
    }

    #[test]
    fn unescape_handles_unicode_escape() {
        let out = unescape_string(b"caf\\u00e9").unwrap();
        assert_eq!(out, "caf\u{e9}");
    }

    #[test]
    fn unescape_rejects_bad_escape() {
        assert!(unescape_string(b"\\q").is_err());
    }
}
