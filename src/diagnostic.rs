//! Failure diagnostics shown in the output pane.
//!
//! Every failure the pipeline can hit implements [`Diagnostic`]. The text shown
//! to the user comes from [`extract`]: the full multi-line trace when the
//! failure has one, otherwise its single-line message.

use std::borrow::Cow;
use std::fmt::Write as _;

use thiserror::Error;
use unicode_width::UnicodeWidthChar;

/// A failure that can describe itself for display.
///
/// The single-line message is the [`std::fmt::Display`] output. Failures that
/// know where in the source they happened also provide a multi-line trace.
pub trait Diagnostic: std::error::Error {
    /// Multi-line trace, when the failure carries one.
    fn trace(&self) -> Option<String> {
        None
    }
}

/// Diagnostic text for a failure: the trace when present, else the message.
pub fn extract<E: Diagnostic + ?Sized>(err: &E) -> String {
    match err.trace() {
        Some(trace) if !trace.trim().is_empty() => trace,
        _ => err.to_string(),
    }
}

/// A 1-based position in a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Format a trace with a caret under the failing column.
///
/// ```text
/// SyntaxError: key must be a string
///  --> line 1, column 2
///   |
/// 1 | {invalid
///   |  ^
/// ```
///
/// The snippet is left out when `pos` does not point into `source`.
pub fn format_trace(kind: &str, message: &str, source: &str, pos: Position) -> String {
    let mut out = format!("{kind}: {message}\n --> {pos}");
    let Some(line_text) = pos
        .line
        .checked_sub(1)
        .and_then(|idx| source.split('\n').nth(idx))
    else {
        return out;
    };
    let line_text = line_text.trim_end_matches('\r');
    let number = pos.line.to_string();
    let pad = " ".repeat(number.len());
    let caret_pad = caret_padding(line_text, pos.column);
    let _ = write!(
        out,
        "\n{pad} |\n{number} | {line_text}\n{pad} | {caret_pad}^"
    );
    out
}

/// Whitespace that lines a caret up with `column` (1-based, in chars).
fn caret_padding(line: &str, column: usize) -> String {
    line.chars()
        .take(column.saturating_sub(1))
        .map(|ch| {
            if ch == '\t' {
                "\t".to_string()
            } else {
                " ".repeat(ch.width().unwrap_or(0))
            }
        })
        .collect()
}

/// The data document is not valid JSON.
#[derive(Debug, Error)]
#[error("SyntaxError: {source}")]
pub struct DecodeError {
    source: serde_json::Error,
    trace: String,
}

impl DecodeError {
    /// Wrap a `serde_json` failure for `text`, rendering its trace up front.
    pub fn new(source: serde_json::Error, text: &str) -> Self {
        let pos = Position::new(source.line(), source.column().max(1));
        let full = source.to_string();
        let suffix = format!(" at line {} column {}", source.line(), source.column());
        let message = full.strip_suffix(&suffix).unwrap_or(&full);
        let trace = format_trace("SyntaxError", message, text, pos);
        Self { source, trace }
    }

    /// Where the decoder gave up.
    pub fn position(&self) -> Position {
        Position::new(self.source.line(), self.source.column())
    }
}

impl Diagnostic for DecodeError {
    fn trace(&self) -> Option<String> {
        Some(self.trace.clone())
    }
}

/// Parse `text` as a JSON document.
///
/// # Errors
///
/// Returns a [`DecodeError`] when `text` is not valid JSON, including when it
/// is empty.
///
/// A `\uXXXX` escape naming half of a surrogate pair with no partner decodes
/// to U+FFFD instead of failing.
pub fn decode_json(text: &str) -> Result<serde_json::Value, DecodeError> {
    serde_json::from_str(&replace_lone_surrogates(text))
        .map_err(|err| DecodeError::new(err, text))
}

/// Rewrite unpaired surrogate escapes inside strings as `\ufffd`.
///
/// The replacement has the same length, so decoder positions still match
/// `text`.
fn replace_lone_surrogates(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let mut lone = Vec::new();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => in_string = !in_string,
            b'\\' if in_string => match unicode_escape(bytes, i) {
                Some(0xD800..=0xDBFF) => {
                    if matches!(unicode_escape(bytes, i + 6), Some(0xDC00..=0xDFFF)) {
                        i += 12;
                    } else {
                        lone.push(i);
                        i += 6;
                    }
                    continue;
                }
                Some(0xDC00..=0xDFFF) => {
                    lone.push(i);
                    i += 6;
                    continue;
                }
                Some(_) => {
                    i += 6;
                    continue;
                }
                // Skip the escaped character so `\"` never ends the string.
                None => i += 1,
            },
            _ => {}
        }
        i += 1;
    }
    if lone.is_empty() {
        return Cow::Borrowed(text);
    }
    let mut fixed = String::with_capacity(text.len());
    let mut copied = 0;
    for start in lone {
        fixed.push_str(&text[copied..start]);
        fixed.push_str("\\ufffd");
        copied = start + 6;
    }
    fixed.push_str(&text[copied..]);
    Cow::Owned(fixed)
}

/// The code unit of a `\uXXXX` escape starting at `at`.
fn unicode_escape(bytes: &[u8], at: usize) -> Option<u32> {
    let escape = bytes.get(at..at + 6)?;
    let (prefix, digits) = escape.split_at(2);
    if prefix != b"\\u" || !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    digits
        .iter()
        .try_fold(0, |unit, &digit| Some(unit * 16 + char::from(digit).to_digit(16)?))
}
