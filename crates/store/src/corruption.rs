//! Structural corruption heuristics for play documents.
//!
//! Detection is cheap and purely textual — no vendor calls, no schema
//! knowledge beyond the play document shape. The checks run in a fixed
//! priority order; the first match classifies the document.

use serde::Serialize;

/// What kind of structural damage a document shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionKind {
    /// File is empty or whitespace only.
    Empty,
    /// Content ends mid-attribute: a key and colon with nothing after.
    CutMidAttribute,
    /// The known truncation immediately after the entry premium field.
    EntryPremiumCut,
    /// Content does not end in the closing `}` delimiter.
    Unterminated,
    /// Open/close brace counts disagree.
    BraceImbalance,
    /// Braces balance but the document still fails to parse.
    ParseFailure,
}

impl std::fmt::Display for CorruptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Empty => "empty file",
            Self::CutMidAttribute => "cut mid-attribute",
            Self::EntryPremiumCut => "cut after entry premium",
            Self::Unterminated => "missing closing delimiter",
            Self::BraceImbalance => "brace imbalance",
            Self::ParseFailure => "parse failure",
        };
        write!(f, "{s}")
    }
}

/// Counts braces outside of string literals.
fn brace_counts(content: &str) -> (usize, usize) {
    let mut open = 0;
    let mut close = 0;
    let mut in_string = false;
    let mut escaped = false;
    for c in content.chars() {
        if in_string {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            if c != '\\' {
                escaped = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => open += 1,
            '}' => close += 1,
            _ => {}
        }
    }
    (open, close)
}

/// True when the tail of the document is the known "cut off immediately
/// after the entry premium" shape: the last attribute present is `premium`,
/// with a complete or partial value and no closing delimiters after it.
fn is_entry_premium_cut(trimmed: &str) -> bool {
    let Some(idx) = trimmed.rfind("\"premium\"") else {
        return false;
    };
    let tail = &trimmed[idx + "\"premium\"".len()..];
    let tail = tail.trim_start();
    let Some(tail) = tail.strip_prefix(':') else {
        return false;
    };
    let tail = tail.trim();
    // Value may be a bare number, a quoted decimal, or missing its closing
    // quote; anything structural (brace, comma + next key) means the cut
    // happened elsewhere.
    !tail.contains('}')
        && !tail.contains(',')
        && tail
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '"'))
}

/// Classify a document's structural damage, or `None` when it is sound.
///
/// Priority order: empty; unterminated content (refined to mid-attribute or
/// entry-premium cuts when the tail matches those shapes); brace imbalance;
/// parse failure.
#[must_use]
pub fn detect_corruption(content: &str) -> Option<CorruptionKind> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Some(CorruptionKind::Empty);
    }

    if !trimmed.ends_with('}') {
        if trimmed.ends_with(':') {
            return Some(CorruptionKind::CutMidAttribute);
        }
        if is_entry_premium_cut(trimmed) {
            return Some(CorruptionKind::EntryPremiumCut);
        }
        return Some(CorruptionKind::Unterminated);
    }

    let (open, close) = brace_counts(trimmed);
    if open != close {
        return Some(CorruptionKind::BraceImbalance);
    }

    if serde_json::from_str::<serde_json::Value>(trimmed).is_err() {
        return Some(CorruptionKind::ParseFailure);
    }

    None
}
