//! OCR-error normalization applied before pattern matching.

use serde::{Deserialize, Serialize};

use super::patterns::WHITESPACE_RUN;

/// How digit/letter confusions (`O`/`0`, `l`/`1`) are corrected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigitCorrection {
    /// Only inside numeric-looking runs not glued to a preceding letter.
    #[default]
    Contextual,
    /// Replace every `O` with `0` and every `l` with `1`.
    Global,
    /// Leave letters alone.
    None,
}

/// Text prepared for field extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    /// Pipe-fixed, whitespace-collapsed, trimmed text.
    pub text: String,
    /// `text` with digit/letter corrections applied.
    pub corrected: String,
}

/// Normalize recognized text.
///
/// `|` becomes `I`, whitespace runs collapse to one space and the result is
/// trimmed. Digit corrections are kept in a separate copy so brand matching
/// can still see the uncorrected letters.
pub fn normalize_text(raw: &str, correction: DigitCorrection) -> NormalizedText {
    let piped = raw.replace('|', "I");
    let text = WHITESPACE_RUN.replace_all(&piped, " ").trim().to_string();

    let corrected = match correction {
        DigitCorrection::None => text.clone(),
        DigitCorrection::Global => text.replace('O', "0").replace('l', "1"),
        DigitCorrection::Contextual => correct_numeric_runs(&text),
    };

    NormalizedText { text, corrected }
}

fn is_run_char(c: char) -> bool {
    c.is_ascii_digit() || c == 'O' || c == 'l'
}

fn as_digit(c: char) -> char {
    match c {
        'O' => '0',
        'l' => '1',
        other => other,
    }
}

/// Rewrite `O`/`l` inside maximal runs of `[0-9Ol]` that hold at least one
/// digit and do not directly follow a letter.
fn correct_numeric_runs(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if !is_run_char(chars[i]) {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && is_run_char(chars[i]) {
            i += 1;
        }

        let run = &chars[start..i];
        let glued_to_word = start > 0 && chars[start - 1].is_alphabetic();
        let numeric = run.iter().any(|c| c.is_ascii_digit());

        if numeric && !glued_to_word {
            out.extend(run.iter().map(|&c| as_digit(c)));
        } else {
            out.extend(run.iter());
        }
    }

    out
}
