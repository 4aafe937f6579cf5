//! Battery code extraction via the prioritized pattern cascade.

use crate::models::battery::CodePattern;

use super::patterns::BATTERY_CODE_PATTERNS;
use super::{pattern_confidence, ExtractionMatch, FieldExtractor};

/// A battery code and the pattern that found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatteryCode {
    pub code: String,
    pub pattern: CodePattern,
}

/// Battery code extractor.
///
/// Only the first match of each pattern is considered. A pattern whose
/// first match fails validation hands over to the next pattern.
pub struct CodeExtractor;

impl CodeExtractor {
    pub fn new() -> Self {
        Self
    }

    fn candidates<'t>(
        &self,
        text: &'t str,
    ) -> impl Iterator<Item = ExtractionMatch<BatteryCode>> + 't {
        BATTERY_CODE_PATTERNS.iter().filter_map(move |pattern| {
            let caps = pattern.regex.captures(text)?;
            let matched = caps.get(1).or_else(|| caps.get(0))?;
            let code = matched.as_str().trim();

            if !is_valid_battery_code(code) {
                tracing::trace!("Rejected {} candidate {:?}", pattern.name.as_str(), code);
                return None;
            }

            Some(ExtractionMatch::new(
                BatteryCode {
                    code: code.to_string(),
                    pattern: pattern.name,
                },
                pattern_confidence(pattern.priority),
            ))
        })
    }
}

impl Default for CodeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for CodeExtractor {
    type Output = ExtractionMatch<BatteryCode>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.candidates(text).next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.candidates(text).collect()
    }
}

/// Extract the highest-priority valid battery code from text.
pub fn extract_battery_code(text: &str) -> Option<BatteryCode> {
    CodeExtractor::new().extract(text).map(|m| m.value)
}

/// Validate a battery code candidate.
///
/// At least 6 characters, at least one alphanumeric, not a purely numeric
/// run shorter than 10, and at most 3 non-alphanumeric characters.
pub fn is_valid_battery_code(code: &str) -> bool {
    if code.chars().count() < 6 {
        return false;
    }

    if !code.chars().any(|c| c.is_ascii_alphanumeric()) {
        return false;
    }

    if code.chars().all(|c| c.is_ascii_digit()) && code.len() < 10 {
        return false;
    }

    code.chars().filter(|c| !c.is_ascii_alphanumeric()).count() <= 3
}
