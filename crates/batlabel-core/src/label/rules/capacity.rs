//! Capacity extraction with a plausibility filter.

use std::ops::RangeInclusive;

use super::patterns::CAPACITY_PATTERNS;
use super::{parse_number, pattern_confidence, ExtractionMatch, FieldExtractor};

/// Accepted capacity values, spanning both mAh and Ah scales.
pub const CAPACITY_RANGE: RangeInclusive<f32> = 100.0..=1_000_000.0;

/// Capacity field extractor.
pub struct CapacityExtractor;

impl CapacityExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CapacityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for CapacityExtractor {
    type Output = ExtractionMatch<f32>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        CAPACITY_PATTERNS
            .iter()
            .filter_map(|pattern| {
                let caps = pattern.regex.captures(text)?;
                let capacity = parse_number(caps.get(1)?.as_str())
                    .filter(|value| CAPACITY_RANGE.contains(value))?;

                Some(ExtractionMatch::new(
                    capacity,
                    pattern_confidence(pattern.priority),
                ))
            })
            .collect()
    }
}

/// Extract the rated capacity from label text.
pub fn extract_capacity(text: &str) -> Option<f32> {
    CapacityExtractor::new().extract(text).map(|m| m.value)
}
