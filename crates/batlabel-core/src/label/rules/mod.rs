//! Rule-based field extractors for battery labels.

pub mod brand;
pub mod capacity;
pub mod code;
pub mod normalize;
pub mod patterns;
pub mod voltage;

pub use brand::{extract_brand, levenshtein, BrandExtractor, KNOWN_BRANDS};
pub use capacity::{extract_capacity, CapacityExtractor};
pub use code::{extract_battery_code, is_valid_battery_code, BatteryCode, CodeExtractor};
pub use normalize::{normalize_text, DigitCorrection, NormalizedText};
pub use patterns::{ExtractionPattern, BATTERY_CODE_PATTERNS, CAPACITY_PATTERNS, VOLTAGE_PATTERNS};
pub use voltage::{extract_voltage, VoltageExtractor};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all accepted candidates, best first.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// An extracted value with its confidence score.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32) -> Self {
        Self { value, confidence }
    }
}

/// Confidence weight of a cascade position: 0.08 lost per step, floored at 0.5.
pub fn pattern_confidence(priority: u8) -> f32 {
    (1.0 - f32::from(priority) * 0.08).max(0.5)
}

/// Parse the first capture group of a numeric pattern.
fn parse_number(value: &str) -> Option<f32> {
    value.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_confidence_decay() {
        assert!((pattern_confidence(1) - 0.92).abs() < 1e-6);
        assert!((pattern_confidence(4) - 0.68).abs() < 1e-6);
        assert!((pattern_confidence(6) - 0.52).abs() < 1e-6);
        assert_eq!(pattern_confidence(7), 0.5);
        assert_eq!(pattern_confidence(9), 0.5);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("3.7"), Some(3.7));
        assert_eq!(parse_number("48."), Some(48.0));
        assert_eq!(parse_number("abc"), None);
    }
}
