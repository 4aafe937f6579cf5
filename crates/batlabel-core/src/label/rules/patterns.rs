//! Ordered regex catalogues for battery label extraction.
//!
//! Each catalogue is tried top to bottom; the order is part of the contract.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::battery::CodePattern;

/// A pattern with its cascade priority (1 = tried first).
#[derive(Debug)]
pub struct ExtractionPattern<N = &'static str> {
    pub regex: Regex,
    pub priority: u8,
    pub name: N,
}

impl ExtractionPattern<CodePattern> {
    fn code(pattern: &str, name: CodePattern) -> Self {
        Self {
            regex: Regex::new(pattern).unwrap(),
            priority: name.priority(),
            name,
        }
    }
}

impl ExtractionPattern {
    fn named(pattern: &str, priority: u8, name: &'static str) -> Self {
        Self {
            regex: Regex::new(pattern).unwrap(),
            priority,
            name,
        }
    }
}

lazy_static! {
    pub static ref BATTERY_CODE_PATTERNS: Vec<ExtractionPattern<CodePattern>> = vec![
        // Labeled formats
        ExtractionPattern::code(
            r"(?i)\b(?:BAT|BATT|BTY)[- ]?([A-Z0-9]{6,12})\b",
            CodePattern::BatPrefix,
        ),
        ExtractionPattern::code(
            r"(?i)\b(?:SN|S/N|SERIAL)[:\s#-]*([A-Z0-9]{6,15})\b",
            CodePattern::SerialNumber,
        ),
        ExtractionPattern::code(
            r"(?i)\bP/N[:\s#-]*([A-Z0-9]{6,15})\b",
            CodePattern::PartNumber,
        ),
        ExtractionPattern::code(
            r"(?i)\b(?:MODEL|MDL)[:\s#-]*([A-Z0-9]{6,15})\b",
            CodePattern::ModelNumber,
        ),
        // Common identifier shapes (case-sensitive)
        ExtractionPattern::code(
            r"\b([A-Z]{2,4}[0-9]{6,10}[A-Z]?)\b",
            CodePattern::AlphaNumeric,
        ),
        ExtractionPattern::code(
            r"\b([0-9]{2}[A-Z]{2,3}[0-9]{6,8})\b",
            CodePattern::NumericAlpha,
        ),
        ExtractionPattern::code(
            r"\b([A-Z][0-9]{8,12})\b",
            CodePattern::SingleAlphaNumeric,
        ),
        ExtractionPattern::code(r"\b([0-9]{10,13})\b", CodePattern::Barcode),
        ExtractionPattern::code(r"\b([A-Z0-9]{8,15})\b", CodePattern::Generic),
    ];

    pub static ref VOLTAGE_PATTERNS: Vec<ExtractionPattern> = vec![
        ExtractionPattern::named(r"(?i)\b([0-9]+\.?[0-9]*)\s*V(?:olts?)?\b", 1, "VOLT_SUFFIX"),
        ExtractionPattern::named(r"(?i)\b([0-9]+\.?[0-9]*)\s*VDC\b", 2, "VDC_SUFFIX"),
        ExtractionPattern::named(r"(?i)\bVoltage[:\s]+([0-9]+\.?[0-9]*)\s*V?\b", 3, "VOLTAGE_LABEL"),
        ExtractionPattern::named(r"(?i)\b([0-9]+\.?[0-9]*)\s*Volt\b", 4, "VOLT_WORD"),
        ExtractionPattern::named(
            r"\b(3\.7|7\.4|11\.1|14\.8|22\.2|48|60|72|400|800)\s*V?\b",
            5,
            "NOMINAL_VOLTAGE",
        ),
    ];

    pub static ref CAPACITY_PATTERNS: Vec<ExtractionPattern> = vec![
        ExtractionPattern::named(r"(?i)\b([0-9]+\.?[0-9]*)\s*mAh\b", 1, "MAH_SUFFIX"),
        ExtractionPattern::named(r"(?i)\b([0-9]+\.?[0-9]*)\s*Ah\b", 2, "AH_SUFFIX"),
        ExtractionPattern::named(
            r"(?i)\bCapacity[:\s]+([0-9]+\.?[0-9]*)\s*(?:mAh|Ah)?\b",
            3,
            "CAPACITY_LABEL",
        ),
    ];

    pub static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_catalogue_is_in_priority_order() {
        let names: Vec<CodePattern> = BATTERY_CODE_PATTERNS.iter().map(|p| p.name).collect();
        assert_eq!(names, CodePattern::ALL.to_vec());

        for window in BATTERY_CODE_PATTERNS.windows(2) {
            assert!(window[0].priority < window[1].priority);
        }
    }

    #[test]
    fn test_field_catalogues_are_in_priority_order() {
        for catalogue in [&*VOLTAGE_PATTERNS, &*CAPACITY_PATTERNS] {
            for window in catalogue.windows(2) {
                assert!(window[0].priority < window[1].priority);
            }
        }
    }

    #[test]
    fn test_voltage_suffix_does_not_match_vdc() {
        assert!(!VOLTAGE_PATTERNS[0].regex.is_match("12VDC"));
        assert!(VOLTAGE_PATTERNS[1].regex.is_match("12VDC"));
    }
}
