//! Label text parser composing the field rules into one battery record.

use chrono::Utc;
use tracing::debug;

use crate::models::battery::{ParsedBatteryData, PLACEHOLDER_PREFIX};
use crate::models::config::ExtractionConfig;

use super::rules::{
    normalize_text, BrandExtractor, CapacityExtractor, CodeExtractor, DigitCorrection,
    FieldExtractor, VoltageExtractor,
};

/// Starting confidence when no battery code matched.
pub const PLACEHOLDER_CONFIDENCE: f32 = 0.3;

/// Added for each of brand, voltage and capacity that was found.
pub const FIELD_BOOST: f32 = 0.05;

/// Upper bound on the final confidence.
pub const MAX_CONFIDENCE: f32 = 0.95;

/// Parser turning recognized label text into [`ParsedBatteryData`].
pub struct LabelParser {
    correction: DigitCorrection,
    codes: CodeExtractor,
    voltages: VoltageExtractor,
    capacities: CapacityExtractor,
    brands: BrandExtractor,
}

impl LabelParser {
    /// Create a parser with contextual digit correction.
    pub fn new() -> Self {
        Self {
            correction: DigitCorrection::default(),
            codes: CodeExtractor::new(),
            voltages: VoltageExtractor::new(),
            capacities: CapacityExtractor::new(),
            brands: BrandExtractor::new(),
        }
    }

    /// Build a parser from extraction settings.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new()
            .with_digit_correction(config.digit_correction)
            .with_brand_extractor(
                BrandExtractor::new()
                    .with_max_distance(config.fuzzy_max_distance)
                    .with_min_word_len(config.fuzzy_min_word_len),
            )
    }

    /// Set the digit/letter correction mode.
    pub fn with_digit_correction(mut self, correction: DigitCorrection) -> Self {
        self.correction = correction;
        self
    }

    /// Replace the brand extractor.
    pub fn with_brand_extractor(mut self, brands: BrandExtractor) -> Self {
        self.brands = brands;
        self
    }

    /// Parse recognized text. Never fails: no match yields a placeholder code.
    pub fn parse(&self, text: &str) -> ParsedBatteryData {
        self.parse_at(text, Utc::now().timestamp_millis())
    }

    /// Parse with an explicit placeholder timestamp (epoch millis).
    pub fn parse_at(&self, text: &str, placeholder_millis: i64) -> ParsedBatteryData {
        let normalized = normalize_text(text, self.correction);

        // Digit corrections only feed the code cascade; the other fields see
        // the letters as recognized.
        let code = self.codes.extract(&normalized.corrected);
        let brand = self.brands.extract(&normalized.text).map(|m| m.value);
        let voltage = self.voltages.extract(&normalized.text).map(|m| m.value);
        let capacity = self.capacities.extract(&normalized.text).map(|m| m.value);

        let (battery_code, mut confidence, match_type, found) = match code {
            Some(m) => (m.value.code, m.confidence, Some(m.value.pattern), true),
            None => (
                format!("{}{}", PLACEHOLDER_PREFIX, placeholder_millis),
                PLACEHOLDER_CONFIDENCE,
                None,
                false,
            ),
        };

        let boosts = [brand.is_some(), voltage.is_some(), capacity.is_some()]
            .iter()
            .filter(|&&present| present)
            .count();
        confidence += boosts as f32 * FIELD_BOOST;
        let confidence = confidence.min(MAX_CONFIDENCE);

        debug!(
            "Parsed label: code={} ({}), brand={:?}, voltage={:?}, capacity={:?}, confidence={:.2}",
            battery_code,
            match_type.map(|p| p.as_str()).unwrap_or("none"),
            brand,
            voltage,
            capacity,
            confidence
        );

        ParsedBatteryData {
            battery_code,
            brand,
            voltage,
            capacity,
            found,
            confidence,
            match_type,
        }
    }
}

impl Default for LabelParser {
    fn default() -> Self {
        Self::new()
    }
}
