//! Battery label extraction.
//!
//! The [`LabelExtractor`] drives preprocessing and OCR; the [`LabelParser`]
//! turns recognized text into a [`ParsedBatteryData`](crate::ParsedBatteryData)
//! using the rule extractors in [`rules`].

mod extractor;
mod parser;
pub mod rules;

pub use extractor::{LabelExtractor, LabelExtractorBuilder};
pub use parser::{LabelParser, FIELD_BOOST, MAX_CONFIDENCE, PLACEHOLDER_CONFIDENCE};
