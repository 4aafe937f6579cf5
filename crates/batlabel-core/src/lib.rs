//! Core library for battery label OCR processing.
//!
//! This crate provides:
//! - Label image preprocessing (downscale, greyscale, contrast, sharpen, binarize)
//! - A pluggable OCR backend trait with a pure Rust `pure-onnx-ocr` implementation
//! - Battery field extraction (code cascade, voltage, capacity, fuzzy brand)
//! - Confidence scoring for the recovered battery record

pub mod error;
pub mod label;
pub mod models;
pub mod ocr;

pub use error::{OcrError, Result, ScanError, Stage};
pub use label::{LabelExtractor, LabelExtractorBuilder, LabelParser};
pub use models::battery::{
    mime_type_for, validate_upload, CodePattern, ParsedBatteryData, RawImage, ScanResult, UploadedImage,
};
pub use models::config::BatlabelConfig;
pub use ocr::{LabelPreprocessor, OcrBackend};
#[cfg(feature = "native")]
pub use ocr::PureOcrBackend;
