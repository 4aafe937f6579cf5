//! Configuration structures for the label extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ScanError;
use crate::label::rules::DigitCorrection;

/// Main configuration for the batlabel pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatlabelConfig {
    /// Image preprocessing configuration.
    pub preprocessing: PreprocessConfig,

    /// OCR run configuration.
    pub ocr: OcrConfig,

    /// Label field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Model configuration.
    pub models: ModelConfig,
}

/// Label image preprocessing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Images with a side longer than this are downscaled to fit.
    pub max_dimension: u32,

    /// Stretch luminance to the full range before sharpening.
    pub normalize: bool,

    /// Lower percentile mapped to black when normalizing.
    pub normalize_low_percentile: f32,

    /// Upper percentile mapped to white when normalizing.
    pub normalize_high_percentile: f32,

    /// Gaussian sigma of the unsharp mask.
    pub sharpen_sigma: f32,

    /// Sharpening weight for flat areas.
    pub sharpen_flat: f32,

    /// Sharpening weight for jagged areas.
    pub sharpen_jagged: f32,

    /// Detail level separating flat from jagged areas.
    pub sharpen_threshold: f32,

    /// Maximum brightening applied by sharpening.
    pub max_brighten: f32,

    /// Maximum darkening applied by sharpening.
    pub max_darken: f32,

    /// Binarize after sharpening.
    pub binarize: bool,

    /// Binarization threshold (pixels at or above become white).
    pub binarize_threshold: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_dimension: 2000,
            normalize: true,
            normalize_low_percentile: 1.0,
            normalize_high_percentile: 99.0,
            sharpen_sigma: 1.5,
            sharpen_flat: 1.2,
            sharpen_jagged: 0.8,
            sharpen_threshold: 2.0,
            max_brighten: 10.0,
            max_darken: 20.0,
            binarize: true,
            binarize_threshold: 128,
        }
    }
}

/// OCR run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory for temporary image files (default: system temp dir).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,

    /// Per-extraction deadline in milliseconds for timed extractions.
    pub timeout_ms: u64,

    /// Keep `[UNK]` tokens emitted by the recognizer.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            timeout_ms: 30_000,
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    /// Scratch directory, falling back to the system temp dir.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Label field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// How digit/letter OCR confusions are corrected before code matching.
    pub digit_correction: DigitCorrection,

    /// Maximum edit distance for fuzzy brand matching.
    pub fuzzy_max_distance: usize,

    /// Minimum word length for fuzzy brand matching.
    pub fuzzy_min_word_len: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            digit_correction: DigitCorrection::Contextual,
            fuzzy_max_distance: 1,
            fuzzy_min_word_len: 3,
        }
    }
}

/// Model file paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl BatlabelConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Check settings that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<(), ScanError> {
        let pre = &self.preprocessing;

        if pre.max_dimension == 0 {
            return Err(ScanError::Config(
                "preprocessing.max_dimension must be positive".to_string(),
            ));
        }

        if !(pre.sharpen_sigma > 0.0) {
            return Err(ScanError::Config(
                "preprocessing.sharpen_sigma must be positive".to_string(),
            ));
        }

        if !(0.0..100.0).contains(&pre.normalize_low_percentile)
            || !(0.0..=100.0).contains(&pre.normalize_high_percentile)
            || pre.normalize_low_percentile >= pre.normalize_high_percentile
        {
            return Err(ScanError::Config(format!(
                "invalid normalization percentiles {}..{}",
                pre.normalize_low_percentile, pre.normalize_high_percentile
            )));
        }

        if self.ocr.timeout_ms == 0 {
            return Err(ScanError::Config("ocr.timeout_ms must be positive".to_string()));
        }

        Ok(())
    }
}
