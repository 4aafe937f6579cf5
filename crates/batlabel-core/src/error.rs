//! Error types for the batlabel-core library.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Main error type for the batlabel library.
#[derive(Error, Debug)]
pub enum ScanError {
    /// A pipeline stage failed; carries the stage name and the underlying cause.
    #[error("OCR extraction failed during {stage}: {source}")]
    Extraction {
        stage: Stage,
        #[source]
        source: OcrError,
    },

    /// The OCR engine could not be initialised.
    #[error("OCR engine unavailable: {0}")]
    Engine(#[source] OcrError),

    /// The extraction did not finish before its deadline.
    #[error("OCR extraction timed out after {0:?}")]
    Timeout(Duration),

    /// The extraction was abandoned by its caller.
    #[error("OCR extraction cancelled")]
    Cancelled,

    /// The blocking worker running the extraction died.
    #[error("OCR worker failed: {0}")]
    Worker(String),

    /// The uploaded file was rejected before extraction.
    #[error("upload rejected: {0}")]
    Upload(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ScanError {
    /// Wrap a stage failure.
    pub fn at(stage: Stage, source: OcrError) -> Self {
        Self::Extraction { stage, source }
    }

    /// The pipeline stage that failed, if the error came from one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Extraction { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Pipeline stage of a single extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Writing the upload to a scratch file.
    Staging,
    /// Image decoding and normalization.
    Preprocessing,
    /// OCR engine call.
    Recognition,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Staging => f.write_str("staging"),
            Stage::Preprocessing => f.write_str("preprocessing"),
            Stage::Recognition => f.write_str("recognition"),
        }
    }
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Image preprocessing failed.
    #[error("image preprocessing failed: {0}")]
    Preprocessing(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Result type for the batlabel library.
pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_message() {
        let err = ScanError::at(
            Stage::Recognition,
            OcrError::Recognition("engine crashed".to_string()),
        );

        assert_eq!(err.stage(), Some(Stage::Recognition));
        assert_eq!(
            err.to_string(),
            "OCR extraction failed during recognition: text recognition failed: engine crashed"
        );
    }

    #[test]
    fn test_non_stage_errors() {
        assert_eq!(ScanError::Cancelled.stage(), None);
        assert!(ScanError::Timeout(Duration::from_millis(250))
            .to_string()
            .contains("250ms"));
    }
}
