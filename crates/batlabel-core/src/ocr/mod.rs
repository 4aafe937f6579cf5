//! OCR stage: label preprocessing, scratch files and recognition backends.

mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;
mod scratch;

pub use preprocessing::{target_dimensions, LabelPreprocessor};
#[cfg(feature = "native")]
pub use pure_engine::PureOcrBackend;
pub use scratch::ScratchFile;

use std::path::Path;
use std::sync::Arc;

use crate::error::OcrError;

/// A text recognition engine run over an image file.
///
/// Implementations are loaded once and shared between extractions, so they
/// must tolerate concurrent callers (serializing internally if the engine is
/// not reentrant).
pub trait OcrBackend: Send + Sync {
    /// Engine identifier reported alongside results.
    fn name(&self) -> &str;

    /// Recognize all text in the image at `image_path`.
    fn recognize(&self, image_path: &Path) -> Result<String, OcrError>;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
        (**self).recognize(image_path)
    }
}

impl<T: OcrBackend + ?Sized> OcrBackend for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
        (**self).recognize(image_path)
    }
}
