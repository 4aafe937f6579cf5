//! End-to-end label extraction: stage, preprocess, recognize, parse.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{OcrError, Result, ScanError, Stage};
use crate::models::battery::{ParsedBatteryData, RawImage, ScanResult, UploadedImage};
use crate::models::config::BatlabelConfig;
use crate::ocr::{LabelPreprocessor, OcrBackend, ScratchFile};

use super::parser::LabelParser;

/// Battery label extractor.
///
/// Each call stages the upload and its preprocessed copy as scratch files,
/// which are removed on every exit path. The backend is shared by all calls.
pub struct LabelExtractor<B> {
    backend: B,
    preprocessor: LabelPreprocessor,
    parser: LabelParser,
    scratch_dir: PathBuf,
    timeout: Duration,
}

/// Builder for [`LabelExtractor`].
pub struct LabelExtractorBuilder<B> {
    backend: B,
    config: BatlabelConfig,
    scratch_dir: Option<PathBuf>,
}

impl<B: OcrBackend> LabelExtractorBuilder<B> {
    /// Apply preprocessing, extraction and OCR settings.
    pub fn with_config(mut self, config: &BatlabelConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// Directory for scratch files (default: configured or system temp dir).
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Default deadline for [`LabelExtractor::extract_async`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.ocr.timeout_ms = timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn build(self) -> Result<LabelExtractor<B>> {
        self.config.validate()?;

        let scratch_dir = self
            .scratch_dir
            .unwrap_or_else(|| self.config.ocr.scratch_dir());
        std::fs::create_dir_all(&scratch_dir)?;

        debug!(
            "Building label extractor: backend={}, scratch_dir={}",
            self.backend.name(),
            scratch_dir.display()
        );

        Ok(LabelExtractor {
            backend: self.backend,
            preprocessor: LabelPreprocessor::with_config(self.config.preprocessing.clone()),
            parser: LabelParser::from_config(&self.config.extraction),
            scratch_dir,
            timeout: self.config.ocr.timeout(),
        })
    }
}

impl<B: OcrBackend> LabelExtractor<B> {
    /// Create an extractor with default settings.
    pub fn new(backend: B) -> Result<Self> {
        Self::builder(backend).build()
    }

    pub fn builder(backend: B) -> LabelExtractorBuilder<B> {
        LabelExtractorBuilder {
            backend,
            config: BatlabelConfig::default(),
            scratch_dir: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Extract the battery record from a label image.
    ///
    /// An unreadable label is not an error: it yields a placeholder record
    /// with low confidence.
    pub fn extract(&self, image: RawImage<'_>) -> Result<ParsedBatteryData> {
        self.scan(image).map(|result| result.data)
    }

    /// Like [`extract`](Self::extract), also returning the recognized text.
    pub fn scan(&self, image: RawImage<'_>) -> Result<ScanResult> {
        self.scan_cancellable(image, &AtomicBool::new(false))
    }

    /// Run preprocessing, recognition and parsing on an image already on disk.
    ///
    /// The file itself is left in place; only the preprocessed copy is a
    /// scratch file.
    pub fn extract_from_path(&self, path: &Path) -> Result<ScanResult> {
        info!("Scanning label image {}", path.display());
        self.run(path, &AtomicBool::new(false), Instant::now())
    }

    /// Parse already-recognized text.
    pub fn parse_text(&self, text: &str) -> ParsedBatteryData {
        self.parser.parse(text)
    }

    /// End the lifetime of the OCR engine handle.
    pub fn shutdown(self) {
        info!("Shutting down {} OCR backend", self.backend.name());
        drop(self.backend);
    }

    fn scan_cancellable(&self, image: RawImage<'_>, cancel: &AtomicBool) -> Result<ScanResult> {
        let start = Instant::now();

        if image.bytes.is_empty() {
            return Err(ScanError::Upload("image file is empty".to_string()));
        }

        info!(
            "Scanning label image ({} bytes, name: {})",
            image.bytes.len(),
            image.original_name.unwrap_or("<none>")
        );

        let staged = ScratchFile::write(&self.scratch_dir, "ocr", &image.extension(), image.bytes)
            .map_err(|e| {
                ScanError::at(
                    Stage::Staging,
                    OcrError::Preprocessing(format!("failed to stage upload: {}", e)),
                )
            })?;

        self.run(staged.path(), cancel, start)
    }

    fn run(&self, path: &Path, cancel: &AtomicBool, start: Instant) -> Result<ScanResult> {
        checkpoint(cancel)?;

        let processed = self
            .preprocessor
            .preprocess_file(path, &self.scratch_dir)
            .map_err(|e| ScanError::at(Stage::Preprocessing, e))?;
        debug!("Preprocessing done after {}ms", start.elapsed().as_millis());

        checkpoint(cancel)?;

        let text = self
            .backend
            .recognize(processed.path())
            .map_err(|e| ScanError::at(Stage::Recognition, e))?;
        drop(processed);
        debug!("Recognized {} chars: {:?}", text.len(), text);

        checkpoint(cancel)?;

        let data = self.parser.parse(&text);
        let processing_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "Label scan complete: code={}, found={}, confidence={:.2} in {}ms",
            data.battery_code, data.found, data.confidence, processing_time_ms
        );

        Ok(ScanResult {
            data,
            extracted_text: text,
            ocr_engine: self.backend.name().to_string(),
            processing_time_ms,
        })
    }
}

impl<B: OcrBackend + 'static> LabelExtractor<B> {
    /// Run an extraction on a blocking worker with a deadline.
    ///
    /// On timeout the worker is told to stop at its next stage boundary and
    /// still removes its scratch files; the caller gets
    /// [`ScanError::Timeout`] immediately.
    pub async fn extract_with_timeout(
        self: Arc<Self>,
        image: UploadedImage,
        timeout: Duration,
    ) -> Result<ScanResult> {
        let cancel = Arc::new(AtomicBool::new(false));

        let worker = {
            let cancel = Arc::clone(&cancel);
            tokio::task::spawn_blocking(move || self.scan_cancellable(image.as_raw(), &cancel))
        };

        match tokio::time::timeout(timeout, worker).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ScanError::Worker(e.to_string())),
            Err(_) => {
                cancel.store(true, Ordering::SeqCst);
                warn!("Label scan timed out after {:?}, cancelling", timeout);
                Err(ScanError::Timeout(timeout))
            }
        }
    }

    /// [`extract_with_timeout`](Self::extract_with_timeout) with the
    /// configured deadline.
    pub async fn extract_async(self: Arc<Self>, image: UploadedImage) -> Result<ScanResult> {
        let timeout = self.timeout;
        self.extract_with_timeout(image, timeout).await
    }
}

#[cfg(feature = "native")]
impl LabelExtractor<crate::ocr::PureOcrBackend> {
    /// Load the native OCR engine from the configured model directory.
    pub fn from_config(config: &BatlabelConfig) -> Result<Self> {
        let backend = crate::ocr::PureOcrBackend::from_config(&config.models, &config.ocr)
            .map_err(ScanError::Engine)?;
        Self::builder(backend).with_config(config).build()
    }
}

fn checkpoint(cancel: &AtomicBool) -> Result<()> {
    if cancel.load(Ordering::SeqCst) {
        debug!("Label scan cancelled at stage boundary");
        return Err(ScanError::Cancelled);
    }
    Ok(())
}
