//! Label image preprocessing for OCR.

use std::path::Path;

use image::{imageops, DynamicImage, GenericImageView, GrayImage, ImageFormat, ImageReader, Luma};
use tracing::debug;

use crate::error::OcrError;
use crate::models::config::PreprocessConfig;

use super::scratch::ScratchFile;

/// Image preprocessor tuned for battery label photographs.
///
/// Pipeline: downscale to fit, greyscale, percentile contrast stretch,
/// unsharp mask, then an optional fixed-threshold binarization.
pub struct LabelPreprocessor {
    config: PreprocessConfig,
}

impl LabelPreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self::with_config(PreprocessConfig::default())
    }

    pub fn with_config(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Set maximum image dimension.
    pub fn with_max_dimension(mut self, size: u32) -> Self {
        self.config.max_dimension = size;
        self
    }

    /// Enable or disable binarization.
    pub fn with_binarize(mut self, binarize: bool) -> Self {
        self.config.binarize = binarize;
        self
    }

    /// Decode `input` and write the processed image as a PNG scratch file
    /// in `scratch_dir`.
    pub fn preprocess_file(&self, input: &Path, scratch_dir: &Path) -> Result<ScratchFile, OcrError> {
        let image = ImageReader::open(input)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| OcrError::Preprocessing(format!("failed to read {}: {}", input.display(), e)))?
            .decode()
            .map_err(|e| OcrError::Preprocessing(format!("failed to decode image: {}", e)))?;

        let processed = self.preprocess(&image)?;

        let output = ScratchFile::reserve(scratch_dir, "processed", ".png")
            .map_err(|e| OcrError::Preprocessing(format!("failed to create output file: {}", e)))?;

        processed
            .save_with_format(output.path(), ImageFormat::Png)
            .map_err(|e| OcrError::Preprocessing(format!("failed to write processed image: {}", e)))?;

        debug!("Wrote processed image to {}", output.path().display());
        Ok(output)
    }

    /// Apply the preprocessing pipeline to a decoded image.
    pub fn preprocess(&self, image: &DynamicImage) -> Result<GrayImage, OcrError> {
        let (orig_width, orig_height) = image.dimensions();
        if orig_width == 0 || orig_height == 0 {
            return Err(OcrError::InvalidImage(format!(
                "image has no pixels ({}x{})",
                orig_width, orig_height
            )));
        }
        debug!("Original image size: {}x{}", orig_width, orig_height);

        let (new_width, new_height) =
            target_dimensions(orig_width, orig_height, self.config.max_dimension);

        let mut gray = if (new_width, new_height) == (orig_width, orig_height) {
            image.to_luma8()
        } else {
            debug!("Downscaling to {}x{}", new_width, new_height);
            image
                .resize_exact(new_width, new_height, imageops::FilterType::Lanczos3)
                .to_luma8()
        };

        if self.config.normalize {
            self.normalize_contrast(&mut gray);
        }

        let mut sharpened = self.sharpen(&gray);

        if self.config.binarize {
            threshold(&mut sharpened, self.config.binarize_threshold);
        }

        Ok(sharpened)
    }

    /// Stretch luminance so the configured low/high percentiles map to 0/255.
    fn normalize_contrast(&self, image: &mut GrayImage) {
        let mut histogram = [0u64; 256];
        for pixel in image.pixels() {
            histogram[pixel[0] as usize] += 1;
        }

        let total = u64::from(image.width()) * u64::from(image.height());
        let low = percentile(&histogram, total, self.config.normalize_low_percentile);
        let high = percentile(&histogram, total, self.config.normalize_high_percentile);

        if high <= low {
            debug!("Skipping contrast stretch on flat image (level {})", low);
            return;
        }

        let scale = 255.0 / f32::from(high - low);
        for pixel in image.pixels_mut() {
            let value = (f32::from(pixel[0].clamp(low, high) - low) * scale).round();
            pixel[0] = value as u8;
        }
    }

    /// Unsharp mask with separate gains for flat and jagged detail and
    /// separate caps for brightening and darkening.
    fn sharpen(&self, image: &GrayImage) -> GrayImage {
        let cfg = &self.config;
        let blurred = imageops::blur(image, cfg.sharpen_sigma);

        let mut result = GrayImage::new(image.width(), image.height());
        for (x, y, pixel) in image.enumerate_pixels() {
            let original = f32::from(pixel[0]);
            let detail = original - f32::from(blurred.get_pixel(x, y)[0]);

            let gain = if detail.abs() < cfg.sharpen_threshold {
                cfg.sharpen_flat
            } else {
                cfg.sharpen_jagged
            };
            let delta = (detail * gain).clamp(-cfg.max_darken, cfg.max_brighten);

            let value = (original + delta).round().clamp(0.0, 255.0);
            result.put_pixel(x, y, Luma([value as u8]));
        }

        result
    }
}

impl Default for LabelPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Dimensions that fit within `max_dimension` on both sides, preserving the
/// aspect ratio. Never upscales.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dim = width.max(height);

    if max_dim <= max_dimension {
        return (width, height);
    }

    let scale = max_dimension as f32 / max_dim as f32;
    let new_width = (width as f32 * scale).round() as u32;
    let new_height = (height as f32 * scale).round() as u32;

    (new_width.clamp(1, max_dimension), new_height.clamp(1, max_dimension))
}

fn percentile(histogram: &[u64; 256], total: u64, pct: f32) -> u8 {
    let target = ((pct / 100.0) * total as f32).ceil().max(1.0) as u64;
    let mut seen = 0u64;

    for (level, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen >= target {
            return level as u8;
        }
    }

    255
}

fn threshold(image: &mut GrayImage, level: u8) {
    for pixel in image.pixels_mut() {
        pixel[0] = if pixel[0] >= level { 255 } else { 0 };
    }
}
