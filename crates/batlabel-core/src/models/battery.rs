//! Battery label data models.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Prefix of the code assigned when no battery code pattern matched.
pub const PLACEHOLDER_PREFIX: &str = "BAT-UNKNOWN-";

/// Maximum accepted upload size (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// MIME types accepted for label uploads.
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

const DEFAULT_EXTENSION: &str = ".jpg";

/// A label image supplied by the caller, borrowed for one extraction.
#[derive(Debug, Clone, Copy)]
pub struct RawImage<'a> {
    /// Encoded image bytes (JPEG, PNG, WebP, ...).
    pub bytes: &'a [u8],

    /// Original upload filename, used only to pick a temp-file extension.
    pub original_name: Option<&'a str>,
}

impl<'a> RawImage<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            original_name: None,
        }
    }

    pub fn with_name(mut self, name: &'a str) -> Self {
        self.original_name = Some(name);
        self
    }

    /// File extension (with leading dot) for the staged copy of this image.
    ///
    /// Falls back to `.jpg` when the name is missing or its extension is not
    /// a short alphanumeric token.
    pub fn extension(&self) -> String {
        self.original_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| {
                !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
            })
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
    }

    /// Check an upload before extraction: non-empty, within the size limit,
    /// and of an accepted image MIME type.
    pub fn validate(&self, mime_type: &str) -> Result<(), ScanError> {
        if self.bytes.is_empty() {
            return Err(ScanError::Upload("image file is empty".to_string()));
        }

        if self.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(ScanError::Upload(format!(
                "file too large: {} bytes (max {} bytes)",
                self.bytes.len(),
                MAX_UPLOAD_BYTES
            )));
        }

        let mime = mime_type.trim().to_ascii_lowercase();
        if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
            return Err(ScanError::Upload(format!(
                "invalid file type {}; allowed types: {}",
                mime_type,
                ALLOWED_MIME_TYPES.join(", ")
            )));
        }

        Ok(())
    }
}

/// Owned label image, for moving an upload onto a worker thread.
#[derive(Debug, Clone, Default)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub original_name: Option<String>,
}

impl UploadedImage {
    pub fn new(bytes: Vec<u8>, original_name: Option<String>) -> Self {
        Self {
            bytes,
            original_name,
        }
    }

    /// Borrow as a [`RawImage`].
    pub fn as_raw(&self) -> RawImage<'_> {
        RawImage {
            bytes: &self.bytes,
            original_name: self.original_name.as_deref(),
        }
    }
}

/// Validate raw upload bytes against the accepted size and MIME types.
pub fn validate_upload(bytes: &[u8], mime_type: &str) -> Result<(), ScanError> {
    RawImage::new(bytes).validate(mime_type)
}

/// MIME type implied by a file name's extension.
///
/// Unknown or missing extensions map to `application/octet-stream`, which
/// [`validate_upload`] rejects.
pub fn mime_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Which battery code pattern produced a match.
///
/// Variants are listed in cascade order; [`CodePattern::priority`] gives the
/// 1-based position used for confidence weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodePattern {
    /// `BAT`/`BATT`/`BTY` prefix.
    BatPrefix,
    /// `SN`, `S/N` or `SERIAL` label.
    SerialNumber,
    /// `P/N` label.
    PartNumber,
    /// `MODEL`/`MDL` label.
    ModelNumber,
    /// 2-4 letters followed by 6-10 digits.
    AlphaNumeric,
    /// 2 digits, 2-3 letters, 6-8 digits.
    NumericAlpha,
    /// One letter followed by 8-12 digits.
    SingleAlphaNumeric,
    /// Bare 10-13 digit run.
    Barcode,
    /// Any 8-15 character uppercase alphanumeric token.
    Generic,
}

impl CodePattern {
    /// All patterns in cascade order.
    pub const ALL: [CodePattern; 9] = [
        CodePattern::BatPrefix,
        CodePattern::SerialNumber,
        CodePattern::PartNumber,
        CodePattern::ModelNumber,
        CodePattern::AlphaNumeric,
        CodePattern::NumericAlpha,
        CodePattern::SingleAlphaNumeric,
        CodePattern::Barcode,
        CodePattern::Generic,
    ];

    pub fn priority(self) -> u8 {
        match self {
            CodePattern::BatPrefix => 1,
            CodePattern::SerialNumber => 2,
            CodePattern::PartNumber => 3,
            CodePattern::ModelNumber => 4,
            CodePattern::AlphaNumeric => 5,
            CodePattern::NumericAlpha => 6,
            CodePattern::SingleAlphaNumeric => 7,
            CodePattern::Barcode => 8,
            CodePattern::Generic => 9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CodePattern::BatPrefix => "BAT_PREFIX",
            CodePattern::SerialNumber => "SERIAL_NUMBER",
            CodePattern::PartNumber => "PART_NUMBER",
            CodePattern::ModelNumber => "MODEL_NUMBER",
            CodePattern::AlphaNumeric => "ALPHA_NUMERIC",
            CodePattern::NumericAlpha => "NUMERIC_ALPHA",
            CodePattern::SingleAlphaNumeric => "SINGLE_ALPHA_NUMERIC",
            CodePattern::Barcode => "BARCODE",
            CodePattern::Generic => "GENERIC",
        }
    }
}

/// Structured battery record recovered from a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedBatteryData {
    /// Matched battery code, or a `BAT-UNKNOWN-<epoch millis>` placeholder.
    pub battery_code: String,

    /// Brand from the known-brand catalogue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    /// Nominal voltage in volts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f32>,

    /// Capacity as printed (mAh or Ah, not converted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f32>,

    /// Whether a battery code pattern matched.
    pub found: bool,

    /// Heuristic confidence, never above 0.95.
    pub confidence: f32,

    /// Pattern that produced the battery code.
    #[serde(rename = "matchType", skip_serializing_if = "Option::is_none")]
    pub match_type: Option<CodePattern>,
}

impl ParsedBatteryData {
    /// Whether the battery code is a generated placeholder.
    pub fn is_placeholder(&self) -> bool {
        !self.found && self.battery_code.starts_with(PLACEHOLDER_PREFIX)
    }
}

/// Full output of one label scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Parsed battery record.
    #[serde(flatten)]
    pub data: ParsedBatteryData,

    /// Raw text returned by the OCR engine.
    pub extracted_text: String,

    /// OCR engine used.
    pub ocr_engine: String,

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_name() {
        let bytes = [1u8, 2, 3];
        assert_eq!(RawImage::new(&bytes).extension(), ".jpg");
        assert_eq!(RawImage::new(&bytes).with_name("label.PNG").extension(), ".png");
        assert_eq!(RawImage::new(&bytes).with_name("label").extension(), ".jpg");
        assert_eq!(
            RawImage::new(&bytes).with_name("label.p/ng").extension(),
            ".jpg"
        );
    }

    #[test]
    fn test_validate_upload() {
        let bytes = [0xffu8, 0xd8, 0xff];
        let image = RawImage::new(&bytes);

        assert!(image.validate("image/jpeg").is_ok());
        assert!(image.validate("image/webp").is_ok());
        assert!(matches!(
            image.validate("application/pdf"),
            Err(ScanError::Upload(_))
        ));
        assert!(matches!(
            RawImage::new(&[]).validate("image/png"),
            Err(ScanError::Upload(_))
        ));

        let oversized = vec![0u8; MAX_UPLOAD_BYTES + 1];
        assert!(RawImage::new(&oversized).validate("image/png").is_err());
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for("label.JPG"), "image/jpeg");
        assert_eq!(mime_type_for("label.jpeg"), "image/jpeg");
        assert_eq!(mime_type_for("dir/label.png"), "image/png");
        assert_eq!(mime_type_for("label.webp"), "image/webp");
        assert_eq!(mime_type_for("scan.tiff"), "application/octet-stream");
        assert_eq!(mime_type_for("label"), "application/octet-stream");
        assert!(validate_upload(b"x", mime_type_for("notes.txt")).is_err());
    }

    #[test]
    fn test_code_pattern_order() {
        for (i, pattern) in CodePattern::ALL.iter().enumerate() {
            assert_eq!(pattern.priority() as usize, i + 1);
        }
        assert_eq!(
            serde_json::to_string(&CodePattern::SingleAlphaNumeric).unwrap(),
            "\"SINGLE_ALPHA_NUMERIC\""
        );
    }

    #[test]
    fn test_serialization_omits_missing_fields() {
        let data = ParsedBatteryData {
            battery_code: "BAT-UNKNOWN-1700000000000".to_string(),
            brand: None,
            voltage: None,
            capacity: None,
            found: false,
            confidence: 0.3,
            match_type: None,
        };

        let json = serde_json::to_value(&data).unwrap();
        assert!(json.get("brand").is_none());
        assert!(json.get("matchType").is_none());
        assert_eq!(json["found"], false);
        assert!(data.is_placeholder());
    }
}
