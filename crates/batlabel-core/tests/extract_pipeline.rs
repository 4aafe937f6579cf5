//! End-to-end extraction tests with deterministic OCR backends.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use batlabel_core::{
    BatlabelConfig, CodePattern, LabelExtractor, OcrBackend, OcrError, RawImage, ScanError,
    Stage, UploadedImage,
};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use pretty_assertions::assert_eq;

/// Returns the same text for every image.
struct StubBackend(String);

impl StubBackend {
    fn new(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl OcrBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    fn recognize(&self, _image_path: &Path) -> Result<String, OcrError> {
        Ok(self.0.clone())
    }
}

struct FailingBackend;

impl OcrBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    fn recognize(&self, _image_path: &Path) -> Result<String, OcrError> {
        Err(OcrError::Recognition("engine crashed".to_string()))
    }
}

struct SlowBackend(Duration);

impl OcrBackend for SlowBackend {
    fn name(&self) -> &str {
        "slow"
    }

    fn recognize(&self, _image_path: &Path) -> Result<String, OcrError> {
        thread::sleep(self.0);
        Ok("BAT-4F8D21K9".to_string())
    }
}

/// Records the scratch directory contents seen during recognition.
struct RecordingBackend {
    scratch_dir: PathBuf,
    seen: Mutex<Vec<(PathBuf, Vec<String>)>>,
}

impl OcrBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
        let mut names: Vec<String> = std::fs::read_dir(&self.scratch_dir)
            .map_err(|e| OcrError::Recognition(e.to_string()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();

        self.seen
            .lock()
            .map_err(|_| OcrError::Recognition("poisoned".to_string()))?
            .push((image_path.to_path_buf(), names));
        Ok("Tesla S/N: QX77120045".to_string())
    }
}

fn label_png() -> Vec<u8> {
    let image = GrayImage::from_fn(120, 40, |x, y| {
        let stroke = (x / 6) % 2 == 0 && (10..30).contains(&y);
        Luma([if stroke { 20 } else { 235 }])
    });

    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn scratch_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

fn extractor<B: OcrBackend>(backend: B, dir: &Path) -> LabelExtractor<B> {
    LabelExtractor::builder(backend)
        .with_scratch_dir(dir)
        .build()
        .unwrap()
}

#[test]
fn test_full_label_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = extractor(
        StubBackend::new("Panasonic BAT-4F8D21K9 48V 2500mAh"),
        dir.path(),
    );

    let bytes = label_png();
    let data = extractor
        .extract(RawImage::new(&bytes).with_name("label.png"))
        .unwrap();

    assert_eq!(data.battery_code, "4F8D21K9");
    assert_eq!(data.brand.as_deref(), Some("Panasonic"));
    assert_eq!(data.voltage, Some(48.0));
    assert_eq!(data.capacity, Some(2500.0));
    assert!(data.found);
    assert_eq!(data.match_type, Some(CodePattern::BatPrefix));
    assert!((data.confidence - 0.95).abs() < 1e-6);
    assert_eq!(scratch_entries(dir.path()), 0);
}

#[test]
fn test_unreadable_label_degrades_to_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = extractor(StubBackend::new("hello world"), dir.path());

    let bytes = label_png();
    let data = extractor.extract(RawImage::new(&bytes)).unwrap();

    assert!(!data.found);
    assert!(data.is_placeholder());
    assert!(data.battery_code.starts_with("BAT-UNKNOWN-"));
    assert_eq!(data.brand, None);
    assert_eq!(data.voltage, None);
    assert_eq!(data.capacity, None);
    assert_eq!(data.match_type, None);
    assert!((data.confidence - 0.3).abs() < 1e-6);
    assert_eq!(scratch_entries(dir.path()), 0);
}

#[test]
fn test_engine_failure_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = extractor(FailingBackend, dir.path());

    let bytes = label_png();
    let err = extractor.extract(RawImage::new(&bytes)).unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Recognition));
    assert!(err.to_string().contains("engine crashed"));
    assert_eq!(scratch_entries(dir.path()), 0);
}

#[test]
fn test_corrupt_image_fails_in_preprocessing() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = extractor(StubBackend::new("BAT-4F8D21K9"), dir.path());

    let err = extractor
        .extract(RawImage::new(b"not an image at all").with_name("label.jpg"))
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Preprocessing));
    assert!(err.to_string().starts_with("OCR extraction failed during preprocessing"));
    assert_eq!(scratch_entries(dir.path()), 0);
}

#[test]
fn test_empty_upload_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = extractor(StubBackend::new("BAT-4F8D21K9"), dir.path());

    let err = extractor.extract(RawImage::new(&[])).unwrap_err();

    assert!(matches!(err, ScanError::Upload(_)));
    assert_eq!(scratch_entries(dir.path()), 0);
}

#[test]
fn test_extraction_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = extractor(
        StubBackend::new("CATL BTY-77XQ1290 22.2V 100Ah"),
        dir.path(),
    );

    let bytes = label_png();
    let first = extractor.extract(RawImage::new(&bytes)).unwrap();
    let second = extractor.extract(RawImage::new(&bytes)).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_staged_files_seen_by_backend() {
    let dir = tempfile::tempdir().unwrap();
    let backend = RecordingBackend {
        scratch_dir: dir.path().to_path_buf(),
        seen: Mutex::new(Vec::new()),
    };
    let extractor = extractor(backend, dir.path());

    let bytes = label_png();
    let result = extractor
        .scan(RawImage::new(&bytes).with_name("photo.PNG"))
        .unwrap();
    assert_eq!(result.data.battery_code, "QX77120045");

    let seen = extractor.backend().seen.lock().unwrap();
    let (path, names) = &seen[0];

    assert_eq!(names.len(), 2);
    assert!(names.iter().any(|n| n.starts_with("ocr_") && n.ends_with(".png")));
    assert!(names.iter().any(|n| n.starts_with("processed_") && n.ends_with(".png")));

    let recognized = path.file_name().unwrap().to_string_lossy();
    assert!(recognized.starts_with("processed_"));
    assert_eq!(scratch_entries(dir.path()), 0);
}

#[test]
fn test_extract_from_path_keeps_input() {
    let dir = tempfile::tempdir().unwrap();
    let input_dir = tempfile::tempdir().unwrap();
    let input = input_dir.path().join("label.png");
    std::fs::write(&input, label_png()).unwrap();

    let extractor = extractor(StubBackend::new("LG MODEL: INR18650MJ1 3.6V"), dir.path());
    let result = extractor.extract_from_path(&input).unwrap();

    assert_eq!(result.data.match_type, Some(CodePattern::ModelNumber));
    assert_eq!(result.data.brand.as_deref(), Some("LG"));
    assert!(input.exists());
    assert_eq!(scratch_entries(dir.path()), 0);
}

#[test]
fn test_concurrent_extractions() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(extractor(
        StubBackend::new("Samsung BAT-4F8D21K9 3.7V 2600mAh"),
        dir.path(),
    ));
    let bytes = Arc::new(label_png());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let extractor = Arc::clone(&extractor);
            let bytes = Arc::clone(&bytes);
            thread::spawn(move || extractor.extract(RawImage::new(&bytes)).unwrap())
        })
        .collect();

    for handle in handles {
        let data = handle.join().unwrap();
        assert_eq!(data.battery_code, "4F8D21K9");
        assert_eq!(data.brand.as_deref(), Some("Samsung"));
    }

    assert_eq!(scratch_entries(dir.path()), 0);
}

#[test]
fn test_configured_correction_mode() {
    let dir = tempfile::tempdir().unwrap();
    let config: BatlabelConfig =
        serde_json::from_str(r#"{"extraction": {"digit_correction": "none"}}"#).unwrap();

    let extractor = LabelExtractor::builder(StubBackend::new("S/N: 12O4567l90"))
        .with_config(&config)
        .with_scratch_dir(dir.path())
        .build()
        .unwrap();

    let bytes = label_png();
    let data = extractor.extract(RawImage::new(&bytes)).unwrap();
    assert_eq!(data.battery_code, "12O4567l90");
}

#[tokio::test]
async fn test_timeout_cancels_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(extractor(
        SlowBackend(Duration::from_millis(400)),
        dir.path(),
    ));

    let upload = UploadedImage::new(label_png(), Some("label.png".to_string()));
    let err = extractor
        .extract_with_timeout(upload, Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::Timeout(_)));

    // The abandoned worker finishes its recognition call, then removes its files.
    let mut remaining = scratch_entries(dir.path());
    for _ in 0..50 {
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        remaining = scratch_entries(dir.path());
    }
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_extract_async_within_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(extractor(StubBackend::new("BYD BAT-77XQ1290 400V"), dir.path()));

    let upload = UploadedImage::new(label_png(), None);
    let result = extractor.extract_async(upload).await.unwrap();

    assert_eq!(result.data.battery_code, "77XQ1290");
    assert_eq!(result.data.voltage, Some(400.0));
    assert_eq!(result.ocr_engine, "stub");
}
