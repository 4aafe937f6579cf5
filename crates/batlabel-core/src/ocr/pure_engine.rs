//! Pure Rust OCR backend using `pure-onnx-ocr`.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use image::GenericImageView;
use tracing::{debug, info, warn};

use pure_onnx_ocr::engine::{OcrEngine, OcrEngineBuilder};

use crate::error::OcrError;
use crate::models::config::{ModelConfig, OcrConfig};

use super::OcrBackend;

/// Regions whose top edges are this close (in pixels) share a row.
const ROW_HEIGHT: f32 = 20.0;

/// An image to recognize and where to send the text.
struct Request {
    image_path: PathBuf,
    reply: Sender<Result<String, OcrError>>,
}

/// OCR backend backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
///
/// The engine is not thread-safe, so it is built on and never leaves a
/// dedicated worker thread. Requests are served one at a time in arrival
/// order. Dropping the backend stops the worker and waits for it.
pub struct PureOcrBackend {
    requests: Option<Sender<Request>>,
    worker: Option<JoinHandle<()>>,
}

impl PureOcrBackend {
    /// Load the detection/recognition models and dictionary from `model_dir`.
    pub fn from_dir(model_dir: &Path, models: &ModelConfig, config: &OcrConfig) -> Result<Self, OcrError> {
        let det_path = model_dir.join(&models.detection_model);
        let rec_path = model_dir.join(&models.recognition_model);
        let dict_path = model_dir.join(&models.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
        }

        let keep_unk = config.keep_unk;
        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), OcrError>>();

        let worker = thread::Builder::new()
            .name("batlabel-ocr".to_string())
            .spawn(move || {
                let engine = match OcrEngineBuilder::new()
                    .det_model_path(&det_path)
                    .rec_model_path(&rec_path)
                    .dictionary_path(&dict_path)
                    .build()
                {
                    Ok(engine) => engine,
                    Err(e) => {
                        let _ = ready_tx.send(Err(OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e))));
                        return;
                    }
                };

                if ready_tx.send(Ok(())).is_ok() {
                    serve(&engine, keep_unk, request_rx);
                }
            })
            .map_err(|e| OcrError::ModelLoad(format!("failed to start OCR worker: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(OcrError::ModelLoad(
                    "OCR worker exited while loading models".to_string(),
                ));
            }
        }

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self {
            requests: Some(request_tx),
            worker: Some(worker),
        })
    }

    /// Load using the model directory and file names from `models`.
    pub fn from_config(models: &ModelConfig, config: &OcrConfig) -> Result<Self, OcrError> {
        Self::from_dir(&models.model_dir, models, config)
    }
}

impl OcrBackend for PureOcrBackend {
    fn name(&self) -> &str {
        "pure-onnx-ocr"
    }

    fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| OcrError::Recognition("OCR worker has stopped".to_string()))?;

        let (reply_tx, reply_rx) = mpsc::channel();
        requests
            .send(Request {
                image_path: image_path.to_path_buf(),
                reply: reply_tx,
            })
            .map_err(|_| OcrError::Recognition("OCR worker has stopped".to_string()))?;

        reply_rx
            .recv()
            .map_err(|_| OcrError::Recognition("OCR worker exited mid-request".to_string()))?
    }
}

impl Drop for PureOcrBackend {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        drop(self.requests.take());

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("OCR worker thread panicked");
            }
        }
        debug!("OCR worker stopped");
    }
}

/// Worker loop: recognize each request until every sender is gone.
fn serve(engine: &OcrEngine, keep_unk: bool, requests: Receiver<Request>) {
    for request in requests {
        let result = recognize_file(engine, &request.image_path, keep_unk);
        if request.reply.send(result).is_err() {
            debug!("Caller left before {} was recognized", request.image_path.display());
        }
    }
}

fn recognize_file(engine: &OcrEngine, image_path: &Path, keep_unk: bool) -> Result<String, OcrError> {
    let start = Instant::now();

    let image = image::open(image_path).map_err(|e| {
        OcrError::InvalidImage(format!("failed to open {}: {}", image_path.display(), e))
    })?;
    let (width, height) = image.dimensions();
    debug!("Recognizing {}x{} image", width, height);

    let results = engine
        .run_from_image(&image)
        .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

    debug!("pure-onnx-ocr returned {} text regions", results.len());

    let regions: Vec<TextRegion> = results
        .iter()
        .map(|r| {
            let (x, y) = top_left(&r.bounding_box);
            TextRegion {
                text: clean_text(&r.text, keep_unk),
                x,
                y,
            }
        })
        .collect();

    let text = join_in_reading_order(regions);

    info!(
        "OCR complete: {} regions, {} chars in {}ms",
        results.len(),
        text.len(),
        start.elapsed().as_millis()
    );

    Ok(text)
}

/// A recognized region reduced to what reading order needs.
#[derive(Debug, Clone)]
struct TextRegion {
    text: String,
    x: f32,
    y: f32,
}

/// Top-left corner of a detection polygon.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f32, f32) {
    polygon
        .exterior()
        .coords()
        .fold((f32::INFINITY, f32::INFINITY), |(x, y), c| {
            (x.min(c.x as f32), y.min(c.y as f32))
        })
}

fn clean_text(text: &str, keep_unk: bool) -> String {
    if keep_unk {
        text.to_string()
    } else {
        text.replace("[UNK]", " ").trim().to_string()
    }
}

/// Sort regions top-to-bottom by row, then left-to-right, and join them with
/// newlines. Empty regions are skipped.
fn join_in_reading_order(mut regions: Vec<TextRegion>) -> String {
    regions.sort_by(|a, b| {
        let row_a = (a.y / ROW_HEIGHT) as i32;
        let row_b = (b.y / ROW_HEIGHT) as i32;
        row_a
            .cmp(&row_b)
            .then_with(|| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    regions
        .iter()
        .filter(|r| !r.text.is_empty())
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
