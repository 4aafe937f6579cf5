//! Scan command - extract battery data from a single label image.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use batlabel_core::{LabelExtractor, ScanResult};

use super::{format_record, load_config, read_upload, OutputFormat};

/// Arguments for the scan command.
#[derive(Args)]
pub struct ScanArgs {
    /// Label image (JPEG, PNG, WebP)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Abandon the scan after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Show extraction confidence and timing
    #[arg(long)]
    show_confidence: bool,
}

pub async fn run(args: ScanArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut config = load_config(config_path)?;

    if let Some(model_dir) = &args.model_dir {
        config.models.model_dir = model_dir.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.ocr.timeout_ms = timeout_ms;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let upload = read_upload(&args.input)?;

    info!("Scanning label: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    pb.set_message("Loading OCR models...");
    let extractor = LabelExtractor::from_config(&config).map_err(|e| {
        anyhow::anyhow!(
            "{}\n\nPlace {}, {} and {} in {} or pass --model-dir.",
            e,
            config.models.detection_model,
            config.models.recognition_model,
            config.models.dictionary,
            config.models.model_dir.display()
        )
    })?;

    pb.set_message("Running OCR...");
    let result = Arc::new(extractor).extract_async(upload).await;

    pb.finish_and_clear();
    let result = result?;

    let output = format_scan(&result, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output.trim_end());
    }

    if args.show_confidence {
        println!();
        println!(
            "{} Extraction confidence: {:.1}%",
            style("ℹ").blue(),
            result.data.confidence * 100.0
        );
        println!(
            "{} Processing time: {}ms ({})",
            style("ℹ").blue(),
            result.processing_time_ms,
            result.ocr_engine
        );
        if !result.data.found {
            println!(
                "{} No battery code found, a placeholder was assigned",
                style("!").yellow()
            );
        }
    }

    debug!("Total command time: {:?}", start.elapsed());

    Ok(())
}

/// JSON keeps the recognized text and timing; other formats show the record.
pub fn format_scan(result: &ScanResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(result)?),
        other => format_record(&result.data, other),
    }
}
