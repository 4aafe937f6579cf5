//! CLI subcommands and the output formatting they share.

pub mod batch;
pub mod config;
pub mod parse;
pub mod scan;

use std::fs;
use std::path::Path;

use batlabel_core::{mime_type_for, validate_upload, BatlabelConfig, ParsedBatteryData, UploadedImage};
use tracing::debug;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// Load the config from `--config`, else the default location, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<BatlabelConfig> {
    let config = match config_path {
        Some(path) => BatlabelConfig::from_file(Path::new(path))?,
        None => {
            let default_path = config::default_config_path();
            if default_path.exists() {
                debug!("Using config file {}", default_path.display());
                BatlabelConfig::from_file(&default_path)?
            } else {
                BatlabelConfig::default()
            }
        }
    };

    config.validate()?;
    Ok(config)
}

/// Read a label image and check it against the accepted upload size and types.
pub fn read_upload(path: &Path) -> anyhow::Result<UploadedImage> {
    let name = path.file_name().and_then(|n| n.to_str()).map(str::to_string);
    let bytes = fs::read(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;

    validate_upload(&bytes, mime_type_for(name.as_deref().unwrap_or_default()))?;
    Ok(UploadedImage::new(bytes, name))
}

pub const CSV_HEADER: [&str; 7] = [
    "battery_code",
    "brand",
    "voltage",
    "capacity",
    "found",
    "confidence",
    "match_type",
];

/// CSV cells for a record, in [`CSV_HEADER`] order.
pub fn csv_fields(data: &ParsedBatteryData) -> [String; 7] {
    [
        data.battery_code.clone(),
        data.brand.clone().unwrap_or_default(),
        data.voltage.map(|v| v.to_string()).unwrap_or_default(),
        data.capacity.map(|c| c.to_string()).unwrap_or_default(),
        data.found.to_string(),
        format!("{:.2}", data.confidence),
        data.match_type.map(|m| m.as_str().to_string()).unwrap_or_default(),
    ]
}

/// Render a parsed record in the requested format.
///
/// JSON output is produced by the caller, which may serialize a richer value.
pub fn format_record(data: &ParsedBatteryData, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(data)?),
        OutputFormat::Csv => format_csv(data),
        OutputFormat::Text => Ok(format_text(data)),
    }
}

fn format_csv(data: &ParsedBatteryData) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;
    wtr.write_record(csv_fields(data))?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(data: &ParsedBatteryData) -> String {
    let mut output = String::new();

    output.push_str(&format!("Battery code: {}\n", data.battery_code));
    match data.match_type {
        Some(pattern) => output.push_str(&format!("  Matched by: {}\n", pattern.as_str())),
        None => output.push_str("  No code pattern matched (placeholder)\n"),
    }

    if let Some(brand) = &data.brand {
        output.push_str(&format!("Brand: {}\n", brand));
    }
    if let Some(voltage) = data.voltage {
        output.push_str(&format!("Voltage: {} V\n", voltage));
    }
    if let Some(capacity) = data.capacity {
        output.push_str(&format!("Capacity: {}\n", capacity));
    }

    output.push_str(&format!("Confidence: {:.0}%\n", data.confidence * 100.0));

    output
}
