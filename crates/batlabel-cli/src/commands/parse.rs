//! Parse command - run field extraction on already-recognized text.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use tracing::debug;

use batlabel_core::LabelParser;

use super::{format_record, load_config, OutputFormat};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Text file to parse ("-" or omitted reads stdin)
    input: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

pub async fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let text = match &args.input {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?,
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    debug!("Parsing {} chars of label text", text.len());

    let parser = LabelParser::from_config(&config.extraction);
    let data = parser.parse(&text);

    print!("{}", with_newline(format_record(&data, args.format)?));

    Ok(())
}

fn with_newline(mut output: String) -> String {
    if !output.ends_with('\n') {
        output.push('\n');
    }
    output
}
