//! Process command - extract fields from a single image.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::info;

use formex_core::batch::{failure_message, Extractor};
use formex_core::models::record::{FieldValue, Record};
use formex_core::ocr::create_client;

use super::{file_label, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input image (JPEG or PNG)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also print the recognized text of every region
    #[arg(long)]
    show_text: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON record
    Json,
    /// One `name: value` line per field
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extractor = Extractor::from_config(&config)?;
    let client = create_client(&config.ocr)?;

    info!("Processing file: {}", args.input.display());
    let name = file_label(&args.input);
    let bytes = fs::read(&args.input)?;

    let extraction = extractor
        .extract_bytes(client.as_ref(), &name, &bytes)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", name, failure_message(&e)))?;

    if args.show_text {
        for region in extractor.region_names() {
            eprintln!("{}", style(format!("--- {} ---", region)).cyan());
            eprintln!("{}", extraction.texts.get(region).map(String::as_str).unwrap_or(""));
        }
        eprintln!();
    }

    let record = Record::extracted(&name, extraction.fields);
    let output = format_record(&record, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    info!(
        "Filled {} fields in {:?}",
        record.filled(),
        start.elapsed()
    );

    Ok(())
}

/// Render a record for display.
pub fn format_record(record: &Record, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Text => Ok(format_text(record)),
    }
}

fn format_text(record: &Record) -> String {
    let mut output = format!("File: {}\n", record.file);

    match &record.outcome {
        formex_core::Outcome::Fields(fields) => {
            let width = fields.iter().map(|f| f.name.chars().count()).max().unwrap_or(0);
            for FieldValue { name, value } in fields {
                let pad = width - name.chars().count();
                output.push_str(&format!(
                    "  {}{}  {}\n",
                    name,
                    " ".repeat(pad),
                    value.as_deref().unwrap_or("-")
                ));
            }
        }
        formex_core::Outcome::Error(error) => {
            output.push_str(&format!("  error: {}\n", error));
        }
    }

    output
}
