//! Batch command - many images into one spreadsheet.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use formex_core::batch::{BatchProcessor, Extractor, ImageInput};
use formex_core::export::sink_for;
use formex_core::models::config::ExportFormat;
use formex_core::ocr::create_client;

use super::{file_label, load_config};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output spreadsheet (default: the configured file name)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Spreadsheet format (default: from the output extension, then config)
    #[arg(short, long, value_enum)]
    format: Option<SheetFormat>,

    /// Number of images processed at once
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum SheetFormat {
    /// Excel workbook
    Xlsx,
    /// Comma-separated values
    Csv,
}

impl From<SheetFormat> for ExportFormat {
    fn from(format: SheetFormat) -> Self {
        match format {
            SheetFormat::Xlsx => ExportFormat::Xlsx,
            SheetFormat::Csv => ExportFormat::Csv,
        }
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut config = load_config(config_path)?;

    let files = expand_inputs(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("No matching files found for: {}", args.inputs.join(" "));
    }

    if let Some(format) = resolve_format(args.format, args.output.as_ref()) {
        config.export.format = format;
    }
    if let Some(jobs) = args.jobs {
        config.batch.concurrency = jobs;
    }

    // Both fail before any image is touched.
    let extractor = Extractor::from_config(&config)?;
    let client = create_client(&config.ocr)?;

    println!(
        "{} Found {} images to process",
        style("ℹ").blue(),
        files.len()
    );

    // Files are read as their turn comes; an unreadable one becomes a failed row.
    let inputs: Vec<ImageInput> = files
        .iter()
        .map(|path| ImageInput::from_path(file_label(path), path.clone()))
        .collect();

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images")
            .unwrap()
            .progress_chars("=>-"),
    );

    let progress_bar = pb.clone();
    let processor = BatchProcessor::new(client.as_ref(), &extractor)
        .with_concurrency(config.batch.concurrency)
        .with_progress(move |p| progress_bar.set_position(p.done as u64));

    let cancel = processor.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing images in flight");
            cancel.cancel();
        }
    });

    let results = processor.run(inputs).await;
    pb.finish_and_clear();

    let sheet = sink_for(&config.export).export(&results)?;
    let output_path = args
        .output
        .unwrap_or_else(|| PathBuf::from(&sheet.file_name));
    sheet.write_to(&output_path)?;
    debug!("Wrote {} bytes ({})", sheet.bytes.len(), sheet.mime);

    let failed: Vec<_> = results.failed().collect();
    let successful = results.len() - failed.len();

    println!(
        "{} Processed {} images in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );
    println!(
        "{} Spreadsheet written to {}",
        style("✓").green(),
        output_path.display()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for record in &failed {
            println!(
                "  - {}: {}",
                record.file,
                record.error().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Expand glob patterns into image paths, keeping first-seen order.
fn expand_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        for path in glob(pattern)?.filter_map(|r| r.ok()) {
            if is_image(&path) && !files.contains(&path) {
                files.push(path);
            }
        }
    }

    Ok(files)
}

fn is_image(path: &std::path::Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// Explicit `--format`, else the output file extension.
fn resolve_format(format: Option<SheetFormat>, output: Option<&PathBuf>) -> Option<ExportFormat> {
    if let Some(format) = format {
        return Some(format.into());
    }

    match output?.extension()?.to_str()?.to_lowercase().as_str() {
        "csv" => Some(ExportFormat::Csv),
        "xlsx" => Some(ExportFormat::Xlsx),
        _ => None,
    }
}
