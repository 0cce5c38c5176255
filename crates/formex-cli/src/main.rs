//! CLI application for enrollment-form OCR field extraction.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, fields, parse, process};

/// Enrollment-form OCR - Extract customer and service fields from scanned forms into a spreadsheet
#[derive(Parser)]
#[command(name = "formex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract fields from many images into one spreadsheet
    Batch(batch::BatchArgs),

    /// Extract fields from a single image
    Process(process::ProcessArgs),

    /// Run the field table on already-recognized text (no OCR)
    Parse(parse::ParseArgs),

    /// List the configured field table
    Fields(fields::FieldsArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Process(args) => process::run(args, config_path).await,
        Commands::Parse(args) => parse::run(args, config_path).await,
        Commands::Fields(args) => fields::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
