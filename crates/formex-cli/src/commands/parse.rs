//! Parse command - run the field table on text that was already recognized.

use std::fs;
use std::io::Read;
use std::path::Path;

use clap::Args;
use tracing::debug;

use formex_core::models::record::Record;

use super::{file_label, load_config};
use super::process::{format_record, OutputFormat};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Text file to parse, or `-` for stdin
    #[arg(required = true)]
    input: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Skip the configured text corrections
    #[arg(long)]
    raw: bool,
}

/// Every rule reads the given text; region tags are ignored since there is no image.
pub async fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let table = config.field_table()?;

    let text = if args.input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        fs::read_to_string(&args.input)?
    };

    let text = if args.raw {
        text
    } else {
        config.text_corrections()?.apply(&text)
    };
    debug!("Parsing {} chars with {} rules", text.chars().count(), table.rules().len());

    let name = if args.input == "-" {
        "stdin".to_string()
    } else {
        file_label(Path::new(&args.input))
    };

    let record = Record::extracted(name, table.parse(&text));
    println!("{}", format_record(&record, args.format)?);

    Ok(())
}
