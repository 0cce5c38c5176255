//! Config command - manage configuration.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use formex_core::FormexConfig;

use super::config_file;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Initialize a new configuration file
    Init(InitArgs),

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "ocr.backend", "regions.0.name")
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// New value (parsed as JSON, else taken as a string)
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

/// Operates on `-c <file>` when given, else the per-user config file.
pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let path = config_file(config_path);

    match args.command {
        ConfigCommand::Show => show_config(&path),
        ConfigCommand::Init(init_args) => init_config(init_args, &path),
        ConfigCommand::Get { key } => get_config(&path, &key),
        ConfigCommand::Set { key, value } => set_config(&path, &key, &value),
        ConfigCommand::Path => show_path(&path),
    }
}

fn read_or_default(path: &Path) -> anyhow::Result<FormexConfig> {
    if path.exists() {
        Ok(FormexConfig::from_file(path)?)
    } else {
        Ok(FormexConfig::default())
    }
}

fn show_config(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        eprintln!(
            "{} No config file found, showing defaults.",
            style("ℹ").blue()
        );
    }
    let config = read_or_default(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn init_config(args: InitArgs, path: &Path) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or_else(|| path.to_path_buf());

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    FormexConfig::default().save(&output_path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );
    Ok(())
}

fn get_config(path: &Path, key: &str) -> anyhow::Result<()> {
    let json = serde_json::to_value(read_or_default(path)?)?;
    let value = lookup(&json, key)
        .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn set_config(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let config = read_or_default(path)?;
    let parsed = parse_value(value);

    let mut json = serde_json::to_value(&config)?;
    assign(&mut json, key, parsed.clone())?;

    // Round-trip through the typed config so invalid values are refused.
    let config: FormexConfig = serde_json::from_value(json)
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))?;
    config.field_table()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    config.save(path)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&parsed)?
    );
    Ok(())
}

fn show_path(path: &Path) -> anyhow::Result<()> {
    println!("Configuration file: {}", path.display());

    if path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'formex config init' to create a configuration file.");
    }
    Ok(())
}

/// JSON when it parses, otherwise a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Follow a dotted key. Numeric segments index into arrays.
fn lookup<'v>(json: &'v Value, key: &str) -> Option<&'v Value> {
    key.split('.').try_fold(json, |current, part| match current {
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => current.get(part),
    })
}

/// Set the value at a dotted key. Missing object keys on the last segment are created.
fn assign(json: &mut Value, key: &str, value: Value) -> anyhow::Result<()> {
    let (parent_key, last) = match key.rsplit_once('.') {
        Some((parent, last)) => (Some(parent), last),
        None => (None, key),
    };

    let mut parent = json;
    if let Some(parent_key) = parent_key {
        for part in parent_key.split('.') {
            parent = match parent {
                Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
                other => other.get_mut(part),
            }
            .ok_or_else(|| anyhow::anyhow!("Configuration path not found: {}", key))?;
        }
    }

    match parent {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
        }
        Value::Array(items) => {
            let slot = last
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get_mut(i))
                .ok_or_else(|| anyhow::anyhow!("Configuration path not found: {}", key))?;
            *slot = value;
        }
        _ => anyhow::bail!("Cannot set value at non-object path: {}", key),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup() {
        let json = json!({"ocr": {"backend": "vision"}, "regions": [{"name": "footer"}]});
        assert_eq!(lookup(&json, "ocr.backend"), Some(&json!("vision")));
        assert_eq!(lookup(&json, "regions.0.name"), Some(&json!("footer")));
        assert_eq!(lookup(&json, "regions.3.name"), None);
        assert_eq!(lookup(&json, "ocr.missing"), None);
    }

    #[test]
    fn test_assign() {
        let mut json = json!({"batch": {"concurrency": 1}, "regions": [{"name": "footer"}]});

        assign(&mut json, "batch.concurrency", json!(4)).unwrap();
        assign(&mut json, "regions.0.name", json!("bottom")).unwrap();
        assign(&mut json, "batch.extra", json!(true)).unwrap();

        assert_eq!(json["batch"]["concurrency"], 4);
        assert_eq!(json["regions"][0]["name"], "bottom");
        assert_eq!(json["batch"]["extra"], true);
        assert!(assign(&mut json, "nope.deeper", json!(1)).is_err());
        assert!(assign(&mut json, "batch.concurrency.x", json!(1)).is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("3"), json!(3));
        assert_eq!(parse_value("ocr_space"), json!("ocr_space"));
        assert_eq!(parse_value(r#"{"kind":"full"}"#), json!({"kind": "full"}));
    }
}
