pub mod batch;
pub mod config;
pub mod fields;
pub mod parse;
pub mod process;

use std::path::{Path, PathBuf};

use tracing::debug;

use formex_core::FormexConfig;

/// `<config dir>/formex/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("formex")
        .join("config.json")
}

/// The file `-c` points at, or the default location.
pub fn config_file(config_path: Option<&str>) -> PathBuf {
    config_path.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load the explicit config file, else the default one if present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FormexConfig> {
    if let Some(path) = config_path {
        return Ok(FormexConfig::from_file(Path::new(path))?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Using config {}", path.display());
        Ok(FormexConfig::from_file(&path)?)
    } else {
        Ok(FormexConfig::default())
    }
}

/// Display name of an input file.
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}
