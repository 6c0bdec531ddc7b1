//! JSON and YAML loading helpers.
//!
//! Thin wrappers over `serde_json` / `serde_yaml` that resolve file paths to
//! absolute form, attach the path to every error and log the outcome.
//!
//! ```rust
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Server {
//!     addr: String,
//!     port: u16,
//! }
//!
//! let server: Server = puzzle::parser::parse_yaml_str("addr: 0.0.0.0\nport: 3333\n").unwrap();
//! assert_eq!(server.port, 3333);
//! ```

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Deserialize a JSON document.
pub fn parse_json_str<T: DeserializeOwned>(source: &str) -> Result<T> {
    serde_json::from_str(source)
        .inspect_err(|e| error!(error = %e, "JSON parse failed"))
        .context("Failed to parse JSON")
}

/// Deserialize a YAML document.
pub fn parse_yaml_str<T: DeserializeOwned>(source: &str) -> Result<T> {
    serde_yaml::from_str(source)
        .inspect_err(|e| error!(error = %e, "YAML parse failed"))
        .context("Failed to parse YAML")
}

/// Deserialize a JSON file.
pub fn parse_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let (abs_path, reader) = open(path.as_ref())?;
    let value = serde_json::from_reader(reader)
        .inspect_err(|e| error!(path = %abs_path.display(), error = %e, "JSON parse failed"))
        .with_context(|| format!("Failed to parse JSON file {}", abs_path.display()))?;
    info!(path = %abs_path.display(), "JSON file parsed");
    Ok(value)
}

/// Deserialize a YAML file.
pub fn parse_yaml_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let (abs_path, reader) = open(path.as_ref())?;
    let value = serde_yaml::from_reader(reader)
        .inspect_err(|e| error!(path = %abs_path.display(), error = %e, "YAML parse failed"))
        .with_context(|| format!("Failed to parse YAML file {}", abs_path.display()))?;
    info!(path = %abs_path.display(), "YAML file parsed");
    Ok(value)
}

fn open(path: &Path) -> Result<(PathBuf, BufReader<File>)> {
    let abs_path = std::path::absolute(path)
        .with_context(|| format!("Failed to resolve path {}", path.display()))?;
    let file = File::open(&abs_path)
        .inspect_err(|e| error!(path = %abs_path.display(), error = %e, "Open failed"))
        .with_context(|| format!("Failed to open {}", abs_path.display()))?;
    Ok((abs_path, BufReader::new(file)))
}
