//! Configuration for the scanhist comparison service.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Top-level compare configuration.
///
/// Loaded from `scanhist.toml` `[compare]` section or
/// `SCANHIST_COMPARE__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct CompareConfig {
    /// Directory holding one JSON document per scan (default: "./scans").
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory for saved comparisons (default: "./bookmarks").
    #[serde(default = "default_bookmark_dir")]
    pub bookmark_dir: String,

    /// How long a computed comparison is reused for identical requests.
    /// Zero disables the cache.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Output format when `--format` is not given.
    #[serde(default)]
    pub default_format: OutputFormat,
}

impl CompareConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Rendering of a comparison result.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain-text overview for the terminal.
    #[default]
    Summary,
    Json,
    Csv,
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" | "text" => Ok(Self::Summary),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(format!(
                "Invalid format: {s}. Choose: summary, json, csv, markdown"
            )),
        }
    }
}

fn default_data_dir() -> String {
    "./scans".to_string()
}

fn default_bookmark_dir() -> String {
    "./bookmarks".to_string()
}

fn default_cache_ttl() -> u64 {
    30
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            bookmark_dir: default_bookmark_dir(),
            cache_ttl_secs: default_cache_ttl(),
            default_format: OutputFormat::default(),
        }
    }
}
