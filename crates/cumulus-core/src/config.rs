//! Configuration module
//!
//! The resolver and the tree never read configuration themselves; callers
//! load a [`Config`] and hand the relevant parts to the backend and to
//! [`TreeOptions`](crate::tree::TreeOptions).

use crate::tree::{TreeOptions, DEFAULT_CONTAINER_EXTENSIONS};
use crate::{Error, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV: &str = "CUMULUS_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Which store to talk to
    #[serde(default)]
    pub store: StoreConfig,
    /// Tree browsing settings
    #[serde(default)]
    pub browse: BrowseConfig,
    /// Upload/download buffering
    #[serde(default)]
    pub transfer: TransferConfig,
}

/// Store selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store URL used when none is given on the command line
    pub default_url: Option<String>,
}

/// Tree browsing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseConfig {
    /// Group name extensions marking containers of datasets
    pub container_extensions: Vec<String>,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            container_extensions: DEFAULT_CONTAINER_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

/// Transfer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Size of each ranged read in bytes
    #[serde(deserialize_with = "deserialize_size")]
    pub read_buffer_size: u64,
    /// Number of read chunks kept in memory
    pub read_cache_size: usize,
    /// Size of the upload buffer in bytes
    #[serde(deserialize_with = "deserialize_size")]
    pub write_buffer_size: u64,
    /// Uploads larger than this switch to multipart
    #[serde(deserialize_with = "deserialize_size")]
    pub multipart_threshold: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 8 * 1024 * 1024,
            read_cache_size: 4,
            write_buffer_size: 8 * 1024 * 1024,
            multipart_threshold: 64 * 1024 * 1024,
        }
    }
}

/// Size given either as a byte count or as a string like `"8MiB"`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Numeric(u64),
    String(String),
}

fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match SizeValue::deserialize(deserializer)? {
        SizeValue::Numeric(bytes) => Ok(bytes),
        SizeValue::String(s) => {
            parse_size(&s).map_err(|e| D::Error::custom(format!("Failed to parse size: {}", e)))
        }
    }
}

/// Parse size string like "100MiB" to bytes
pub fn parse_size(size_str: &str) -> Result<u64> {
    let size_str = size_str.trim();

    if let Ok(bytes) = size_str.parse::<u64>() {
        return Ok(bytes);
    }

    let split_pos = size_str
        .chars()
        .position(|c| !c.is_ascii_digit() && c != '.')
        .unwrap_or(size_str.len());

    if split_pos == 0 {
        return Err(Error::Config(format!("Invalid size format: {}", size_str)));
    }

    let (number_part, unit_part) = size_str.split_at(split_pos);
    let number: f64 = number_part
        .parse()
        .map_err(|_| Error::Config(format!("Invalid number in size: {}", number_part)))?;

    let multiplier: u64 = match unit_part.trim().to_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "t" | "tb" => 1_000_000_000_000,
        "ki" | "kib" => 1_024,
        "mi" | "mib" => 1_048_576,
        "gi" | "gib" => 1_073_741_824,
        "ti" | "tib" => 1_099_511_627_776,
        _ => return Err(Error::Config(format!("Unknown size unit: {}", unit_part))),
    };

    Ok((number * multiplier as f64) as u64)
}

impl Config {
    /// Get the configuration file path
    ///
    /// `CUMULUS_CONFIG` wins over the per-user config directory.
    pub fn config_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = config_dir()
            .ok_or_else(|| Error::Config("Unable to determine config directory".to_string()))?;

        Ok(config_dir.join("cumulus").join("config.toml"))
    }

    /// Get default configuration content with examples
    pub fn default_config_content() -> String {
        r#"# Cumulus Configuration File

[store]
# Store used when --store is not given, e.g. "s3://my-bucket",
# "gs://my-bucket" or "file:///data/archive"
# default_url = "s3://my-bucket"

[browse]
# Groups whose name ends with one of these extensions are shown as
# containers of datasets instead of plain directories
container_extensions = [".hdf", ".h5", ".hf5", ".hdf5", ".h5py", ".grp", ".arr", ".dar"]

[transfer]
# Size of each ranged read when downloading
read_buffer_size = "8MiB"
# Number of downloaded chunks kept in memory
read_cache_size = 4
# Upload buffer size
write_buffer_size = "8MiB"
# Uploads larger than this use multipart upload
multipart_threshold = "64MiB"
"#
        .to_string()
    }

    /// Load configuration from file
    ///
    /// A commented default file is written when none exists yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, Self::default_config_content())?;
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&path, contents)?;
        Ok(())
    }

    /// Load configuration or use defaults if loading fails
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Tree options derived from the `[browse]` section
    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            container_extensions: self.browse.container_extensions.clone(),
        }
    }
}
