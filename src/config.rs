//! Upload area configuration.
//!
//! Handles loading, validating, and merging `upload.toml`. Stock defaults are
//! overridden by the user's file; only the keys being changed need to appear.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! label = "Photo"           # Label shown above the drop zone
//! required = false          # Whether a photo must be supplied
//! disabled = false          # Ignore every drag, drop, click and key event
//! max_size = 5242880        # Maximum accepted size in bytes (5 MiB)
//! allowed_types = ["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"]
//! allowed_extensions = [".jpg", ".jpeg", ".png", ".gif", ".webp"]
//! timeout_ms = 30000        # Upper bound for each asynchronous stage
//!
//! [dimensions]
//! min_width = 100
//! min_height = 100
//! max_width = 8000
//! max_height = 8000
//!
//! [compression]
//! threshold_bytes = 2097152 # Files at or above this size are re-encoded
//! max_dimension = 2000      # Longer side after re-encoding
//! quality = 85              # Lossy encoding quality (1-100)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Upload area configuration loaded from `upload.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Label shown above the drop zone.
    pub label: String,
    /// Whether the surrounding form requires a photo.
    pub required: bool,
    /// When set, the controller ignores all user events.
    pub disabled: bool,
    /// Maximum accepted file size in bytes.
    pub max_size: u64,
    /// Declared MIME types accepted as-is.
    pub allowed_types: Vec<String>,
    /// File name suffixes accepted when the declared MIME type is unreliable.
    pub allowed_extensions: Vec<String>,
    /// Upper bound, in milliseconds, for each asynchronous pipeline stage.
    pub timeout_ms: u64,
    /// Accepted pixel dimensions.
    pub dimensions: DimensionsConfig,
    /// When and how oversized images are re-encoded.
    pub compression: CompressionConfig,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            label: "Photo".to_string(),
            required: false,
            disabled: false,
            max_size: 5 * 1024 * 1024,
            allowed_types: ["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allowed_extensions: [".jpg", ".jpeg", ".png", ".gif", ".webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout_ms: 30_000,
            dimensions: DimensionsConfig::default(),
            compression: CompressionConfig::default(),
        }
    }
}

impl UploadConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::Validation("max_size must be non-zero".into()));
        }
        if self.allowed_types.is_empty() && self.allowed_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "allowed_types and allowed_extensions must not both be empty".into(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Validation("timeout_ms must be non-zero".into()));
        }
        self.dimensions.validate()?;
        self.compression.validate()?;
        Ok(())
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Accepted pixel dimensions. Bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DimensionsConfig {
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for DimensionsConfig {
    fn default() -> Self {
        Self {
            min_width: 100,
            min_height: 100,
            max_width: 8000,
            max_height: 8000,
        }
    }
}

impl DimensionsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let all = [
            self.min_width,
            self.min_height,
            self.max_width,
            self.max_height,
        ];
        if all.contains(&0) {
            return Err(ConfigError::Validation(
                "dimensions values must be non-zero".into(),
            ));
        }
        if self.min_width > self.max_width {
            return Err(ConfigError::Validation(
                "dimensions.min_width must not exceed dimensions.max_width".into(),
            ));
        }
        if self.min_height > self.max_height {
            return Err(ConfigError::Validation(
                "dimensions.min_height must not exceed dimensions.max_height".into(),
            ));
        }
        Ok(())
    }
}

/// Re-encoding policy for oversized images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    /// Files of at least this many bytes are re-encoded.
    pub threshold_bytes: u64,
    /// Images with a side of at least this many pixels are re-encoded, and
    /// the longer side of the output is clamped to it.
    pub max_dimension: u32,
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: 2 * 1024 * 1024,
            max_dimension: 2000,
            quality: 85,
        }
    }
}

impl CompressionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "compression.max_dimension must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation(
                "compression.quality must be 1-100".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(UploadConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<UploadConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: UploadConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file, layered over stock defaults.
///
/// A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<UploadConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(path)?)
}

/// Returns a fully-commented stock `upload.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Photo Upload Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Label shown above the drop zone.
label = "Photo"

# Whether the surrounding form requires a photo.
required = false

# Ignore every drag, drop, click and key event.
disabled = false

# Maximum accepted file size in bytes (5 MiB).
max_size = 5242880

# Declared MIME types accepted as-is.
allowed_types = ["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"]

# File name suffixes accepted when the declared MIME type is unreliable.
allowed_extensions = [".jpg", ".jpeg", ".png", ".gif", ".webp"]

# Upper bound for each asynchronous stage (probe, compress, preview).
timeout_ms = 30000

# ---------------------------------------------------------------------------
# Accepted pixel dimensions (inclusive)
# ---------------------------------------------------------------------------
[dimensions]
min_width = 100
min_height = 100
max_width = 8000
max_height = 8000

# ---------------------------------------------------------------------------
# Compression of oversized images
# ---------------------------------------------------------------------------
[compression]
# Files at or above this many bytes are re-encoded.
threshold_bytes = 2097152

# Images with a side at or above this many pixels are re-encoded, and the
# longer side of the output is clamped to it.
max_dimension = 2000

# Lossy encoding quality (1 = worst, 100 = best).
quality = 85
"##
}
