//! Configuration module.
//!
//! Handles loading, validating, and merging a `config.toml`. Stock defaults
//! are the base layer; a user file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [resize]
//! scale_method = 2          # 1 passthrough, 2 inside, 3 outside, 4 crop, 5 crop+resize, 6 fit
//! allow_upscale = false     # Allow derivatives at least as large as the source
//! keep_original = false     # Keep an untouched {name}_original copy
//! quality = "high"          # "fast" (nearest) or "high" (Lanczos3)
//! fill_color = ""           # e.g. "#ffffff"; empty = keep transparency
//! fill_opacity = 1.0        # 0.0 - 1.0
//! width = 0                 # Resize the upload itself; 0 = off
//! height = 0
//!
//! [derivatives]
//! directory = ""            # Sub-folder next to the upload
//! specs = """
//! 300|0
//! 150|150|thumb|4
//! """
//!
//! [encoding]
//! jpeg_quality = 80         # 0-100, out of range = 80
//! png_compression = 6       # 0-9, out of range = 6
//!
//! [compression]
//! services = []             # e.g. ["tinypng", "resmush"], tried in order
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [encoding]
//! jpeg_quality = 90
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{
    Dimension, EncodeOptions, FillColor, JpegQuality, PngCompression, ResampleQuality,
    ScaleMethod,
};
use crate::pipeline::PipelineSettings;
use crate::specs::{DerivativeSpec, parse_spec_list};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub resize: ResizeConfig,
    pub derivatives: DerivativesConfig,
    pub encoding: EncodingConfig,
    pub compression: CompressionConfig,
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if ScaleMethod::from_code(self.resize.scale_method).is_none() {
            return Err(ConfigError::Validation(
                "resize.scale_method must be 1-6".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.resize.fill_opacity) {
            return Err(ConfigError::Validation(
                "resize.fill_opacity must be 0.0-1.0".into(),
            ));
        }
        self.resize.fill()?;
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Turn the config into the explicit settings the pipeline runs with.
    pub fn to_settings(&self) -> Result<PipelineSettings, ConfigError> {
        Ok(PipelineSettings {
            default_method: ScaleMethod::from_code(self.resize.scale_method).unwrap_or_default(),
            allow_upscale: self.resize.allow_upscale,
            keep_original: self.resize.keep_original,
            quality: self.resize.quality,
            fill: self.resize.fill()?,
            primary_width: pixels(self.resize.width),
            primary_height: pixels(self.resize.height),
            derivative_directory: self.derivatives.directory.clone(),
            specs: self.derivatives.parsed_specs(),
            encode: EncodeOptions {
                jpeg_quality: JpegQuality::new(self.encoding.jpeg_quality),
                png_compression: PngCompression::new(self.encoding.png_compression),
            },
        })
    }
}

fn pixels(value: u32) -> Option<Dimension> {
    (value > 0).then_some(Dimension::Pixels(value))
}

/// How uploads and derivatives are resized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    /// Default scale method code (1-6). Specs may override it per line.
    pub scale_method: i64,
    /// Allow outputs at least as large as the source on either axis.
    pub allow_upscale: bool,
    /// Keep an untouched `{name}_original` copy next to the upload.
    pub keep_original: bool,
    pub quality: ResampleQuality,
    /// Hex background color; empty means no fill.
    pub fill_color: String,
    pub fill_opacity: f32,
    /// Resize the upload itself to this size. 0 = derive / off.
    pub width: u32,
    pub height: u32,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            scale_method: ScaleMethod::default().code() as i64,
            allow_upscale: false,
            keep_original: false,
            quality: ResampleQuality::default(),
            fill_color: String::new(),
            fill_opacity: 1.0,
            width: 0,
            height: 0,
        }
    }
}

impl ResizeConfig {
    pub fn fill(&self) -> Result<Option<FillColor>, ConfigError> {
        if self.fill_color.trim().is_empty() {
            return Ok(None);
        }
        let color = FillColor::from_hex(&self.fill_color)
            .map_err(|e| ConfigError::Validation(format!("resize.fill_color: {e}")))?;
        Ok(Some(color.with_opacity(self.fill_opacity)))
    }
}

/// Where derivatives go and which ones to make.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DerivativesConfig {
    /// Sub-folder of the upload's directory. Empty = same directory.
    pub directory: String,
    /// One `width|height|suffix|method` spec per line.
    pub specs: String,
}

impl DerivativesConfig {
    pub fn parsed_specs(&self) -> Vec<DerivativeSpec> {
        parse_spec_list(&self.specs)
    }
}

/// Encoder settings. Out-of-range values fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    pub jpeg_quality: i64,
    pub png_compression: i64,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: JpegQuality::DEFAULT as i64,
            png_compression: PngCompression::DEFAULT as i64,
        }
    }
}

/// External compression services, in the order they are tried.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    pub services: Vec<String>,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel derivative workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
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

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load a config file. `None` gives the validated stock defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let overlay = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# multisize configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Resizing
# ---------------------------------------------------------------------------
[resize]
# Default scale method for the upload and every derivative:
#   1 = passthrough  exact size, aspect ratio ignored
#   2 = inside       fit inside the box, keep aspect ratio
#   3 = outside      cover the box, keep aspect ratio
#   4 = crop         cover the box, then center-crop to the exact size
#   5 = crop+resize  center-crop to the box aspect, then scale to the exact size
#   6 = fit          inside, centered on a canvas of the exact size
scale_method = 2

# Produce images at least as large as the source. When false, such
# derivatives are skipped.
allow_upscale = false

# Keep an untouched copy of the upload as {name}_original.{ext}.
keep_original = false

# Resampling: "fast" (nearest neighbour) or "high" (Lanczos3).
quality = "high"

# Background painted behind the image, e.g. "#ffffff". Empty keeps
# transparency (or black for opaque sources).
fill_color = ""

# Opacity of the fill color, 0.0 (transparent) to 1.0 (opaque).
fill_opacity = 1.0

# Resize the upload itself. 0 derives the value from the other axis;
# both 0 leaves the upload untouched.
width = 0
height = 0

# ---------------------------------------------------------------------------
# Derivatives
# ---------------------------------------------------------------------------
[derivatives]
# Sub-folder (next to the upload) that receives derivatives.
directory = ""

# One derivative per line: width|height|suffix|method
#   width, height  pixels or a percentage ("50%"); 0 or empty = derive
#   suffix         file name suffix; empty = "{width}w"
#   method         1-6 as above; empty = scale_method
# Example:
#   300|0
#   150|150|thumb|4
specs = ""

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encoding]
# JPEG quality (0 = worst, 100 = best).
jpeg_quality = 80

# PNG compression level (0 = fastest, 9 = smallest).
png_compression = 6

# ---------------------------------------------------------------------------
# External compression
# ---------------------------------------------------------------------------
[compression]
# Services tried in order after each file is written, e.g. ["tinypng", "resmush"].
services = []

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
