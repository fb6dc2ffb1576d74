//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how*. They flow from the
//! [`config`](crate::config) and [`specs`](crate::specs) layers into the
//! resolver, the compositing engine and the backend encoders.
//!
//! ## Types
//!
//! - [`ScaleMethod`]: The six scale policies. Integer codes exist only for parsing.
//! - [`Dimension`]: A requested width or height: pixels or a percentage of the source.
//! - [`FillColor`]: Background RGB + opacity fraction painted behind the source.
//! - [`ResampleQuality`]: Nearest-neighbour (`Fast`) vs. filtered (`High`) resampling.
//! - [`JpegQuality`]: JPEG encoder quality (0–100, default 80).
//! - [`PngCompression`]: PNG compression level (0–9, default 6).
//! - [`EncodeOptions`]: The encoder settings handed to a backend on every write.

use image::codecs::png::CompressionType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How the source aspect ratio and the requested box interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleMethod {
    /// Requested dimensions taken literally; aspect ratio is not preserved.
    Passthrough,
    /// Scale to fit inside the box. One axis may come out smaller than requested.
    #[default]
    Inside,
    /// Scale until the box is fully covered. One axis may overflow.
    Outside,
    /// Cover the box, then center-crop to exactly the requested size.
    Crop,
    /// Center-crop the source to the target aspect, then stretch to the exact size.
    CropResize,
    /// `Inside` scaling centered on a canvas of exactly the requested size.
    Fit,
}

impl ScaleMethod {
    /// All methods, in code order.
    pub const ALL: [ScaleMethod; 6] = [
        ScaleMethod::Passthrough,
        ScaleMethod::Inside,
        ScaleMethod::Outside,
        ScaleMethod::Crop,
        ScaleMethod::CropResize,
        ScaleMethod::Fit,
    ];

    /// Map an integer code (1–6) to a method. Anything else is `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ScaleMethod::Passthrough),
            2 => Some(ScaleMethod::Inside),
            3 => Some(ScaleMethod::Outside),
            4 => Some(ScaleMethod::Crop),
            5 => Some(ScaleMethod::CropResize),
            6 => Some(ScaleMethod::Fit),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            ScaleMethod::Passthrough => 1,
            ScaleMethod::Inside => 2,
            ScaleMethod::Outside => 3,
            ScaleMethod::Crop => 4,
            ScaleMethod::CropResize => 5,
            ScaleMethod::Fit => 6,
        }
    }

    /// Whether the output is guaranteed to be exactly the requested box.
    pub fn is_exact(self) -> bool {
        matches!(
            self,
            ScaleMethod::Passthrough
                | ScaleMethod::Crop
                | ScaleMethod::CropResize
                | ScaleMethod::Fit
        )
    }
}

impl fmt::Display for ScaleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScaleMethod::Passthrough => "passthrough",
            ScaleMethod::Inside => "inside",
            ScaleMethod::Outside => "outside",
            ScaleMethod::Crop => "crop",
            ScaleMethod::CropResize => "crop-resize",
            ScaleMethod::Fit => "fit",
        };
        f.write_str(name)
    }
}

/// A requested width or height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Dimension {
    Pixels(u32),
    /// Percentage of the matching source dimension, e.g. `50.0` for "50%".
    Percent(f64),
}

impl Dimension {
    /// Resolve against the matching source dimension.
    ///
    /// Returns `None` when the value resolves to zero, which callers treat as
    /// "derive from the other axis".
    pub fn resolve(self, source: u32) -> Option<u32> {
        let px = match self {
            Dimension::Pixels(px) => px,
            Dimension::Percent(pct) => {
                if !pct.is_finite() || pct <= 0.0 {
                    return None;
                }
                (source as f64 * pct / 100.0).round() as u32
            }
        };
        (px > 0).then_some(px)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Pixels(px) => write!(f, "{px}"),
            Dimension::Percent(pct) => write!(f, "{pct}%"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid fill color {0:?}: expected 6 hex digits, e.g. #ffffff")]
pub struct FillColorError(pub String);

/// Background color painted behind the source before it is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    /// 0.0 = fully transparent, 1.0 = fully opaque.
    pub opacity: f32,
}

impl FillColor {
    pub fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            opacity: 1.0,
        }
    }

    /// Same color with a different opacity, clamped to `0.0..=1.0`.
    pub fn with_opacity(self, opacity: f32) -> Self {
        let opacity = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        Self { opacity, ..self }
    }

    /// Parse `#rrggbb` or `rrggbb`.
    pub fn from_hex(hex: &str) -> Result<Self, FillColorError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(FillColorError(hex.to_string()));
        }
        let value =
            u32::from_str_radix(digits, 16).map_err(|_| FillColorError(hex.to_string()))?;
        Ok(Self::opaque(
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ))
    }

    /// Alpha channel value (0–255) for this opacity.
    pub fn alpha(&self) -> u8 {
        (self.opacity.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    pub fn is_opaque(&self) -> bool {
        self.alpha() == u8::MAX
    }

    pub fn to_rgba(&self) -> [u8; 4] {
        [self.red, self.green, self.blue, self.alpha()]
    }
}

impl FromStr for FillColor {
    type Err = FillColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Resampling policy used by the compositing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleQuality {
    /// Pixel replication. Cheap and blocky.
    Fast,
    /// Filtered resampling (Lanczos3).
    #[default]
    High,
}

/// JPEG encoder quality (0–100). Out-of-range input falls back to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegQuality(u8);

impl JpegQuality {
    pub const DEFAULT: u8 = 80;

    pub fn new(value: i64) -> Self {
        match u8::try_from(value) {
            Ok(v) if v <= 100 => Self(v),
            _ => Self(Self::DEFAULT),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for JpegQuality {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// PNG compression level (0–9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngCompression(u8);

impl PngCompression {
    pub const DEFAULT: u8 = 6;

    pub fn new(value: i64) -> Self {
        match u8::try_from(value) {
            Ok(v) if v <= 9 => Self(v),
            _ => Self(Self::DEFAULT),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// The `image` crate exposes three presets rather than zlib levels.
    pub fn compression_type(self) -> CompressionType {
        match self.0 {
            0..=3 => CompressionType::Fast,
            4..=6 => CompressionType::Default,
            _ => CompressionType::Best,
        }
    }
}

impl Default for PngCompression {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Encoder settings for every file the pipeline writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeOptions {
    pub jpeg_quality: JpegQuality,
    pub png_compression: PngCompression,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_method_codes_round_trip() {
        for method in ScaleMethod::ALL {
            assert_eq!(ScaleMethod::from_code(method.code() as i64), Some(method));
        }
    }

    #[test]
    fn scale_method_rejects_unknown_codes() {
        assert_eq!(ScaleMethod::from_code(0), None);
        assert_eq!(ScaleMethod::from_code(7), None);
        assert_eq!(ScaleMethod::from_code(-2), None);
    }

    #[test]
    fn scale_method_default_is_inside() {
        assert_eq!(ScaleMethod::default(), ScaleMethod::Inside);
    }

    #[test]
    fn dimension_percent_resolves_against_source() {
        assert_eq!(Dimension::Percent(50.0).resolve(640), Some(320));
        assert_eq!(Dimension::Percent(33.3).resolve(100), Some(33));
    }

    #[test]
    fn dimension_zero_means_unset() {
        assert_eq!(Dimension::Pixels(0).resolve(640), None);
        assert_eq!(Dimension::Percent(0.0).resolve(640), None);
        assert_eq!(Dimension::Percent(0.01).resolve(10), None);
    }

    #[test]
    fn fill_color_parses_hex_with_and_without_hash() {
        assert_eq!(
            FillColor::from_hex("#FF8000").unwrap(),
            FillColor::opaque(255, 128, 0)
        );
        assert_eq!(
            "0a0b0c".parse::<FillColor>().unwrap(),
            FillColor::opaque(10, 11, 12)
        );
    }

    #[test]
    fn fill_color_rejects_malformed_hex() {
        assert!(FillColor::from_hex("#fff").is_err());
        assert!(FillColor::from_hex("zzzzzz").is_err());
        assert!(FillColor::from_hex("").is_err());
    }

    #[test]
    fn fill_color_opacity_maps_to_alpha() {
        let c = FillColor::opaque(0, 0, 0).with_opacity(0.5);
        assert_eq!(c.alpha(), 128);
        assert!(!c.is_opaque());
        assert_eq!(FillColor::opaque(1, 2, 3).to_rgba(), [1, 2, 3, 255]);
    }

    #[test]
    fn fill_color_opacity_is_clamped() {
        assert_eq!(FillColor::opaque(0, 0, 0).with_opacity(3.0).alpha(), 255);
        assert_eq!(FillColor::opaque(0, 0, 0).with_opacity(-1.0).alpha(), 0);
        assert_eq!(
            FillColor::opaque(0, 0, 0).with_opacity(f32::NAN).alpha(),
            255
        );
    }

    #[test]
    fn jpeg_quality_out_of_range_uses_default() {
        assert_eq!(JpegQuality::new(0).value(), 0);
        assert_eq!(JpegQuality::new(95).value(), 95);
        assert_eq!(JpegQuality::new(101).value(), 80);
        assert_eq!(JpegQuality::new(-1).value(), 80);
    }

    #[test]
    fn png_compression_out_of_range_uses_default() {
        assert_eq!(PngCompression::new(9).value(), 9);
        assert_eq!(PngCompression::new(10).value(), 6);
        assert_eq!(PngCompression::new(-3).value(), 6);
    }

    #[test]
    fn png_compression_maps_to_presets() {
        assert_eq!(PngCompression::new(1).compression_type(), CompressionType::Fast);
        assert_eq!(PngCompression::new(6).compression_type(), CompressionType::Default);
        assert_eq!(PngCompression::new(9).compression_type(), CompressionType::Best);
    }
}
