//! Shared test utilities: synthetic rasters and fixture files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let path = write_jpeg(tmp.path(), "photo.jpg", 1000, 800);
//! let source = solid_rgb(1000, 800, [10, 20, 30]);
//! let settings = settings_with_specs("300|0\n150|150||5");
//! ```

use std::path::{Path, PathBuf};

pub use tempfile::TempDir;

use crate::imaging::{EncodeOptions, ImageBackend, RasterImage, RustBackend, SourceFormat};
use crate::pipeline::PipelineSettings;
use crate::specs::parse_spec_list;
use image::{Rgb, RgbImage, Rgba, RgbaImage};

// =========================================================================
// Synthetic rasters
// =========================================================================

pub fn solid_rgb(width: u32, height: u32, rgb: [u8; 3]) -> RasterImage {
    RasterImage::from_rgb(RgbImage::from_pixel(width, height, Rgb(rgb)))
}

/// Horizontal gradient, so resampling artifacts are visible in assertions.
pub fn gradient_rgb(width: u32, height: u32) -> RasterImage {
    RasterImage::from_rgb(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

/// Opaque square with fully transparent corners of `corner` pixels.
pub fn rgba_with_transparent_corners(size: u32, corner: u32) -> RasterImage {
    RasterImage::from_rgba(RgbaImage::from_fn(size, size, |x, y| {
        let near = |v: u32| v < corner || v >= size - corner;
        if near(x) && near(y) {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([30, 144, 255, 255])
        }
    }))
}

// =========================================================================
// Fixture files
// =========================================================================

fn write_with_backend(image: &RasterImage, path: PathBuf, format: SourceFormat) -> PathBuf {
    RustBackend::new()
        .encode(image, &path, format, &EncodeOptions::default())
        .unwrap();
    path
}

pub fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    write_with_backend(&gradient_rgb(width, height), dir.join(name), SourceFormat::Jpeg)
}

pub fn write_png(dir: &Path, name: &str, image: &RasterImage) -> PathBuf {
    write_with_backend(image, dir.join(name), SourceFormat::Png)
}

// =========================================================================
// Settings
// =========================================================================

pub fn settings_with_specs(specs: &str) -> PipelineSettings {
    PipelineSettings {
        specs: parse_spec_list(specs),
        ..PipelineSettings::default()
    }
}

/// File names in `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
