//! Pure Rust codec backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF) | `image::ImageReader` with the format pinned to the upload MIME type |
//! | GIF transparency | first fully transparent pixel becomes the designated transparent color |
//! | Encode → JPEG | `JpegEncoder::new_with_quality`, alpha flattened away |
//! | Encode → PNG | `PngEncoder::new_with_quality`, adaptive filtering |
//! | Encode → GIF | `GifEncoder`, quantized from RGBA |
//!
//! Every encode goes to a hidden `.{name}.partial` sibling first and is
//! renamed into place on success, so an upload resized in place is never left
//! truncated.

use super::backend::{BackendError, ImageBackend};
use super::format::SourceFormat;
use super::params::{EncodeOptions, JpegQuality, PngCompression};
use super::raster::{RasterImage, find_transparent_color};
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{FilterType as PngFilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageReader};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

fn decode_error(path: &Path, err: impl std::fmt::Display) -> BackendError {
    BackendError::Decode {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

fn encode_error(path: &Path, err: impl std::fmt::Display) -> BackendError {
    BackendError::Encode {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

fn load_image(path: &Path, format: SourceFormat) -> Result<DynamicImage, BackendError> {
    let mut reader = ImageReader::open(path)?;
    reader.set_format(format.image_format());
    reader.decode().map_err(|e| decode_error(path, e))
}

/// GIF frames always decode as RGBA. Keep the alpha channel only when some
/// pixel is actually transparent, and remember that pixel's color.
fn from_gif(image: DynamicImage) -> RasterImage {
    let rgba = image.into_rgba8();
    match find_transparent_color(&rgba) {
        Some(color) => RasterImage::from_rgba(rgba).with_transparent_color(Some(color)),
        None => RasterImage::from_rgb(DynamicImage::ImageRgba8(rgba).into_rgb8()),
    }
}

/// `.{name}.partial` next to `path`.
fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

/// Encode into a sibling `.partial` file, then rename it over `path`.
/// A failed encode leaves whatever was at `path` untouched.
fn write_replacing(
    path: &Path,
    encode: impl FnOnce(&mut BufWriter<File>) -> Result<(), BackendError>,
) -> Result<(), BackendError> {
    let partial = partial_path(path);
    let result = File::create(&partial)
        .map_err(BackendError::from)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            encode(&mut writer)?;
            writer.flush()?;
            Ok(())
        })
        .and_then(|()| Ok(fs::rename(&partial, path)?));
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn save_jpeg(image: &RasterImage, path: &Path, quality: JpegQuality) -> Result<(), BackendError> {
    // JPEG has no alpha channel; transparent areas keep their RGB values.
    let flattened = DynamicImage::ImageRgb8(image.to_dynamic().into_rgb8());
    write_replacing(path, |writer| {
        let encoder = JpegEncoder::new_with_quality(writer, quality.value().max(1));
        flattened
            .write_with_encoder(encoder)
            .map_err(|e| encode_error(path, e))
    })
}

fn save_png(
    image: &RasterImage,
    path: &Path,
    compression: PngCompression,
) -> Result<(), BackendError> {
    let dynamic = image.to_dynamic();
    write_replacing(path, |writer| {
        let encoder = PngEncoder::new_with_quality(
            writer,
            compression.compression_type(),
            PngFilterType::Adaptive,
        );
        dynamic
            .write_with_encoder(encoder)
            .map_err(|e| encode_error(path, e))
    })
}

/// Keyed pixels arrive with alpha 0, which the frame encoder maps to the
/// GIF transparent index.
fn save_gif(image: &RasterImage, path: &Path) -> Result<(), BackendError> {
    let rgba = image.to_rgba_image();
    write_replacing(path, |writer| {
        let mut encoder = GifEncoder::new(writer);
        encoder
            .encode(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
            .map_err(|e| encode_error(path, e))
    })
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path, format: SourceFormat) -> Result<RasterImage, BackendError> {
        let image = load_image(path, format)?;
        Ok(match format {
            SourceFormat::Gif => from_gif(image),
            SourceFormat::Jpeg | SourceFormat::Png => RasterImage::from_dynamic(image),
        })
    }

    fn encode(
        &self,
        image: &RasterImage,
        path: &Path,
        format: SourceFormat,
        options: &EncodeOptions,
    ) -> Result<(), BackendError> {
        match format {
            SourceFormat::Jpeg => save_jpeg(image, path, options.jpeg_quality),
            SourceFormat::Png => save_png(image, path, options.png_compression),
            SourceFormat::Gif => save_gif(image, path),
        }
    }
}
