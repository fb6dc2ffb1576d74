//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the pipeline needs
//! from a codec: decode a file into a [`RasterImage`] and encode a raster
//! back to disk. Geometry and compositing never touch the backend.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate's pure Rust codecs.

use super::format::SourceFormat;
use super::params::EncodeOptions;
use super::raster::RasterImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },
    #[error("Failed to encode {path}: {message}")]
    Encode { path: String, message: String },
}

/// Trait for image codec backends.
///
/// `Sync` so a single backend can be shared by the rayon workers that
/// produce derivatives in parallel.
pub trait ImageBackend: Sync {
    /// Read and decode an image file.
    fn decode(&self, path: &Path, format: SourceFormat) -> Result<RasterImage, BackendError>;

    /// Encode `image` as `format` and write it to `path`, replacing any existing file.
    fn encode(
        &self,
        image: &RasterImage,
        path: &Path,
        format: SourceFormat,
        options: &EncodeOptions,
    ) -> Result<(), BackendError>;
}
