//! Image processing in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (JPEG, PNG, GIF) |
//! | **Geometry** | [`resolve`]: six scale methods → target size + draw boxes |
//! | **Compositing** | `imageops::crop_imm` + `resize` (Nearest / Lanczos3) onto an RGBA canvas |
//! | **Encode** | `JpegEncoder`, `PngEncoder`, `GifEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Raster**: Owned pixel buffers
//! - **Compositing**: Canvas allocation, background, fill and drawing
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + compositing

pub mod backend;
pub mod calculations;
pub mod compositing;
pub mod format;
pub mod operations;
mod params;
pub mod raster;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{DrawGeometry, Rect, Resolved, resolve, sanitize_dimensions};
pub use format::{PDF_MIME, SourceFormat};
pub use operations::{
    ResizeError, ResizeOutcome, ResizeRequest, not_smaller_than_source, plan_resize, resize,
};
pub use params::{
    Dimension, EncodeOptions, FillColor, FillColorError, JpegQuality, PngCompression,
    ResampleQuality, ScaleMethod,
};
pub use raster::{PixelLayout, RasterError, RasterImage};
pub use rust_backend::RustBackend;
