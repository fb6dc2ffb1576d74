//! # Multisize
//!
//! Turns one uploaded image into a set of resized derivatives. The upload is
//! decoded once, optionally resized in place, and then every configured size
//! is rendered from that single raster and written next to it.
//!
//! # Architecture: One Upload, Many Sizes
//!
//! ```text
//! upload ──decode──▶ RasterImage ──primary resize──▶ RasterImage
//!                                                        │
//!                          ┌─────────────┬───────────────┤  (rayon, one task per spec)
//!                          ▼             ▼               ▼
//!                    photo-300w.jpg  photo-thumb.jpg  photo-half.jpg
//!                          │             │               │
//!                          └──── compression chain ──────┘
//! ```
//!
//! Geometry is decided before any pixel is touched: [`imaging::resolve`] turns
//! the source size, the requested box and a [`imaging::ScaleMethod`] into an
//! output size plus a source/destination rectangle pair. Compositing then
//! samples that source rectangle into that destination rectangle on a canvas
//! of the output size. Every method, including letterboxing, goes through the
//! same two steps.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Geometry resolution, compositing, upscale guard, codecs behind [`imaging::ImageBackend`] |
//! | [`specs`] | `width\|height\|suffix\|method` spec list parser |
//! | [`pipeline`] | Per-upload orchestration: original copy, primary resize, parallel derivatives, naming |
//! | [`compress`] | Ordered fallback chain over external compression services |
//! | [`config`] | `config.toml` loading, validation, merging onto stock defaults |
//! | [`output`] | CLI output formatting for reports and settings |
//!
//! # Design Decisions
//!
//! ## Transparency Survives Resizing
//!
//! PNG and GIF sources keep their alpha channel through every method. A
//! raster can also carry a designated transparent color: pixels of that color
//! are treated as alpha 0 when resampled or encoded, and the GIF encoder maps
//! alpha 0 to its transparent palette index. Letterboxed areas are transparent
//! unless a fill color is set, and a fill is composited under the image rather
//! than replacing it.
//!
//! ## Never Upscale By Accident
//!
//! A derivative that would come out at least as large as its source on either
//! axis is skipped and reported, unless upscaling is explicitly allowed. A
//! "thumbnail" spec can never silently produce a copy of a small upload.
//!
//! ## Failures Stay Local
//!
//! A spec that fails to render or encode is recorded in the report and the
//! remaining specs still run. Only problems with the upload itself (unsupported
//! type, undecodable data, a failed `_original` copy) abort processing.

pub mod compress;
pub mod config;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod specs;

#[cfg(test)]
pub(crate) mod test_helpers;
