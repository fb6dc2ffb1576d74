//! Hand-off to external compression services.
//!
//! The services themselves (TinyPNG, reSmush, a PDF compressor) live outside
//! this crate. Each one is a [`Compressor`] or [`PdfCompressor`] that
//! compresses a file in place and reports the new size. This module only
//! decides which service to call and summarizes the result:
//!
//! - [`compress_with_fallback`] tries an ordered chain of image compressors.
//!   The first success wins; every failure before it is recorded.
//! - [`compress_document`] delegates a PDF upload to a document compressor.
//! - [`CompressionSummary`] renders the "compressed by N% (a kiB → b kiB)" line.

use crate::imaging::{PDF_MIME, SourceFormat};
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{service} rejected the file: {message}")]
    Rejected { service: String, message: String },
    #[error("{service} is unavailable: {message}")]
    Unavailable { service: String, message: String },
    #[error("file is {size} bytes, {service} accepts at most {limit}")]
    TooLarge {
        service: String,
        size: u64,
        limit: u64,
    },
}

#[derive(Error, Debug)]
pub enum PdfCompressionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("document compression failed: {0}")]
    Service(String),
}

/// An external image compression service.
pub trait Compressor: Sync {
    /// Short name shown in reports, e.g. `"tinypng"`.
    fn name(&self) -> &str;

    /// Largest input the service accepts, if it has a limit.
    fn max_input_bytes(&self) -> Option<u64> {
        None
    }

    /// Compress `path` in place and return the new size in bytes.
    fn compress(&self, path: &Path, mime: &str) -> Result<u64, CompressionError>;
}

/// An external PDF compression service. Compresses the file in place.
pub trait PdfCompressor {
    fn compress_pdf(&self, path: &Path) -> Result<(), PdfCompressionError>;
}

/// Sizes before and after compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressionSummary {
    pub original_bytes: u64,
    pub compressed_bytes: u64,
}

impl CompressionSummary {
    /// Percentage saved, rounded to two decimals. Zero for an empty original.
    pub fn saved_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        let ratio = 1.0 - self.compressed_bytes as f64 / self.original_bytes as f64;
        (ratio * 10_000.0).round() / 100.0
    }
}

/// Whole kibibytes, rounded up.
fn kib(bytes: u64) -> u64 {
    bytes.div_ceil(1024)
}

impl fmt::Display for CompressionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "compressed by {}% ({} kiB → {} kiB)",
            self.saved_percent(),
            kib(self.original_bytes),
            kib(self.compressed_bytes)
        )
    }
}

/// A service that failed, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceFailure {
    pub service: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompressionOutcome {
    /// No compressor configured, or the MIME type is not a supported image.
    NotAttempted,
    Compressed {
        service: String,
        summary: CompressionSummary,
        /// Services tried before the one that succeeded.
        failures: Vec<ServiceFailure>,
    },
    AllFailed { failures: Vec<ServiceFailure> },
}

impl CompressionOutcome {
    pub fn is_compressed(&self) -> bool {
        matches!(self, CompressionOutcome::Compressed { .. })
    }
}

/// Try each compressor in order until one succeeds.
///
/// Only JPEG, PNG and GIF files are handed to image compressors.
pub fn compress_with_fallback(
    chain: &[&dyn Compressor],
    path: &Path,
    mime: &str,
) -> Result<CompressionOutcome, CompressionError> {
    if chain.is_empty() || SourceFormat::from_mime(mime).is_none() {
        return Ok(CompressionOutcome::NotAttempted);
    }

    let original_bytes = std::fs::metadata(path)?.len();
    let mut failures = Vec::new();

    for compressor in chain {
        let service = compressor.name().to_string();
        let attempt = match compressor.max_input_bytes() {
            Some(limit) if original_bytes > limit => Err(CompressionError::TooLarge {
                service: service.clone(),
                size: original_bytes,
                limit,
            }),
            _ => compressor.compress(path, mime),
        };

        match attempt {
            Ok(compressed_bytes) => {
                let summary = CompressionSummary {
                    original_bytes,
                    compressed_bytes,
                };
                info!("{}: {} via {}", path.display(), summary, service);
                return Ok(CompressionOutcome::Compressed {
                    service,
                    summary,
                    failures,
                });
            }
            Err(e) => {
                warn!("{}: {} failed: {}", path.display(), service, e);
                failures.push(ServiceFailure {
                    service,
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(CompressionOutcome::AllFailed { failures })
}

/// Compress a PDF upload with the document service.
///
/// Returns `Ok(None)` for anything that is not `application/pdf`.
pub fn compress_document(
    compressor: &dyn PdfCompressor,
    path: &Path,
    mime: &str,
) -> Result<Option<CompressionSummary>, PdfCompressionError> {
    if !mime.trim().eq_ignore_ascii_case(PDF_MIME) {
        return Ok(None);
    }
    let original_bytes = std::fs::metadata(path)?.len();
    compressor.compress_pdf(path)?;
    let compressed_bytes = std::fs::metadata(path)?.len();
    Ok(Some(CompressionSummary {
        original_bytes,
        compressed_bytes,
    }))
}
