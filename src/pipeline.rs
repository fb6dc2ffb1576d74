//! Multi-derivative generation for one upload.
//!
//! [`process_upload`] is the entry point. For a single source file it:
//!
//! 1. Maps the MIME type to a [`SourceFormat`]; anything else is rejected.
//! 2. Decodes the file once.
//! 3. Writes `{stem}_original{ext}` next to the source when `keep_original` is on.
//! 4. Resizes the upload itself in place when a primary size is configured.
//! 5. Generates every derivative from the resulting raster ([`generate`]).
//! 6. Hands each written file to the compression chain.
//!
//! ## Output Structure
//!
//! ```text
//! images/
//! ├── dawn.jpg                   # upload, possibly resized in place
//! ├── dawn_original.jpg          # untouched copy (keep_original)
//! └── sizes/                     # [derivatives] directory
//!     ├── dawn-300w.jpg          # "300|0": suffix defaults to "{width}w"
//!     └── dawn-thumb.jpg         # "150|150|thumb|4"
//! ```
//!
//! ## Parallel Processing
//!
//! Specs are independent. They run on rayon's pool over a shared, read-only
//! source raster, and results come back in spec order.

use crate::compress::{CompressionOutcome, Compressor, compress_with_fallback};
use crate::imaging::{
    BackendError, Dimension, EncodeOptions, FillColor, ImageBackend, RasterImage,
    ResampleQuality, ResizeError, ResizeOutcome, ResizeRequest, ScaleMethod, SourceFormat,
    not_smaller_than_source, plan_resize, resize,
};
use crate::specs::DerivativeSpec;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a whole upload.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Source has no file name: {0}")]
    InvalidSourcePath(PathBuf),
    #[error("Image processing failed: {0}")]
    Backend(#[from] BackendError),
}

/// Errors that fail a single derivative.
#[derive(Error, Debug)]
pub enum DerivativeError {
    #[error(transparent)]
    Resize(#[from] ResizeError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Everything the pipeline needs, passed explicitly.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub default_method: ScaleMethod,
    pub allow_upscale: bool,
    pub keep_original: bool,
    pub quality: ResampleQuality,
    pub fill: Option<FillColor>,
    /// In-place resize of the upload itself. Both `None` disables it.
    pub primary_width: Option<Dimension>,
    pub primary_height: Option<Dimension>,
    /// Sub-folder of the source directory for derivatives; empty = same folder.
    pub derivative_directory: String,
    pub specs: Vec<DerivativeSpec>,
    pub encode: EncodeOptions,
}

impl PipelineSettings {
    fn primary_spec(&self) -> Option<DerivativeSpec> {
        let spec = DerivativeSpec {
            width: self.primary_width,
            height: self.primary_height,
            ..DerivativeSpec::default()
        };
        (!spec.is_blank()).then_some(spec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Neither width nor height was given.
    BlankSpec,
    /// The result would not be smaller than the source and upscaling is off.
    NotSmallerThanSource { width: u32, height: u32 },
    /// An earlier spec (1-based position) already writes the same file.
    DuplicatePath { first: usize },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivativeOutcome {
    Written {
        path: PathBuf,
        width: u32,
        height: u32,
    },
    Skipped(SkipReason),
    Failed(#[serde(serialize_with = "display_string")] DerivativeError),
}

fn display_string<S: Serializer>(value: &impl std::fmt::Display, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

impl DerivativeOutcome {
    pub fn written_path(&self) -> Option<&Path> {
        match self {
            DerivativeOutcome::Written { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result for one spec, in spec order.
#[derive(Debug, Serialize)]
pub struct DerivativeResult {
    pub spec: DerivativeSpec,
    pub outcome: DerivativeOutcome,
    pub compression: CompressionOutcome,
}

/// Summary of one processed upload.
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub source: PathBuf,
    pub format: SourceFormat,
    /// Dimensions as uploaded, before any primary resize.
    pub source_dimensions: (u32, u32),
    pub original_copy: Option<PathBuf>,
    pub primary: Option<DerivativeResult>,
    pub derivatives: Vec<DerivativeResult>,
}

impl PipelineReport {
    pub fn written_count(&self) -> usize {
        self.derivatives
            .iter()
            .filter(|r| r.outcome.written_path().is_some())
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.derivatives
            .iter()
            .filter(|r| matches!(r.outcome, DerivativeOutcome::Failed(_)))
            .count()
    }
}

// ============================================================================
// Paths
// ============================================================================

/// Stem and extension (with its dot) of an upload's file name.
struct FileName {
    stem: String,
    extension: String,
}

impl FileName {
    fn of(source_path: &Path) -> Result<Self, PipelineError> {
        let stem = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PipelineError::InvalidSourcePath(source_path.to_path_buf()))?;
        let extension = source_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Ok(Self { stem, extension })
    }

    fn with_suffix(&self, dir: &Path, suffix: Option<&str>, width: u32) -> PathBuf {
        let suffix = suffix.map_or_else(|| format!("{width}w"), str::to_string);
        dir.join(format!("{}-{}{}", self.stem, suffix, self.extension))
    }

    fn original(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_original{}", self.stem, self.extension))
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

/// `{dir}/{stem}_original{ext}`, next to the source.
pub fn original_path(source_path: &Path) -> Result<PathBuf, PipelineError> {
    Ok(FileName::of(source_path)?.original(parent_dir(source_path)))
}

/// The source's directory joined with the configured sub-folder.
pub fn derivative_dir(source_path: &Path, sub_folder: &str) -> PathBuf {
    let dir = parent_dir(source_path);
    let sub_folder = sub_folder.trim().trim_matches('/');
    if sub_folder.is_empty() {
        dir.to_path_buf()
    } else {
        dir.join(sub_folder)
    }
}

/// `{dir}/{stem}-{suffix}{ext}`, where `suffix` defaults to `{width}w`.
pub fn derivative_path(
    dir: &Path,
    source_path: &Path,
    suffix: Option<&str>,
    width: u32,
) -> Result<PathBuf, PipelineError> {
    Ok(FileName::of(source_path)?.with_suffix(dir, suffix, width))
}

// ============================================================================
// Generation
// ============================================================================

fn request_for<'a>(
    source: &'a RasterImage,
    spec: &DerivativeSpec,
    settings: &PipelineSettings,
) -> ResizeRequest<'a> {
    ResizeRequest {
        source,
        width: spec.width,
        height: spec.height,
        method: spec.method_or(settings.default_method),
        fill: settings.fill,
        allow_upscale: settings.allow_upscale,
        quality: settings.quality,
    }
}

/// Resize `source` per `spec`. `Err` carries the final outcome when there is
/// nothing to write.
fn prepare(
    source: &RasterImage,
    spec: &DerivativeSpec,
    settings: &PipelineSettings,
) -> Result<RasterImage, DerivativeOutcome> {
    if spec.is_blank() {
        debug!("skipping blank spec");
        return Err(DerivativeOutcome::Skipped(SkipReason::BlankSpec));
    }

    let request = request_for(source, spec, settings);
    match resize(&request) {
        Ok(ResizeOutcome::Resized(image)) => {
            debug!("{spec}: {} → {}x{}", request.method, image.width(), image.height());
            Ok(image)
        }
        Ok(ResizeOutcome::NotSmallerThanSource { width, height }) => {
            warn!(
                "{spec}: {width}x{height} is not smaller than the {}x{} source, skipped",
                source.width(),
                source.height()
            );
            Err(DerivativeOutcome::Skipped(SkipReason::NotSmallerThanSource { width, height }))
        }
        Err(e) => {
            warn!("{spec}: {e}");
            Err(DerivativeOutcome::Failed(e.into()))
        }
    }
}

fn write(
    backend: &impl ImageBackend,
    image: &RasterImage,
    path: PathBuf,
    format: SourceFormat,
    settings: &PipelineSettings,
) -> DerivativeOutcome {
    match backend.encode(image, &path, format, &settings.encode) {
        Ok(()) => {
            info!("wrote {} ({}x{})", path.display(), image.width(), image.height());
            DerivativeOutcome::Written {
                path,
                width: image.width(),
                height: image.height(),
            }
        }
        Err(e) => {
            warn!("{}: {e}", path.display());
            DerivativeOutcome::Failed(e.into())
        }
    }
}

/// The file each spec would write, or `None` when it will not write one.
fn planned_paths(
    source: &RasterImage,
    name: &FileName,
    dir: &Path,
    settings: &PipelineSettings,
) -> Vec<Option<PathBuf>> {
    settings
        .specs
        .iter()
        .map(|spec| {
            if spec.is_blank() {
                return None;
            }
            let plan = plan_resize(&request_for(source, spec, settings)).ok()?;
            if !settings.allow_upscale
                && not_smaller_than_source(plan.dimensions(), source.dimensions())
            {
                return None;
            }
            Some(name.with_suffix(dir, spec.suffix.as_deref(), plan.width))
        })
        .collect()
}

/// For each spec, the 1-based position of an earlier spec writing the same path.
fn duplicate_owners(paths: &[Option<PathBuf>]) -> Vec<Option<usize>> {
    let mut owners: HashMap<&Path, usize> = HashMap::new();
    paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let path = path.as_deref()?;
            match owners.get(path) {
                Some(&first) => Some(first),
                None => {
                    owners.insert(path, i + 1);
                    None
                }
            }
        })
        .collect()
}

/// Produce every derivative in `settings.specs` from `source`.
///
/// Returns exactly one outcome per spec, in spec order. When two specs would
/// write the same file, the first one writes it and the later ones are
/// skipped. The derivative directory must already exist. Fails only when
/// `source_path` has no file name to derive output names from.
pub fn generate(
    backend: &impl ImageBackend,
    source: &RasterImage,
    source_path: &Path,
    format: SourceFormat,
    settings: &PipelineSettings,
) -> Result<Vec<DerivativeOutcome>, PipelineError> {
    let name = FileName::of(source_path)?;
    let dir = derivative_dir(source_path, &settings.derivative_directory);
    let duplicates = duplicate_owners(&planned_paths(source, &name, &dir, settings));

    Ok(settings
        .specs
        .par_iter()
        .zip(duplicates)
        .map(|(spec, duplicate)| {
            if let Some(first) = duplicate {
                warn!("{spec}: same output file as spec {first}, skipped");
                return DerivativeOutcome::Skipped(SkipReason::DuplicatePath { first });
            }
            match prepare(source, spec, settings) {
                Ok(image) => {
                    let path = name.with_suffix(&dir, spec.suffix.as_deref(), image.width());
                    write(backend, &image, path, format, settings)
                }
                Err(outcome) => outcome,
            }
        })
        .collect())
}

fn compress_written(
    outcome: &DerivativeOutcome,
    format: SourceFormat,
    compressors: &[&dyn Compressor],
) -> CompressionOutcome {
    let Some(path) = outcome.written_path() else {
        return CompressionOutcome::NotAttempted;
    };
    match compress_with_fallback(compressors, path, format.mime()) {
        Ok(result) => result,
        Err(e) => {
            warn!("{}: compression skipped: {e}", path.display());
            CompressionOutcome::NotAttempted
        }
    }
}

/// Process one upload end to end. See the [module docs](self).
pub fn process_upload(
    backend: &impl ImageBackend,
    source_path: &Path,
    mime: &str,
    settings: &PipelineSettings,
    compressors: &[&dyn Compressor],
) -> Result<PipelineReport, PipelineError> {
    let format = SourceFormat::from_mime(mime)
        .ok_or_else(|| PipelineError::UnsupportedFormat(mime.to_string()))?;
    let name = FileName::of(source_path)?;

    let decoded = backend.decode(source_path, format)?;
    let source_dimensions = decoded.dimensions();
    info!(
        "{}: {}x{} {}",
        source_path.display(),
        source_dimensions.0,
        source_dimensions.1,
        format
    );

    let original_copy = if settings.keep_original {
        let path = name.original(parent_dir(source_path));
        backend.encode(&decoded, &path, format, &settings.encode)?;
        info!("kept original as {}", path.display());
        Some(path)
    } else {
        None
    };

    let mut working = decoded;
    let primary = settings.primary_spec().map(|spec| {
        let outcome = match prepare(&working, &spec, settings) {
            Ok(resized) => {
                let outcome = write(backend, &resized, source_path.to_path_buf(), format, settings);
                if outcome.written_path().is_some() {
                    // Derivatives start from the resized upload.
                    working = resized;
                }
                outcome
            }
            Err(outcome) => outcome,
        };
        let compression = compress_written(&outcome, format, compressors);
        DerivativeResult {
            spec,
            outcome,
            compression,
        }
    });

    if settings.specs.iter().any(|s| !s.is_blank()) {
        std::fs::create_dir_all(derivative_dir(source_path, &settings.derivative_directory))?;
    }

    let outcomes = generate(backend, &working, source_path, format, settings)?;
    let derivatives = settings
        .specs
        .iter()
        .cloned()
        .zip(outcomes)
        .map(|(spec, outcome)| {
            let compression = compress_written(&outcome, format, compressors);
            DerivativeResult {
                spec,
                outcome,
                compression,
            }
        })
        .collect();

    Ok(PipelineReport {
        source: source_path.to_path_buf(),
        format,
        source_dimensions,
        original_copy,
        primary,
        derivatives,
    })
}
