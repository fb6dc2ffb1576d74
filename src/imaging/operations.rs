//! High-level image operations.
//!
//! These functions combine the resolver with the compositing engine. They
//! take a [`ResizeRequest`], compute the geometry, apply the upscale guard and
//! draw the result. File I/O stays with the backend.

use super::calculations::{Resolved, resolve};
use super::compositing::composite;
use super::params::{Dimension, FillColor, ResampleQuality, ScaleMethod};
use super::raster::RasterImage;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResizeError {
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),
    #[error("could not allocate a {width}x{height} canvas")]
    CanvasAllocationFailure { width: u32, height: u32 },
}

/// Result type for resize operations.
pub type Result<T> = std::result::Result<T, ResizeError>;

/// One resize of an in-memory raster.
#[derive(Debug, Clone, Copy)]
pub struct ResizeRequest<'a> {
    pub source: &'a RasterImage,
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub method: ScaleMethod,
    pub fill: Option<FillColor>,
    pub allow_upscale: bool,
    pub quality: ResampleQuality,
}

impl<'a> ResizeRequest<'a> {
    /// Request with the default method, no fill, upscaling refused and high quality.
    pub fn new(source: &'a RasterImage, width: Option<Dimension>, height: Option<Dimension>) -> Self {
        Self {
            source,
            width,
            height,
            method: ScaleMethod::default(),
            fill: None,
            allow_upscale: false,
            quality: ResampleQuality::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResizeOutcome {
    Resized(RasterImage),
    /// The upscale guard tripped; nothing was drawn.
    NotSmallerThanSource { width: u32, height: u32 },
}

/// True when a candidate is at least as large as the source on either axis.
///
/// A derivative that is not strictly smaller in both dimensions is skipped
/// unless upscaling is allowed.
pub fn not_smaller_than_source(candidate: (u32, u32), source: (u32, u32)) -> bool {
    candidate.0 >= source.0 || candidate.1 >= source.1
}

/// Compute the geometry for a request without drawing anything.
pub fn plan_resize(request: &ResizeRequest<'_>) -> Result<Resolved> {
    resolve(
        request.source.dimensions(),
        request.width,
        request.height,
        request.method,
    )
}

/// Resolve, check the upscale guard and composite.
///
/// The source is never modified; a successful resize returns a new raster of
/// exactly the resolved dimensions.
pub fn resize(request: &ResizeRequest<'_>) -> Result<ResizeOutcome> {
    let plan = plan_resize(request)?;

    if !request.allow_upscale && not_smaller_than_source(plan.dimensions(), request.source.dimensions())
    {
        return Ok(ResizeOutcome::NotSmallerThanSource {
            width: plan.width,
            height: plan.height,
        });
    }

    let image = composite(
        request.source,
        plan.width,
        plan.height,
        &plan.geometry,
        request.fill,
        request.quality,
    )?;
    Ok(ResizeOutcome::Resized(image))
}
