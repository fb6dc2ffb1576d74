//! Pure calculation functions for resize geometry.
//!
//! All functions here are pure and testable without any I/O or images. The
//! entry point is [`resolve`], which turns a request into target dimensions
//! plus a [`DrawGeometry`] the compositing engine can execute directly.

use super::operations::ResizeError;
use super::params::{Dimension, ScaleMethod};

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rect covering a whole `width x height` area.
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Clamp this rect to fit within `(0, 0, max_w, max_h)`.
    /// Width and height are clamped to at least 1.
    pub fn clamp_to(self, max_w: u32, max_h: u32) -> Self {
        let x = self.x.min(max_w.saturating_sub(1));
        let y = self.y.min(max_h.saturating_sub(1));
        Self {
            x,
            y,
            width: self.width.min(max_w.saturating_sub(x)).max(1),
            height: self.height.min(max_h.saturating_sub(y)).max(1),
        }
    }

    pub fn is_full(&self, width: u32, height: u32) -> bool {
        *self == Self::full(width, height)
    }
}

/// Where source pixels come from and where they land on the canvas.
///
/// `source_box` is in source pixel coordinates. `dest_box` is in canvas
/// coordinates; its origin is the centering offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawGeometry {
    pub source_box: Rect,
    pub dest_box: Rect,
}

/// Output of [`resolve`]: the canvas size and how to draw onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub width: u32,
    pub height: u32,
    pub geometry: DrawGeometry,
}

impl Resolved {
    /// Whether part of the canvas is left uncovered by the source (letterboxing).
    pub fn pads(&self) -> bool {
        !self.geometry.dest_box.is_full(self.width, self.height)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Resolve percentages and fill in a missing axis from the source aspect ratio.
///
/// # Examples
/// ```
/// # use multisize::imaging::{Dimension, sanitize_dimensions};
/// // 1000x800 source, width only → height follows the aspect ratio
/// assert_eq!(
///     sanitize_dimensions((1000, 800), Some(Dimension::Pixels(300)), None).unwrap(),
///     (300, 240)
/// );
///
/// // 50% of the source height, width derived
/// assert_eq!(
///     sanitize_dimensions((1000, 800), None, Some(Dimension::Percent(50.0))).unwrap(),
///     (500, 400)
/// );
/// ```
pub fn sanitize_dimensions(
    source: (u32, u32),
    width: Option<Dimension>,
    height: Option<Dimension>,
) -> Result<(u32, u32), ResizeError> {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return Err(ResizeError::InvalidDimensions(format!(
            "source is {src_w}x{src_h}"
        )));
    }

    let w = width.and_then(|d| d.resolve(src_w));
    let h = height.and_then(|d| d.resolve(src_h));

    match (w, h) {
        (Some(w), Some(h)) => Ok((w, h)),
        (Some(w), None) => Ok((w, proportional(w, src_h, src_w))),
        (None, Some(h)) => Ok((proportional(h, src_w, src_h), h)),
        (None, None) => Err(ResizeError::InvalidDimensions(
            "neither width nor height given".into(),
        )),
    }
}

/// `basis * num / den`, rounded, at least 1.
fn proportional(basis: u32, num: u32, den: u32) -> u32 {
    to_pixels(basis as f64 * num as f64 / den as f64)
}

fn to_pixels(value: f64) -> u32 {
    value.round().max(1.0) as u32
}

/// Scale both axes of `source` by `factor`.
fn scale_by(source: (u32, u32), factor: f64) -> (u32, u32) {
    (
        to_pixels(source.0 as f64 * factor),
        to_pixels(source.1 as f64 * factor),
    )
}

fn axis_ratios(source: (u32, u32), requested: (u32, u32)) -> (f64, f64) {
    (
        requested.0 as f64 / source.0 as f64,
        requested.1 as f64 / source.1 as f64,
    )
}

/// Compute target dimensions and draw geometry for a request.
///
/// `width`/`height` may be omitted (or zero) to derive them from the source
/// aspect ratio; omitting both is an error. Whether the result is larger than
/// the source is not checked here.
pub fn resolve(
    source: (u32, u32),
    width: Option<Dimension>,
    height: Option<Dimension>,
    method: ScaleMethod,
) -> Result<Resolved, ResizeError> {
    let requested = sanitize_dimensions(source, width, height)?;
    let resolved = match method {
        ScaleMethod::Passthrough => resolve_passthrough(source, requested),
        ScaleMethod::Inside => resolve_inside(source, requested),
        ScaleMethod::Outside => resolve_outside(source, requested),
        ScaleMethod::Fit => resolve_fit(source, requested),
        ScaleMethod::Crop => resolve_crop(source, requested),
        ScaleMethod::CropResize => resolve_crop_resize(source, requested),
    };
    Ok(resolved)
}

/// Draw the whole source onto the whole canvas.
fn stretch(source: (u32, u32), target: (u32, u32)) -> Resolved {
    Resolved {
        width: target.0,
        height: target.1,
        geometry: DrawGeometry {
            source_box: Rect::full(source.0, source.1),
            dest_box: Rect::full(target.0, target.1),
        },
    }
}

fn resolve_passthrough(source: (u32, u32), requested: (u32, u32)) -> Resolved {
    stretch(source, requested)
}

fn inside_box(source: (u32, u32), requested: (u32, u32)) -> (u32, u32) {
    let (rx, ry) = axis_ratios(source, requested);
    scale_by(source, rx.min(ry))
}

fn outside_box(source: (u32, u32), requested: (u32, u32)) -> (u32, u32) {
    let (rx, ry) = axis_ratios(source, requested);
    scale_by(source, rx.max(ry))
}

fn resolve_inside(source: (u32, u32), requested: (u32, u32)) -> Resolved {
    stretch(source, inside_box(source, requested))
}

fn resolve_outside(source: (u32, u32), requested: (u32, u32)) -> Resolved {
    stretch(source, outside_box(source, requested))
}

fn resolve_fit(source: (u32, u32), requested: (u32, u32)) -> Resolved {
    let (content_w, content_h) = inside_box(source, requested);
    let offset_x = centered_offset(requested.0, content_w);
    let offset_y = centered_offset(requested.1, content_h);
    Resolved {
        width: requested.0,
        height: requested.1,
        geometry: DrawGeometry {
            source_box: Rect::full(source.0, source.1),
            dest_box: Rect::new(offset_x, offset_y, content_w, content_h),
        },
    }
}

/// `round((outer - inner) / 2)`, never negative.
fn centered_offset(outer: u32, inner: u32) -> u32 {
    (outer.saturating_sub(inner) as f64 / 2.0).round() as u32
}

fn resolve_crop(source: (u32, u32), requested: (u32, u32)) -> Resolved {
    let (scaled_w, scaled_h) = outside_box(source, requested);

    // Centered crop window in scaled coordinates.
    let crop_x = scaled_w.saturating_sub(requested.0) / 2;
    let crop_y = scaled_h.saturating_sub(requested.1) / 2;

    // Map the window back onto source pixels.
    let fx = source.0 as f64 / scaled_w as f64;
    let fy = source.1 as f64 / scaled_h as f64;
    let source_box = Rect::new(
        (crop_x as f64 * fx).round() as u32,
        (crop_y as f64 * fy).round() as u32,
        to_pixels(requested.0 as f64 * fx),
        to_pixels(requested.1 as f64 * fy),
    )
    .clamp_to(source.0, source.1);

    Resolved {
        width: requested.0,
        height: requested.1,
        geometry: DrawGeometry {
            source_box,
            dest_box: Rect::full(requested.0, requested.1),
        },
    }
}

fn resolve_crop_resize(source: (u32, u32), requested: (u32, u32)) -> Resolved {
    Resolved {
        width: requested.0,
        height: requested.1,
        geometry: DrawGeometry {
            source_box: crop_to_aspect(source, requested),
            dest_box: Rect::full(requested.0, requested.1),
        },
    }
}

/// Largest centered window of `source` with the aspect ratio of `target`.
pub fn crop_to_aspect(source: (u32, u32), target: (u32, u32)) -> Rect {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    // Cross-multiply to catch exact matches without float comparison.
    if src_w as u64 * tgt_h as u64 == src_h as u64 * tgt_w as u64 {
        return Rect::full(src_w, src_h);
    }

    if src_w as f64 / src_h as f64 > tgt_w as f64 / tgt_h as f64 {
        // Source is wider: keep full height, trim the sides.
        let crop_w = proportional(src_h, tgt_w, tgt_h).min(src_w);
        Rect::new((src_w - crop_w) / 2, 0, crop_w, src_h)
    } else {
        // Source is taller: keep full width, trim top and bottom.
        let crop_h = proportional(src_w, tgt_h, tgt_w).min(src_h);
        Rect::new(0, (src_h - crop_h) / 2, src_w, crop_h)
    }
}
