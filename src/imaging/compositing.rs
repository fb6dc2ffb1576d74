//! The compositing engine: canvas allocation, background, and drawing.
//!
//! [`composite`] takes a source raster and a [`DrawGeometry`] from the
//! resolver and produces a new RGBA raster of exactly the target size:
//!
//! 1. Allocate the canvas. Alpha is always present.
//! 2. Pick the initial background: transparent when the source has
//!    transparency or the geometry letterboxes, opaque black otherwise.
//! 3. Paint the fill color, if any. Translucent fills are blended over the
//!    initial background, opaque fills replace it.
//! 4. Resample `source_box` to the size of `dest_box` and draw it at the
//!    box origin. Without a fill the pixels are copied as-is; with a fill
//!    they are composited once over it.

use super::calculations::{DrawGeometry, Rect};
use super::operations::ResizeError;
use super::params::{FillColor, ResampleQuality};
use super::raster::RasterImage;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

const OPAQUE_BLACK: [u8; 4] = [0, 0, 0, u8::MAX];

/// Draw `source` onto a fresh `target_w x target_h` canvas.
pub fn composite(
    source: &RasterImage,
    target_w: u32,
    target_h: u32,
    geometry: &DrawGeometry,
    fill: Option<FillColor>,
    quality: ResampleQuality,
) -> Result<RasterImage, ResizeError> {
    if target_w == 0 || target_h == 0 {
        return Err(ResizeError::InvalidDimensions(format!(
            "canvas {target_w}x{target_h}"
        )));
    }

    let letterboxed = !geometry.dest_box.is_full(target_w, target_h);
    let background = initial_background(source, letterboxed);
    let mut canvas = allocate_canvas(target_w, target_h, background)?;

    if let Some(fill) = fill {
        paint_fill(&mut canvas, fill);
    }

    let drawn = resample(source, geometry.source_box, geometry.dest_box, quality);
    let (x, y) = (geometry.dest_box.x, geometry.dest_box.y);
    match fill {
        Some(_) => blend_onto(&mut canvas, &drawn, x, y),
        None => imageops::replace(&mut canvas, &drawn, x as i64, y as i64),
    }

    // A fill replaces transparency, so there is nothing left to mark.
    let transparent_color = match fill {
        Some(_) => None,
        None => source.transparent_color(),
    };
    Ok(RasterImage::from_rgba(canvas).with_transparent_color(transparent_color))
}

fn initial_background(source: &RasterImage, letterboxed: bool) -> [u8; 4] {
    if !(source.has_transparency() || letterboxed) {
        return OPAQUE_BLACK;
    }
    match source.transparent_color() {
        Some([r, g, b]) => [r, g, b, 0],
        None => [0, 0, 0, 0],
    }
}

/// Allocate a canvas filled with `background`, reporting failure instead of aborting.
pub fn allocate_canvas(
    width: u32,
    height: u32,
    background: [u8; 4],
) -> Result<RgbaImage, ResizeError> {
    let failure = || ResizeError::CanvasAllocationFailure { width, height };

    let pixel_count = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(failure)?;
    let byte_len = pixel_count
        .checked_mul(4)
        .filter(|&n| n <= isize::MAX as usize)
        .ok_or_else(failure)?;

    let mut buffer: Vec<u8> = Vec::new();
    buffer.try_reserve_exact(byte_len).map_err(|_| failure())?;
    buffer.extend(std::iter::repeat_n(background, pixel_count).flatten());

    RgbaImage::from_raw(width, height, buffer).ok_or_else(failure)
}

fn paint_fill(canvas: &mut RgbaImage, fill: FillColor) {
    let color = fill.to_rgba();
    if fill.is_opaque() {
        for pixel in canvas.pixels_mut() {
            *pixel = Rgba(color);
        }
    } else {
        for pixel in canvas.pixels_mut() {
            pixel.0 = blend_over(pixel.0, color);
        }
    }
}

/// Crop `source_box` out of the source and scale it to the size of `dest_box`.
fn resample(
    source: &RasterImage,
    source_box: Rect,
    dest_box: Rect,
    quality: ResampleQuality,
) -> RgbaImage {
    let rgba = source.to_rgba_image();
    let region = if source_box.is_full(rgba.width(), rgba.height()) {
        rgba
    } else {
        imageops::crop_imm(
            &rgba,
            source_box.x,
            source_box.y,
            source_box.width,
            source_box.height,
        )
        .to_image()
    };

    if region.dimensions() == (dest_box.width, dest_box.height) {
        return region;
    }

    let filter = match quality {
        ResampleQuality::Fast => FilterType::Nearest,
        ResampleQuality::High => FilterType::Lanczos3,
    };
    imageops::resize(&region, dest_box.width, dest_box.height, filter)
}

fn blend_onto(canvas: &mut RgbaImage, top: &RgbaImage, x: u32, y: u32) {
    for (tx, ty, pixel) in top.enumerate_pixels() {
        let (cx, cy) = (x + tx, y + ty);
        if cx < canvas.width() && cy < canvas.height() {
            let below = canvas.get_pixel(cx, cy).0;
            canvas.put_pixel(cx, cy, Rgba(blend_over(below, pixel.0)));
        }
    }
}

/// Porter-Duff "source over destination" on straight (non-premultiplied) RGBA.
pub fn blend_over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    match src[3] {
        0 => return dst,
        u8::MAX => return src,
        _ => {}
    }

    let src_a = src[3] as f32 / 255.0;
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    let channel = |i: usize| {
        let c = (src[i] as f32 * src_a + dst[i] as f32 * dst_a * (1.0 - src_a)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    [
        channel(0),
        channel(1),
        channel(2),
        (out_a * 255.0).round() as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::calculations::resolve;
    use crate::imaging::params::Dimension;
    use crate::imaging::{PixelLayout, ScaleMethod};
    use crate::test_helpers::solid_rgb;

    /// Opaque red square inside a transparent border.
    fn framed_rgba(size: u32, border: u32) -> RasterImage {
        RasterImage::from_rgba(RgbaImage::from_fn(size, size, |x, y| {
            let inside = x >= border && y >= border && x < size - border && y < size - border;
            if inside {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        }))
    }

    fn geometry_for(source: &RasterImage, w: u32, h: u32, method: ScaleMethod) -> (u32, u32, DrawGeometry) {
        let r = resolve(
            source.dimensions(),
            Some(Dimension::Pixels(w)),
            Some(Dimension::Pixels(h)),
            method,
        )
        .unwrap();
        (r.width, r.height, r.geometry)
    }

    #[test]
    fn output_is_exactly_target_size() {
        let src = solid_rgb(640, 480, [10, 20, 30]);
        for method in ScaleMethod::ALL {
            let (w, h, g) = geometry_for(&src, 150, 150, method);
            let out = composite(&src, w, h, &g, None, ResampleQuality::Fast).unwrap();
            assert_eq!(out.dimensions(), (w, h), "{method}");
            assert!(out.has_alpha(), "{method}");
        }
    }

    #[test]
    fn opaque_source_without_fill_stays_opaque() {
        let src = solid_rgb(100, 80, [200, 100, 50]);
        let (w, h, g) = geometry_for(&src, 50, 40, ScaleMethod::Inside);
        let out = composite(&src, w, h, &g, None, ResampleQuality::High).unwrap();
        assert_eq!(out.pixel(0, 0), [200, 100, 50, 255]);
        assert_eq!(out.pixel(49, 39), [200, 100, 50, 255]);
    }

    #[test]
    fn fit_letterbox_on_opaque_source_is_transparent() {
        let src = solid_rgb(200, 100, [255, 255, 255]);
        let (w, h, g) = geometry_for(&src, 100, 100, ScaleMethod::Fit);
        let out = composite(&src, w, h, &g, None, ResampleQuality::Fast).unwrap();
        assert_eq!(out.pixel(50, 0)[3], 0);
        assert_eq!(out.pixel(50, 50), [255, 255, 255, 255]);
        assert_eq!(out.pixel(50, 99)[3], 0);
    }

    #[test]
    fn transparent_source_keeps_transparent_pixels() {
        let src = framed_rgba(100, 20);
        let (w, h, g) = geometry_for(&src, 50, 50, ScaleMethod::Inside);
        let out = composite(&src, w, h, &g, None, ResampleQuality::High).unwrap();
        assert_eq!(out.pixel(0, 0)[3], 0);
        assert_eq!(out.pixel(25, 25), [255, 0, 0, 255]);
    }

    #[test]
    fn transparent_color_is_registered_and_used_as_background() {
        let src = RasterImage::new(4, 2, PixelLayout::Rgb8, vec![9; 24])
            .unwrap()
            .with_transparent_color(Some([1, 2, 3]));
        let (w, h, g) = geometry_for(&src, 8, 8, ScaleMethod::Fit);
        let out = composite(&src, w, h, &g, None, ResampleQuality::Fast).unwrap();
        assert_eq!(out.transparent_color(), Some([1, 2, 3]));
        assert_eq!(out.pixel(0, 0), [1, 2, 3, 0]);
        assert_eq!(out.pixel(4, 4), [9, 9, 9, 255]);
    }

    #[test]
    fn keyed_source_pixels_stay_transparent() {
        // Left half is the designated transparent color.
        let src = RasterImage::from_rgb(image::RgbImage::from_fn(8, 4, |x, _| {
            if x < 4 {
                image::Rgb([1, 2, 3])
            } else {
                image::Rgb([200, 100, 50])
            }
        }))
        .with_transparent_color(Some([1, 2, 3]));
        let r = resolve((8, 4), Some(Dimension::Pixels(4)), None, ScaleMethod::Inside).unwrap();
        let out = composite(&src, r.width, r.height, &r.geometry, None, ResampleQuality::Fast)
            .unwrap();

        assert_eq!(out.dimensions(), (4, 2));
        assert_eq!(out.pixel(0, 0)[3], 0);
        assert_eq!(out.pixel(1, 1)[3], 0);
        assert_eq!(out.pixel(3, 0), [200, 100, 50, 255]);
    }

    #[test]
    fn keyed_source_under_fill_shows_the_fill() {
        let src = RasterImage::from_rgb(image::RgbImage::from_pixel(4, 4, image::Rgb([1, 2, 3])))
            .with_transparent_color(Some([1, 2, 3]));
        let (w, h, g) = geometry_for(&src, 2, 2, ScaleMethod::Passthrough);
        let fill = FillColor::opaque(255, 255, 255);
        let out = composite(&src, w, h, &g, Some(fill), ResampleQuality::Fast).unwrap();
        assert_eq!(out.pixel(0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn opaque_fill_overrides_transparency() {
        let src = framed_rgba(100, 20);
        let (w, h, g) = geometry_for(&src, 50, 50, ScaleMethod::Fit);
        let fill = FillColor::opaque(255, 255, 255);
        let out = composite(&src, w, h, &g, Some(fill), ResampleQuality::High).unwrap();
        assert_eq!(out.pixel(0, 0), [255, 255, 255, 255]);
        assert_eq!(out.transparent_color(), None);
        assert!(out.pixels().chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn translucent_fill_sets_background_alpha() {
        let src = framed_rgba(100, 20);
        let (w, h, g) = geometry_for(&src, 50, 50, ScaleMethod::Fit);
        let fill = FillColor::opaque(0, 0, 255).with_opacity(0.5);
        let out = composite(&src, w, h, &g, Some(fill), ResampleQuality::High).unwrap();
        assert_eq!(out.pixel(0, 0), [0, 0, 255, 128]);
        // Opaque content is drawn over the fill unchanged.
        assert_eq!(out.pixel(25, 25), [255, 0, 0, 255]);
    }

    #[test]
    fn translucent_fill_on_opaque_source_blends_with_black() {
        let src = solid_rgb(100, 50, [255, 255, 255]);
        let (w, h, g) = geometry_for(&src, 100, 100, ScaleMethod::Passthrough);
        let fill = FillColor::opaque(255, 255, 255).with_opacity(0.5);
        // Full coverage: no letterbox, fill hidden under opaque source.
        let out = composite(&src, w, h, &g, Some(fill), ResampleQuality::Fast).unwrap();
        assert_eq!(out.pixel(0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn zero_canvas_is_invalid() {
        let src = solid_rgb(4, 4, [0, 0, 0]);
        let g = DrawGeometry {
            source_box: Rect::full(4, 4),
            dest_box: Rect::full(0, 4),
        };
        assert!(matches!(
            composite(&src, 0, 4, &g, None, ResampleQuality::Fast),
            Err(ResizeError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn oversized_canvas_reports_allocation_failure() {
        assert_eq!(
            allocate_canvas(u32::MAX, u32::MAX, OPAQUE_BLACK).unwrap_err(),
            ResizeError::CanvasAllocationFailure {
                width: u32::MAX,
                height: u32::MAX
            }
        );
    }

    #[test]
    fn allocate_canvas_fills_background() {
        let canvas = allocate_canvas(3, 2, [1, 2, 3, 4]).unwrap();
        assert!(canvas.pixels().all(|p| p.0 == [1, 2, 3, 4]));
    }

    #[test]
    fn fast_quality_replicates_pixels() {
        let src = RasterImage::from_rgb(image::RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        }));
        let (w, h, g) = geometry_for(&src, 4, 2, ScaleMethod::Passthrough);
        let out = composite(&src, w, h, &g, None, ResampleQuality::Fast).unwrap();
        assert_eq!(out.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(out.pixel(1, 1), [0, 0, 0, 255]);
        assert_eq!(out.pixel(3, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn crop_draws_only_the_source_box() {
        // Left half black, right half white; crop the right 50x50.
        let src = RasterImage::from_rgb(image::RgbImage::from_fn(100, 50, |x, _| {
            if x < 50 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        }));
        let g = DrawGeometry {
            source_box: Rect::new(50, 0, 50, 50),
            dest_box: Rect::full(50, 50),
        };
        let out = composite(&src, 50, 50, &g, None, ResampleQuality::Fast).unwrap();
        assert!(out.pixels().chunks_exact(4).all(|p| p == [255, 255, 255, 255]));
    }

    #[test]
    fn source_is_not_modified() {
        let src = framed_rgba(40, 10);
        let before = src.clone();
        let (w, h, g) = geometry_for(&src, 20, 20, ScaleMethod::Crop);
        composite(&src, w, h, &g, Some(FillColor::opaque(0, 0, 0)), ResampleQuality::High)
            .unwrap();
        assert_eq!(src, before);
    }

    #[test]
    fn blend_over_transparent_keeps_source() {
        assert_eq!(blend_over([0, 0, 0, 0], [10, 20, 30, 128]), [10, 20, 30, 128]);
    }

    #[test]
    fn blend_over_opaque_mixes_colors() {
        assert_eq!(blend_over([0, 0, 0, 255], [255, 255, 255, 128]), [128, 128, 128, 255]);
    }

    #[test]
    fn blend_over_short_circuits_extremes() {
        assert_eq!(blend_over([1, 2, 3, 4], [9, 9, 9, 0]), [1, 2, 3, 4]);
        assert_eq!(blend_over([1, 2, 3, 4], [9, 9, 9, 255]), [9, 9, 9, 255]);
    }
}
