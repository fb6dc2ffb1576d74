//! Owned pixel buffers passed between decode, the compositing engine and encode.

use image::{DynamicImage, RgbImage, Rgba, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    #[error("pixel buffer holds {actual} bytes, {width}x{height} {layout:?} needs {expected}")]
    BufferLength {
        width: u32,
        height: u32,
        layout: PixelLayout,
        expected: usize,
        actual: usize,
    },
}

/// Channel layout of a [`RasterImage`] buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb8,
    Rgba8,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Rgb8 => 3,
            PixelLayout::Rgba8 => 4,
        }
    }
}

/// A decoded image.
///
/// The buffer is always exactly `width * height * bytes_per_pixel` long; the
/// constructor rejects anything else. Resizing never touches an existing
/// raster, it produces a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    buffer: Buffer,
    /// Palette-style "not drawn" color, for formats without a real alpha channel.
    transparent_color: Option<[u8; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
enum Buffer {
    Rgb(RgbImage),
    Rgba(RgbaImage),
}

impl RasterImage {
    pub fn new(
        width: u32,
        height: u32,
        layout: PixelLayout,
        pixels: Vec<u8>,
    ) -> Result<Self, RasterError> {
        let actual = pixels.len();
        let buffer = match layout {
            PixelLayout::Rgb8 => RgbImage::from_raw(width, height, pixels).map(Buffer::Rgb),
            PixelLayout::Rgba8 => RgbaImage::from_raw(width, height, pixels).map(Buffer::Rgba),
        };
        // from_raw accepts oversized buffers, so check the exact length too.
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(layout.bytes_per_pixel());
        match buffer {
            Some(buffer) if actual == expected => Ok(Self {
                buffer,
                transparent_color: None,
            }),
            _ => Err(RasterError::BufferLength {
                width,
                height,
                layout,
                expected,
                actual,
            }),
        }
    }

    pub fn from_rgba(image: RgbaImage) -> Self {
        Self {
            buffer: Buffer::Rgba(image),
            transparent_color: None,
        }
    }

    pub fn from_rgb(image: RgbImage) -> Self {
        Self {
            buffer: Buffer::Rgb(image),
            transparent_color: None,
        }
    }

    /// Convert a decoded image, keeping an alpha channel only if it had one.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        if image.color().has_alpha() {
            Self::from_rgba(image.into_rgba8())
        } else {
            Self::from_rgb(image.into_rgb8())
        }
    }

    pub fn with_transparent_color(mut self, color: Option<[u8; 3]>) -> Self {
        self.transparent_color = color;
        self
    }

    pub fn width(&self) -> u32 {
        self.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.dimensions().1
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match &self.buffer {
            Buffer::Rgb(img) => img.dimensions(),
            Buffer::Rgba(img) => img.dimensions(),
        }
    }

    pub fn layout(&self) -> PixelLayout {
        match self.buffer {
            Buffer::Rgb(_) => PixelLayout::Rgb8,
            Buffer::Rgba(_) => PixelLayout::Rgba8,
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.layout() == PixelLayout::Rgba8
    }

    pub fn transparent_color(&self) -> Option<[u8; 3]> {
        self.transparent_color
    }

    /// True when the background of a derivative should start transparent.
    pub fn has_transparency(&self) -> bool {
        self.has_alpha() || self.transparent_color.is_some()
    }

    pub fn pixels(&self) -> &[u8] {
        match &self.buffer {
            Buffer::Rgb(img) => img.as_raw(),
            Buffer::Rgba(img) => img.as_raw(),
        }
    }

    /// RGBA value at `(x, y)`. RGB rasters report alpha 255, or 0 for the
    /// designated transparent color.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        match &self.buffer {
            Buffer::Rgb(img) => keyed_rgba(img.get_pixel(x, y).0, self.transparent_color),
            Buffer::Rgba(img) => img.get_pixel(x, y).0,
        }
    }

    /// Copy into an RGBA buffer for resampling. On RGB rasters, pixels equal
    /// to the designated transparent color get alpha 0.
    pub fn to_rgba_image(&self) -> RgbaImage {
        match &self.buffer {
            Buffer::Rgb(img) => RgbaImage::from_fn(img.width(), img.height(), |x, y| {
                Rgba(keyed_rgba(img.get_pixel(x, y).0, self.transparent_color))
            }),
            Buffer::Rgba(img) => img.clone(),
        }
    }

    /// Keyed RGB rasters come out as RGBA so encoders keep the transparency.
    pub fn to_dynamic(&self) -> DynamicImage {
        match &self.buffer {
            Buffer::Rgb(_) if self.transparent_color.is_some() => {
                DynamicImage::ImageRgba8(self.to_rgba_image())
            }
            Buffer::Rgb(img) => DynamicImage::ImageRgb8(img.clone()),
            Buffer::Rgba(img) => DynamicImage::ImageRgba8(img.clone()),
        }
    }
}

fn keyed_rgba([r, g, b]: [u8; 3], key: Option<[u8; 3]>) -> [u8; 4] {
    if key == Some([r, g, b]) {
        [r, g, b, 0]
    } else {
        [r, g, b, u8::MAX]
    }
}

/// First fully transparent pixel's color, used as the designated transparent
/// color for palette formats after they have been expanded to RGBA.
pub fn find_transparent_color(image: &RgbaImage) -> Option<[u8; 3]> {
    image
        .pixels()
        .find(|p| p.0[3] == 0)
        .map(|p| [p.0[0], p.0[1], p.0[2]])
}
