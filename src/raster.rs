//! RGBA raster shared by the renderer and the steganography codec.

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Pixel layout of every image this crate produces or accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    /// 8-bit RGBA, serialized as PNG.
    Rgba8,
}

/// An RGBA pixel buffer.
///
/// Produced fresh by every render. Later stages take it by reference and
/// return a new image; nothing mutates one in place.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pixels: RgbaImage,
}

impl RenderedImage {
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Converts any decoded image to RGBA8. RGB sources get opaque alpha.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            pixels: image.to_rgba8(),
        }
    }

    /// Decodes PNG (or any format the `image` crate was built with).
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self, image::ImageError> {
        Ok(Self::from_dynamic(image::load_from_memory(bytes)?))
    }

    /// Encodes as PNG.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut bytes = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn format(&self) -> RasterFormat {
        RasterFormat::Rgba8
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }

    /// Flattens transparency over white.
    pub fn flatten_over_white(&self) -> RgbaImage {
        let mut out = RgbaImage::from_pixel(self.width(), self.height(), Rgba([255, 255, 255, 255]));
        for (x, y, px) in self.pixels.enumerate_pixels() {
            blend_pixel(out.get_pixel_mut(x, y), *px, 1.0);
        }
        out
    }
}

/// Source-over blend of `src` onto `dst`, with `src` alpha scaled by
/// `coverage` in `[0, 1]`. Straight (non-premultiplied) alpha.
pub(crate) fn blend_pixel(dst: &mut Rgba<u8>, src: Rgba<u8>, coverage: f32) {
    let sa = f32::from(src.0[3]) / 255.0 * coverage.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = f32::from(dst.0[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    for i in 0..3 {
        let s = f32::from(src.0[i]);
        let d = f32::from(dst.0[i]);
        let c = (s * sa + d * da * (1.0 - sa)) / out_a;
        dst.0[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Composites `src` onto `dst` with its top-left corner at `(x0, y0)`.
/// Parts falling outside `dst` are dropped.
pub(crate) fn overlay(dst: &mut RgbaImage, src: &RgbaImage, x0: i64, y0: i64, opacity: f32) {
    let (dw, dh) = (i64::from(dst.width()), i64::from(dst.height()));
    for (x, y, px) in src.enumerate_pixels() {
        let tx = x0 + i64::from(x);
        let ty = y0 + i64::from(y);
        if tx < 0 || ty < 0 || tx >= dw || ty >= dh {
            continue;
        }
        blend_pixel(dst.get_pixel_mut(tx as u32, ty as u32), *px, opacity);
    }
}
