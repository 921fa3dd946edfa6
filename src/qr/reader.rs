//! Reading rendered symbols back to text.
//!
//! Used to check that a styled render still scans. Transparent pixels are
//! flattened over white before detection, the way a phone screen shows them.
//!
//! Finder detection expects square eyes. Every dot shape reads back with
//! [`EyeShape::Square`](crate::qr::EyeShape::Square); the other eye shapes are
//! decorative and may not be found.

use rqrr::PreparedImage;
use tracing::debug;

use super::QrError;
use crate::raster::RenderedImage;

/// Reads the first symbol found in `image`.
///
/// # Arguments
/// * `image` - Rendered symbol, possibly with transparency
///
/// # Returns
/// The decoded text, `QrError::NoQrCodeFound` when no finder patterns are
/// detected, or `QrError::QrReadError` when the grid fails to decode.
pub fn read_symbol(image: &RenderedImage) -> Result<String, QrError> {
    let first = scan(image).into_iter().next().ok_or(QrError::NoQrCodeFound)?;
    first.map_err(|e| QrError::QrReadError(format!("Failed to decode symbol: {}", e)))
}

/// Reads every symbol found in `image`, skipping those that fail to decode.
pub fn read_all_symbols(image: &RenderedImage) -> Result<Vec<String>, QrError> {
    let decoded = scan(image);
    if decoded.is_empty() {
        return Err(QrError::NoQrCodeFound);
    }

    let mut results = Vec::new();
    for attempt in decoded {
        match attempt {
            Ok(content) => results.push(content),
            Err(e) => debug!(error = %e, "reader.grid_skipped"),
        }
    }

    if results.is_empty() {
        return Err(QrError::QrReadError(
            "Found symbols but failed to decode any".to_string(),
        ));
    }

    Ok(results)
}

/// Detects grids and decodes each one.
fn scan(image: &RenderedImage) -> Vec<Result<String, String>> {
    let flat = image.flatten_over_white();
    let mut prepared =
        PreparedImage::prepare_from_greyscale(flat.width() as usize, flat.height() as usize, |x, y| {
            let p = flat.get_pixel(x as u32, y as u32).0;
            // Rec. 601 luma.
            let luma = 299 * u32::from(p[0]) + 587 * u32::from(p[1]) + 114 * u32::from(p[2]);
            (luma / 1000) as u8
        });

    prepared
        .detect_grids()
        .iter()
        .map(|grid| {
            grid.decode()
                .map(|(_, content)| content)
                .map_err(|e| format!("{:?}", e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;
    use crate::qr::style::{Color, DotShape, EyeShape, Gradient, StyleSpec};
    use crate::qr::{render, BitMatrix, ErrorCorrection};
    use crate::scoring::ClearedPayload;
    use image::{Rgba, RgbaImage};

    fn rendered(value: &str, style: &StyleSpec, ec: ErrorCorrection) -> RenderedImage {
        let cleared = ClearedPayload::for_tests(Payload::text(value).unwrap());
        let matrix = BitMatrix::encode(&cleared, ec).unwrap();
        render(&matrix, style, ec).unwrap()
    }

    #[test]
    fn test_default_style_reads_back() {
        let value = "https://glyphlock.io";
        let img = rendered(value, &StyleSpec::default(), ErrorCorrection::Medium);
        assert_eq!(read_symbol(&img).unwrap(), value);
    }

    #[test]
    fn test_png_roundtrip_reads_back() {
        let value = "Hello, glyphlock!";
        let img = rendered(value, &StyleSpec::default(), ErrorCorrection::Low);
        let back = RenderedImage::from_png_bytes(&img.to_png_bytes().unwrap()).unwrap();
        assert_eq!(read_symbol(&back).unwrap(), value);
    }

    #[test]
    fn test_colored_gradient_reads_back() {
        let value = "gradient payload";
        let style = StyleSpec {
            gradient: Some(Gradient::linear(
                45.0,
                Color::rgb(20, 20, 120),
                Color::rgb(90, 0, 60),
            )),
            ..Default::default()
        };
        let img = rendered(value, &style, ErrorCorrection::Quartile);
        assert_eq!(read_symbol(&img).unwrap(), value);
    }

    #[test]
    fn test_rounded_dots_read_back() {
        let value = "rounded";
        let style = StyleSpec {
            dot_shape: DotShape::Rounded,
            eye_shape: EyeShape::Square,
            ..Default::default()
        };
        let img = rendered(value, &style, ErrorCorrection::High);
        assert_eq!(read_symbol(&img).unwrap(), value);
    }

    #[test]
    fn test_every_dot_shape_reads_back_with_square_eyes() {
        let value = "https://glyphlock.io/dots";
        for ec in [ErrorCorrection::Low, ErrorCorrection::Medium, ErrorCorrection::High] {
            for dot_shape in DotShape::ALL {
                let style = StyleSpec {
                    dot_shape,
                    eye_shape: EyeShape::Square,
                    ..Default::default()
                };
                let img = rendered(value, &style, ec);
                match read_symbol(&img) {
                    Ok(text) => assert_eq!(text, value, "{dot_shape:?} at {ec:?}"),
                    Err(e) => panic!("{dot_shape:?} at {ec:?} failed to read: {e}"),
                }
            }
        }
    }

    #[test]
    fn test_blank_image_has_no_symbol() {
        let img = RenderedImage::from_rgba(RgbaImage::from_pixel(64, 64, Rgba([255, 255, 255, 255])));
        assert!(matches!(read_symbol(&img), Err(QrError::NoQrCodeFound)));
        assert!(matches!(read_all_symbols(&img), Err(QrError::NoQrCodeFound)));
    }

    #[test]
    fn test_read_all_finds_one() {
        let img = rendered("only one", &StyleSpec::default(), ErrorCorrection::Medium);
        assert_eq!(read_all_symbols(&img).unwrap(), vec!["only one".to_string()]);
    }
}
