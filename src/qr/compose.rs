//! Styled rasterization of a [`BitMatrix`].

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use tracing::{debug, warn};

use super::shapes::{fill_primitive, fill_shape, pixel_coverage, superellipse, Point, Rect, Region, Role, Shape};
use super::style::{BackgroundMode, LogoPosition, LogoShape, PatternKind, Silhouette, StyleSpec};
use super::symbol::{BitMatrix, FINDER_SIZE};
use super::{ErrorCorrection, RenderError};
use crate::config::RenderConfig;
use crate::raster::{blend_pixel, overlay, RenderedImage};

/// Hard ceiling on logo coverage before a warning is always logged.
const LOGO_COVERAGE_CEILING: f32 = 0.35;

/// Default round-frame radius when none is configured.
const ROUND_FRAME_DEFAULT_PCT: u8 = 20;

/// Resolves `imageRef` strings to pixels.
pub trait AssetSource {
    fn resolve(&self, image_ref: &str) -> Option<&RgbaImage>;
}

/// No assets available; any image reference fails validation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAssets;

impl AssetSource for NoAssets {
    fn resolve(&self, _image_ref: &str) -> Option<&RgbaImage> {
        None
    }
}

/// In-memory asset table.
#[derive(Debug, Default, Clone)]
pub struct AssetMap {
    images: HashMap<String, RgbaImage>,
}

impl AssetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image_ref: impl Into<String>, image: RgbaImage) -> &mut Self {
        self.images.insert(image_ref.into(), image);
        self
    }
}

impl AssetSource for AssetMap {
    fn resolve(&self, image_ref: &str) -> Option<&RgbaImage> {
        self.images.get(image_ref)
    }
}

/// Everything a stage needs, fixed before the first pixel is drawn.
struct Plan<'a> {
    matrix: &'a BitMatrix,
    style: &'a StyleSpec,
    ec: ErrorCorrection,
    size: u32,
    module_px: u32,
    /// Pixel offset of the symbol's top-left module.
    origin: u32,
    background_image: Option<&'a RgbaImage>,
    logo_image: Option<&'a RgbaImage>,
}

impl Plan<'_> {
    fn symbol_px(&self) -> u32 {
        self.matrix.width() as u32 * self.module_px
    }
}

type Stage = fn(&Plan<'_>, RgbaImage) -> RgbaImage;

/// Compositing order. Never reordered.
const STAGES: [(&str, Stage); 4] = [
    ("background", stage_background),
    ("modules", stage_modules),
    ("logo", stage_logo),
    ("silhouette", stage_silhouette),
];

/// Renders symbols under a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Renders with no external assets.
    pub fn render(
        &self,
        matrix: &BitMatrix,
        style: &StyleSpec,
        ec: ErrorCorrection,
    ) -> Result<RenderedImage, RenderError> {
        self.render_with_assets(matrix, style, ec, &NoAssets)
    }

    /// Renders, resolving background and logo images from `assets`.
    ///
    /// The style is fully validated and every asset resolved before drawing;
    /// on error nothing is returned.
    ///
    /// # Arguments
    /// * `matrix` - Module matrix from [`BitMatrix::encode`]
    /// * `style` - Shapes, colors, background, logo and silhouette
    /// * `ec` - Error correction the matrix was built with, used for the logo budget
    /// * `assets` - Source for `imageRef` lookups
    ///
    /// # Returns
    /// The composed RGBA image, or `RenderError::InvalidCustomization` for a bad
    /// style, an unresolved asset or an output above `max_dimension`.
    pub fn render_with_assets(
        &self,
        matrix: &BitMatrix,
        style: &StyleSpec,
        ec: ErrorCorrection,
        assets: &dyn AssetSource,
    ) -> Result<RenderedImage, RenderError> {
        let plan = self.plan(matrix, style, ec, assets)?;

        let mut canvas = RgbaImage::new(plan.size, plan.size);
        for (name, stage) in STAGES {
            canvas = stage(&plan, canvas);
            debug!(stage = name, "render.stage");
        }
        Ok(RenderedImage::from_rgba(canvas))
    }

    fn plan<'a>(
        &self,
        matrix: &'a BitMatrix,
        style: &'a StyleSpec,
        ec: ErrorCorrection,
        assets: &'a dyn AssetSource,
    ) -> Result<Plan<'a>, RenderError> {
        style.validate()?;

        let background_image = match style.background.mode {
            BackgroundMode::Image => {
                let image_ref = style.background.image_ref.as_deref().unwrap_or_default();
                Some(resolve(assets, image_ref, "background")?)
            }
            _ => None,
        };
        let logo_image = match &style.logo {
            Some(logo) => Some(resolve(assets, &logo.image_ref, "logo")?),
            None => None,
        };

        let module_px = style.module_px;
        let symbol_px = matrix.width() as u32 * module_px;
        let margin_px = style.transform.margin.modules() * module_px;
        let base = symbol_px + 2 * margin_px;
        // Round clips must not cut into the finder patterns.
        let fit = match style.transform.silhouette {
            Silhouette::Circle => (symbol_px as f32 * std::f32::consts::SQRT_2).ceil() as u32 + 2 * module_px,
            Silhouette::Squircle => (symbol_px as f32 * 2f32.powf(0.25)).ceil() as u32 + 2 * module_px,
            Silhouette::Standard | Silhouette::RoundFrame => 0,
        };
        let size = base.max(fit);
        if size > self.config.max_dimension {
            return Err(RenderError::InvalidCustomization(format!(
                "output {}px exceeds the {}px limit",
                size, self.config.max_dimension
            )));
        }

        Ok(Plan {
            matrix,
            style,
            ec,
            size,
            module_px,
            origin: (size - symbol_px) / 2,
            background_image,
            logo_image,
        })
    }
}

fn resolve<'a>(
    assets: &'a dyn AssetSource,
    image_ref: &str,
    what: &str,
) -> Result<&'a RgbaImage, RenderError> {
    match assets.resolve(image_ref) {
        Some(img) if img.width() > 0 && img.height() > 0 => Ok(img),
        Some(_) => Err(RenderError::InvalidCustomization(format!(
            "{} image {:?} is empty",
            what, image_ref
        ))),
        None => Err(RenderError::InvalidCustomization(format!(
            "unresolved {} image {:?}",
            what, image_ref
        ))),
    }
}

/// Renders with the default configuration and no assets.
pub fn render(
    matrix: &BitMatrix,
    style: &StyleSpec,
    ec: ErrorCorrection,
) -> Result<RenderedImage, RenderError> {
    Renderer::default().render(matrix, style, ec)
}

/// Runs [`Renderer::render_with_assets`] on tokio's blocking pool.
pub async fn render_in_background(
    renderer: Renderer,
    matrix: BitMatrix,
    style: StyleSpec,
    ec: ErrorCorrection,
    assets: AssetMap,
) -> Result<RenderedImage, RenderError> {
    tokio::task::spawn_blocking(move || renderer.render_with_assets(&matrix, &style, ec, &assets))
        .await
        .map_err(|e| RenderError::Worker(e.to_string()))?
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

fn stage_background(plan: &Plan<'_>, mut canvas: RgbaImage) -> RgbaImage {
    let bg = &plan.style.background;
    let size = plan.size;

    let mut layer = match bg.mode {
        BackgroundMode::Solid => RgbaImage::from_pixel(size, size, bg.color.to_rgba()),
        BackgroundMode::Gradient => match &bg.gradient {
            Some(gradient) => RgbaImage::from_fn(size, size, |x, y| {
                let u = (x as f32 + 0.5) / size as f32;
                let v = (y as f32 + 0.5) / size as f32;
                gradient.color_at(u, v).to_rgba()
            }),
            None => RgbaImage::from_pixel(size, size, bg.color.to_rgba()),
        },
        BackgroundMode::Image => match plan.background_image {
            Some(img) => cover_fit(img, size),
            None => RgbaImage::from_pixel(size, size, bg.color.to_rgba()),
        },
    };

    if let Some(sigma) = bg.blur.filter(|s| *s > 0.0) {
        layer = imageops::blur(&layer, sigma);
    }

    if let Some(pattern) = &bg.pattern_overlay {
        let spacing = pattern.spacing_px;
        let color = pattern.color.to_rgba();
        for (x, y, px) in layer.enumerate_pixels_mut() {
            let on = match pattern.kind {
                PatternKind::Dots => x % spacing == spacing / 2 && y % spacing == spacing / 2,
                PatternKind::Grid => x % spacing == 0 || y % spacing == 0,
                PatternKind::Diagonal => (x + y) % spacing == 0,
            };
            if on {
                blend_pixel(px, color, 1.0);
            }
        }
    }

    overlay(&mut canvas, &layer, 0, 0, bg.opacity);
    canvas
}

/// Scales `img` to cover a `size`x`size` square, then center-crops.
fn cover_fit(img: &RgbaImage, size: u32) -> RgbaImage {
    let scale = (size as f32 / img.width() as f32).max(size as f32 / img.height() as f32);
    let w = ((img.width() as f32 * scale).ceil() as u32).max(size);
    let h = ((img.height() as f32 * scale).ceil() as u32).max(size);
    let scaled = imageops::resize(img, w, h, FilterType::Triangle);
    imageops::crop_imm(&scaled, (w - size) / 2, (h - size) / 2, size, size).to_image()
}

fn stage_modules(plan: &Plan<'_>, mut canvas: RgbaImage) -> RgbaImage {
    let n = plan.matrix.width();
    let m = plan.module_px as f32;
    let origin = plan.origin as f32;
    let dot = plan.style.dot_shape.painter();

    for row in 0..n {
        for col in 0..n {
            if plan.matrix.is_finder(row, col) || !plan.matrix.is_dark(row, col) {
                continue;
            }
            let bbox = Rect::new(origin + col as f32 * m, origin + row as f32 * m, m, m);
            let u = (col as f32 + 0.5) / n as f32;
            let v = (row as f32 + 0.5) / n as f32;
            let color = plan.style.module_color(u, v).to_rgba();
            for primitive in dot(bbox) {
                fill_primitive(&mut canvas, &primitive, color);
            }
        }
    }

    let eye = plan.style.eye_shape.painter();
    let side = FINDER_SIZE as f32 * m;
    for ((row, col), colors) in plan
        .matrix
        .finder_origins()
        .into_iter()
        .zip(plan.style.eye_colors.in_finder_order())
    {
        let bbox = Rect::new(origin + col as f32 * m, origin + row as f32 * m, side, side);
        for primitive in eye(bbox) {
            let color = match primitive.role {
                Role::EyeInner => colors.inner,
                Role::EyeOuter | Role::Module => colors.outer,
            };
            fill_primitive(&mut canvas, &primitive, color.to_rgba());
        }
    }

    canvas
}

fn stage_logo(plan: &Plan<'_>, mut canvas: RgbaImage) -> RgbaImage {
    let (logo, source) = match (&plan.style.logo, plan.logo_image) {
        (Some(logo), Some(source)) => (logo, source),
        _ => return canvas,
    };

    let box_side = ((plan.size as f32 * f32::from(logo.size_pct) / 100.0).round() as u32).max(1);
    let coverage = (box_side as f32 / plan.symbol_px() as f32).powi(2);
    if coverage > plan.ec.logo_coverage_budget() || coverage > LOGO_COVERAGE_CEILING {
        warn!(
            coverage = coverage,
            budget = plan.ec.logo_coverage_budget(),
            ec = ?plan.ec,
            "render.logo_coverage_high"
        );
    }

    let border_px = logo.border.map(|b| b.width_px).unwrap_or(0);
    let tile_side = box_side + 2 * border_px;
    let mut tile = RgbaImage::new(tile_side, tile_side);
    let tile_rect = Rect::new(0.0, 0.0, tile_side as f32, tile_side as f32);

    if let Some(border) = &logo.border {
        fill_shape(&mut tile, &logo_clip(logo.shape, tile_rect), None, border.color.to_rgba());
    }

    // Fit inside the box, keeping aspect ratio.
    let scale = (box_side as f32 / source.width() as f32).min(box_side as f32 / source.height() as f32);
    let lw = ((source.width() as f32 * scale).round() as u32).max(1);
    let lh = ((source.height() as f32 * scale).round() as u32).max(1);
    let scaled = imageops::resize(source, lw, lh, FilterType::Triangle);
    let lx = border_px + (box_side - lw) / 2;
    let ly = border_px + (box_side - lh) / 2;

    let clip = Region::new(&logo_clip(logo.shape, tile_rect.inset(border_px as f32)));
    let opacity = f32::from(logo.opacity_pct) / 100.0;
    for (x, y, px) in scaled.enumerate_pixels() {
        let (tx, ty) = (lx + x, ly + y);
        let cov = pixel_coverage(tx, ty, |p| clip.contains(p));
        if cov > 0.0 {
            blend_pixel(tile.get_pixel_mut(tx, ty), *px, cov * opacity);
        }
    }

    let tile = rotate(&tile, logo.rotation_degrees);
    let (cx, cy) = logo_center(plan, logo.position, tile.width());
    let x0 = cx - i64::from(tile.width()) / 2;
    let y0 = cy - i64::from(tile.height()) / 2;

    if let Some(shadow) = &logo.shadow {
        let color = shadow.color;
        let mut layer = RgbaImage::from_fn(tile.width(), tile.height(), |x, y| {
            let a = f32::from(tile.get_pixel(x, y).0[3]) / 255.0 * f32::from(color.0[3]);
            Rgba([color.0[0], color.0[1], color.0[2], a.round() as u8])
        });
        if shadow.blur > 0.0 {
            layer = imageops::blur(&layer, shadow.blur);
        }
        overlay(
            &mut canvas,
            &layer,
            x0 + i64::from(shadow.offset_x),
            y0 + i64::from(shadow.offset_y),
            1.0,
        );
    }

    overlay(&mut canvas, &tile, x0, y0, 1.0);
    canvas
}

fn logo_clip(shape: LogoShape, r: Rect) -> Shape {
    match shape {
        LogoShape::Square => Shape::Rect(r),
        LogoShape::Rounded => Shape::RoundedRect {
            rect: r,
            radius: r.w * 0.2,
        },
        LogoShape::Circle => Shape::Ellipse {
            center: r.center(),
            rx: r.w / 2.0,
            ry: r.h / 2.0,
        },
    }
}

fn logo_center(plan: &Plan<'_>, position: LogoPosition, tile_side: u32) -> (i64, i64) {
    let size = i64::from(plan.size);
    let half = i64::from(tile_side) / 2;
    // Corner logos sit on the symbol, one module in from its edge.
    let near = i64::from(plan.origin + plan.module_px) + half;
    let far = size - near;
    match position {
        LogoPosition::Center => (size / 2, size / 2),
        LogoPosition::TopLeft => (near, near),
        LogoPosition::TopRight => (far, near),
        LogoPosition::BottomLeft => (near, far),
        LogoPosition::BottomRight => (far, far),
    }
}

/// Rotates about the center into a canvas large enough for the result.
/// Bilinear sampling; outside pixels are transparent.
fn rotate(img: &RgbaImage, degrees: f32) -> RgbaImage {
    let normalized = degrees.rem_euclid(360.0);
    if normalized.abs() < f32::EPSILON {
        return img.clone();
    }
    let (sin, cos) = normalized.to_radians().sin_cos();
    let (w, h) = (img.width() as f32, img.height() as f32);
    // Tolerance keeps right angles from growing a pixel through rounding noise.
    let extent = |v: f32| (v - 1e-3).ceil().max(1.0) as u32;
    let out_w = extent(w * cos.abs() + h * sin.abs());
    let out_h = extent(w * sin.abs() + h * cos.abs());
    let (icx, icy) = (w / 2.0, h / 2.0);
    let (ocx, ocy) = (out_w as f32 / 2.0, out_h as f32 / 2.0);

    RgbaImage::from_fn(out_w, out_h, |x, y| {
        let dx = x as f32 + 0.5 - ocx;
        let dy = y as f32 + 0.5 - ocy;
        // Inverse rotation back into source space.
        let sx = dx * cos + dy * sin + icx - 0.5;
        let sy = -dx * sin + dy * cos + icy - 0.5;
        sample_bilinear(img, sx, sy)
    })
}

fn sample_bilinear(img: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let texel = |tx: i64, ty: i64| -> [f32; 4] {
        if tx < 0 || ty < 0 || tx >= w || ty >= h {
            [0.0; 4]
        } else {
            let p = img.get_pixel(tx as u32, ty as u32).0;
            let a = f32::from(p[3]);
            // Premultiply so transparent neighbors do not darken edges.
            [
                f32::from(p[0]) * a / 255.0,
                f32::from(p[1]) * a / 255.0,
                f32::from(p[2]) * a / 255.0,
                a,
            ]
        }
    };
    let (p00, p10, p01, p11) = (texel(x0, y0), texel(x0 + 1, y0), texel(x0, y0 + 1), texel(x0 + 1, y0 + 1));
    let mut out = [0f32; 4];
    for i in 0..4 {
        let top = p00[i] + (p10[i] - p00[i]) * fx;
        let bottom = p01[i] + (p11[i] - p01[i]) * fx;
        out[i] = top + (bottom - top) * fy;
    }
    let a = out[3];
    if a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    Rgba([
        (out[0] * 255.0 / a).round().clamp(0.0, 255.0) as u8,
        (out[1] * 255.0 / a).round().clamp(0.0, 255.0) as u8,
        (out[2] * 255.0 / a).round().clamp(0.0, 255.0) as u8,
        a.round().clamp(0.0, 255.0) as u8,
    ])
}

fn stage_silhouette(plan: &Plan<'_>, mut canvas: RgbaImage) -> RgbaImage {
    let size = plan.size as f32;
    let full = Rect::new(0.0, 0.0, size, size);
    let radius_for = |pct: u8| size / 2.0 * f32::from(pct) / 100.0;
    let transform = &plan.style.transform;

    let clip = match transform.silhouette {
        Silhouette::Standard if transform.corner_radius_pct == 0 => return canvas,
        Silhouette::Standard => Shape::RoundedRect {
            rect: full,
            radius: radius_for(transform.corner_radius_pct),
        },
        Silhouette::RoundFrame => {
            let pct = match transform.corner_radius_pct {
                0 => ROUND_FRAME_DEFAULT_PCT,
                pct => pct,
            };
            Shape::RoundedRect {
                rect: full,
                radius: radius_for(pct),
            }
        }
        Silhouette::Circle => Shape::circle(Point::new(size / 2.0, size / 2.0), size / 2.0),
        Silhouette::Squircle => Shape::Path(superellipse(full, 4.0, 128)),
    };

    let region = Region::new(&clip);
    for (x, y, px) in canvas.enumerate_pixels_mut() {
        let cov = pixel_coverage(x, y, |p| region.contains(p));
        if cov < 1.0 {
            px.0[3] = (f32::from(px.0[3]) * cov).round() as u8;
            if px.0[3] == 0 {
                *px = Rgba([0, 0, 0, 0]);
            }
        }
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;
    use crate::qr::style::{
        Background, Color, DotShape, EyeColors, EyeColorSet, EyeShape, Gradient, Logo, LogoBorder,
        LogoShadow, MarginPreset, PatternOverlay, ShapeTransform,
    };
    use crate::scoring::ClearedPayload;

    fn matrix(value: &str) -> BitMatrix {
        let cleared = ClearedPayload::for_tests(Payload::text(value).unwrap());
        BitMatrix::encode(&cleared, ErrorCorrection::Medium).unwrap()
    }

    fn red_logo() -> RgbaImage {
        RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 255]))
    }

    #[test]
    fn test_default_render_dimensions() {
        let m = matrix("hello");
        let img = render(&m, &StyleSpec::default(), ErrorCorrection::Medium).unwrap();
        // 21 modules + 4-module margin on each side, 10px per module.
        assert_eq!(img.width(), (21 + 8) * 10);
        assert_eq!(img.height(), img.width());
    }

    #[test]
    fn test_margin_is_background_and_finder_is_foreground() {
        let m = matrix("hello");
        let img = render(&m, &StyleSpec::default(), ErrorCorrection::Medium).unwrap();
        let px = img.as_rgba();
        assert_eq!(*px.get_pixel(5, 5), Rgba([255, 255, 255, 255]));
        // First finder module starts at (40, 40).
        assert_eq!(*px.get_pixel(45, 45), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_eye_colors_override_foreground() {
        let m = matrix("eyes");
        let style = StyleSpec {
            eye_colors: EyeColorSet {
                top_left: EyeColors {
                    outer: Color::rgb(255, 0, 0),
                    inner: Color::rgb(0, 0, 255),
                },
                ..Default::default()
            },
            ..Default::default()
        };
        let img = render(&m, &style, ErrorCorrection::Medium).unwrap();
        let px = img.as_rgba();
        assert_eq!(*px.get_pixel(45, 45), Rgba([255, 0, 0, 255]));
        // Center of the inner 3x3: module (3, 3).
        assert_eq!(*px.get_pixel(75, 75), Rgba([0, 0, 255, 255]));
        // Top-right eye keeps the default.
        let tr = 40 + (m.width() as u32 - 7) * 10 + 5;
        assert_eq!(*px.get_pixel(tr, 45), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_invalid_style_fails_before_drawing() {
        let mut style = StyleSpec::default();
        style.module_px = 0;
        let err = render(&matrix("x"), &style, ErrorCorrection::Medium).unwrap_err();
        assert!(matches!(err, RenderError::InvalidCustomization(_)));
    }

    #[test]
    fn test_unresolved_logo_is_invalid() {
        let style = StyleSpec {
            logo: Some(Logo {
                image_ref: "missing".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = render(&matrix("x"), &style, ErrorCorrection::High).unwrap_err();
        assert!(matches!(err, RenderError::InvalidCustomization(_)));
    }

    #[test]
    fn test_oversized_output_rejected() {
        let renderer = Renderer::new(RenderConfig {
            max_dimension: 100,
            ..Default::default()
        });
        let err = renderer
            .render(&matrix("x"), &StyleSpec::default(), ErrorCorrection::Medium)
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidCustomization(_)));
    }

    #[test]
    fn test_circle_silhouette_clears_corners_and_keeps_eyes() {
        let m = matrix("round");
        let style = StyleSpec {
            transform: ShapeTransform {
                silhouette: Silhouette::Circle,
                ..Default::default()
            },
            ..Default::default()
        };
        let img = render(&m, &style, ErrorCorrection::Medium).unwrap();
        let px = img.as_rgba();
        assert_eq!(px.get_pixel(0, 0).0[3], 0);
        let c = img.width() / 2;
        assert_eq!(px.get_pixel(c, c).0[3], 255);

        // Symbol is widened so its top-left finder corner stays opaque.
        let symbol_px = m.width() as u32 * 10;
        let origin = (img.width() - symbol_px) / 2;
        assert_eq!(*px.get_pixel(origin + 2, origin + 2), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_squircle_is_between_square_and_circle() {
        let m = matrix("squircle");
        let style = |s| StyleSpec {
            transform: ShapeTransform {
                silhouette: s,
                margin: MarginPreset::None,
                ..Default::default()
            },
            ..Default::default()
        };
        let circle = render(&m, &style(Silhouette::Circle), ErrorCorrection::Medium).unwrap();
        let squircle = render(&m, &style(Silhouette::Squircle), ErrorCorrection::Medium).unwrap();
        assert!(squircle.width() < circle.width());
        assert_eq!(squircle.as_rgba().get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_round_frame_rounds_corners() {
        let style = StyleSpec {
            transform: ShapeTransform {
                silhouette: Silhouette::RoundFrame,
                ..Default::default()
            },
            ..Default::default()
        };
        let img = render(&matrix("frame"), &style, ErrorCorrection::Medium).unwrap();
        assert_eq!(img.as_rgba().get_pixel(0, 0).0[3], 0);
        assert_eq!(img.as_rgba().get_pixel(img.width() / 2, 0).0[3], 255);
    }

    #[test]
    fn test_gradient_colors_modules() {
        let m = matrix("gradient");
        let style = StyleSpec {
            gradient: Some(Gradient::linear(0.0, Color::rgb(255, 0, 0), Color::rgb(0, 0, 255))),
            ..Default::default()
        };
        let img = render(&m, &style, ErrorCorrection::Medium).unwrap();
        let px = img.as_rgba();
        // Sample dark data modules in the outer column bands.
        let n = m.width();
        let mut left = None;
        let mut right = None;
        for row in 0..n {
            for col in (0..5).chain(n - 5..n) {
                if m.is_finder(row, col) || !m.is_dark(row, col) {
                    continue;
                }
                let p = *px.get_pixel(40 + col as u32 * 10 + 5, 40 + row as u32 * 10 + 5);
                if col < 5 {
                    left.get_or_insert(p);
                } else {
                    right.get_or_insert(p);
                }
            }
        }
        let (left, right) = (left.unwrap(), right.unwrap());
        assert!(left.0[0] > left.0[2], "left side should lean red: {left:?}");
        assert!(right.0[2] > right.0[0], "right side should lean blue: {right:?}");
    }

    #[test]
    fn test_background_opacity_and_pattern() {
        let style = StyleSpec {
            background: Background {
                color: Color::rgb(0, 128, 0),
                opacity: 0.5,
                pattern_overlay: Some(PatternOverlay::default()),
                ..Default::default()
            },
            ..Default::default()
        };
        let img = render(&matrix("bg"), &style, ErrorCorrection::Medium).unwrap();
        let p = img.as_rgba().get_pixel(1, 1);
        assert_eq!(p.0[1], 128);
        assert!((127..=128).contains(&p.0[3]));
    }

    #[test]
    fn test_image_background_is_used() {
        let mut assets = AssetMap::new();
        assets.insert("photo", RgbaImage::from_pixel(30, 60, Rgba([10, 200, 30, 255])));
        let style = StyleSpec {
            background: Background {
                mode: BackgroundMode::Image,
                image_ref: Some("photo".into()),
                blur: Some(1.5),
                ..Default::default()
            },
            ..Default::default()
        };
        let img = Renderer::default()
            .render_with_assets(&matrix("bg"), &style, ErrorCorrection::Medium, &assets)
            .unwrap();
        // Inside the margin, well clear of the blur's edge falloff.
        let p = img.as_rgba().get_pixel(20, 20);
        assert!(p.0[1] > 150 && p.0[0] < 60, "{p:?}");
    }

    #[test]
    fn test_logo_painted_at_center() {
        let mut assets = AssetMap::new();
        assets.insert("logo", red_logo());
        let style = StyleSpec {
            logo: Some(Logo {
                image_ref: "logo".into(),
                size_pct: 20,
                ..Default::default()
            }),
            ..Default::default()
        };
        let img = Renderer::default()
            .render_with_assets(&matrix("logo"), &style, ErrorCorrection::High, &assets)
            .unwrap();
        let c = img.width() / 2;
        assert_eq!(*img.as_rgba().get_pixel(c, c), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_logo_border_shadow_and_rotation() {
        let mut assets = AssetMap::new();
        assets.insert("logo", red_logo());
        let style = StyleSpec {
            logo: Some(Logo {
                image_ref: "logo".into(),
                size_pct: 20,
                rotation_degrees: 45.0,
                shape: LogoShape::Circle,
                border: Some(LogoBorder {
                    color: Color::rgb(0, 255, 0),
                    width_px: 4,
                }),
                shadow: Some(LogoShadow::default()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let img = Renderer::default()
            .render_with_assets(&matrix("logo"), &style, ErrorCorrection::High, &assets)
            .unwrap();
        let c = img.width() / 2;
        let px = img.as_rgba();
        assert_eq!(*px.get_pixel(c, c), Rgba([255, 0, 0, 255]));
        // Box is 58px + 2*4 border; the border ring sits just inside radius 33.
        let ring = px.get_pixel(c + 31, c);
        assert!(ring.0[1] > 200 && ring.0[0] < 60, "{ring:?}");
    }

    #[test]
    fn test_logo_opacity_blends() {
        let mut assets = AssetMap::new();
        assets.insert("logo", red_logo());
        let style = StyleSpec {
            logo: Some(Logo {
                image_ref: "logo".into(),
                opacity_pct: 50,
                ..Default::default()
            }),
            // White modules so the logo blends over a known color.
            foreground: Color::WHITE,
            ..Default::default()
        };
        let img = Renderer::default()
            .render_with_assets(&matrix("logo"), &style, ErrorCorrection::High, &assets)
            .unwrap();
        let c = img.width() / 2;
        let p = img.as_rgba().get_pixel(c, c);
        assert_eq!(p.0[0], 255);
        assert!(p.0[1] > 0 && p.0[1] < 255);
    }

    #[test]
    fn test_every_shape_renders() {
        let m = matrix("catalog");
        for dot in DotShape::ALL {
            for eye in EyeShape::ALL {
                let style = StyleSpec {
                    dot_shape: dot,
                    eye_shape: eye,
                    module_px: 4,
                    ..Default::default()
                };
                assert!(render(&m, &style, ErrorCorrection::Medium).is_ok());
            }
        }
    }

    #[test]
    fn test_rotate_quarter_turn_swaps_axes() {
        let img = RgbaImage::from_pixel(10, 4, Rgba([9, 9, 9, 255]));
        let rotated = rotate(&img, 90.0);
        assert_eq!((rotated.width(), rotated.height()), (4, 10));
    }

    #[tokio::test]
    async fn test_render_in_background() {
        let img = render_in_background(
            Renderer::default(),
            matrix("async"),
            StyleSpec::default(),
            ErrorCorrection::Medium,
            AssetMap::new(),
        )
        .await
        .unwrap();
        assert_eq!(img.width(), 290);
    }
}
