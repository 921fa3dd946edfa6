//! Visual styling of a rendered symbol.
//!
//! A [`StyleSpec`] is plain data and usually arrives as JSON from a UI.
//! [`StyleSpec::from_json`] and [`StyleSpec::validate`] turn every problem
//! into [`RenderError::InvalidCustomization`] so nothing is drawn from a bad
//! style. Styling never influences the content hash.

use image::Rgba;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::RenderError;

/// Largest gaussian sigma accepted for background blur and logo shadows.
const MAX_BLUR: f32 = 50.0;

/// Largest module size in pixels.
const MAX_MODULE_PX: u32 = 64;

fn invalid(msg: impl Into<String>) -> RenderError {
    RenderError::InvalidCustomization(msg.into())
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// RGBA color, `#rrggbb` or `#rrggbbaa` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const BLACK: Color = Color([0, 0, 0, 255]);
    pub const WHITE: Color = Color([255, 255, 255, 255]);
    pub const TRANSPARENT: Color = Color([0, 0, 0, 0]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color([r, g, b, 255])
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba(self.0)
    }

    /// Linear interpolation, `t` in `[0, 1]`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mut out = [0u8; 4];
        for (i, c) in out.iter_mut().enumerate() {
            let a = f32::from(self.0[i]);
            let b = f32::from(other.0[i]);
            *c = (a + (b - a) * t).round() as u8;
        }
        Color(out)
    }
}

impl FromStr for Color {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix('#').unwrap_or(s.trim());
        let bytes = hex::decode(digits).map_err(|e| invalid(format!("color {:?}: {}", s, e)))?;
        match bytes.as_slice() {
            [r, g, b] => Ok(Color([*r, *g, *b, 255])),
            [r, g, b, a] => Ok(Color([*r, *g, *b, *a])),
            _ => Err(invalid(format!("color {:?}: expected #rrggbb or #rrggbbaa", s))),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0[3] == 255 {
            write!(f, "#{}", hex::encode(&self.0[..3]))
        } else {
            write!(f, "#{}", hex::encode(self.0))
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Shape catalogs
// ---------------------------------------------------------------------------

/// Shape of an ordinary data module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DotShape {
    #[default]
    Square,
    Rounded,
    Circle,
    Diamond,
    Pixel,
    Mosaic,
    Microdot,
    Star,
    Hexagon,
    Bevel,
    Liquid,
    Heart,
}

impl DotShape {
    /// Every dot shape, in discriminant order.
    pub const ALL: [DotShape; 12] = [
        DotShape::Square,
        DotShape::Rounded,
        DotShape::Circle,
        DotShape::Diamond,
        DotShape::Pixel,
        DotShape::Mosaic,
        DotShape::Microdot,
        DotShape::Star,
        DotShape::Hexagon,
        DotShape::Bevel,
        DotShape::Liquid,
        DotShape::Heart,
    ];
}

/// Shape of the three finder patterns.
///
/// Only these eye styles are drawn, fewer than [`DotShape`].
///
/// [`read_symbol`](crate::qr::read_symbol) locates finders by their square
/// 1:1:3:1:1 runs and corners, so only `Square` eyes are guaranteed to read
/// back. `Circular` and `Diamond` eyes are decorative and are usually not
/// detected by it; `Rounded` keeps its radii to one module or less.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EyeShape {
    #[default]
    Square,
    Circular,
    Rounded,
    Diamond,
}

impl EyeShape {
    pub const ALL: [EyeShape; 4] = [
        EyeShape::Square,
        EyeShape::Circular,
        EyeShape::Rounded,
        EyeShape::Diamond,
    ];
}

macro_rules! parse_kebab {
    ($ty:ty, $what:literal) => {
        impl FromStr for $ty {
            type Err = RenderError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                serde_json::from_value(serde_json::Value::String(s.to_string()))
                    .map_err(|_| invalid(format!("unknown {} {:?}", $what, s)))
            }
        }
    };
}

parse_kebab!(DotShape, "dot shape");
parse_kebab!(EyeShape, "eye shape");

// ---------------------------------------------------------------------------
// Eyes
// ---------------------------------------------------------------------------

/// Outer ring and inner square colors of one finder pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeColors {
    pub outer: Color,
    pub inner: Color,
}

impl Default for EyeColors {
    fn default() -> Self {
        Self {
            outer: Color::BLACK,
            inner: Color::BLACK,
        }
    }
}

/// Colors for the top-left, top-right and bottom-left eyes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EyeColorSet {
    pub top_left: EyeColors,
    pub top_right: EyeColors,
    pub bottom_left: EyeColors,
}

impl EyeColorSet {
    /// Same colors on all three eyes.
    pub fn uniform(colors: EyeColors) -> Self {
        Self {
            top_left: colors,
            top_right: colors,
            bottom_left: colors,
        }
    }

    /// In the order of [`super::BitMatrix::finder_origins`].
    pub fn in_finder_order(&self) -> [EyeColors; 3] {
        [self.top_left, self.top_right, self.bottom_left]
    }
}

// ---------------------------------------------------------------------------
// Gradient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientKind {
    #[default]
    Linear,
    Radial,
    Diagonal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub position: f32,
    pub color: Color,
}

/// Color ramp evaluated at normalized positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gradient {
    #[serde(rename = "type", default)]
    pub kind: GradientKind,
    /// Direction for linear gradients; 0 runs left to right, 90 top to bottom.
    #[serde(default)]
    pub angle_degrees: f32,
    pub stops: Vec<GradientStop>,
}

impl Gradient {
    /// Two-stop linear gradient.
    pub fn linear(angle_degrees: f32, from: Color, to: Color) -> Self {
        Self {
            kind: GradientKind::Linear,
            angle_degrees,
            stops: vec![
                GradientStop {
                    position: 0.0,
                    color: from,
                },
                GradientStop {
                    position: 1.0,
                    color: to,
                },
            ],
        }
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.stops.len() < 2 {
            return Err(invalid("gradient needs at least two stops"));
        }
        if !self.angle_degrees.is_finite() {
            return Err(invalid("gradient angle must be finite"));
        }
        let mut previous = 0.0f32;
        for stop in &self.stops {
            if !(0.0..=1.0).contains(&stop.position) {
                return Err(invalid(format!(
                    "gradient stop position {} outside [0, 1]",
                    stop.position
                )));
            }
            if stop.position < previous {
                return Err(invalid("gradient stops must be in ascending order"));
            }
            previous = stop.position;
        }
        Ok(())
    }

    /// Color at normalized position `(u, v)`, both in `[0, 1]`.
    pub fn color_at(&self, u: f32, v: f32) -> Color {
        let dx = u - 0.5;
        let dy = v - 0.5;
        let t = match self.kind {
            GradientKind::Linear => {
                let (sin, cos) = self.angle_degrees.to_radians().sin_cos();
                let extent = cos.abs() + sin.abs();
                0.5 + (dx * cos + dy * sin) / extent
            }
            GradientKind::Radial => (dx * dx + dy * dy).sqrt() / std::f32::consts::FRAC_1_SQRT_2,
            GradientKind::Diagonal => (u + v) / 2.0,
        };
        self.sample(t.clamp(0.0, 1.0))
    }

    fn sample(&self, t: f32) -> Color {
        let (first, last) = match (self.stops.first(), self.stops.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Color::BLACK,
        };
        if t <= first.position {
            return first.color;
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.position {
                let span = b.position - a.position;
                if span <= f32::EPSILON {
                    return b.color;
                }
                return a.color.lerp(b.color, (t - a.position) / span);
            }
        }
        last.color
    }
}

// ---------------------------------------------------------------------------
// Background
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundMode {
    #[default]
    Solid,
    Gradient,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    #[default]
    Dots,
    Grid,
    Diagonal,
}

/// Tiled pattern drawn over the background fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatternOverlay {
    pub kind: PatternKind,
    pub color: Color,
    pub spacing_px: u32,
}

impl Default for PatternOverlay {
    fn default() -> Self {
        Self {
            kind: PatternKind::Dots,
            color: Color([0, 0, 0, 24]),
            spacing_px: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Background {
    pub mode: BackgroundMode,
    /// Fill for `solid` mode.
    pub color: Color,
    /// Fill for `gradient` mode.
    pub gradient: Option<Gradient>,
    /// Asset reference for `image` mode.
    pub image_ref: Option<String>,
    /// Gaussian blur sigma in pixels.
    pub blur: Option<f32>,
    pub pattern_overlay: Option<PatternOverlay>,
    /// Layer opacity in `[0, 1]`.
    pub opacity: f32,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            mode: BackgroundMode::Solid,
            color: Color::WHITE,
            gradient: None,
            image_ref: None,
            blur: None,
            pattern_overlay: None,
            opacity: 1.0,
        }
    }
}

impl Background {
    pub fn validate(&self) -> Result<(), RenderError> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(invalid(format!(
                "background opacity {} outside [0, 1]",
                self.opacity
            )));
        }
        if let Some(blur) = self.blur {
            if !(0.0..=MAX_BLUR).contains(&blur) {
                return Err(invalid(format!("background blur {} outside [0, {}]", blur, MAX_BLUR)));
            }
        }
        if let Some(pattern) = &self.pattern_overlay {
            if !(2..=256).contains(&pattern.spacing_px) {
                return Err(invalid(format!(
                    "pattern spacing {} outside [2, 256]",
                    pattern.spacing_px
                )));
            }
        }
        match self.mode {
            BackgroundMode::Solid => Ok(()),
            BackgroundMode::Gradient => match &self.gradient {
                Some(g) => g.validate(),
                None => Err(invalid("gradient background without a gradient")),
            },
            BackgroundMode::Image => match self.image_ref.as_deref() {
                Some(r) if !r.trim().is_empty() => Ok(()),
                _ => Err(invalid("image background without an imageRef")),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Logo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoPosition {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoShape {
    #[default]
    Square,
    Rounded,
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoBorder {
    pub color: Color,
    pub width_px: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogoShadow {
    pub color: Color,
    pub offset_x: i32,
    pub offset_y: i32,
    pub blur: f32,
}

impl Default for LogoShadow {
    fn default() -> Self {
        Self {
            color: Color([0, 0, 0, 96]),
            offset_x: 3,
            offset_y: 3,
            blur: 2.0,
        }
    }
}

/// Image painted over the center (or a corner) of the symbol.
///
/// Logos larger than roughly 35-40% of the symbol hurt decoding. The renderer
/// warns about that but does not refuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Logo {
    pub image_ref: String,
    pub opacity_pct: u8,
    pub size_pct: u8,
    pub position: LogoPosition,
    pub rotation_degrees: f32,
    pub shape: LogoShape,
    pub border: Option<LogoBorder>,
    pub shadow: Option<LogoShadow>,
}

impl Default for Logo {
    fn default() -> Self {
        Self {
            image_ref: String::new(),
            opacity_pct: 100,
            size_pct: 20,
            position: LogoPosition::Center,
            rotation_degrees: 0.0,
            shape: LogoShape::Square,
            border: None,
            shadow: None,
        }
    }
}

impl Logo {
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.image_ref.trim().is_empty() {
            return Err(invalid("logo without an imageRef"));
        }
        if self.opacity_pct > 100 {
            return Err(invalid(format!("logo opacity {}% above 100", self.opacity_pct)));
        }
        if !(1..=100).contains(&self.size_pct) {
            return Err(invalid(format!("logo size {}% outside [1, 100]", self.size_pct)));
        }
        if !self.rotation_degrees.is_finite() {
            return Err(invalid("logo rotation must be finite"));
        }
        if let Some(border) = &self.border {
            if border.width_px > 64 {
                return Err(invalid(format!("logo border {}px above 64", border.width_px)));
            }
        }
        if let Some(shadow) = &self.shadow {
            if !(0.0..=MAX_BLUR).contains(&shadow.blur) {
                return Err(invalid(format!("logo shadow blur {} outside [0, {}]", shadow.blur, MAX_BLUR)));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Shape transform
// ---------------------------------------------------------------------------

/// Quiet zone around the symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginPreset {
    None,
    Small,
    #[default]
    Medium,
    Large,
}

impl MarginPreset {
    /// Margin width in modules.
    pub fn modules(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Small => 2,
            Self::Medium => 4,
            Self::Large => 6,
        }
    }
}

/// Outer clip applied to the finished image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Silhouette {
    #[default]
    Standard,
    RoundFrame,
    Circle,
    Squircle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShapeTransform {
    pub margin: MarginPreset,
    /// Corner radius as a percentage of half the image side.
    pub corner_radius_pct: u8,
    pub silhouette: Silhouette,
}

// ---------------------------------------------------------------------------
// StyleSpec
// ---------------------------------------------------------------------------

/// Complete styling of one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleSpec {
    pub dot_shape: DotShape,
    pub eye_shape: EyeShape,
    pub foreground: Color,
    pub eye_colors: EyeColorSet,
    pub gradient: Option<Gradient>,
    pub background: Background,
    pub logo: Option<Logo>,
    pub transform: ShapeTransform,
    /// Side of one module in pixels.
    pub module_px: u32,
}

impl Default for StyleSpec {
    fn default() -> Self {
        Self {
            dot_shape: DotShape::Square,
            eye_shape: EyeShape::Square,
            foreground: Color::BLACK,
            eye_colors: EyeColorSet::default(),
            gradient: None,
            background: Background::default(),
            logo: None,
            transform: ShapeTransform::default(),
            module_px: 10,
        }
    }
}

impl StyleSpec {
    /// Parses and validates a JSON style.
    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        let style: Self = serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;
        style.validate()?;
        Ok(style)
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if !(1..=MAX_MODULE_PX).contains(&self.module_px) {
            return Err(invalid(format!(
                "module size {}px outside [1, {}]",
                self.module_px, MAX_MODULE_PX
            )));
        }
        if self.transform.corner_radius_pct > 100 {
            return Err(invalid(format!(
                "corner radius {}% above 100",
                self.transform.corner_radius_pct
            )));
        }
        if let Some(gradient) = &self.gradient {
            gradient.validate()?;
        }
        self.background.validate()?;
        if let Some(logo) = &self.logo {
            logo.validate()?;
        }
        Ok(())
    }

    /// Fill color of a data module centered at normalized `(u, v)`.
    pub fn module_color(&self, u: f32, v: f32) -> Color {
        match &self.gradient {
            Some(gradient) => gradient.color_at(u, v),
            None => self.foreground,
        }
    }
}
