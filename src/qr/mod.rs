//! Matrix-code rendering and reading.
//!
//! Symbol encoding is delegated to the `qrcode` crate ([`BitMatrix::encode`]); this
//! module turns the resulting [`BitMatrix`] into a styled raster:
//!
//! ```text
//! background -> modules -> logo -> silhouette clip
//! ```
//!
//! Each stage takes the previous image and returns the next one, always in
//! that order.

mod compose;
mod reader;
pub mod shapes;
pub mod style;
mod symbol;

pub use compose::{render, render_in_background, AssetMap, AssetSource, NoAssets, Renderer};
pub use reader::{read_all_symbols, read_symbol};
pub use style::{
    Background, BackgroundMode, Color, DotShape, EyeColors, EyeColorSet, EyeShape, Gradient,
    GradientKind, GradientStop, Logo, LogoBorder, LogoPosition, LogoShadow, LogoShape,
    MarginPreset, PatternKind, PatternOverlay, ShapeTransform, Silhouette, StyleSpec,
};
pub use symbol::{BitMatrix, FINDER_SIZE};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from symbol encoding and reading.
#[derive(Error, Debug)]
pub enum QrError {
    #[error("Symbol encoding failed: {0}")]
    SymbolEncoding(String),

    #[error("Invalid module matrix: {0}")]
    InvalidMatrix(String),

    #[error("QR code read error: {0}")]
    QrReadError(String),

    #[error("No QR code found in image")]
    NoQrCodeFound,
}

/// Errors from rendering. Raised before any drawing starts.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid customization: {0}")]
    InvalidCustomization(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Render worker failed: {0}")]
    Worker(String),
}

impl From<image::ImageError> for RenderError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e.to_string())
    }
}

/// Error correction level of the encoded symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorCorrection {
    /// ~7% of codewords recoverable.
    #[serde(rename = "l", alias = "low")]
    Low,
    /// ~15% (default).
    #[default]
    #[serde(rename = "m", alias = "medium")]
    Medium,
    /// ~25%.
    #[serde(rename = "q", alias = "quartile")]
    Quartile,
    /// ~30%.
    #[serde(rename = "h", alias = "high")]
    High,
}

impl ErrorCorrection {
    /// Share of the symbol area a centered logo can cover before decoding
    /// becomes unreliable at this level.
    pub fn logo_coverage_budget(&self) -> f32 {
        match self {
            Self::Low => 0.05,
            Self::Medium => 0.12,
            Self::Quartile => 0.20,
            Self::High => 0.30,
        }
    }

    pub(crate) fn to_ec_level(self) -> qrcode::EcLevel {
        match self {
            Self::Low => qrcode::EcLevel::L,
            Self::Medium => qrcode::EcLevel::M,
            Self::Quartile => qrcode::EcLevel::Q,
            Self::High => qrcode::EcLevel::H,
        }
    }
}
