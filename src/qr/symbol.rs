//! Module matrix produced by the symbol encoder.

use qrcode::{Color as QrColor, QrCode};

use super::{ErrorCorrection, QrError};
use crate::scoring::ClearedPayload;

/// Side length of a finder pattern, in modules.
pub const FINDER_SIZE: usize = 7;

/// Smallest valid symbol (version 1).
const MIN_WIDTH: usize = 21;

/// Square grid of dark/light modules, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    width: usize,
    modules: Vec<bool>,
}

impl BitMatrix {
    /// Encodes a cleared payload's value.
    pub fn encode(cleared: &ClearedPayload, ec: ErrorCorrection) -> Result<Self, QrError> {
        let code = QrCode::with_error_correction_level(
            cleared.payload().value().as_bytes(),
            ec.to_ec_level(),
        )
        .map_err(|e| QrError::SymbolEncoding(e.to_string()))?;

        let width = code.width();
        let modules = code
            .to_colors()
            .into_iter()
            .map(|c| c == QrColor::Dark)
            .collect();
        Self::new(width, modules)
    }

    /// Wraps an already-encoded grid.
    pub fn new(width: usize, modules: Vec<bool>) -> Result<Self, QrError> {
        if width < MIN_WIDTH {
            return Err(QrError::InvalidMatrix(format!(
                "width {} is below the minimum of {}",
                width, MIN_WIDTH
            )));
        }
        if modules.len() != width * width {
            return Err(QrError::InvalidMatrix(format!(
                "expected {} modules, got {}",
                width * width,
                modules.len()
            )));
        }
        Ok(Self { width, modules })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, row: usize, col: usize) -> bool {
        row < self.width && col < self.width && self.modules[row * self.width + col]
    }

    /// True if `(row, col)` lies in one of the three corner finder patterns.
    pub fn is_finder(&self, row: usize, col: usize) -> bool {
        let far = self.width - FINDER_SIZE;
        (row < FINDER_SIZE && col < FINDER_SIZE)
            || (row < FINDER_SIZE && col >= far)
            || (row >= far && col < FINDER_SIZE)
    }

    /// Top-left `(row, col)` of each finder: top-left, top-right, bottom-left.
    pub fn finder_origins(&self) -> [(usize, usize); 3] {
        let far = self.width - FINDER_SIZE;
        [(0, 0), (0, far), (far, 0)]
    }

    pub fn dark_count(&self) -> usize {
        self.modules.iter().filter(|m| **m).count()
    }
}
