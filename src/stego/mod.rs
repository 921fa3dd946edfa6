//! Steganography for hiding data in raster images.
//!
//! Supports:
//! - Image LSB steganography with delimiter framing ([`lsb`])
//! - Concealing a rendered symbol inside a cover image ([`conceal`] / [`reveal`])
//!
//! The codec enforces no risk policy; it moves bytes.

pub mod lsb;

pub use lsb::{capacity_bits, decode, encode, fits};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::raster::RenderedImage;

/// End-of-payload marker appended to every embedded stream.
pub const DELIMITER: &[u8] = b"<<<END>>>";

/// Errors that can occur during steganography.
#[derive(Error, Debug)]
pub enum StegoError {
    #[error("Cover too small: need {needed_bits} bits, capacity is {capacity_bits}")]
    InsufficientCapacity { needed_bits: u64, capacity_bits: u64 },

    #[error("No hidden data found in image")]
    NoHiddenData,

    #[error("Invalid cover image: {0}")]
    InvalidCoverImage(String),

    #[error("Payload contains the end delimiter and cannot be framed")]
    PayloadContainsDelimiter,

    #[error("Image error: {0}")]
    Image(String),

    #[error("Codec worker failed: {0}")]
    Worker(String),
}

impl From<image::ImageError> for StegoError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StegoMethod {
    Lsb,
}

/// Metadata of one embedding. `bits_used <= capacity_bits` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StegoResult {
    /// Hex fingerprint of the cover's pixels.
    pub cover_image_ref: String,
    pub method: StegoMethod,
    pub bits_used: u64,
    pub capacity_bits: u64,
}

/// A cover with data embedded in it.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedCover {
    pub image: RenderedImage,
    pub result: StegoResult,
}

/// Hides `symbol`, as PNG bytes, inside `cover`.
pub fn conceal(cover: &RenderedImage, symbol: &RenderedImage) -> Result<EncodedCover, StegoError> {
    let png = symbol.to_png_bytes()?;
    encode(cover, &png)
}

/// Recovers a symbol hidden with [`conceal`].
pub fn reveal(image: &RenderedImage) -> Result<RenderedImage, StegoError> {
    let png = decode(image)?;
    Ok(RenderedImage::from_png_bytes(&png)?)
}

/// Runs [`encode`] on tokio's blocking pool.
pub async fn encode_in_background(
    cover: RenderedImage,
    payload: Vec<u8>,
) -> Result<EncodedCover, StegoError> {
    tokio::task::spawn_blocking(move || encode(&cover, &payload))
        .await
        .map_err(|e| StegoError::Worker(e.to_string()))?
}

/// Runs [`conceal`] on tokio's blocking pool.
pub async fn conceal_in_background(
    cover: RenderedImage,
    symbol: RenderedImage,
) -> Result<EncodedCover, StegoError> {
    tokio::task::spawn_blocking(move || conceal(&cover, &symbol))
        .await
        .map_err(|e| StegoError::Worker(e.to_string()))?
}

/// Runs [`decode`] on tokio's blocking pool.
pub async fn decode_in_background(image: RenderedImage) -> Result<Vec<u8>, StegoError> {
    tokio::task::spawn_blocking(move || decode(&image))
        .await
        .map_err(|e| StegoError::Worker(e.to_string()))?
}
