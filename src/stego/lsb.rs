//! LSB (Least Significant Bit) steganography for RGBA rasters.
//!
//! Format: [payload bytes] + `<<<END>>>`, MSB-first per byte.
//! Bits go into the lowest bit of R, G and B of each pixel, row-major.
//! Alpha is never touched.

use image::RgbaImage;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{EncodedCover, StegoError, StegoMethod, StegoResult, DELIMITER};
use crate::raster::RenderedImage;

/// Usable channels per pixel (R, G, B).
const CHANNELS_PER_PIXEL: u64 = 3;

/// Hex characters of the cover fingerprint.
const COVER_REF_HEX_LEN: usize = 16;

/// Number of bits `cover` can carry, delimiter included.
pub fn capacity_bits(cover: &RenderedImage) -> u64 {
    u64::from(cover.width()) * u64::from(cover.height()) * CHANNELS_PER_PIXEL
}

/// True if `payload_len` bytes plus the delimiter fit in `cover`.
pub fn fits(cover: &RenderedImage, payload_len: usize) -> bool {
    stream_bits(payload_len) <= capacity_bits(cover)
}

fn stream_bits(payload_len: usize) -> u64 {
    (payload_len as u64 + DELIMITER.len() as u64) * 8
}

/// Hides `payload` in a copy of `cover`.
///
/// Capacity is checked before any pixel is written; on error the caller's
/// cover is unchanged and no partial image exists.
///
/// # Arguments
/// * `cover` - Image whose RGB low bits carry the data; alpha is left alone
/// * `payload` - Bytes to hide; must not contain [`DELIMITER`]
///
/// # Returns
/// The encoded copy and its [`StegoResult`], or
/// `StegoError::InsufficientCapacity` when payload plus delimiter needs more
/// bits than `width * height * 3`.
pub fn encode(cover: &RenderedImage, payload: &[u8]) -> Result<EncodedCover, StegoError> {
    check_cover(cover)?;
    if contains_delimiter(payload) {
        return Err(StegoError::PayloadContainsDelimiter);
    }

    let capacity = capacity_bits(cover);
    let needed = stream_bits(payload.len());
    if needed > capacity {
        return Err(StegoError::InsufficientCapacity {
            needed_bits: needed,
            capacity_bits: capacity,
        });
    }

    let mut pixels = cover.as_rgba().clone();
    let bits = payload
        .iter()
        .chain(DELIMITER.iter())
        .flat_map(|byte| (0..8).rev().map(move |shift| (byte >> shift) & 1));
    for (channel, bit) in channels_mut(&mut pixels).zip(bits) {
        *channel = (*channel & 0xFE) | bit;
    }

    let result = StegoResult {
        cover_image_ref: cover_fingerprint(cover),
        method: StegoMethod::Lsb,
        bits_used: needed,
        capacity_bits: capacity,
    };
    debug!(
        cover = %result.cover_image_ref,
        bits_used = result.bits_used,
        capacity_bits = result.capacity_bits,
        "stego.encoded"
    );

    Ok(EncodedCover {
        image: RenderedImage::from_rgba(pixels),
        result,
    })
}

/// Extracts the bytes preceding the first delimiter.
pub fn decode(image: &RenderedImage) -> Result<Vec<u8>, StegoError> {
    check_cover(image)?;

    let mut data = Vec::new();
    let mut current = 0u8;
    let mut filled = 0;
    for channel in image.as_rgba().pixels().flat_map(|p| p.0[..3].iter()) {
        current = (current << 1) | (channel & 1);
        filled += 1;
        if filled == 8 {
            data.push(current);
            current = 0;
            filled = 0;
            if data.ends_with(DELIMITER) {
                data.truncate(data.len() - DELIMITER.len());
                return Ok(data);
            }
        }
    }

    Err(StegoError::NoHiddenData)
}

fn check_cover(cover: &RenderedImage) -> Result<(), StegoError> {
    if cover.width() == 0 || cover.height() == 0 {
        return Err(StegoError::InvalidCoverImage(format!(
            "{}x{} image has no pixels",
            cover.width(),
            cover.height()
        )));
    }
    Ok(())
}

fn contains_delimiter(payload: &[u8]) -> bool {
    payload.windows(DELIMITER.len()).any(|w| w == DELIMITER)
}

/// R, G, B bytes in walk order.
fn channels_mut(pixels: &mut RgbaImage) -> impl Iterator<Item = &mut u8> {
    pixels.pixels_mut().flat_map(|p| p.0[..3].iter_mut())
}

/// Short SHA-256 fingerprint of the cover's pixels.
fn cover_fingerprint(cover: &RenderedImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cover.width().to_be_bytes());
    hasher.update(cover.height().to_be_bytes());
    hasher.update(cover.as_rgba().as_raw());
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(COVER_REF_HEX_LEN);
    hex
}
