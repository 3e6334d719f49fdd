//! QR code decoding using rqrr.
//!
//! Two passes over the cropped region: the first reads the image as-is
//! (dark modules on a light background); the second stretches contrast and
//! tries both polarities, which picks up light-on-dark and washed-out codes.

use image::{imageops, DynamicImage, GrayImage, RgbaImage};
use rqrr::PreparedImage;
use std::panic::{self, AssertUnwindSafe};

/// Outcome of decoding one cropped region.
pub type DecodeResult = Result<String, DecodeFailure>;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeFailure {
    #[error("No QR code found in the selected region")]
    NotFound,

    #[error("QR decoding failed: {detail}")]
    DecodeError { detail: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Inversion {
    DontInvert,
    AttemptBoth,
}

/// Decodes a raw RGBA buffer of `width * height * 4` bytes.
pub fn decode_rgba(data: &[u8], width: u32, height: u32) -> DecodeResult {
    let expected = width as usize * height as usize * 4;
    if width == 0 || height == 0 || data.len() != expected {
        return Err(DecodeFailure::DecodeError {
            detail: format!(
                "buffer of {} bytes does not match {}x{} RGBA",
                data.len(),
                width,
                height
            ),
        });
    }
    let image = RgbaImage::from_raw(width, height, data.to_vec()).ok_or_else(|| {
        DecodeFailure::DecodeError {
            detail: "buffer too small for dimensions".to_string(),
        }
    })?;
    decode_image(&image)
}

/// Decodes the first QR code found in `image`.
///
/// Returns the payload exactly as encoded, with no trimming.
pub fn decode_image(image: &RgbaImage) -> DecodeResult {
    if image.width() == 0 || image.height() == 0 {
        return Err(DecodeFailure::DecodeError {
            detail: "empty image".to_string(),
        });
    }

    let start = std::time::Instant::now();
    let luma = DynamicImage::ImageRgba8(image.clone()).to_luma8();

    for inversion in [Inversion::DontInvert, Inversion::AttemptBoth] {
        if let Some(text) = run_pass(&luma, inversion)? {
            // A symbol with no data is nothing to keep.
            if text.is_empty() {
                log::info!("[QR] Code found but its payload is empty");
                return Err(DecodeFailure::NotFound);
            }
            log::info!(
                "[QR] Decoded {} chars ({:?}) in {}ms",
                text.chars().count(),
                inversion,
                start.elapsed().as_millis()
            );
            return Ok(text);
        }
    }

    log::info!(
        "[QR] No code in {}x{} region after {}ms",
        image.width(),
        image.height(),
        start.elapsed().as_millis()
    );
    Err(DecodeFailure::NotFound)
}

fn run_pass(luma: &GrayImage, inversion: Inversion) -> Result<Option<String>, DecodeFailure> {
    match inversion {
        Inversion::DontInvert => scan(luma.clone()),
        Inversion::AttemptBoth => {
            let Some(stretched) = stretch_contrast(luma) else {
                return Ok(None);
            };
            if let Some(text) = scan(stretched.clone())? {
                return Ok(Some(text));
            }
            let mut inverted = stretched;
            imageops::invert(&mut inverted);
            scan(inverted)
        }
    }
}

/// Runs grid detection and returns the first grid that decodes.
fn scan(gray: GrayImage) -> Result<Option<String>, DecodeFailure> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || {
        let mut prepared = PreparedImage::prepare(gray);
        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((_, content)) => return Some(content),
                Err(e) => log::debug!("[QR] Grid found but failed to decode: {:?}", e),
            }
        }
        None
    }));

    outcome.map_err(|_| DecodeFailure::DecodeError {
        detail: "decoder aborted on malformed input".to_string(),
    })
}

/// Linearly stretches luma to the full 0..=255 range.
/// `None` for a flat image, which cannot hold a code.
fn stretch_contrast(luma: &GrayImage) -> Option<GrayImage> {
    let (min, max) = luma
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if max <= min {
        return None;
    }
    let range = (max - min) as u32;
    let mut stretched = luma.clone();
    for pixel in stretched.pixels_mut() {
        pixel.0[0] = ((pixel.0[0] - min) as u32 * 255 / range) as u8;
    }
    Some(stretched)
}
