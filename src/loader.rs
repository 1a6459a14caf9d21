use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

use crate::files::write_atomic;

// ---------------------------------------------------------------------------
// Decoded image data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub rgba_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl DecodedImage {
    pub fn mem_size(&self) -> u64 {
        self.rgba_bytes.len() as u64
    }

    /// Dimensions as doubles, the way the fit-scale math consumes them.
    pub fn size(&self) -> (f64, f64) {
        (self.width as f64, self.height as f64)
    }
}

/// Decode fetched bytes into an RGBA pixel buffer. The format is sniffed
/// from the content, not from any file name.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        rgba_bytes: rgba.into_raw(),
        width,
        height,
    })
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write image: {0}")]
    Io(#[from] std::io::Error),
}

/// Encode `decoded` as PNG and write it atomically to `path`.
pub fn save_png(decoded: &DecodedImage, path: &Path) -> Result<(), ExportError> {
    let buffer = RgbaImage::from_raw(decoded.width, decoded.height, decoded.rgba_bytes.clone())
        .ok_or_else(|| {
            image::ImageError::Parameter(image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::DimensionMismatch,
            ))
        })?;

    let mut encoded = Cursor::new(Vec::new());
    buffer.write_to(&mut encoded, ImageFormat::Png)?;
    write_atomic(path, encoded.get_ref())?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn checkerboard(width: u32, height: u32) -> DecodedImage {
    let rgba = RgbaImage::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            image::Rgba([255, 255, 255, 255])
        } else {
            image::Rgba([0, 0, 0, 255])
        }
    });
    DecodedImage {
        rgba_bytes: rgba.into_raw(),
        width,
        height,
    }
}
