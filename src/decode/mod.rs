//! The decoding capability the engine is handed. The engine never parses image
//! formats itself; it only asks a [`BitmapDecoder`] for RGBA pixels.

pub mod remote;

use async_trait::async_trait;
use thiserror::Error;

pub use remote::{FetchOptions, RemoteDecoder};

/// Decoded RGBA8 pixels at the image's native size, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self { width, height, pixels }
    }

    /// A bitmap filled with one RGBA value.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let n = (width as usize) * (height as usize);
        let mut pixels = Vec::with_capacity(n * 4);
        for _ in 0..n {
            pixels.extend_from_slice(&rgba);
        }
        Self { width, height, pixels }
    }

    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeRequest {
    /// Pixels are read back, so the source must permit cross-origin reads.
    pub allow_cross_origin: bool,
}

impl Default for DecodeRequest {
    fn default() -> Self {
        Self { allow_cross_origin: true }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unsupported or malformed image: {0}")]
    Format(String),

    #[error("cross-origin read rejected for {0}")]
    CrossOrigin(String),

    #[error("image exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("pixel surface unavailable: {0}")]
    SurfaceUnavailable(String),
}

/// Produces pixels for a URL. One attempt per call; retries are the caller's business.
#[async_trait]
pub trait BitmapDecoder: Send + Sync {
    async fn decode(&self, url: &str, request: DecodeRequest) -> Result<Bitmap, DecodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_bitmap_has_one_rgba_per_pixel() {
        let b = Bitmap::solid(3, 2, [1, 2, 3, 255]);
        assert_eq!(b.pixels.len(), 3 * 2 * 4);
        assert_eq!(&b.pixels[20..24], &[1, 2, 3, 255]);
    }

    #[test]
    fn default_request_allows_cross_origin() {
        assert!(DecodeRequest::default().allow_cross_origin);
    }
}
