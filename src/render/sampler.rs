use crate::decode::Bitmap;
use crate::error::GradientError;
use image::{imageops, RgbaImage};

pub const MAX_WORKING_DIMENSION: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Working raster size for a source image. Never upscales.
pub fn working_size(width: u32, height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let longest = width.max(height) as u64;
    let bound = MAX_WORKING_DIMENSION as u64;
    if longest <= bound {
        return (width, height);
    }
    // floor(side * bound / longest), kept in integers so exact multiples stay exact
    let w = (width as u64 * bound / longest) as u32;
    let h = (height as u64 * bound / longest) as u32;
    (w, h)
}

/// Puts the decoded pixels on a raster at working size.
pub fn resample(bitmap: &Bitmap) -> Result<RgbaImage, GradientError> {
    let expected = (bitmap.width as usize) * (bitmap.height as usize) * 4;
    if bitmap.pixels.len() != expected {
        return Err(GradientError::SurfaceUnavailable(format!(
            "{}x{} bitmap needs {} bytes, got {}",
            bitmap.width,
            bitmap.height,
            expected,
            bitmap.pixels.len()
        )));
    }

    let (w, h) = working_size(bitmap.width, bitmap.height);
    if w == 0 || h == 0 {
        return Ok(RgbaImage::new(0, 0));
    }

    let src = RgbaImage::from_raw(bitmap.width, bitmap.height, bitmap.pixels.clone()).ok_or_else(|| {
        GradientError::SurfaceUnavailable(format!("cannot build {}x{} raster", bitmap.width, bitmap.height))
    })?;

    if (w, h) == (bitmap.width, bitmap.height) {
        return Ok(src);
    }
    Ok(imageops::resize(&src, w, h, imageops::FilterType::Triangle))
}

/// Every `sample_rate`-th pixel of a flattened RGBA buffer, starting at the first.
pub fn sample_pixels(raw: &[u8], sample_rate: u32) -> impl Iterator<Item = PixelSample> + '_ {
    raw.chunks_exact(4).step_by(sample_rate.max(1) as usize).map(|px| PixelSample {
        r: px[0],
        g: px[1],
        b: px[2],
        a: px[3],
    })
}
