//! Accent gradients for dashboard cards, derived from institution logos.
//!
//! A logo is decoded, downsampled to at most 256px on its long side, and walked
//! at a fixed stride. Opaque, dark pixels are counted by exact color; the most
//! frequent becomes the primary stop and the most frequent color clearly
//! different from it becomes the secondary stop. Results are memoized per URL
//! (and, by default, per option set).

pub mod data;
pub mod decode;
pub mod engine;
pub mod error;
pub mod render;

pub use decode::{Bitmap, BitmapDecoder, DecodeError, DecodeRequest, FetchOptions, RemoteDecoder};
pub use engine::{extract_from_bitmap, GradientEngine};
pub use error::GradientError;
pub use render::gradient::{GradientOptions, GradientOverrides, GradientResult, Rgb};
pub use render::result_cache::{CacheConfig, CacheKeyPolicy};
pub use render::selector::{FALLBACK_PRIMARY, FALLBACK_SECONDARY};
