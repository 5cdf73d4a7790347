use crate::decode::DecodeError;
use thiserror::Error;

/// Failures surfaced by [`crate::GradientEngine::extract_gradient`].
///
/// An image without usable dark pixels is not an error; it resolves to the
/// fallback colors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GradientError {
    /// The image itself could not be obtained or decoded. Never cached, so the
    /// next call for the same URL decodes again.
    #[error("decode failed: {0}")]
    Decode(DecodeError),

    /// The host cannot give us readable pixels at all.
    #[error("pixel surface unavailable: {0}")]
    SurfaceUnavailable(String),
}

impl From<DecodeError> for GradientError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::SurfaceUnavailable(msg) => GradientError::SurfaceUnavailable(msg),
            other => GradientError::Decode(other),
        }
    }
}
