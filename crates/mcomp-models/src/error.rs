//! Model parsing errors.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error(
        "Unknown preset: {0}. Supported: facebook, instagram, high_quality, balanced, aggressive"
    )]
    UnknownPreset(String),

    #[error("Unknown image format: {0}. Supported: jpg, png, webp")]
    UnknownImageFormat(String),
}
