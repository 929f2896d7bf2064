use thiserror::Error;

/// Errors raised by the decomposition core.
#[derive(Debug, Error)]
pub enum LowRankError {
    /// The input matrix is empty, ragged or holds non-finite values.
    #[error("invalid input matrix: {reason}")]
    InvalidInput { reason: String },

    /// Requested rank falls outside `1..=max`.
    #[error("invalid rank {rank}: expected a value in 1..={max}")]
    InvalidRank { rank: usize, max: usize },

    #[error("shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("SVD backend did not return the {0} factor")]
    MissingFactor(&'static str),

    /// LAPACK reported a failure while factorizing.
    #[error("SVD backend failed: {0}")]
    Backend(#[from] ndarray_linalg::error::LinalgError),
}

impl LowRankError {
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        LowRankError::InvalidInput {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ImageIoError {
    #[error("channel {channel} out of range for an RGB image (expected 0..=2)")]
    InvalidChannel { channel: usize },

    #[error("image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Value(String),
}

pub type Result<T> = std::result::Result<T, LowRankError>;
