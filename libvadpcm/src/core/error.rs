//! Error types for the vadpcm codec.

use thiserror::Error;

use super::types::MAX_PREDICTOR_COUNT;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VadpcmError {
    #[error("invalid predictor count: {0}, must be 1-{max}", max = MAX_PREDICTOR_COUNT)]
    InvalidPredictorCount(usize),

    #[error("predictor count is zero")]
    ZeroPredictorCount,

    #[error("codebook has invalid order: {0}")]
    InvalidOrder(usize),

    #[error("codebook has {actual} vectors, needs {expected}")]
    InvalidCodebook { expected: usize, actual: usize },

    #[error("invalid data in frame {frame}: {reason}")]
    InvalidData { frame: usize, reason: String },

    #[error("invalid AIFF file: {0}")]
    Container(String),

    #[error("unsupported audio: {0}")]
    Unsupported(String),
}

/// result type for vadpcm stuff
pub type VadpcmResult<T> = Result<T, VadpcmError>;
