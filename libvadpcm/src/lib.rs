#![allow(clippy::needless_range_loop)]

//! VADPCM audio codec
//!
//! VADPCM compresses 16-bit mono audio at a fixed 9 bytes per 16 samples.
//! Each stream carries a small codebook of linear predictors; every frame
//! picks one predictor and a scale and stores sixteen 4-bit residuals.
//!
//! ```no_run
//! let samples: Vec<i16> = vec![0; 4800];
//! let encoded = libvadpcm::encode(4, &samples).unwrap();
//!
//! let mut state = [0; libvadpcm::VECTOR_SIZE];
//! let mut decoded = vec![0; samples.len()];
//! libvadpcm::decode(&encoded.codebook, &mut state, &mut decoded, &encoded.data).unwrap();
//! ```

pub mod aiff;
pub mod codec;
pub mod core;
pub mod parallel;

pub use crate::core::{
    pad_samples, Codebook, Encoded, Extended, Stats, VadpcmError, VadpcmResult, Vector,
    COEFFICIENT_SHIFT, COMPRESSION_NAME, COMPRESSION_TYPE, DEFAULT_PREDICTOR_COUNT, ENCODE_ORDER,
    FRAME_BYTE_SIZE, FRAME_SAMPLE_COUNT, MAX_ORDER, MAX_PREDICTOR_COUNT, MAX_SHIFT, VECTOR_SIZE,
};
pub use aiff::{Aiff, AiffKind, Codec};
pub use codec::{decode, encode_frames, Decoder, Encoder};

/// Train a codebook with `predictor_count` predictors and encode `samples`
/// with it.
///
/// Only whole frames are encoded. For the builder form see [`Encoder`].
pub fn encode(predictor_count: usize, samples: &[i16]) -> VadpcmResult<Encoded> {
    Encoder::new()
        .with_predictor_count(predictor_count)
        .encode(samples)
}
