//! common types for the vadpcm codec

use serde::Serialize;

use super::error::{VadpcmError, VadpcmResult};

// constants

/// Number of PCM samples in one frame
pub const FRAME_SAMPLE_COUNT: usize = 16;

/// Number of bytes in one encoded frame (header + 16 four-bit codes)
pub const FRAME_BYTE_SIZE: usize = 9;

/// Number of coefficients in a vector
pub const VECTOR_SIZE: usize = 8;

/// Maximum predictor order. The decoder state is one vector, so a predictor
/// can never look further back than that.
pub const MAX_ORDER: usize = 8;

/// Maximum number of predictors, limited by the 4-bit predictor field in each
/// frame header.
pub const MAX_PREDICTOR_COUNT: usize = 16;

/// Predictor order produced by the encoder. Other orders can be decoded but
/// not trained.
pub const ENCODE_ORDER: usize = 2;

/// Default number of predictors when encoding
pub const DEFAULT_PREDICTOR_COUNT: usize = 4;

/// Largest scale exponent the encoder will choose
pub const MAX_SHIFT: u32 = 12;

/// Codebook coefficients are fixed point with this many fraction bits
pub const COEFFICIENT_SHIFT: u32 = 11;

/// AIFF-C compression type for VADPCM audio
pub const COMPRESSION_TYPE: [u8; 4] = *b"VAPC";

/// AIFF-C compression name for VADPCM audio
pub const COMPRESSION_NAME: &str = "VADPCM ~4-1";

// types

/// One row of codebook coefficients, or the decoder state
pub type Vector = [i16; VECTOR_SIZE];

/// A set of predictors for one stream.
///
/// Vectors are stored as `predictor_count` groups of `order` vectors each.
/// Vector `k` of a predictor is the filter's response to a unit sample at
/// history position `k`, where the last vector belongs to the most recent
/// sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Codebook {
    pub order: usize,
    pub predictor_count: usize,
    pub vectors: Vec<Vector>,
}

impl Codebook {
    /// codebook of the given shape with all coefficients zero
    pub fn zeroed(order: usize, predictor_count: usize) -> Self {
        Codebook {
            order,
            predictor_count,
            vectors: vec![[0; VECTOR_SIZE]; order * predictor_count],
        }
    }

    /// Build a codebook from the flat coefficient table used by containers.
    ///
    /// The table must hold at least `order * predictor_count * VECTOR_SIZE`
    /// values; extra values are ignored.
    pub fn from_table(order: usize, predictor_count: usize, table: &[i16]) -> VadpcmResult<Self> {
        if order > MAX_ORDER {
            return Err(VadpcmError::InvalidOrder(order));
        }
        if predictor_count > MAX_PREDICTOR_COUNT {
            return Err(VadpcmError::InvalidPredictorCount(predictor_count));
        }
        let expected = order * predictor_count;
        let actual = table.len() / VECTOR_SIZE;
        if actual < expected {
            return Err(VadpcmError::InvalidCodebook { expected, actual });
        }
        let vectors = table
            .chunks_exact(VECTOR_SIZE)
            .take(expected)
            .map(|chunk| {
                let mut v = [0i16; VECTOR_SIZE];
                v.copy_from_slice(chunk);
                v
            })
            .collect();
        Ok(Codebook {
            order,
            predictor_count,
            vectors,
        })
    }

    /// flatten into the container table layout
    pub fn to_table(&self) -> Vec<i16> {
        self.vectors.iter().flat_map(|v| v.iter().copied()).collect()
    }

    /// Number of predictors the frame format can address
    pub fn usable_predictor_count(&self) -> usize {
        self.predictor_count.min(MAX_PREDICTOR_COUNT)
    }

    /// Check the order and that there are enough vectors for every
    /// addressable predictor.
    pub fn validate(&self) -> VadpcmResult<()> {
        if self.order > MAX_ORDER {
            return Err(VadpcmError::InvalidOrder(self.order));
        }
        let expected = self.order * self.usable_predictor_count();
        if self.vectors.len() < expected {
            return Err(VadpcmError::InvalidCodebook {
                expected,
                actual: self.vectors.len(),
            });
        }
        Ok(())
    }

    /// vectors for one predictor
    ///
    /// Panics if the codebook does not hold that predictor; call
    /// [`Codebook::validate`] first.
    pub fn predictor(&self, index: usize) -> &[Vector] {
        &self.vectors[index * self.order..(index + 1) * self.order]
    }
}

/// Error statistics from encoding.
///
/// Both values are mean squares relative to full scale, so a full-scale
/// square wave has a signal mean square of 1.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Stats {
    pub signal_mean_square: f64,
    pub error_mean_square: f64,
}

impl Stats {
    /// signal level in dB relative to full scale
    pub fn signal_level_db(&self) -> f64 {
        10.0 * self.signal_mean_square.log10()
    }

    /// error level in dB relative to full scale
    pub fn error_level_db(&self) -> f64 {
        10.0 * self.error_mean_square.log10()
    }

    /// Signal to noise ratio in dB, or None when there was no error at all.
    pub fn snr_db(&self) -> Option<f64> {
        if self.error_mean_square > 0.0 {
            Some(10.0 * (self.signal_mean_square / self.error_mean_square).log10())
        } else {
            None
        }
    }
}

/// Output of the encoder
#[derive(Debug, Clone)]
pub struct Encoded {
    pub codebook: Codebook,
    pub data: Vec<u8>,
    pub stats: Stats,
}

/// Pad samples with zeros to a whole number of frames
pub fn pad_samples(samples: &mut Vec<i16>) {
    let padded = samples.len().div_ceil(FRAME_SAMPLE_COUNT) * FRAME_SAMPLE_COUNT;
    samples.resize(padded, 0);
}
