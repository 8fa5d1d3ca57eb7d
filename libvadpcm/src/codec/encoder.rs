use tracing::debug;

use crate::core::{
    Codebook, Encoded, Stats, VadpcmError, VadpcmResult, Vector, DEFAULT_PREDICTOR_COUNT,
    ENCODE_ORDER, FRAME_BYTE_SIZE, FRAME_SAMPLE_COUNT, MAX_PREDICTOR_COUNT, MAX_SHIFT,
    VECTOR_SIZE,
};

use super::autocorr::autocorr;
use super::frame::{pack_frame, quantize, residual_range, shift_for_range, FrameHeader, Quantized};
use super::predictor::{assign_predictors, make_codebook};

/// Full scale squared, for normalizing stats
const FULL_SCALE_SQUARED: f64 = 32768.0 * 32768.0;

/// vadpcm encoder
///
/// Trains a codebook for the input and then encodes it with that codebook.
pub struct Encoder {
    predictor_count: usize,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Encoder {
            predictor_count: DEFAULT_PREDICTOR_COUNT,
        }
    }

    /// Number of predictors to train, 1 to [`MAX_PREDICTOR_COUNT`].
    /// Checked when encoding.
    pub fn with_predictor_count(mut self, count: usize) -> Self {
        self.predictor_count = count;
        self
    }

    pub fn predictor_count(&self) -> usize {
        self.predictor_count
    }

    /// Encode mono 16-bit samples.
    ///
    /// Only whole frames are encoded; pad the input with
    /// [`crate::pad_samples`] to keep a trailing partial frame.
    pub fn encode(&self, samples: &[i16]) -> VadpcmResult<Encoded> {
        let predictor_count = self.predictor_count;
        if predictor_count > MAX_PREDICTOR_COUNT {
            return Err(VadpcmError::InvalidPredictorCount(predictor_count));
        }

        let frame_count = samples.len() / FRAME_SAMPLE_COUNT;
        if frame_count == 0 {
            return Ok(Encoded {
                codebook: Codebook::zeroed(ENCODE_ORDER, predictor_count),
                data: Vec::new(),
                stats: Stats::default(),
            });
        }
        if predictor_count == 0 {
            return Err(VadpcmError::ZeroPredictorCount);
        }

        let samples = &samples[..frame_count * FRAME_SAMPLE_COUNT];
        let corrs = autocorr(samples);
        let assignments = assign_predictors(&corrs, predictor_count);
        let codebook = make_codebook(&corrs, predictor_count, &assignments);
        debug!(frame_count, predictor_count, "trained codebook");

        let mut data = vec![0u8; frame_count * FRAME_BYTE_SIZE];
        let mut state = [0i16; VECTOR_SIZE];
        let stats = encode_frames(&codebook, &mut state, samples, &mut data)?;

        Ok(Encoded {
            codebook,
            data,
            stats,
        })
    }
}

/// Encode with an existing codebook.
///
/// Encodes `min(samples.len() / 16, dest.len() / 9)` frames. `state` holds
/// the decoder state before the first frame and is updated to the state after
/// the last one, so a stream can be encoded in pieces.
pub fn encode_frames(
    codebook: &Codebook,
    state: &mut Vector,
    samples: &[i16],
    dest: &mut [u8],
) -> VadpcmResult<Stats> {
    codebook.validate()?;
    let frame_count = (samples.len() / FRAME_SAMPLE_COUNT).min(dest.len() / FRAME_BYTE_SIZE);
    if frame_count == 0 {
        return Ok(Stats::default());
    }
    let predictor_count = codebook.usable_predictor_count();

    let mut signal = 0.0f64;
    let mut error = 0.0f64;
    let input = samples.chunks_exact(FRAME_SAMPLE_COUNT);
    let output = dest.chunks_exact_mut(FRAME_BYTE_SIZE);
    for (frame, out) in input.zip(output).take(frame_count) {
        let (header, best) = encode_frame(codebook, predictor_count, state, frame)
            .ok_or(VadpcmError::ZeroPredictorCount)?;
        out.copy_from_slice(&pack_frame(header, &best.codes));
        state.copy_from_slice(&best.output[FRAME_SAMPLE_COUNT - VECTOR_SIZE..]);

        signal += frame.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>();
        error += best.error as f64;
    }

    let scale = 1.0 / (frame_count * FRAME_SAMPLE_COUNT) as f64 / FULL_SCALE_SQUARED;
    Ok(Stats {
        signal_mean_square: signal * scale,
        error_mean_square: error * scale,
    })
}

/// Pick the predictor and shift with the lowest error for one frame. Ties go
/// to the lower predictor, then the lower shift.
fn encode_frame(
    codebook: &Codebook,
    predictor_count: usize,
    state: &Vector,
    samples: &[i16],
) -> Option<(FrameHeader, Quantized)> {
    (0..predictor_count)
        .flat_map(|predictor| {
            let vectors = codebook.predictor(predictor);
            let (min, max) = residual_range(vectors, state, samples);
            let shift = shift_for_range(min, max);
            (shift.saturating_sub(1)..=(shift + 1).min(MAX_SHIFT)).map(move |shift| {
                let candidate = quantize(vectors, state, shift, samples);
                (FrameHeader { predictor, shift }, candidate)
            })
        })
        .min_by_key(|(_, candidate)| candidate.error)
}
