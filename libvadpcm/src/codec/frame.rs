//! Frame layout and the fixed-point predictor shared by encoder and decoder
//!
//! A frame is one header byte followed by sixteen 4-bit codes:
//!
//! ```text
//! byte 0     shift << 4 | predictor
//! byte 1..9  code[2i] << 4 | code[2i + 1]
//! ```
//!
//! Reconstruction runs in two halves of [`VECTOR_SIZE`] samples. Each half is
//! predicted from the previous eight output samples, plus the residuals
//! already seen in the same half fed back through the predictor's last vector.

use crate::core::{
    Vector, COEFFICIENT_SHIFT, FRAME_BYTE_SIZE, FRAME_SAMPLE_COUNT, MAX_SHIFT, VECTOR_SIZE,
};

/// Residual codes for one frame, each in -8..=7
pub type Codes = [i8; FRAME_SAMPLE_COUNT];

/// Decoded samples for one frame
pub type FrameSamples = [i16; FRAME_SAMPLE_COUNT];

const CODE_BYTES: usize = FRAME_BYTE_SIZE - 1;

/// First byte of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub predictor: usize,
    pub shift: u32,
}

impl FrameHeader {
    pub fn from_byte(byte: u8) -> Self {
        FrameHeader {
            predictor: (byte & 0x0f) as usize,
            shift: (byte >> 4) as u32,
        }
    }

    /// Pack into a header byte. Both fields must fit in four bits.
    pub fn to_byte(self) -> u8 {
        debug_assert!(self.predictor < 16 && self.shift < 16);
        ((self.shift as u8) << 4) | (self.predictor as u8 & 0x0f)
    }
}

/// Sign-extend the sixteen nibbles of a frame's code bytes
pub fn unpack_codes(bytes: &[u8]) -> Codes {
    let mut codes = [0i8; FRAME_SAMPLE_COUNT];
    for (pair, &byte) in codes.chunks_exact_mut(2).zip(bytes.iter().take(CODE_BYTES)) {
        pair[0] = (byte as i8) >> 4;
        pair[1] = ((byte << 4) as i8) >> 4;
    }
    codes
}

pub fn pack_codes(codes: &Codes) -> [u8; CODE_BYTES] {
    let mut bytes = [0u8; CODE_BYTES];
    for (byte, pair) in bytes.iter_mut().zip(codes.chunks_exact(2)) {
        *byte = ((pair[0] as u8) << 4) | (pair[1] as u8 & 0x0f);
    }
    bytes
}

/// Serialize a whole frame
pub fn pack_frame(header: FrameHeader, codes: &Codes) -> [u8; FRAME_BYTE_SIZE] {
    let mut frame = [0u8; FRAME_BYTE_SIZE];
    frame[0] = header.to_byte();
    frame[1..].copy_from_slice(&pack_codes(codes));
    frame
}

/// Run the predictor over one frame.
///
/// `residual` is called once per sample, in order, with the sample index and
/// the integer prediction, saturated to the `i32` range. It returns the
/// residual to add, already scaled to sample units. The returned samples are
/// `prediction + residual` saturated to the `i16` range.
///
/// `predictor` holds `order` vectors, at most [`VECTOR_SIZE`]. `state` is the
/// previous eight output samples; only the last `order` are used.
pub fn predict_frame<F>(predictor: &[Vector], state: &Vector, mut residual: F) -> FrameSamples
where
    F: FnMut(usize, i32) -> i32,
{
    let order = predictor.len();
    let mut out = [0i16; FRAME_SAMPLE_COUNT];
    let mut history = *state;

    for half in 0..FRAME_SAMPLE_COUNT / VECTOR_SIZE {
        let mut acc = [0i64; VECTOR_SIZE];
        for (k, vector) in predictor.iter().enumerate() {
            let h = history[VECTOR_SIZE - order + k] as i64;
            for (a, &c) in acc.iter_mut().zip(vector) {
                *a += h * c as i64;
            }
        }

        let base = half * VECTOR_SIZE;
        for i in 0..VECTOR_SIZE {
            let prediction = saturate_i32(acc[i] >> COEFFICIENT_SHIFT);
            let r = residual(base + i, prediction);
            if let Some(last) = predictor.last() {
                for (a, &c) in acc[i + 1..].iter_mut().zip(last) {
                    *a += r as i64 * c as i64;
                }
            }
            out[base + i] = (prediction as i64 + r as i64).clamp(i16::MIN as i64, i16::MAX as i64)
                as i16;
        }

        history.copy_from_slice(&out[base..base + VECTOR_SIZE]);
    }

    out
}

fn saturate_i32(x: i64) -> i32 {
    x.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Decode one frame's codes
pub fn reconstruct(
    predictor: &[Vector],
    state: &Vector,
    header: FrameHeader,
    codes: &Codes,
) -> FrameSamples {
    predict_frame(predictor, state, |index, _| (codes[index] as i32) << header.shift)
}

/// Result of quantizing one frame with a fixed predictor and shift
#[derive(Debug, Clone)]
pub struct Quantized {
    pub codes: Codes,
    /// what the decoder will reconstruct from `codes`
    pub output: FrameSamples,
    /// sum of squared differences between input and output
    pub error: u64,
}

/// Quantize one frame. Residuals are rounded to nearest and clamped to the
/// code range.
pub fn quantize(predictor: &[Vector], state: &Vector, shift: u32, samples: &[i16]) -> Quantized {
    let mut codes = [0i8; FRAME_SAMPLE_COUNT];
    let round = (1i64 << shift) >> 1;
    let output = predict_frame(predictor, state, |index, prediction| {
        let residual = samples[index] as i64 - prediction as i64;
        let code = ((residual + round) >> shift).clamp(-8, 7) as i32;
        codes[index] = code as i8;
        code << shift
    });
    let error = squared_error(samples, &output);
    Quantized { codes, output, error }
}

/// Range of the residuals if they could be coded exactly
pub fn residual_range(predictor: &[Vector], state: &Vector, samples: &[i16]) -> (i32, i32) {
    let mut min = 0;
    let mut max = 0;
    predict_frame(predictor, state, |index, prediction| {
        let r = saturate_i32(samples[index] as i64 - prediction as i64);
        min = min.min(r);
        max = max.max(r);
        r
    });
    (min, max)
}

/// Smallest shift that brings a residual range into -8..=7, capped at
/// [`MAX_SHIFT`]
pub fn shift_for_range(min: i32, max: i32) -> u32 {
    let mut shift = 0;
    while shift < MAX_SHIFT && ((min >> shift) < -8 || (max >> shift) > 7) {
        shift += 1;
    }
    shift
}

pub fn squared_error(samples: &[i16], output: &[i16]) -> u64 {
    samples
        .iter()
        .zip(output)
        .map(|(&a, &b)| {
            let d = a as i64 - b as i64;
            (d * d) as u64
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_order(c: i16) -> [Vector; 2] {
        // x[n] = c/2048 * x[n-1]
        let mut vectors = [[0i16; VECTOR_SIZE]; 2];
        let mut x = 2048.0f64;
        for v in vectors[1].iter_mut() {
            x = x * c as f64 / 2048.0;
            *v = x.round() as i16;
        }
        vectors
    }

    #[test]
    fn test_header_byte() {
        let header = FrameHeader { predictor: 3, shift: 12 };
        assert_eq!(header.to_byte(), 0xc3);
        assert_eq!(FrameHeader::from_byte(0xc3), header);
        assert_eq!(FrameHeader::from_byte(0xff), FrameHeader { predictor: 15, shift: 15 });
    }

    #[test]
    fn test_code_nibbles() {
        let mut codes = [0i8; FRAME_SAMPLE_COUNT];
        codes[0] = -8;
        codes[1] = 7;
        codes[2] = -1;
        codes[3] = 1;
        let bytes = pack_codes(&codes);
        assert_eq!(bytes[0], 0x87);
        assert_eq!(bytes[1], 0xf1);
        assert_eq!(unpack_codes(&bytes), codes);
    }

    #[test]
    fn test_zero_predictor_passes_residuals() {
        let predictor = [[0i16; VECTOR_SIZE]; 2];
        let mut codes = [0i8; FRAME_SAMPLE_COUNT];
        for (i, c) in codes.iter_mut().enumerate() {
            *c = i as i8 - 8;
        }
        let header = FrameHeader { predictor: 0, shift: 4 };
        let out = reconstruct(&predictor, &[0; VECTOR_SIZE], header, &codes);
        for (i, &s) in out.iter().enumerate() {
            assert_eq!(s, ((i as i16) - 8) << 4);
        }
    }

    #[test]
    fn test_state_feeds_prediction() {
        // unity first-order predictor holds the last sample
        let predictor = first_order(2048);
        let mut state = [0i16; VECTOR_SIZE];
        state[7] = 1000;
        let header = FrameHeader { predictor: 0, shift: 0 };
        let out = reconstruct(&predictor, &state, header, &[0; FRAME_SAMPLE_COUNT]);
        assert!(out.iter().all(|&s| s == 1000), "{:?}", out);
    }

    #[test]
    fn test_residual_feedback_within_half() {
        let predictor = first_order(2048);
        let mut codes = [0i8; FRAME_SAMPLE_COUNT];
        codes[0] = 1;
        let header = FrameHeader { predictor: 0, shift: 0 };
        let out = reconstruct(&predictor, &[0; VECTOR_SIZE], header, &codes);
        // a single step persists through both halves
        assert!(out.iter().all(|&s| s == 1), "{:?}", out);
    }

    #[test]
    fn test_output_saturates() {
        let predictor = first_order(2048);
        let mut state = [0i16; VECTOR_SIZE];
        state[7] = i16::MAX;
        let codes = [7i8; FRAME_SAMPLE_COUNT];
        let header = FrameHeader { predictor: 0, shift: 12 };
        let out = reconstruct(&predictor, &state, header, &codes);
        assert!(out.iter().all(|&s| s == i16::MAX));
    }

    #[test]
    fn test_ideal_residual_reproduces_input() {
        let predictor = first_order(1800);
        let samples: Vec<i16> = (0..16).map(|i| ((i as f32 * 0.3).sin() * 5000.0) as i16).collect();
        let out = predict_frame(&predictor, &[0; VECTOR_SIZE], |index, prediction| {
            samples[index] as i32 - prediction
        });
        assert_eq!(&out[..], &samples[..]);
    }

    #[test]
    fn test_shift_for_range() {
        assert_eq!(shift_for_range(0, 0), 0);
        assert_eq!(shift_for_range(-8, 7), 0);
        assert_eq!(shift_for_range(-9, 7), 1);
        assert_eq!(shift_for_range(0, 8), 1);
        assert_eq!(shift_for_range(-100, 100), 4);
        assert_eq!(shift_for_range(i32::MIN / 2, i32::MAX / 2), MAX_SHIFT);
    }

    #[test]
    fn test_quantize_matches_reconstruct() {
        let predictor = first_order(1900);
        let state = [0, 0, 0, 0, 0, 0, 300, 400];
        let samples: Vec<i16> = (0..16).map(|i| (500 + i * 37) as i16).collect();
        let q = quantize(&predictor, &state, 3, &samples);
        let header = FrameHeader { predictor: 0, shift: 3 };
        let out = reconstruct(&predictor, &state, header, &q.codes);
        assert_eq!(out, q.output);
        assert_eq!(q.error, squared_error(&samples, &out));
    }
}
