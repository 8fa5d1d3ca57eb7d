use tracing::debug;

use crate::core::{Codebook, VadpcmError, VadpcmResult, Vector, FRAME_BYTE_SIZE, FRAME_SAMPLE_COUNT, VECTOR_SIZE};

use super::frame::{reconstruct, unpack_codes, FrameHeader};

/// vadpcm decoder
///
/// Holds the decoder state between calls, so a stream can be decoded in
/// pieces.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    codebook: &'a Codebook,
    state: Vector,
}

impl<'a> Decoder<'a> {
    /// Decoder at the start of a stream. Fails if the codebook is invalid.
    pub fn new(codebook: &'a Codebook) -> VadpcmResult<Self> {
        codebook.validate()?;
        Ok(Decoder {
            codebook,
            state: [0; VECTOR_SIZE],
        })
    }

    pub fn with_state(mut self, state: Vector) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &Vector {
        &self.state
    }

    /// Decode as many whole frames as fit in `dest`. Returns the number of
    /// frames decoded.
    pub fn decode_into(&mut self, dest: &mut [i16], src: &[u8]) -> VadpcmResult<usize> {
        decode(self.codebook, &mut self.state, dest, src)
    }

    /// Decode every whole frame in `src`
    pub fn decode(&mut self, src: &[u8]) -> VadpcmResult<Vec<i16>> {
        let mut out = vec![0i16; src.len() / FRAME_BYTE_SIZE * FRAME_SAMPLE_COUNT];
        self.decode_into(&mut out, src)?;
        Ok(out)
    }
}

/// Decode frames from `src` into `dest`.
///
/// Decodes `min(dest.len() / 16, src.len() / 9)` frames and returns that
/// count; partial frames at the end of either buffer are ignored. Predictor
/// indexes are checked for every frame before anything is written, and
/// `state` is only updated if decoding succeeds.
pub fn decode(
    codebook: &Codebook,
    state: &mut Vector,
    dest: &mut [i16],
    src: &[u8],
) -> VadpcmResult<usize> {
    codebook.validate()?;
    let predictor_count = codebook.usable_predictor_count();
    let frame_count = (dest.len() / FRAME_SAMPLE_COUNT).min(src.len() / FRAME_BYTE_SIZE);
    let frames = &src[..frame_count * FRAME_BYTE_SIZE];

    for (index, frame) in frames.chunks_exact(FRAME_BYTE_SIZE).enumerate() {
        let header = FrameHeader::from_byte(frame[0]);
        if header.predictor >= predictor_count {
            return Err(VadpcmError::InvalidData {
                frame: index,
                reason: format!(
                    "predictor {} out of range, codebook has {}",
                    header.predictor, predictor_count
                ),
            });
        }
    }

    let mut current = *state;
    let output = dest.chunks_exact_mut(FRAME_SAMPLE_COUNT);
    for (frame, out) in frames.chunks_exact(FRAME_BYTE_SIZE).zip(output) {
        let header = FrameHeader::from_byte(frame[0]);
        let codes = unpack_codes(&frame[1..]);
        let samples = reconstruct(codebook.predictor(header.predictor), &current, header, &codes);
        out.copy_from_slice(&samples);
        current.copy_from_slice(&samples[FRAME_SAMPLE_COUNT - VECTOR_SIZE..]);
    }
    *state = current;

    debug!(frame_count, "decoded frames");
    Ok(frame_count)
}
