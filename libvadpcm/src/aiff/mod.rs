//! AIFF and AIFF-C containers
//!
//! Only what vadpcm needs: the `COMM`, `SSND` and `FVER` chunks, and the
//! codebook stored in an `APPL` chunk with the `stoc` signature. Anything
//! else is skipped when reading and never written.

mod reader;
mod writer;

pub use reader::parse;
pub use writer::write;

use serde::Serialize;
use tracing::warn;

use crate::core::{
    Codebook, Encoded, Extended, VadpcmError, VadpcmResult, FRAME_BYTE_SIZE, FRAME_SAMPLE_COUNT,
};

pub(crate) const FORM: [u8; 4] = *b"FORM";
pub(crate) const KIND_AIFF: [u8; 4] = *b"AIFF";
pub(crate) const KIND_AIFC: [u8; 4] = *b"AIFC";
pub(crate) const CHUNK_COMM: [u8; 4] = *b"COMM";
pub(crate) const CHUNK_SSND: [u8; 4] = *b"SSND";
pub(crate) const CHUNK_FVER: [u8; 4] = *b"FVER";
pub(crate) const CHUNK_APPL: [u8; 4] = *b"APPL";
pub(crate) const APPL_STOC: [u8; 4] = *b"stoc";

/// Pascal string naming the codebook application chunk
pub(crate) const CODEBOOK_NAME: &[u8; 12] = b"\x0bVADPCMCODES";
pub(crate) const CODEBOOK_VERSION: u16 = 1;

/// Timestamp in the `FVER` chunk of AIFF-C version 1
pub const AIFC_VERSION_1: u32 = 0xa280_5140;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AiffKind {
    /// plain AIFF, always PCM
    Aiff,
    /// AIFF-C, with a compression type
    Aifc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Codec {
    Pcm,
    Vadpcm,
}

impl Codec {
    /// compression type tag
    pub fn fourcc(self) -> [u8; 4] {
        match self {
            Codec::Pcm => *b"NONE",
            Codec::Vadpcm => crate::core::COMPRESSION_TYPE,
        }
    }

    /// compression name as a Pascal string
    pub(crate) fn pascal_name(self) -> &'static [u8] {
        match self {
            Codec::Pcm => b"\x0enot compressed",
            Codec::Vadpcm => b"\x0bVADPCM ~4-1",
        }
    }

    pub(crate) fn from_fourcc(id: [u8; 4]) -> Option<Self> {
        match &id {
            b"NONE" => Some(Codec::Pcm),
            b"VAPC" => Some(Codec::Vadpcm),
            _ => None,
        }
    }
}

/// A parsed AIFF or AIFF-C file
#[derive(Debug, Clone, PartialEq)]
pub struct Aiff {
    pub kind: AiffKind,
    /// from the `FVER` chunk, 0 if there is none
    pub version_timestamp: u32,
    pub num_channels: u16,
    pub num_sample_frames: u32,
    pub sample_size: u16,
    pub sample_rate: Extended,
    pub codec: Codec,
    /// contents of `SSND` after its offset and block size header
    pub audio: Vec<u8>,
    pub codebook: Option<Codebook>,
}

impl Aiff {
    /// 16-bit mono PCM file
    pub fn from_pcm(kind: AiffKind, sample_rate: Extended, samples: &[i16]) -> Self {
        Aiff {
            kind,
            version_timestamp: if kind == AiffKind::Aifc { AIFC_VERSION_1 } else { 0 },
            num_channels: 1,
            num_sample_frames: samples.len() as u32,
            sample_size: 16,
            sample_rate,
            codec: Codec::Pcm,
            audio: samples.iter().flat_map(|s| s.to_be_bytes()).collect(),
            codebook: None,
        }
    }

    /// Mono VADPCM AIFF-C file. `sample_count` is the number of samples before
    /// padding.
    pub fn from_encoded(sample_rate: Extended, sample_count: usize, encoded: &Encoded) -> Self {
        Aiff {
            kind: AiffKind::Aifc,
            version_timestamp: AIFC_VERSION_1,
            num_channels: 1,
            num_sample_frames: sample_count as u32,
            sample_size: 16,
            sample_rate,
            codec: Codec::Vadpcm,
            audio: encoded.data.clone(),
            codebook: Some(encoded.codebook.clone()),
        }
    }

    pub fn duration_secs(&self) -> f64 {
        let rate = self.sample_rate.to_f64();
        if rate > 0.0 {
            self.num_sample_frames as f64 / rate
        } else {
            0.0
        }
    }

    fn check_mono(&self) -> VadpcmResult<()> {
        if self.num_channels != 1 {
            return Err(VadpcmError::Unsupported(format!(
                "{} channels, only mono is supported",
                self.num_channels
            )));
        }
        Ok(())
    }

    /// Samples of a 16-bit mono PCM file. Stops early if the file has fewer
    /// samples than `COMM` claims.
    pub fn pcm_samples(&self) -> VadpcmResult<Vec<i16>> {
        if self.codec != Codec::Pcm {
            return Err(VadpcmError::Unsupported("audio is compressed".to_string()));
        }
        self.check_mono()?;
        if self.sample_size != 16 {
            return Err(VadpcmError::Unsupported(format!(
                "{}-bit samples, only 16-bit is supported",
                self.sample_size
            )));
        }
        let available = self.audio.len() / 2;
        let count = (self.num_sample_frames as usize).min(available);
        if count < self.num_sample_frames as usize {
            warn!(
                expected = self.num_sample_frames,
                found = available,
                "audio data is shorter than the sample count"
            );
        }
        Ok(self.audio[..count * 2]
            .chunks_exact(2)
            .map(|b| i16::from_be_bytes([b[0], b[1]]))
            .collect())
    }

    /// Codebook, encoded bytes and frame count of a mono VADPCM file
    pub fn vadpcm_stream(&self) -> VadpcmResult<(&Codebook, &[u8], usize)> {
        if self.codec != Codec::Vadpcm {
            return Err(VadpcmError::Unsupported("audio is not VADPCM".to_string()));
        }
        self.check_mono()?;
        let codebook = self
            .codebook
            .as_ref()
            .ok_or_else(|| VadpcmError::Container("no codebook".to_string()))?;
        // the last frame may be partly padding
        let frame_count = (self.num_sample_frames as usize)
            .div_ceil(FRAME_SAMPLE_COUNT)
            .min(self.audio.len() / FRAME_BYTE_SIZE);
        Ok((codebook, &self.audio[..frame_count * FRAME_BYTE_SIZE], frame_count))
    }
}
