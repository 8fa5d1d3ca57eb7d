//! vadpcm - VADPCM encoder and decoder for audio files
//!
//! Glue between files on disk and `libvadpcm`: picks the container from the
//! file extension, converts input to 16-bit mono, and wraps the codec output
//! in AIFF-C. The `vadpcm` binary is a thin clap front end over this crate.

pub mod audio;
pub mod batch;

use anyhow::{bail, Context, Result};
use libvadpcm::aiff::{self, Aiff, AiffKind, Codec};
use libvadpcm::{
    pad_samples, Codebook, Encoder, Extended, Stats, FRAME_SAMPLE_COUNT, VECTOR_SIZE,
};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// File formats, by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Aiff,
    Aifc,
    Wav,
    /// anything else, handed to symphonia on input
    Other,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("aif") | Some("aiff") => FileFormat::Aiff,
            Some("aifc") => FileFormat::Aifc,
            Some("wav") | Some("wave") => FileFormat::Wav,
            _ => FileFormat::Other,
        }
    }
}

/// 16-bit mono PCM, padded to a whole number of frames
#[derive(Debug, Clone)]
pub struct PcmAudio {
    pub samples: Vec<i16>,
    /// sample count before padding
    pub sample_count: usize,
    pub sample_rate: Extended,
}

impl PcmAudio {
    pub fn new(mut samples: Vec<i16>, sample_rate: Extended) -> Self {
        let sample_count = samples.len();
        pad_samples(&mut samples);
        PcmAudio {
            samples,
            sample_count,
            sample_rate,
        }
    }
}

/// Read an input file as 16-bit mono PCM. AIFF and AIFF-C files are parsed
/// directly, everything else goes through symphonia.
pub fn read_pcm(path: &Path) -> Result<PcmAudio> {
    match FileFormat::from_path(path) {
        FileFormat::Aiff | FileFormat::Aifc => {
            let data = std::fs::read(path).context("Failed to read input file")?;
            read_pcm_aiff(&data)
        }
        _ => {
            let decoded = audio::read_audio_file(path)?;
            Ok(PcmAudio::new(
                decoded.samples,
                Extended::from_u32(decoded.sample_rate),
            ))
        }
    }
}

/// PCM audio from AIFF or AIFF-C bytes
pub fn read_pcm_aiff(data: &[u8]) -> Result<PcmAudio> {
    let file = aiff::parse(data)?;
    let samples = file.pcm_samples()?;
    Ok(PcmAudio::new(samples, file.sample_rate))
}

/// Encode PCM audio into a VADPCM AIFF-C file
pub fn encode_to_aifc(audio: &PcmAudio, predictor_count: usize) -> Result<(Vec<u8>, Stats)> {
    let encoded = Encoder::new()
        .with_predictor_count(predictor_count)
        .encode(&audio.samples)
        .context("Encoding failed")?;
    let file = Aiff::from_encoded(audio.sample_rate, audio.sample_count, &encoded);
    let bytes = aiff::write(&file)?;
    Ok((bytes, encoded.stats))
}

/// Decode a VADPCM AIFF-C file to PCM, trimmed to the sample count in the
/// file header.
pub fn decode_aifc(data: &[u8]) -> Result<PcmAudio> {
    let file = aiff::parse(data)?;
    let (codebook, stream, frame_count) = file.vadpcm_stream()?;

    let mut samples = vec![0i16; frame_count * FRAME_SAMPLE_COUNT];
    let mut state = [0i16; VECTOR_SIZE];
    libvadpcm::decode(codebook, &mut state, &mut samples, stream).context("Decoding failed")?;

    let sample_count = file.num_sample_frames as usize;
    if sample_count > samples.len() {
        warn!(
            expected = sample_count,
            found = samples.len(),
            "encoded data is shorter than the sample count"
        );
    }
    samples.truncate(sample_count);
    debug!(frames = frame_count, samples = samples.len(), "decoded");

    Ok(PcmAudio {
        sample_count: samples.len(),
        samples,
        sample_rate: file.sample_rate,
    })
}

/// Serialize PCM audio in the given output format
pub fn write_pcm(format: FileFormat, audio: &PcmAudio) -> Result<Vec<u8>> {
    let samples = &audio.samples[..audio.sample_count.min(audio.samples.len())];
    match format {
        FileFormat::Aiff | FileFormat::Aifc => {
            let kind = if format == FileFormat::Aiff {
                AiffKind::Aiff
            } else {
                AiffKind::Aifc
            };
            let file = Aiff::from_pcm(kind, audio.sample_rate, samples);
            Ok(aiff::write(&file)?)
        }
        FileFormat::Wav => {
            let rate = audio.sample_rate.to_f64();
            if rate.is_nan() || rate < 1.0 || rate > u32::MAX as f64 {
                bail!("Sample rate {} cannot be stored in a WAV file", rate);
            }
            audio::write_wav_to_bytes(samples, rate.round() as u32)
        }
        FileFormat::Other => bail!("Unknown output format, use .aiff, .aifc or .wav"),
    }
}

/// Summary of an AIFF or AIFF-C file
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub kind: AiffKind,
    pub codec: Codec,
    pub channels: u16,
    pub sample_size: u16,
    pub sample_rate: f64,
    pub sample_frames: u32,
    pub duration_secs: f64,
    pub audio_bytes: usize,
    pub file_size: usize,
    /// AIFF-C version timestamp, 0 if there is no `FVER` chunk
    pub version_timestamp: u32,
    pub codebook: Option<Codebook>,
}

/// Get information about an AIFF or AIFF-C file
pub fn file_info(data: &[u8]) -> Result<FileInfo> {
    let file = aiff::parse(data)?;
    Ok(FileInfo {
        kind: file.kind,
        codec: file.codec,
        channels: file.num_channels,
        sample_size: file.sample_size,
        sample_rate: file.sample_rate.to_f64(),
        sample_frames: file.num_sample_frames,
        duration_secs: file.duration_secs(),
        audio_bytes: file.audio.len(),
        file_size: data.len(),
        version_timestamp: file.version_timestamp,
        codebook: file.codebook,
    })
}
