use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Mono 16-bit audio decoded from a file
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

/// Decode an audio file that symphonia understands (wav, flac, mp3, ...).
/// Only mono files are accepted.
pub fn read_audio_file(path: &Path) -> Result<DecodedAudio> {
    let file = std::fs::File::open(path).context("Failed to open audio file")?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    read_from_source(mss, path.extension().and_then(|e| e.to_str()))
}

fn read_from_source(mss: MediaSourceStream, extension: Option<&str>) -> Result<DecodedAudio> {
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Unsupported audio format")?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Unknown sample rate")?;
    let channels = track
        .codec_params
        .channels
        .context("Unknown channel count")?
        .count();
    if channels != 1 {
        bail!("Audio has {} channels, only mono is supported", channels);
    }
    debug!(sample_rate, codec = ?track.codec_params.codec, "decoding input");

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create decoder")?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(e) => return Err(e).context("Error reading packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(e).context("Error decoding packet"),
        };

        append_samples(&decoded, &mut samples)?;
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

fn float_to_i16(x: f64) -> i16 {
    (x * 32768.0).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Append the first channel of a buffer as 16-bit samples
fn append_samples(buffer: &AudioBufferRef, samples: &mut Vec<i16>) -> Result<()> {
    match buffer {
        AudioBufferRef::S16(buf) => samples.extend_from_slice(buf.chan(0)),
        AudioBufferRef::U8(buf) => samples.extend(
            buf.chan(0)
                .iter()
                .map(|&s| ((s as i16) - 128) << 8),
        ),
        AudioBufferRef::S8(buf) => samples.extend(buf.chan(0).iter().map(|&s| (s as i16) << 8)),
        AudioBufferRef::S24(buf) => {
            samples.extend(buf.chan(0).iter().map(|s| (s.inner() >> 8) as i16))
        }
        AudioBufferRef::S32(buf) => samples.extend(buf.chan(0).iter().map(|&s| (s >> 16) as i16)),
        AudioBufferRef::F32(buf) => {
            samples.extend(buf.chan(0).iter().map(|&s| float_to_i16(s as f64)))
        }
        AudioBufferRef::F64(buf) => samples.extend(buf.chan(0).iter().map(|&s| float_to_i16(s))),
        _ => bail!("Unsupported sample format"),
    }
    Ok(())
}

/// 16-bit mono PCM WAV file in memory
pub fn write_wav_to_bytes(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(44 + samples.len() * 2);

    let channels: u16 = 1;
    let bytes_per_sample: u16 = 2;
    let data_size = samples.len() * bytes_per_sample as usize;
    let file_size = 36 + data_size;
    if file_size > u32::MAX as usize {
        bail!("Audio is too long for a WAV file");
    }

    // RIFF header
    buffer.write_all(b"RIFF")?;
    buffer.write_all(&(file_size as u32).to_le_bytes())?;
    buffer.write_all(b"WAVE")?;

    // fmt chunk
    buffer.write_all(b"fmt ")?;
    buffer.write_all(&16u32.to_le_bytes())?;
    buffer.write_all(&1u16.to_le_bytes())?; // PCM
    buffer.write_all(&channels.to_le_bytes())?;
    buffer.write_all(&sample_rate.to_le_bytes())?;
    let byte_rate = sample_rate
        .checked_mul((channels * bytes_per_sample) as u32)
        .context("Sample rate is too high for a WAV file")?;
    buffer.write_all(&byte_rate.to_le_bytes())?;
    buffer.write_all(&(channels * bytes_per_sample).to_le_bytes())?;
    buffer.write_all(&16u16.to_le_bytes())?;

    // data chunk
    buffer.write_all(b"data")?;
    buffer.write_all(&(data_size as u32).to_le_bytes())?;
    for &sample in samples {
        buffer.write_all(&sample.to_le_bytes())?;
    }

    Ok(buffer)
}
