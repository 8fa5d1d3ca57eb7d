//! File-level tests for the vadpcm crate

#[cfg(test)]
mod tests {
    use libvadpcm::aiff::{self, Aiff, AiffKind, Codec};
    use libvadpcm::{Extended, FRAME_BYTE_SIZE, FRAME_SAMPLE_COUNT};
    use std::path::Path;
    use std::path::PathBuf;
    use vadpcm::audio::write_wav_to_bytes;
    use vadpcm::{
        decode_aifc, encode_to_aifc, file_info, read_pcm, read_pcm_aiff, write_pcm, FileFormat,
        PcmAudio,
    };

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("vadpcm-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// 16-bit PCM WAV with interleaved channels
    fn wav_bytes(channels: u16, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let data_size = (samples.len() * 2) as u32;
        let block_align = channels * 2;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_size).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_size.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    fn sine(len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let t = i as f64 / 22050.0;
                ((t * 440.0 * 2.0 * std::f64::consts::PI).sin() * 12000.0) as i16
            })
            .collect()
    }

    // ========================================================================
    // Format detection
    // ========================================================================

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.aif")), FileFormat::Aiff);
        assert_eq!(FileFormat::from_path(Path::new("a.AIFF")), FileFormat::Aiff);
        assert_eq!(FileFormat::from_path(Path::new("a.aifc")), FileFormat::Aifc);
        assert_eq!(FileFormat::from_path(Path::new("dir/a.wav")), FileFormat::Wav);
        assert_eq!(FileFormat::from_path(Path::new("a.flac")), FileFormat::Other);
        assert_eq!(FileFormat::from_path(Path::new("noext")), FileFormat::Other);
    }

    // ========================================================================
    // Encode / decode
    // ========================================================================

    #[test]
    fn test_pcm_audio_pads_to_frames() {
        let audio = PcmAudio::new(vec![1; 20], Extended::from_u32(22050));
        assert_eq!(audio.sample_count, 20);
        assert_eq!(audio.samples.len(), 32);
        assert!(audio.samples[20..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_encode_then_decode_aifc() {
        let audio = PcmAudio::new(sine(1000), Extended::from_u32(22050));
        let (bytes, stats) = encode_to_aifc(&audio, 4).unwrap();
        assert!(stats.snr_db().map_or(true, |snr| snr > 10.0));

        let parsed = aiff::parse(&bytes).unwrap();
        assert_eq!(parsed.kind, AiffKind::Aifc);
        assert_eq!(parsed.codec, Codec::Vadpcm);
        assert_eq!(parsed.num_sample_frames, 1000);
        let frames = 1000usize.div_ceil(FRAME_SAMPLE_COUNT);
        assert_eq!(parsed.audio.len(), frames * FRAME_BYTE_SIZE);

        let decoded = decode_aifc(&bytes).unwrap();
        assert_eq!(decoded.sample_count, 1000);
        assert_eq!(decoded.samples.len(), 1000);
        assert_eq!(decoded.sample_rate.to_f64(), 22050.0);
    }

    #[test]
    fn test_silence_decodes_to_silence() {
        let audio = PcmAudio::new(vec![0; 160], Extended::from_u32(8000));
        let (bytes, _) = encode_to_aifc(&audio, 2).unwrap();
        let decoded = decode_aifc(&bytes).unwrap();
        assert!(decoded.samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_decode_rejects_pcm_file() {
        let file = Aiff::from_pcm(AiffKind::Aiff, Extended::from_u32(8000), &[1, 2, 3]);
        let bytes = aiff::write(&file).unwrap();
        assert!(decode_aifc(&bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_aifc(b"not an aiff file").is_err());
    }

    // ========================================================================
    // PCM output
    // ========================================================================

    #[test]
    fn test_write_wav_header() {
        let audio = PcmAudio::new(vec![1, -1, 2], Extended::from_u32(16000));
        let bytes = write_pcm(FileFormat::Wav, &audio).unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), 16000);
        assert_eq!(u16::from_le_bytes(bytes[34..36].try_into().unwrap()), 16);
        // padding is not written
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 6);
        assert_eq!(bytes.len(), 44 + 6);
        assert_eq!(&bytes[44..46], &1i16.to_le_bytes());
    }

    #[test]
    fn test_write_aiff_reads_back() {
        let samples = vec![100, -200, 300, i16::MIN, i16::MAX];
        let audio = PcmAudio::new(samples.clone(), Extended::from_u32(32000));
        let bytes = write_pcm(FileFormat::Aiff, &audio).unwrap();

        let back = read_pcm_aiff(&bytes).unwrap();
        assert_eq!(back.sample_count, samples.len());
        assert_eq!(&back.samples[..samples.len()], &samples[..]);
        assert_eq!(back.sample_rate.to_f64(), 32000.0);
    }

    #[test]
    fn test_write_aifc_pcm() {
        let audio = PcmAudio::new(vec![5; 10], Extended::from_u32(32000));
        let bytes = write_pcm(FileFormat::Aifc, &audio).unwrap();
        let parsed = aiff::parse(&bytes).unwrap();
        assert_eq!(parsed.kind, AiffKind::Aifc);
        assert_eq!(parsed.codec, Codec::Pcm);
    }

    #[test]
    fn test_write_unknown_format_fails() {
        let audio = PcmAudio::new(vec![0; 16], Extended::from_u32(8000));
        assert!(write_pcm(FileFormat::Other, &audio).is_err());
    }

    // ========================================================================
    // Info
    // ========================================================================

    #[test]
    fn test_file_info_vadpcm() {
        let audio = PcmAudio::new(sine(320), Extended::from_u32(22050));
        let (bytes, _) = encode_to_aifc(&audio, 3).unwrap();
        let info = file_info(&bytes).unwrap();

        assert_eq!(info.kind, AiffKind::Aifc);
        assert_eq!(info.codec, Codec::Vadpcm);
        assert_eq!(info.channels, 1);
        assert_eq!(info.sample_frames, 320);
        assert_eq!(info.file_size, bytes.len());
        assert_eq!(info.version_timestamp, aiff::AIFC_VERSION_1);
        let codebook = info.codebook.unwrap();
        assert_eq!(codebook.order, 2);
        assert_eq!(codebook.predictor_count, 3);

        let json = serde_json::to_string(&file_info(&bytes).unwrap()).unwrap();
        assert!(json.contains("\"codebook\""));
    }

    #[test]
    fn test_file_info_pcm_has_no_codebook() {
        let file = Aiff::from_pcm(AiffKind::Aiff, Extended::from_u32(44100), &[0; 441]);
        let bytes = aiff::write(&file).unwrap();
        let info = file_info(&bytes).unwrap();
        assert_eq!(info.codec, Codec::Pcm);
        assert!(info.codebook.is_none());
        assert!((info.duration_secs - 0.01).abs() < 1e-9);
    }

    // ========================================================================
    // Files on disk
    // ========================================================================

    #[test]
    fn test_read_pcm_from_disk() {
        let dir = scratch_dir("aiff-input");

        let samples = sine(200);
        let file = Aiff::from_pcm(AiffKind::Aiff, Extended::from_u32(22050), &samples);
        let aiff_path = dir.join("in.aiff");
        std::fs::write(&aiff_path, aiff::write(&file).unwrap()).unwrap();

        let audio = read_pcm(&aiff_path).unwrap();
        assert_eq!(audio.sample_count, 200);
        assert_eq!(&audio.samples[..200], &samples[..]);

        let missing = dir.join("missing.aiff");
        assert!(read_pcm(&missing).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_read_pcm_wav_through_symphonia() {
        let dir = scratch_dir("wav-input");
        let samples = sine(1000);
        let path = dir.join("in.wav");
        std::fs::write(&path, write_wav_to_bytes(&samples, 22050).unwrap()).unwrap();

        let audio = read_pcm(&path).unwrap();
        assert_eq!(audio.sample_count, 1000);
        assert_eq!(audio.samples.len(), 1008);
        assert_eq!(&audio.samples[..1000], &samples[..]);
        assert!(audio.samples[1000..].iter().all(|&s| s == 0));
        assert_eq!(audio.sample_rate.to_f64(), 22050.0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_read_pcm_rejects_stereo_wav() {
        let dir = scratch_dir("wav-stereo");
        let interleaved: Vec<i16> = sine(400);
        let path = dir.join("stereo.wav");
        std::fs::write(&path, wav_bytes(2, 22050, &interleaved)).unwrap();

        let err = read_pcm(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("2 channels"), "{:#}", err);

        std::fs::remove_dir_all(&dir).ok();
    }
}
