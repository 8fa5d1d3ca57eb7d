use super::{
    Aiff, AiffKind, Codec, APPL_STOC, CHUNK_APPL, CHUNK_COMM, CHUNK_FVER, CHUNK_SSND,
    CODEBOOK_NAME, CODEBOOK_VERSION, FORM, KIND_AIFC, KIND_AIFF,
};
use crate::core::{Codebook, VadpcmError, VadpcmResult, MAX_PREDICTOR_COUNT, VECTOR_SIZE};

/// Serialize an AIFF or AIFF-C file.
///
/// Chunks are written in the order `FVER`, `COMM`, codebook `APPL`, `SSND`.
/// `FVER` and the codebook only exist in AIFF-C files, and plain AIFF files
/// must be PCM.
pub fn write(aiff: &Aiff) -> VadpcmResult<Vec<u8>> {
    let mut body = Vec::new();

    match aiff.kind {
        AiffKind::Aiff => {
            if aiff.codec != Codec::Pcm {
                return Err(VadpcmError::Container(
                    "plain AIFF files must be PCM".to_string(),
                ));
            }
            body.extend_from_slice(&KIND_AIFF);
            write_chunk(&mut body, CHUNK_COMM, &comm(aiff));
        }
        AiffKind::Aifc => {
            body.extend_from_slice(&KIND_AIFC);
            write_chunk(&mut body, CHUNK_FVER, &aiff.version_timestamp.to_be_bytes());
            write_chunk(&mut body, CHUNK_COMM, &comm(aiff));
            if aiff.codec == Codec::Vadpcm {
                let codebook = aiff.codebook.as_ref().ok_or_else(|| {
                    VadpcmError::Container("VADPCM audio with no codebook".to_string())
                })?;
                write_chunk(&mut body, CHUNK_APPL, &codebook_chunk(codebook)?);
            }
        }
    }

    if aiff.audio.len() > u32::MAX as usize - 8 {
        return Err(VadpcmError::Container("audio data is too large".to_string()));
    }
    let mut ssnd = Vec::with_capacity(8 + aiff.audio.len());
    ssnd.extend_from_slice(&0u32.to_be_bytes()); // offset
    ssnd.extend_from_slice(&0u32.to_be_bytes()); // block size
    ssnd.extend_from_slice(&aiff.audio);
    write_chunk(&mut body, CHUNK_SSND, &ssnd);

    let size = u32::try_from(body.len())
        .map_err(|_| VadpcmError::Container("file is too large".to_string()))?;
    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(&FORM);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

fn write_chunk(out: &mut Vec<u8>, id: [u8; 4], data: &[u8]) {
    out.extend_from_slice(&id);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
    if data.len() % 2 == 1 {
        out.push(0);
    }
}

fn comm(aiff: &Aiff) -> Vec<u8> {
    let mut out = Vec::with_capacity(40);
    out.extend_from_slice(&aiff.num_channels.to_be_bytes());
    out.extend_from_slice(&aiff.num_sample_frames.to_be_bytes());
    out.extend_from_slice(&aiff.sample_size.to_be_bytes());
    out.extend_from_slice(&aiff.sample_rate.to_be_bytes());
    if aiff.kind == AiffKind::Aifc {
        out.extend_from_slice(&aiff.codec.fourcc());
        out.extend_from_slice(aiff.codec.pascal_name());
    }
    out
}

fn codebook_chunk(codebook: &Codebook) -> VadpcmResult<Vec<u8>> {
    if codebook.predictor_count > MAX_PREDICTOR_COUNT {
        return Err(VadpcmError::InvalidPredictorCount(codebook.predictor_count));
    }
    codebook.validate()?;
    let count = codebook.order * codebook.predictor_count;
    let mut out = Vec::with_capacity(22 + count * VECTOR_SIZE * 2);
    out.extend_from_slice(&APPL_STOC);
    out.extend_from_slice(CODEBOOK_NAME);
    out.extend_from_slice(&CODEBOOK_VERSION.to_be_bytes());
    out.extend_from_slice(&(codebook.order as u16).to_be_bytes());
    out.extend_from_slice(&(codebook.predictor_count as u16).to_be_bytes());
    for value in codebook.to_table().iter().take(count * VECTOR_SIZE) {
        out.extend_from_slice(&value.to_be_bytes());
    }
    Ok(out)
}
