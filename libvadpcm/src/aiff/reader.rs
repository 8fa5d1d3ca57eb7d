use tracing::debug;

use super::{
    Aiff, AiffKind, Codec, APPL_STOC, CHUNK_APPL, CHUNK_COMM, CHUNK_FVER, CHUNK_SSND,
    CODEBOOK_NAME, CODEBOOK_VERSION, FORM, KIND_AIFC, KIND_AIFF,
};
use crate::core::{
    Codebook, Extended, VadpcmError, VadpcmResult, MAX_ORDER, MAX_PREDICTOR_COUNT, VECTOR_SIZE,
};

fn err<T>(msg: impl Into<String>) -> VadpcmResult<T> {
    Err(VadpcmError::Container(msg.into()))
}

fn fourcc(id: [u8; 4]) -> String {
    id.iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })
        .collect()
}

/// Fields of a `COMM` chunk
struct Comm {
    num_channels: u16,
    num_sample_frames: u32,
    sample_size: u16,
    sample_rate: Extended,
    codec: Codec,
}

/// Parse an AIFF or AIFF-C file.
pub fn parse(data: &[u8]) -> VadpcmResult<Aiff> {
    let mut cursor = Cursor::new(data);
    if data.len() < 12 {
        return err(format!("file is too small, size={}", data.len()));
    }
    let id = cursor.read_fourcc()?;
    if id != FORM {
        return err(format!("bad container chunk '{}', expected 'FORM'", fourcc(id)));
    }
    let content_size = cursor.read_u32()? as usize;
    let kind = match cursor.read_fourcc()? {
        KIND_AIFF => AiffKind::Aiff,
        KIND_AIFC => AiffKind::Aifc,
        other => {
            return err(format!(
                "form type '{}' is not 'AIFF' or 'AIFC'",
                fourcc(other)
            ))
        }
    };
    debug!(?kind, content_size, "FORM");
    if content_size > data.len() - 8 {
        return err(format!(
            "file is truncated, body size={}, file size={}",
            content_size,
            data.len()
        ));
    }

    let end = content_size + 8;
    let mut comm: Option<Comm> = None;
    let mut audio: Option<Vec<u8>> = None;
    let mut codebook: Option<Codebook> = None;
    let mut version_timestamp = 0;

    while cursor.pos < end {
        if end - cursor.pos < 8 {
            return err(format!("incomplete chunk header at offset {}", cursor.pos));
        }
        let id = cursor.read_fourcc()?;
        let size = cursor.read_u32()? as usize;
        let padded = size + (size & 1);
        if padded > end - cursor.pos {
            return err(format!(
                "chunk '{}' at offset {} has invalid size {}",
                fourcc(id),
                cursor.pos,
                size
            ));
        }
        let body = cursor.read_slice(size)?;
        cursor.skip(padded - size);

        match id {
            CHUNK_COMM => {
                if comm.is_some() {
                    return err("multiple COMM chunks");
                }
                comm = Some(parse_comm(kind, body)?);
            }
            CHUNK_SSND => {
                if audio.is_some() {
                    return err("multiple SSND chunks");
                }
                audio = Some(parse_ssnd(body)?);
            }
            CHUNK_FVER => {
                if body.len() < 4 {
                    return err(format!("FVER chunk is too small, size={}", body.len()));
                }
                version_timestamp = Cursor::new(body).read_u32()?;
            }
            CHUNK_APPL => {
                if let Some(book) = parse_appl(body)? {
                    if codebook.is_some() {
                        return err("multiple codebooks");
                    }
                    codebook = Some(book);
                }
            }
            _ => debug!(chunk = %fourcc(id), size, "skipping unknown chunk"),
        }
    }

    let comm = comm.ok_or_else(|| VadpcmError::Container("no COMM chunk".to_string()))?;
    let audio = audio.ok_or_else(|| VadpcmError::Container("no SSND chunk".to_string()))?;
    if comm.codec == Codec::Vadpcm && codebook.is_none() {
        return err("VADPCM audio with no codebook");
    }
    debug!(
        channels = comm.num_channels,
        frames = comm.num_sample_frames,
        bits = comm.sample_size,
        audio_bytes = audio.len(),
        "parsed AIFF"
    );

    Ok(Aiff {
        kind,
        version_timestamp,
        num_channels: comm.num_channels,
        num_sample_frames: comm.num_sample_frames,
        sample_size: comm.sample_size,
        sample_rate: comm.sample_rate,
        codec: comm.codec,
        audio,
        codebook,
    })
}

fn parse_comm(kind: AiffKind, body: &[u8]) -> VadpcmResult<Comm> {
    match kind {
        AiffKind::Aiff if body.len() != 18 => {
            return err(format!("COMM chunk has size {}, expected 18", body.len()))
        }
        AiffKind::Aifc if body.len() < 23 => {
            return err(format!("COMM chunk is too small, size={}, minimum=23", body.len()))
        }
        _ => {}
    }

    let mut cursor = Cursor::new(body);
    let num_channels = cursor.read_u16()?;
    let num_sample_frames = cursor.read_u32()?;
    let sample_size = cursor.read_u16()?;
    let sample_rate = Extended::from_be_bytes(cursor.read_array()?);
    let codec = match kind {
        AiffKind::Aiff => Codec::Pcm,
        AiffKind::Aifc => {
            let id = cursor.read_fourcc()?;
            Codec::from_fourcc(id)
                .ok_or_else(|| VadpcmError::Container(format!("unknown codec '{}'", fourcc(id))))?
        }
    };

    Ok(Comm {
        num_channels,
        num_sample_frames,
        sample_size,
        sample_rate,
        codec,
    })
}

fn parse_ssnd(body: &[u8]) -> VadpcmResult<Vec<u8>> {
    if body.len() < 8 {
        return err(format!("SSND chunk is too small, size={}, minimum=8", body.len()));
    }
    let mut cursor = Cursor::new(body);
    let offset = cursor.read_u32()? as usize;
    let _block_size = cursor.read_u32()?;
    if offset > body.len() - 8 {
        return err(format!("invalid SSND offset {}", offset));
    }
    Ok(body[8 + offset..].to_vec())
}

/// Returns the codebook if this is the VADPCM codebook chunk
fn parse_appl(body: &[u8]) -> VadpcmResult<Option<Codebook>> {
    if body.len() < 4 {
        return err(format!("APPL chunk is too small, size={}, minimum=4", body.len()));
    }
    if body[..4] != APPL_STOC {
        return Ok(None);
    }
    let rest = &body[4..];
    let Some(&name_length) = rest.first() else {
        return err("APPL stoc chunk is too small");
    };
    // length byte plus name, padded to even
    let name_size = (name_length as usize + 2) & !1;
    if rest.len() < name_size {
        return err("APPL stoc chunk is truncated");
    }
    if rest[..name_size] != CODEBOOK_NAME[..] {
        debug!(name_length, "skipping stoc chunk");
        return Ok(None);
    }
    parse_codebook(&rest[name_size..]).map(Some)
}

fn parse_codebook(body: &[u8]) -> VadpcmResult<Codebook> {
    let mut cursor = Cursor::new(body);
    let version = cursor
        .read_u16()
        .map_err(|_| VadpcmError::Container("codebook is truncated".to_string()))?;
    if version != CODEBOOK_VERSION {
        return err(format!("codebook has unknown version {}", version));
    }
    let (order, predictor_count) = match (cursor.read_u16(), cursor.read_u16()) {
        (Ok(order), Ok(count)) => (order as usize, count as usize),
        _ => return err("codebook is truncated"),
    };
    if order > MAX_ORDER {
        return Err(VadpcmError::InvalidOrder(order));
    }
    if predictor_count > MAX_PREDICTOR_COUNT {
        return Err(VadpcmError::InvalidPredictorCount(predictor_count));
    }
    let value_count = order * predictor_count * VECTOR_SIZE;
    if cursor.remaining() < value_count * 2 {
        return err(format!(
            "codebook is truncated, order={}, predictors={}",
            order, predictor_count
        ));
    }
    let table = cursor
        .read_slice(value_count * 2)?
        .chunks_exact(2)
        .map(|b| i16::from_be_bytes([b[0], b[1]]))
        .collect::<Vec<_>>();
    Codebook::from_table(order, predictor_count, &table)
}

/// big-endian reader over a byte slice
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_slice(&mut self, count: usize) -> VadpcmResult<&'a [u8]> {
        if count > self.remaining() {
            return err("unexpected end of file");
        }
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    fn skip(&mut self, count: usize) {
        self.pos = (self.pos + count).min(self.data.len());
    }

    fn read_array<const N: usize>(&mut self) -> VadpcmResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    fn read_fourcc(&mut self) -> VadpcmResult<[u8; 4]> {
        self.read_array()
    }

    fn read_u16(&mut self) -> VadpcmResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    fn read_u32(&mut self) -> VadpcmResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }
}
