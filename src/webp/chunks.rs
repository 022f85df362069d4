use byteorder::{ByteOrder, LittleEndian};

use crate::error::StickerError;

pub const RIFF: &[u8; 4] = b"RIFF";
pub const WEBP: &[u8; 4] = b"WEBP";
pub const FOURCC_EXIF: &[u8; 4] = b"EXIF";
pub const FOURCC_VP8: &[u8; 4] = b"VP8 ";
pub const FOURCC_VP8L: &[u8; 4] = b"VP8L";
pub const FOURCC_ANMF: &[u8; 4] = b"ANMF";

/// `RIFF` + size + `WEBP`
pub const RIFF_HEADER_LEN: usize = 12;
/// fourcc + size
pub const CHUNK_HEADER_LEN: usize = 8;
/// Frame geometry/timing fields at the start of an `ANMF` payload.
const ANMF_HEADER_LEN: usize = 16;

/// A chunk header located inside a RIFF/WebP buffer.
///
/// Offsets are absolute positions in the buffer the chunk was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiffChunk {
    pub fourcc: [u8; 4],
    /// Payload length as declared by the chunk header.
    pub size: u32,
    pub payload_offset: usize,
    pub payload_len: usize,
}

impl RiffChunk {
    /// Payload plus the pad byte that follows odd-sized payloads.
    pub fn padded_len(&self) -> usize {
        padded(self.payload_len)
    }

    /// Offset of the first byte after this chunk (and its padding).
    pub fn end(&self) -> usize {
        self.payload_offset + self.padded_len()
    }

    /// Offset of the chunk header.
    pub fn header_offset(&self) -> usize {
        self.payload_offset - CHUNK_HEADER_LEN
    }

    pub fn is(&self, fourcc: &[u8; 4]) -> bool {
        &self.fourcc == fourcc
    }

    /// The fourcc as text, for logs and error messages.
    pub fn tag(&self) -> String {
        String::from_utf8_lossy(&self.fourcc).into_owned()
    }

    pub fn payload<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.payload_offset..self.payload_offset + self.payload_len]
    }

    /// Header, payload and padding exactly as they appear in `buf`.
    pub fn raw<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.header_offset()..self.end()]
    }
}

/// Length of a payload once padded to an even boundary.
pub fn padded(len: usize) -> usize {
    len + (len % 2)
}

/// Check the `RIFF....WEBP` preamble and that the declared RIFF size matches
/// the buffer length. Returns the declared RIFF size.
pub fn validate_header(buf: &[u8]) -> Result<u32, StickerError> {
    if buf.len() < RIFF_HEADER_LEN {
        return Err(StickerError::MalformedContainer(format!(
            "File too small ({} bytes)",
            buf.len()
        )));
    }
    if &buf[0..4] != RIFF {
        return Err(StickerError::MalformedContainer(
            "Missing RIFF signature".into(),
        ));
    }
    if &buf[8..12] != WEBP {
        return Err(StickerError::MalformedContainer(
            "Missing WEBP signature".into(),
        ));
    }

    let riff_size = LittleEndian::read_u32(&buf[4..8]);
    let expected = buf.len() - CHUNK_HEADER_LEN;
    if riff_size as usize != expected {
        return Err(StickerError::MalformedContainer(format!(
            "RIFF size field is {riff_size}, buffer holds {expected} bytes after the header"
        )));
    }

    Ok(riff_size)
}

/// Walk the chunk list of `buf[start..end]`.
///
/// Each step consumes `8 + size + size % 2` bytes; a header or payload that
/// would run past `end` is rejected.
fn walk(buf: &[u8], start: usize, end: usize) -> Result<Vec<RiffChunk>, StickerError> {
    let mut chunks = Vec::new();
    let mut offset = start;

    while offset < end {
        if end - offset < CHUNK_HEADER_LEN {
            return Err(StickerError::MalformedContainer(format!(
                "Truncated chunk header at offset {offset}"
            )));
        }

        let mut fourcc = [0u8; 4];
        fourcc.copy_from_slice(&buf[offset..offset + 4]);
        let size = LittleEndian::read_u32(&buf[offset + 4..offset + 8]);
        let payload_offset = offset + CHUNK_HEADER_LEN;
        let payload_len = size as usize;

        let chunk_end = payload_offset
            .checked_add(padded(payload_len))
            .filter(|&e| e <= end)
            .ok_or_else(|| {
                StickerError::MalformedContainer(format!(
                    "Chunk {:?} at offset {offset} claims {size} bytes, only {} available",
                    String::from_utf8_lossy(&fourcc),
                    end - payload_offset
                ))
            })?;

        let chunk = RiffChunk {
            fourcc,
            size,
            payload_offset,
            payload_len,
        };
        log::debug!(
            "chunk {} at {} ({} bytes)",
            chunk.tag(),
            chunk.header_offset(),
            size
        );
        chunks.push(chunk);
        offset = chunk_end;
    }

    Ok(chunks)
}

/// Parse the top-level chunk sequence of a WebP file.
///
/// # Example
///
/// ```rust
/// use wa_sticker::webp::parse_chunks;
///
/// // RIFF, size 12, WEBP, empty VP8 chunk
/// let webp = b"RIFF\x0c\0\0\0WEBPVP8 \0\0\0\0";
/// let chunks = parse_chunks(webp).unwrap();
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(&chunks[0].fourcc, b"VP8 ");
///
/// assert!(parse_chunks(b"NOTRIFFDATA").is_err());
/// ```
pub fn parse_chunks(buf: &[u8]) -> Result<Vec<RiffChunk>, StickerError> {
    validate_header(buf)?;
    walk(buf, RIFF_HEADER_LEN, buf.len())
}

/// Parse the sub-chunks of an `ANMF` frame (after its 16-byte frame header).
pub fn parse_frame_chunks(buf: &[u8], anmf: &RiffChunk) -> Result<Vec<RiffChunk>, StickerError> {
    if anmf.payload_len < ANMF_HEADER_LEN {
        return Err(StickerError::MalformedContainer(format!(
            "ANMF chunk at offset {} too small ({} bytes)",
            anmf.header_offset(),
            anmf.payload_len
        )));
    }
    walk(
        buf,
        anmf.payload_offset + ANMF_HEADER_LEN,
        anmf.payload_offset + anmf.payload_len,
    )
}
