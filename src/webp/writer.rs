use byteorder::{LittleEndian, WriteBytesExt};

use super::chunks::{
    self, CHUNK_HEADER_LEN, FOURCC_ANMF, FOURCC_EXIF, FOURCC_VP8, FOURCC_VP8L, RIFF,
    RIFF_HEADER_LEN, RiffChunk, WEBP, padded,
};
use super::exif::{StickerMetadata, build_exif_block};
use crate::error::StickerError;

/// Insert a sticker metadata `EXIF` chunk right after the `WEBP` tag.
///
/// Every original chunk is kept unchanged, in order, after the new chunk.
/// The RIFF size field of the result equals `result.len() - 8`.
///
/// Strategy:
/// 1. Validate the container (same checks as [`parse_chunks`](super::parse_chunks))
/// 2. Build the EXIF block from `metadata`
/// 3. Write `RIFF`, the grown size, `WEBP`, the EXIF chunk (+ pad), then `input[12..]`
///
/// # Example
///
/// ```rust
/// use wa_sticker::webp::{embed_metadata, parse_chunks, StickerMetadata};
///
/// let webp = b"RIFF\x0c\0\0\0WEBPVP8 \0\0\0\0";
/// let out = embed_metadata(webp, &StickerMetadata::new("Test", "Bot")).unwrap();
///
/// let chunks = parse_chunks(&out).unwrap();
/// assert_eq!(&chunks[0].fourcc, b"EXIF");
/// assert_eq!(&chunks[1].fourcc, b"VP8 ");
/// ```
pub fn embed_metadata(webp: &[u8], metadata: &StickerMetadata) -> Result<Vec<u8>, StickerError> {
    let original_riff_size = chunks::validate_header(webp)?;
    // Reject bad chunk framing before we copy it into a new file
    chunks::parse_chunks(webp)?;

    let block = build_exif_block(metadata);
    let exif_size = block.len();
    let growth = CHUNK_HEADER_LEN + padded(exif_size);

    let new_riff_size = u32::try_from(original_riff_size as usize + growth).map_err(|_| {
        StickerError::MalformedContainer("File too large to hold sticker metadata".into())
    })?;

    let mut out = Vec::with_capacity(webp.len() + growth);
    out.extend_from_slice(RIFF);
    write_u32(&mut out, new_riff_size);
    out.extend_from_slice(WEBP);
    out.extend_from_slice(FOURCC_EXIF);
    write_u32(&mut out, exif_size as u32);
    out.extend_from_slice(&block);
    if exif_size % 2 == 1 {
        out.push(0);
    }
    out.extend_from_slice(&webp[RIFF_HEADER_LEN..]);

    debug_assert_eq!(out.len(), webp.len() + growth);
    log::debug!(
        "Embedded {exif_size}-byte EXIF chunk ({} -> {} bytes)",
        webp.len(),
        out.len()
    );
    Ok(out)
}

/// Best-effort [`embed_metadata`]: on failure, log and return the input
/// unchanged so the sticker can still be sent without metadata.
pub fn embed_metadata_or_original(webp: Vec<u8>, metadata: &StickerMetadata) -> Vec<u8> {
    match embed_metadata(&webp, metadata) {
        Ok(out) => out,
        Err(e) => {
            log::warn!("Could not add sticker metadata, sending without it: {e}");
            webp
        }
    }
}

/// Build a standalone still WebP from the first image-data chunk.
///
/// Looks for a top-level `VP8 `/`VP8L` chunk first, then inside the first
/// `ANMF` frame of an animated file. The result is `RIFF` + size + `WEBP` +
/// that single chunk. Lossy frames lose their separate `ALPH` plane.
pub fn extract_still_frame(webp: &[u8]) -> Result<Vec<u8>, StickerError> {
    let top_level = chunks::parse_chunks(webp)?;

    let frame = match find_image_chunk(&top_level) {
        Some(chunk) => chunk,
        None => {
            let anmf = top_level
                .iter()
                .find(|c| c.is(FOURCC_ANMF))
                .ok_or(StickerError::NoImageChunk)?;
            let inner = chunks::parse_frame_chunks(webp, anmf)?;
            find_image_chunk(&inner).ok_or(StickerError::NoImageChunk)?
        }
    };

    log::debug!(
        "Extracting {} chunk ({} bytes) at offset {}",
        frame.tag(),
        frame.size,
        frame.header_offset()
    );

    let raw = frame.raw(webp);
    let mut out = Vec::with_capacity(RIFF_HEADER_LEN + raw.len());
    out.extend_from_slice(RIFF);
    write_u32(&mut out, (4 + raw.len()) as u32);
    out.extend_from_slice(WEBP);
    out.extend_from_slice(raw);
    Ok(out)
}

fn find_image_chunk(chunks: &[RiffChunk]) -> Option<RiffChunk> {
    chunks
        .iter()
        .find(|c| c.is(FOURCC_VP8) || c.is(FOURCC_VP8L))
        .copied()
}

fn write_u32(out: &mut Vec<u8>, value: u32) {
    // Writing into a Vec cannot fail
    let _ = out.write_u32::<LittleEndian>(value);
}
