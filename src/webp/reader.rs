use super::chunks::{FOURCC_EXIF, parse_chunks};
use super::exif::{StickerMetadata, decode_exif_block};
use crate::error::StickerError;

/// Read sticker pack metadata from a WebP file.
///
/// Returns `Ok(None)` when the file has no `EXIF` chunk, or when its first
/// `EXIF` chunk holds something other than sticker JSON.
pub fn read_sticker_metadata(webp: &[u8]) -> Result<Option<StickerMetadata>, StickerError> {
    let chunks = parse_chunks(webp)?;

    let Some(exif) = chunks.iter().find(|c| c.is(FOURCC_EXIF)) else {
        log::debug!("No EXIF chunk found");
        return Ok(None);
    };

    Ok(decode_exif_block(exif.payload(webp)))
}
