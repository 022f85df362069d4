//! RIFF/WebP chunk codec for sticker metadata.
//!
//! - [`parse_chunks`]: Walk and validate the chunk list of a WebP file
//! - [`embed_metadata`]: Insert a WhatsApp sticker `EXIF` chunk
//! - [`extract_still_frame`]: Reduce a (possibly animated) WebP to one frame
//! - [`read_sticker_metadata`]: Read sticker metadata back
//!
//! Chunks start at offset 12 and are laid out back-to-back; an odd-sized
//! payload is followed by one zero byte so every header sits on an even
//! offset. All operations reject files whose RIFF size field disagrees with
//! the buffer length.

mod chunks;
mod exif;
mod reader;
mod writer;

pub use chunks::{
    FOURCC_ANMF, FOURCC_EXIF, FOURCC_VP8, FOURCC_VP8L, RiffChunk, parse_chunks, parse_frame_chunks,
};
pub use exif::{
    EXIF_PREFIX_LEN, MAX_FIELD_CHARS, StickerMetadata, build_exif_block, decode_exif_block,
};
pub use reader::read_sticker_metadata;
pub use writer::{embed_metadata, embed_metadata_or_original, extract_still_frame};
