//! Byte-signature detection for incoming media.
//!
//! Only the first few bytes of a buffer are inspected; nothing is parsed.
//! Use [`classify`] to decide which sticker path a buffer should take.

/// The container type of a media buffer, derived from its magic number.
///
/// # Example
///
/// ```rust
/// use wa_sticker::container::{classify, ContainerSignature};
///
/// assert_eq!(classify(b"\x89PNG\r\n\x1a\n"), ContainerSignature::Png);
/// assert_eq!(classify(b"NOTRIFFDATA"), ContainerSignature::Unknown);
/// assert_eq!(classify(&[]), ContainerSignature::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerSignature {
    /// `RIFF....WEBP`
    WebP,
    Png,
    Jpeg,
    Gif,
    /// ISO BMFF with an `ftyp` box at offset 4
    Mp4,
    Unknown,
}

/// Bytes expected at a fixed offset.
struct Pattern {
    offset: usize,
    bytes: &'static [u8],
}

/// Signature table, checked in order. Every pattern of an entry must match.
const SIGNATURES: &[(ContainerSignature, &[Pattern])] = &[
    (
        ContainerSignature::WebP,
        &[
            Pattern { offset: 0, bytes: b"RIFF" },
            Pattern { offset: 8, bytes: b"WEBP" },
        ],
    ),
    (
        ContainerSignature::Png,
        &[Pattern { offset: 0, bytes: &[0x89, 0x50, 0x4E, 0x47] }],
    ),
    (
        ContainerSignature::Jpeg,
        &[Pattern { offset: 0, bytes: &[0xFF, 0xD8, 0xFF] }],
    ),
    (
        ContainerSignature::Gif,
        &[Pattern { offset: 0, bytes: &[0x47, 0x49, 0x46] }],
    ),
    (
        ContainerSignature::Mp4,
        &[Pattern { offset: 4, bytes: b"ftyp" }],
    ),
];

impl Pattern {
    fn matches(&self, buf: &[u8]) -> bool {
        buf.get(self.offset..self.offset + self.bytes.len())
            .is_some_and(|window| window == self.bytes)
    }
}

/// Classify a buffer by its leading bytes. Never fails.
pub fn classify(buf: &[u8]) -> ContainerSignature {
    SIGNATURES
        .iter()
        .find(|(_, patterns)| patterns.iter().all(|p| p.matches(buf)))
        .map(|(sig, _)| *sig)
        .unwrap_or(ContainerSignature::Unknown)
}

impl ContainerSignature {
    /// MIME type used when uploading this media to a provider.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::WebP => "image/webp",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Mp4 => "video/mp4",
            Self::Unknown => "application/octet-stream",
        }
    }

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::WebP => "webp",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Mp4 => "mp4",
            Self::Unknown => "bin",
        }
    }

    /// Still images that go through the image conversion path.
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Png | Self::Jpeg)
    }

    /// Animated sources. GIF is treated as video, as sticker services do.
    pub fn is_video(&self) -> bool {
        matches!(self, Self::Gif | Self::Mp4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_webp() -> Vec<u8> {
        let mut buf = b"RIFF".to_vec();
        buf.extend_from_slice(&12u32.to_le_bytes());
        buf.extend_from_slice(b"WEBPVP8 ");
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf
    }

    #[test]
    fn webp_needs_both_tags() {
        assert_eq!(classify(&minimal_webp()), ContainerSignature::WebP);
        // RIFF but a WAV profile
        assert_eq!(classify(b"RIFF\x24\0\0\0WAVEfmt "), ContainerSignature::Unknown);
    }

    #[test]
    fn riff_prefix_alone_is_not_webp() {
        assert_eq!(classify(b"RIFF"), ContainerSignature::Unknown);
        assert_eq!(classify(b"RIFF\0\0\0\0WEB"), ContainerSignature::Unknown);
    }

    #[test]
    fn png_jpeg_gif() {
        assert_eq!(classify(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]), ContainerSignature::Png);
        assert_eq!(classify(&[0xFF, 0xD8, 0xFF, 0xE0]), ContainerSignature::Jpeg);
        assert_eq!(classify(b"GIF89a"), ContainerSignature::Gif);
    }

    #[test]
    fn mp4_ftyp_box() {
        assert_eq!(classify(b"\0\0\0\x20ftypisom"), ContainerSignature::Mp4);
        // Three zero bytes alone are not enough
        assert_eq!(classify(&[0, 0, 0, 0, 0, 0, 0, 0]), ContainerSignature::Unknown);
    }

    #[test]
    fn short_buffers_never_match() {
        assert_eq!(classify(&[]), ContainerSignature::Unknown);
        assert_eq!(classify(&[0xFF]), ContainerSignature::Unknown);
        assert_eq!(classify(&[0xFF, 0xD8]), ContainerSignature::Unknown);
        assert_eq!(classify(b"GI"), ContainerSignature::Unknown);
    }

    #[test]
    fn malformed_text_is_unknown() {
        assert_eq!(classify(b"NOTRIFFDATA"), ContainerSignature::Unknown);
    }

    #[test]
    fn media_families() {
        assert!(ContainerSignature::Png.is_image());
        assert!(ContainerSignature::Jpeg.is_image());
        assert!(!ContainerSignature::WebP.is_image());
        assert!(ContainerSignature::Gif.is_video());
        assert!(ContainerSignature::Mp4.is_video());
        assert!(!ContainerSignature::Unknown.is_video());
    }

    #[test]
    fn mime_types() {
        assert_eq!(ContainerSignature::WebP.mime_type(), "image/webp");
        assert_eq!(ContainerSignature::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(ContainerSignature::Mp4.mime_type(), "video/mp4");
        assert_eq!(ContainerSignature::Unknown.extension(), "bin");
    }
}
