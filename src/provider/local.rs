use anyhow::Result;
use image::codecs::webp::WebPEncoder;
use image::{Rgba, RgbaImage};
use std::io::Cursor;

use super::{LocalFallback, MediaInput, Provider, StickerRequest};
use crate::config::FallbackConfig;
use crate::webp::{embed_metadata, extract_still_frame};

/// 1×1 white lossless WebP, used when the placeholder cannot be encoded.
const MINIMAL_WEBP: [u8; 34] = [
    0x52, 0x49, 0x46, 0x46, 0x1a, 0x00, 0x00, 0x00, 0x57, 0x45, 0x42, 0x50, 0x56, 0x50, 0x38, 0x4c,
    0x0d, 0x00, 0x00, 0x00, 0x2f, 0x00, 0x00, 0x00, 0x10, 0x07, 0x10, 0x11, 0x11, 0x88, 0x88, 0xfe,
    0x07, 0x00,
];

/// Solid-colour lossless WebP of a fixed size.
///
/// Output depends only on the configured size and colour, never on the input.
#[derive(Debug, Clone)]
pub struct PlaceholderWebp {
    pub width: u32,
    pub height: u32,
    pub color: [u8; 4],
}

impl Default for PlaceholderWebp {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            color: [255, 255, 255, 255],
        }
    }
}

impl PlaceholderWebp {
    pub fn from_config(config: &FallbackConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            color: config.color,
        }
    }

    fn render(&self) -> image::ImageResult<Vec<u8>> {
        let img = RgbaImage::from_pixel(self.width, self.height, Rgba(self.color));
        let mut out = Cursor::new(Vec::new());
        img.write_with_encoder(WebPEncoder::new_lossless(&mut out))?;
        Ok(out.into_inner())
    }
}

impl<I: ?Sized> LocalFallback<I> for PlaceholderWebp {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn generate(&self, _input: &I) -> Vec<u8> {
        match self.render() {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Placeholder encoding failed ({e}), using minimal WebP");
                MINIMAL_WEBP.to_vec()
            }
        }
    }
}

/// Returns the input bytes unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl LocalFallback<StickerRequest> for PassThrough {
    fn name(&self) -> &str {
        "pass-through"
    }

    fn generate(&self, input: &StickerRequest) -> Vec<u8> {
        input.bytes.clone()
    }
}

impl LocalFallback<MediaInput> for PassThrough {
    fn name(&self) -> &str {
        "pass-through"
    }

    fn generate(&self, input: &MediaInput) -> Vec<u8> {
        input.bytes.clone()
    }
}

/// First frame of a WebP as a standalone still image, or the input
/// unchanged when it has no image chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct StillFrame;

impl LocalFallback<MediaInput> for StillFrame {
    fn name(&self) -> &str {
        "still-frame"
    }

    fn generate(&self, input: &MediaInput) -> Vec<u8> {
        match extract_still_frame(&input.bytes) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Still frame extraction failed ({e}), returning original");
                input.bytes.clone()
            }
        }
    }
}

/// Stamps metadata in-process with the chunk codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbedMetadataProvider;

#[async_trait::async_trait]
impl Provider<StickerRequest> for EmbedMetadataProvider {
    fn name(&self) -> &str {
        "local-exif"
    }

    async fn produce(&self, input: &StickerRequest) -> Result<Vec<u8>> {
        Ok(embed_metadata(&input.bytes, &input.metadata)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerSignature, classify};
    use crate::provider::TextPrompt;
    use crate::webp::{StickerMetadata, parse_chunks, read_sticker_metadata};

    // ── PlaceholderWebp ──────────────────────────────────────────────

    #[test]
    fn minimal_webp_is_valid() {
        assert_eq!(classify(&MINIMAL_WEBP), ContainerSignature::WebP);
        let chunks = parse_chunks(&MINIMAL_WEBP).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].tag(), "VP8L");
    }

    #[test]
    fn placeholder_is_webp() {
        let placeholder = PlaceholderWebp {
            width: 16,
            height: 16,
            color: [0, 0, 0, 255],
        };
        let bytes = LocalFallback::<TextPrompt>::generate(&placeholder, &TextPrompt::new("x"));
        assert_eq!(classify(&bytes), ContainerSignature::WebP);
        assert!(parse_chunks(&bytes).is_ok());
    }

    #[test]
    fn placeholder_is_deterministic() {
        let placeholder = PlaceholderWebp::default();
        let a = LocalFallback::<str>::generate(&placeholder, "one");
        let b = LocalFallback::<str>::generate(&placeholder, "two");
        assert_eq!(a, b);
    }

    #[test]
    fn zero_size_uses_minimal_webp() {
        let placeholder = PlaceholderWebp {
            width: 0,
            height: 0,
            color: [0, 0, 0, 0],
        };
        assert_eq!(LocalFallback::<str>::generate(&placeholder, ""), MINIMAL_WEBP.to_vec());
    }

    #[test]
    fn from_config_copies_fields() {
        let placeholder = PlaceholderWebp::from_config(&FallbackConfig {
            width: 64,
            height: 32,
            color: [1, 2, 3, 4],
        });
        assert_eq!((placeholder.width, placeholder.height), (64, 32));
        assert_eq!(placeholder.color, [1, 2, 3, 4]);
    }

    // ── StillFrame ───────────────────────────────────────────────────

    #[test]
    fn still_frame_of_minimal_webp() {
        let frame = StillFrame.generate(&MediaInput::new(MINIMAL_WEBP.to_vec()));
        assert_eq!(classify(&frame), ContainerSignature::WebP);
        assert_eq!(parse_chunks(&frame).unwrap()[0].tag(), "VP8L");
    }

    #[test]
    fn still_frame_falls_back_to_input() {
        let input = MediaInput::new(b"not a webp".to_vec());
        assert_eq!(StillFrame.generate(&input), b"not a webp");
    }

    // ── PassThrough / EmbedMetadataProvider ──────────────────────────

    #[test]
    fn pass_through_returns_input() {
        let request = StickerRequest {
            bytes: b"raw".to_vec(),
            metadata: StickerMetadata::default(),
        };
        assert_eq!(PassThrough.generate(&request), b"raw");
        assert_eq!(PassThrough.generate(&MediaInput::new(b"media".to_vec())), b"media");
    }

    #[tokio::test]
    async fn embed_provider_stamps_metadata() {
        let request = StickerRequest {
            bytes: MINIMAL_WEBP.to_vec(),
            metadata: StickerMetadata::new("Pack", "Author"),
        };
        let out = EmbedMetadataProvider.produce(&request).await.unwrap();
        let meta = read_sticker_metadata(&out).unwrap().unwrap();
        assert_eq!(meta.pack_name, "Pack");
    }

    #[tokio::test]
    async fn embed_provider_rejects_non_webp() {
        let request = StickerRequest {
            bytes: b"GIF89a".to_vec(),
            metadata: StickerMetadata::default(),
        };
        let err = EmbedMetadataProvider.produce(&request).await.unwrap_err();
        assert!(err.to_string().contains("Malformed"));
    }
}
