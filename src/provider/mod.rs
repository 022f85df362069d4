//! Media providers used by the fallback chains.
//!
//! A [`Provider`] turns an input (media bytes, a text prompt, an emoji pair,
//! a sticker plus metadata) into output bytes, or fails. Providers are
//! stateless; the library ships HTTP providers configured from
//! [`Config`](crate::config::Config) and the in-process
//! [`EmbedMetadataProvider`]. A [`LocalFallback`] is the infallible last
//! resort of a chain.

mod http;
mod local;
mod source;

pub use http::{JsonLinkProvider, MediaFamily, TemplateProvider, UploadProvider, build_client, fetch_checked};
pub use local::{EmbedMetadataProvider, PassThrough, PlaceholderWebp, StillFrame};
pub use source::{Attachment, FileAttachment, HttpSource, MediaSource};

use anyhow::Result;

use crate::container::{ContainerSignature, classify};
use crate::webp::StickerMetadata;

/// A media transform that may fail.
///
/// Implement this trait to add a custom backend.
///
/// # Example
///
/// ```rust
/// use wa_sticker::provider::{Provider, TextPrompt};
///
/// struct Echo;
///
/// #[async_trait::async_trait]
/// impl Provider<TextPrompt> for Echo {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     async fn produce(&self, input: &TextPrompt) -> anyhow::Result<Vec<u8>> {
///         Ok(input.text.as_bytes().to_vec())
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Provider<I: ?Sized + Sync>: Send + Sync {
    /// The display name of this provider (e.g., "ezgif", "ryzumi").
    fn name(&self) -> &str;
    /// Produce output bytes for `input`. An empty body counts as a failure.
    async fn produce(&self, input: &I) -> Result<Vec<u8>>;
}

/// Deterministic last resort of a provider chain. Never fails.
pub trait LocalFallback<I: ?Sized>: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, input: &I) -> Vec<u8>;
}

/// Values substituted into `{key}` placeholders of provider URLs and form fields.
pub trait Placeholders {
    fn placeholders(&self) -> Vec<(&'static str, String)>;
}

/// Inputs that can be uploaded as a multipart file.
pub trait Uploadable: Placeholders {
    fn bytes(&self) -> &[u8];
    fn file_name(&self) -> String;
    fn mime_type(&self) -> &'static str;
}

/// Media bytes to convert, with their detected container type.
#[derive(Debug, Clone)]
pub struct MediaInput {
    pub bytes: Vec<u8>,
    pub signature: ContainerSignature,
}

impl MediaInput {
    pub fn new(bytes: Vec<u8>) -> Self {
        let signature = classify(&bytes);
        Self { bytes, signature }
    }
}

impl Placeholders for MediaInput {
    fn placeholders(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ext", self.signature.extension().to_string()),
            ("mime", self.signature.mime_type().to_string()),
        ]
    }
}

impl Uploadable for MediaInput {
    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn file_name(&self) -> String {
        format!("input.{}", self.signature.extension())
    }

    fn mime_type(&self) -> &'static str {
        self.signature.mime_type()
    }
}

/// Text for text-to-image generators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPrompt {
    pub text: String,
}

impl TextPrompt {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

impl Placeholders for TextPrompt {
    fn placeholders(&self) -> Vec<(&'static str, String)> {
        vec![("text", self.text.clone())]
    }
}

/// Two emoji to mix into one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiPair {
    pub first: String,
    pub second: String,
}

impl EmojiPair {
    pub fn new(first: &str, second: &str) -> Self {
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }
}

/// Lowercase hex of the first code point, as used in emoji image paths.
fn code_point_hex(emoji: &str) -> String {
    emoji
        .chars()
        .next()
        .map(|c| format!("{:x}", c as u32))
        .unwrap_or_default()
}

impl Placeholders for EmojiPair {
    fn placeholders(&self) -> Vec<(&'static str, String)> {
        vec![
            ("emoji1", self.first.clone()),
            ("emoji2", self.second.clone()),
            ("cp1", code_point_hex(&self.first)),
            ("cp2", code_point_hex(&self.second)),
        ]
    }
}

/// A WebP sticker and the metadata to stamp on it.
#[derive(Debug, Clone)]
pub struct StickerRequest {
    pub bytes: Vec<u8>,
    pub metadata: StickerMetadata,
}

impl Placeholders for StickerRequest {
    fn placeholders(&self) -> Vec<(&'static str, String)> {
        vec![
            ("pack", self.metadata.pack_name.clone()),
            ("author", self.metadata.publisher.clone()),
        ]
    }
}

impl Uploadable for StickerRequest {
    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn file_name(&self) -> String {
        "sticker.webp".to_string()
    }

    fn mime_type(&self) -> &'static str {
        "image/webp"
    }
}

/// Replace every `{key}` in `template` with its value.
pub(crate) fn fill(template: &str, vars: &[(&'static str, String)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}
