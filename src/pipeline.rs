use reqwest::Client;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{Config, GetProviderConfig, Limits, StickerDefaults, UploadProviderConfig};
use crate::container::ContainerSignature;
use crate::error::StickerError;
use crate::fallback::{Outcome, Source, attempt};
use crate::provider::{
    EmbedMetadataProvider, EmojiPair, JsonLinkProvider, MediaInput, PassThrough, PlaceholderWebp,
    Placeholders, Provider, StickerRequest, StillFrame, TemplateProvider, TextPrompt, UploadProvider,
    Uploadable, build_client,
};
use crate::webp::{StickerMetadata, embed_metadata_or_original};

/// File extensions accepted by [`collect_media`].
const MEDIA_EXTENSIONS: &[&str] = &["webp", "png", "jpg", "jpeg", "gif", "mp4"];

/// The provider chains used by a [`StickerPipeline`], one per operation.
///
/// Each chain is tried in order; see [`attempt`].
#[derive(Default)]
pub struct Chains {
    pub convert: Vec<Box<dyn Provider<MediaInput>>>,
    pub to_image: Vec<Box<dyn Provider<MediaInput>>>,
    pub watermark: Vec<Box<dyn Provider<StickerRequest>>>,
    pub text: Vec<Box<dyn Provider<TextPrompt>>>,
    pub animated_text: Vec<Box<dyn Provider<TextPrompt>>>,
    pub emoji: Vec<Box<dyn Provider<EmojiPair>>>,
}

/// Build every provider chain from configuration.
///
/// Disabled providers are skipped. The watermark chain always ends with the
/// in-process [`EmbedMetadataProvider`].
///
/// # Example
///
/// ```rust
/// use wa_sticker::config::Config;
/// use wa_sticker::pipeline::build_chains;
///
/// let chains = build_chains(&Config::default());
/// assert_eq!(chains.watermark.last().unwrap().name(), "local-exif");
/// ```
pub fn build_chains(config: &Config) -> Chains {
    let client = build_client(&config.http);
    let providers = &config.providers;

    let mut watermark = upload_chain(&providers.watermark, &client);
    watermark.push(Box::new(EmbedMetadataProvider));

    Chains {
        convert: upload_chain(&providers.convert, &client),
        to_image: upload_chain(&providers.to_image, &client),
        watermark,
        text: get_chain(&providers.text, &client),
        animated_text: get_chain(&providers.animated_text, &client),
        emoji: get_chain(&providers.emoji, &client),
    }
}

fn upload_chain<I: Uploadable + Sync>(
    configs: &[UploadProviderConfig],
    client: &Client,
) -> Vec<Box<dyn Provider<I>>> {
    configs
        .iter()
        .filter(|c| {
            if !c.enabled {
                log::debug!("Skipping disabled provider {}", c.name);
            }
            c.enabled
        })
        .map(|c| Box::new(UploadProvider::new(c, client.clone())) as Box<dyn Provider<I>>)
        .collect()
}

fn get_chain<I: Placeholders + Sync>(
    configs: &[GetProviderConfig],
    client: &Client,
) -> Vec<Box<dyn Provider<I>>> {
    configs
        .iter()
        .filter(|c| {
            if !c.enabled() {
                log::debug!("Skipping disabled provider {}", c.name());
            }
            c.enabled()
        })
        .map(|c| match c {
            GetProviderConfig::Direct(d) => {
                Box::new(TemplateProvider::new(d, client.clone())) as Box<dyn Provider<I>>
            }
            GetProviderConfig::Link(l) => Box::new(JsonLinkProvider::new(l, client.clone())),
        })
        .collect()
}

/// Sticker operations built on the provider chains.
///
/// Every operation takes its [`StickerMetadata`] explicitly; defaults come
/// from [`StickerDefaults::metadata`].
///
/// # Example
///
/// ```rust,no_run
/// use wa_sticker::config::Config;
/// use wa_sticker::pipeline::StickerPipeline;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load(None)?;
/// let pipeline = StickerPipeline::from_config(&config);
///
/// let meta = config.sticker.metadata();
/// let sticker = pipeline.text_sticker("hello world", &meta).await?;
/// std::fs::write("brat.webp", &sticker.bytes)?;
/// # Ok(())
/// # }
/// ```
pub struct StickerPipeline {
    chains: Chains,
    placeholder: PlaceholderWebp,
    limits: Limits,
}

impl StickerPipeline {
    pub fn new(chains: Chains, placeholder: PlaceholderWebp, limits: Limits) -> Self {
        Self {
            chains,
            placeholder,
            limits,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            build_chains(config),
            PlaceholderWebp::from_config(&config.fallback),
            config.limits.clone(),
        )
    }

    /// Turn media into a WebP sticker carrying `metadata`.
    ///
    /// - WebP input is stamped directly.
    /// - PNG/JPEG go through the conversion chain; the placeholder is used
    ///   when every converter fails.
    /// - GIF/MP4 go through the conversion chain with no local fallback,
    ///   after the video size limit is checked.
    ///
    /// Metadata embedding is best effort: output that cannot be stamped is
    /// returned as produced.
    pub async fn make_sticker(
        &self,
        bytes: Vec<u8>,
        metadata: &StickerMetadata,
    ) -> Result<Outcome, StickerError> {
        let input = MediaInput::new(bytes);

        let outcome = match input.signature {
            ContainerSignature::WebP => Outcome {
                bytes: input.bytes,
                source: Source::Input,
                failures: Vec::new(),
            },
            sig if sig.is_image() => {
                log::info!("Converting {} to WebP", sig.mime_type());
                attempt(&self.chains.convert, &input, Some(&self.placeholder), |_| {}).await?
            }
            sig if sig.is_video() => {
                if input.bytes.len() > self.limits.max_video_bytes {
                    return Err(StickerError::InvalidInput(format!(
                        "Video is {} bytes, limit is {}",
                        input.bytes.len(),
                        self.limits.max_video_bytes
                    )));
                }
                log::info!("Converting {} to animated WebP", sig.mime_type());
                attempt(&self.chains.convert, &input, None, |_| {}).await?
            }
            _ => {
                return Err(StickerError::UnsupportedMedia(
                    "unrecognized file signature".to_string(),
                ));
            }
        };

        let Outcome {
            bytes,
            source,
            failures,
        } = outcome;
        Ok(Outcome {
            bytes: embed_metadata_or_original(bytes, metadata),
            source,
            failures,
        })
    }

    /// Replace the metadata of an existing WebP sticker.
    ///
    /// Online stamping services are tried first, then the in-process
    /// embedder; if all fail the sticker is returned unchanged.
    pub async fn watermark(
        &self,
        bytes: Vec<u8>,
        metadata: &StickerMetadata,
    ) -> Result<Outcome, StickerError> {
        require_webp(&bytes, "watermark")?;

        let request = StickerRequest {
            bytes,
            metadata: metadata.clone(),
        };
        attempt(&self.chains.watermark, &request, Some(&PassThrough), |_| {}).await
    }

    /// Static text sticker.
    pub async fn text_sticker(
        &self,
        text: &str,
        metadata: &StickerMetadata,
    ) -> Result<Outcome, StickerError> {
        let prompt = validate_text(text, self.limits.max_text_len)?;
        let image = attempt(&self.chains.text, &prompt, Some(&self.placeholder), |_| {}).await?;
        self.finish(image, metadata).await
    }

    /// Animated text sticker. There is no local fallback.
    pub async fn animated_text_sticker(
        &self,
        text: &str,
        metadata: &StickerMetadata,
    ) -> Result<Outcome, StickerError> {
        let prompt = validate_text(text, self.limits.max_animated_text_len)?;
        let animation = attempt(&self.chains.animated_text, &prompt, None, |_| {}).await?;
        self.finish(animation, metadata).await
    }

    /// Mix two emoji (e.g. `"😂+😍"` or `"🔥 💖"`) into one sticker.
    pub async fn emoji_mix(
        &self,
        input: &str,
        metadata: &StickerMetadata,
    ) -> Result<Outcome, StickerError> {
        let pair = parse_emoji_pair(input)?;
        let image = attempt(&self.chains.emoji, &pair, Some(&self.placeholder), |_| {}).await?;
        self.finish(image, metadata).await
    }

    /// Convert a WebP sticker to a PNG image.
    ///
    /// When every converter fails, the first frame is returned as a still
    /// WebP, or the original bytes if no frame can be found.
    pub async fn to_image(&self, bytes: Vec<u8>) -> Result<Outcome, StickerError> {
        require_webp(&bytes, "to_image")?;
        let input = MediaInput::new(bytes);
        attempt(&self.chains.to_image, &input, Some(&StillFrame), |_| {}).await
    }

    /// Make generated media into a sticker, keeping the generator's provenance.
    async fn finish(&self, generated: Outcome, metadata: &StickerMetadata) -> Result<Outcome, StickerError> {
        let sticker = self.make_sticker(generated.bytes, metadata).await?;

        let source = match sticker.source {
            Source::Input => generated.source,
            other => other,
        };
        let mut failures = generated.failures;
        failures.extend(sticker.failures);

        Ok(Outcome {
            bytes: sticker.bytes,
            source,
            failures,
        })
    }
}

fn require_webp(bytes: &[u8], operation: &str) -> Result<(), StickerError> {
    match crate::container::classify(bytes) {
        ContainerSignature::WebP => Ok(()),
        other => Err(StickerError::UnsupportedMedia(format!(
            "{operation} needs a WebP sticker, got {}",
            other.mime_type()
        ))),
    }
}

fn validate_text(text: &str, max_chars: usize) -> Result<TextPrompt, StickerError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(StickerError::InvalidInput("text is empty".to_string()));
    }
    let len = text.chars().count();
    if len > max_chars {
        return Err(StickerError::InvalidInput(format!(
            "text is {len} characters, limit is {max_chars}"
        )));
    }
    Ok(TextPrompt::new(text))
}

/// Split `"😂+😍"` or `"🔥 💖"` into exactly two emoji.
///
/// # Example
///
/// ```rust
/// use wa_sticker::pipeline::parse_emoji_pair;
///
/// let pair = parse_emoji_pair("😂+😍").unwrap();
/// assert_eq!((pair.first.as_str(), pair.second.as_str()), ("😂", "😍"));
/// assert!(parse_emoji_pair("😂").is_err());
/// ```
pub fn parse_emoji_pair(input: &str) -> Result<EmojiPair, StickerError> {
    let parts: Vec<&str> = input
        .split(|c: char| c == '+' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();

    let [first, second] = parts.as_slice() else {
        return Err(StickerError::InvalidInput(format!(
            "expected exactly 2 emoji, got {}",
            parts.len()
        )));
    };

    for part in [first, second] {
        if part.is_ascii() {
            return Err(StickerError::InvalidInput(format!("{part:?} is not an emoji")));
        }
    }

    Ok(EmojiPair::new(first, second))
}

/// Parse `"pack|author"` watermark arguments.
///
/// Everything after the first `|` is the author. Blank parts, or blank
/// arguments, take the configured defaults.
pub fn parse_watermark_args(args: Option<&str>, defaults: &StickerDefaults) -> (String, String) {
    let Some(args) = args.map(str::trim).filter(|a| !a.is_empty()) else {
        return (defaults.pack_name.clone(), defaults.publisher.clone());
    };

    let (pack, author) = args.split_once('|').unwrap_or((args, ""));
    let pick = |value: &str, default: &str| {
        let value = value.trim();
        if value.is_empty() { default.to_string() } else { value.to_string() }
    };

    (
        pick(pack, &defaults.pack_name),
        pick(author, &defaults.publisher),
    )
}

/// Collect media files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). Only files with a media extension
/// (`webp`, `png`, `jpg`, `jpeg`, `gif`, `mp4`) are included.
pub fn collect_media(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut media = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_media(path) {
                media.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_media(p) {
                    media.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    media
}

fn is_supported_media(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MEDIA_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
