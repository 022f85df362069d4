use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::provider::MediaFamily;
use crate::webp::StickerMetadata;

/// Top-level configuration for the sticker library.
///
/// Holds the default pack metadata, the ordered provider chains for each
/// pipeline operation, input limits, HTTP client settings and the local
/// placeholder used when every provider of a chain fails.
///
/// # Loading
///
/// ```rust,no_run
/// use wa_sticker::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.sticker.pack_name = "My Pack".into();
/// config.limits.max_text_len = 60;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default sticker pack metadata.
    pub sticker: StickerDefaults,
    /// Provider chains, tried in list order.
    pub providers: Providers,
    /// Input limits for text and video.
    pub limits: Limits,
    /// Shared HTTP client settings.
    pub http: HttpConfig,
    /// Local placeholder rendered when an image chain is exhausted.
    pub fallback: FallbackConfig,
}

/// Default metadata stamped on stickers when the caller gives none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StickerDefaults {
    pub pack_name: String,
    pub publisher: String,
    #[serde(default)]
    pub publisher_email: String,
    #[serde(default)]
    pub publisher_website: String,
    #[serde(default)]
    pub android_app_store_link: String,
    #[serde(default)]
    pub ios_app_store_link: String,
}

impl StickerDefaults {
    /// Build metadata with a fresh pack id from these defaults.
    pub fn metadata(&self) -> StickerMetadata {
        StickerMetadata::new(&self.pack_name, &self.publisher)
            .with_publisher_email(&self.publisher_email)
            .with_publisher_website(&self.publisher_website)
            .with_android_app_store_link(&self.android_app_store_link)
            .with_ios_app_store_link(&self.ios_app_store_link)
    }
}

/// Ordered provider chains for each pipeline operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Providers {
    /// Image or video to WebP.
    pub convert: Vec<UploadProviderConfig>,
    /// WebP to PNG.
    pub to_image: Vec<UploadProviderConfig>,
    /// Online metadata stamping, tried before the in-process embedder.
    pub watermark: Vec<UploadProviderConfig>,
    /// Text to static image.
    pub text: Vec<GetProviderConfig>,
    /// Text to animation.
    pub animated_text: Vec<GetProviderConfig>,
    /// Emoji pair to image.
    pub emoji: Vec<GetProviderConfig>,
}

/// A multipart upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadProviderConfig {
    pub name: String,
    pub url: String,
    /// Form field carrying the file.
    pub file_field: String,
    /// Extra form fields; values may contain placeholders.
    #[serde(default)]
    pub fields: Vec<(String, String)>,
    /// JSON pointer to a result link, when the service answers with JSON.
    #[serde(default)]
    pub result_pointer: Option<String>,
    pub accept: MediaFamily,
    pub enabled: bool,
}

/// A GET endpoint returning media directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateProviderConfig {
    pub name: String,
    /// URL template; path placeholders are substituted verbatim.
    pub url: String,
    /// Query pairs; values are substituted, then URL-encoded.
    #[serde(default)]
    pub query: Vec<(String, String)>,
    pub accept: MediaFamily,
    pub enabled: bool,
}

/// A GET endpoint returning JSON that links to the media.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkProviderConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub query: Vec<(String, String)>,
    /// JSON pointer to the media URL (e.g. `/results/0/url`).
    pub pointer: String,
    pub accept: MediaFamily,
    pub enabled: bool,
}

/// Either kind of GET endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GetProviderConfig {
    Direct(TemplateProviderConfig),
    Link(LinkProviderConfig),
}

impl GetProviderConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Direct(c) => &c.name,
            Self::Link(c) => &c.name,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            Self::Direct(c) => c.enabled,
            Self::Link(c) => c.enabled,
        }
    }
}

/// Input limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum characters for a static text sticker.
    pub max_text_len: usize,
    /// Maximum characters for an animated text sticker.
    pub max_animated_text_len: usize,
    /// Largest video accepted for conversion, in bytes.
    pub max_video_bytes: usize,
}

/// HTTP client settings shared by every provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Solid-colour placeholder sticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub width: u32,
    pub height: u32,
    /// RGBA fill colour.
    pub color: [u8; 4],
}

fn upload(name: &str, url: &str, fields: &[(&str, &str)], accept: MediaFamily) -> UploadProviderConfig {
    UploadProviderConfig {
        name: name.to_string(),
        url: url.to_string(),
        file_field: "file".to_string(),
        fields: pairs(fields),
        result_pointer: None,
        accept,
        enabled: true,
    }
}

fn direct(name: &str, url: &str, query: &[(&str, &str)], accept: MediaFamily) -> GetProviderConfig {
    GetProviderConfig::Direct(TemplateProviderConfig {
        name: name.to_string(),
        url: url.to_string(),
        query: pairs(query),
        accept,
        enabled: true,
    })
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        let freeconvert = UploadProviderConfig {
            result_pointer: Some("/output/url".to_string()),
            ..upload(
                "freeconvert",
                "https://api.freeconvert.com/v1/process/convert",
                &[("to", "png")],
                MediaFamily::Image,
            )
        };

        // Tenor needs an API key in its `key` query pair
        let tenor = GetProviderConfig::Link(LinkProviderConfig {
            name: "tenor".to_string(),
            url: "https://tenor.googleapis.com/v2/featured".to_string(),
            query: pairs(&[
                ("key", ""),
                ("contentfilter", "high"),
                ("media_filter", "png_transparent"),
                ("component", "proactive"),
                ("collection", "emoji_kitchen_v6"),
                ("q", "{emoji1}_{emoji2}"),
            ]),
            pointer: "/results/0/media_formats/png_transparent/url".to_string(),
            accept: MediaFamily::Image,
            enabled: false,
        });

        Self {
            sticker: StickerDefaults {
                pack_name: "Bot Sticker".to_string(),
                publisher: "WhatsApp Bot".to_string(),
                publisher_email: String::new(),
                publisher_website: String::new(),
                android_app_store_link: String::new(),
                ios_app_store_link: String::new(),
            },
            providers: Providers {
                convert: vec![
                    upload(
                        "ezgif",
                        "https://api.ezgif.com/convert-to-webp",
                        &[("type", "sticker")],
                        MediaFamily::Image,
                    ),
                    upload(
                        "cloudconvert",
                        "https://api.cloudconvert.com/v2/convert/auto/webp",
                        &[("format", "webp")],
                        MediaFamily::Image,
                    ),
                    upload(
                        "ilovepdf",
                        "https://api.ilovepdf.com/convert/webp",
                        &[],
                        MediaFamily::Image,
                    ),
                ],
                to_image: vec![
                    upload("convertio", "https://api.convertio.co/convert", &[], MediaFamily::Image),
                    upload(
                        "cloudconvert",
                        "https://api.cloudconvert.com/v2/convert/webp/png",
                        &[],
                        MediaFamily::Image,
                    ),
                    freeconvert,
                ],
                watermark: vec![upload(
                    "sticker-tools",
                    "https://api.sticker-tools.com/add-metadata",
                    &[("packname", "{pack}"), ("author", "{author}")],
                    MediaFamily::Image,
                )],
                text: vec![
                    direct(
                        "ryzumi",
                        "https://api.ryzumi.vip/api/image/brat",
                        &[("text", "{text}")],
                        MediaFamily::Image,
                    ),
                    direct(
                        "moesif",
                        "https://textoverimage.moesif.com/image",
                        &[
                            ("text", "{text}"),
                            ("width", "500"),
                            ("height", "200"),
                            ("fontSize", "40"),
                            ("fontColor", "white"),
                            ("backgroundColor", "black"),
                        ],
                        MediaFamily::Image,
                    ),
                    direct(
                        "dummyimage",
                        "https://dummyimage.com/500x200/000/fff.png",
                        &[("text", "{text}")],
                        MediaFamily::Image,
                    ),
                ],
                animated_text: vec![
                    direct(
                        "ryzumi",
                        "https://api.ryzumi.vip/api/image/brat/animated",
                        &[("text", "{text}")],
                        MediaFamily::Animated,
                    ),
                    direct(
                        "ryzendesu",
                        "https://api.ryzendesu.vip/api/image/brat/animated",
                        &[("text", "{text}")],
                        MediaFamily::Animated,
                    ),
                    direct(
                        "textanim",
                        "https://textanim.com/api/gif",
                        &[("text", "{text}"), ("style", "brat")],
                        MediaFamily::Animated,
                    ),
                    direct(
                        "gifmaker",
                        "https://api.gifmaker.me/text",
                        &[("text", "{text}"), ("animation", "fade"), ("duration", "2")],
                        MediaFamily::Animated,
                    ),
                ],
                emoji: vec![
                    direct(
                        "emoji-kitchen",
                        "https://www.gstatic.com/android/keyboard/emojikitchen/20201001/u{cp1}/u{cp1}_u{cp2}.png",
                        &[],
                        MediaFamily::Image,
                    ),
                    tenor,
                ],
            },
            limits: Limits {
                max_text_len: 100,
                max_animated_text_len: 80,
                max_video_bytes: 5 * 1024 * 1024,
            },
            http: HttpConfig {
                timeout_secs: 30,
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            },
            fallback: FallbackConfig {
                width: 512,
                height: 512,
                color: [255, 255, 255, 255],
            },
        }
    }
}

impl Config {
    /// Resolve the config file path: `config.json` next to the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
