use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

/// WhatsApp limit on pack name and publisher length, in characters.
pub const MAX_FIELD_CHARS: usize = 50;

/// Prefix used for generated pack ids.
const PACK_ID_PREFIX: &str = "com.whatsapp.sticker.";

/// Little-endian TIFF header with a single IFD entry (tag 0x5741, type
/// UNDEFINED) whose value is the JSON document stored right after it at
/// offset 0x16. Bytes 14..18 carry the JSON length.
const EXIF_PREFIX: [u8; 22] = [
    0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00, 0x01, 0x00, 0x41, 0x57, 0x07, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x16, 0x00, 0x00, 0x00,
];
pub const EXIF_PREFIX_LEN: usize = EXIF_PREFIX.len();
const JSON_LEN_OFFSET: usize = 14;

/// Sticker pack metadata read by WhatsApp clients.
///
/// Field names serialize to the exact JSON keys the clients expect.
///
/// # Example
///
/// ```rust
/// use wa_sticker::webp::StickerMetadata;
///
/// let meta = StickerMetadata::new("My Pack", "Bot")
///     .with_publisher_website("https://example.com");
/// assert!(meta.pack_id.starts_with("com.whatsapp.sticker."));
/// assert_eq!(meta.pack_name, "My Pack");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StickerMetadata {
    #[serde(rename = "sticker-pack-id")]
    pub pack_id: String,
    #[serde(rename = "sticker-pack-name")]
    pub pack_name: String,
    #[serde(rename = "sticker-pack-publisher")]
    pub publisher: String,
    #[serde(rename = "sticker-pack-publisher-email", default)]
    pub publisher_email: String,
    #[serde(rename = "sticker-pack-publisher-website", default)]
    pub publisher_website: String,
    #[serde(rename = "android-app-store-link", default)]
    pub android_app_store_link: String,
    #[serde(rename = "ios-app-store-link", default)]
    pub ios_app_store_link: String,
}

impl StickerMetadata {
    /// Create metadata with a fresh time-based pack id. Names longer than
    /// [`MAX_FIELD_CHARS`] are truncated.
    pub fn new(pack_name: &str, publisher: &str) -> Self {
        Self {
            pack_id: generate_pack_id(),
            pack_name: truncate_chars(pack_name, MAX_FIELD_CHARS),
            publisher: truncate_chars(publisher, MAX_FIELD_CHARS),
            ..Default::default()
        }
    }

    pub fn with_publisher_email(mut self, email: &str) -> Self {
        self.publisher_email = email.to_string();
        self
    }

    pub fn with_publisher_website(mut self, website: &str) -> Self {
        self.publisher_website = website.to_string();
        self
    }

    pub fn with_android_app_store_link(mut self, link: &str) -> Self {
        self.android_app_store_link = link.to_string();
        self
    }

    pub fn with_ios_app_store_link(mut self, link: &str) -> Self {
        self.ios_app_store_link = link.to_string();
        self
    }

    /// Same links and contact fields, new names and a new pack id.
    pub fn renamed(&self, pack_name: &str, publisher: &str) -> Self {
        Self {
            pack_id: generate_pack_id(),
            pack_name: truncate_chars(pack_name, MAX_FIELD_CHARS),
            publisher: truncate_chars(publisher, MAX_FIELD_CHARS),
            ..self.clone()
        }
    }
}

fn generate_pack_id() -> String {
    format!("{PACK_ID_PREFIX}{}", chrono::Utc::now().timestamp_millis())
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => {
            log::debug!("Truncating {s:?} to {max} characters");
            s[..idx].to_string()
        }
        None => s.to_string(),
    }
}

/// Serialize metadata into the `EXIF` chunk payload:
/// 22-byte prefix followed by compact UTF-8 JSON.
///
/// Name limits are re-applied here so hand-built metadata cannot exceed them.
pub fn build_exif_block(metadata: &StickerMetadata) -> Vec<u8> {
    let mut limited = metadata.clone();
    limited.pack_name = truncate_chars(&metadata.pack_name, MAX_FIELD_CHARS);
    limited.publisher = truncate_chars(&metadata.publisher, MAX_FIELD_CHARS);

    // A struct of plain strings always serializes
    let json = serde_json::to_vec(&limited).unwrap_or_default();

    let mut block = Vec::with_capacity(EXIF_PREFIX_LEN + json.len());
    block.extend_from_slice(&EXIF_PREFIX);
    LittleEndian::write_u32(
        &mut block[JSON_LEN_OFFSET..JSON_LEN_OFFSET + 4],
        json.len() as u32,
    );
    block.extend_from_slice(&json);
    block
}

/// Decode an `EXIF` chunk payload written by [`build_exif_block`] (or by
/// other sticker tools using the same layout).
///
/// Returns `None` if the payload is not a little-endian TIFF header followed
/// by sticker JSON.
pub fn decode_exif_block(payload: &[u8]) -> Option<StickerMetadata> {
    if payload.len() < EXIF_PREFIX_LEN || payload[0..4] != EXIF_PREFIX[0..4] {
        return None;
    }

    let json = &payload[EXIF_PREFIX_LEN..];
    // Some writers leave the length field zeroed; trust the chunk size then
    let declared = LittleEndian::read_u32(&payload[JSON_LEN_OFFSET..JSON_LEN_OFFSET + 4]) as usize;
    let json = if declared > 0 && declared <= json.len() {
        &json[..declared]
    } else {
        json
    };

    match serde_json::from_slice::<StickerMetadata>(json) {
        Ok(meta) => Some(meta),
        Err(e) => {
            log::debug!("EXIF payload is not sticker metadata: {e}");
            None
        }
    }
}
