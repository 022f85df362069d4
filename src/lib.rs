//! # wa-sticker
//!
//! WhatsApp sticker toolkit. Embeds sticker pack metadata into WebP files,
//! inspects media containers by signature, and turns images, videos, text and
//! emoji into stickers through ordered provider chains with local fallbacks.
//!
//! ## Quick Start
//!
//! Stamping metadata on a WebP needs no network access:
//!
//! ```rust,no_run
//! use wa_sticker::webp::{StickerMetadata, embed_metadata, read_sticker_metadata};
//!
//! fn main() -> anyhow::Result<()> {
//!     let webp = std::fs::read("sticker.webp")?;
//!
//!     let meta = StickerMetadata::new("My Pack", "Me");
//!     let stamped = embed_metadata(&webp, &meta)?;
//!     std::fs::write("stamped.webp", &stamped)?;
//!
//!     let read_back = read_sticker_metadata(&stamped)?;
//!     assert_eq!(read_back.map(|m| m.pack_name), Some("My Pack".into()));
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! The pipeline module wires the configured provider chains together:
//!
//! ```rust,no_run
//! use wa_sticker::config::Config;
//! use wa_sticker::pipeline::{StickerPipeline, collect_media};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load config from file (provider chains, limits, defaults)
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!     let pipeline = StickerPipeline::from_config(&config);
//!     let meta = config.sticker.metadata();
//!
//!     for path in collect_media(&[PathBuf::from("./media")]) {
//!         let bytes = std::fs::read(&path)?;
//!         match pipeline.make_sticker(bytes, &meta).await {
//!             Ok(outcome) => println!("{}: via {}", path.display(), outcome.source.name()),
//!             Err(e) => eprintln!("{}: {e}", path.display()),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Inputs
//!
//! | Container | Sticker path |
//! |-----------|--------------|
//! | WebP | Metadata embedded directly |
//! | PNG, JPEG | Conversion chain, placeholder WebP if all fail |
//! | GIF, MP4 | Conversion chain, no local fallback |
//!
//! ## Modules
//!
//! - [`container`]: signature-based media classification
//! - [`webp`]: RIFF chunk walking, EXIF sticker metadata, still frames
//! - [`fallback`]: ordered provider chains
//! - [`provider`]: provider trait, HTTP and local providers
//! - [`pipeline`]: sticker operations and media collection
//! - [`config`]: configuration types and loading/saving

pub mod config;
pub mod container;
pub mod error;
pub mod fallback;
pub mod pipeline;
pub mod provider;
pub mod webp;

pub use container::{ContainerSignature, classify};
pub use error::{ProviderFailure, StickerError};
pub use fallback::{Outcome, Source, attempt};
pub use webp::{StickerMetadata, embed_metadata, extract_still_frame, read_sticker_metadata};
