use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use wa_sticker::config::Config;
use wa_sticker::container::classify;
use wa_sticker::fallback::Outcome;
use wa_sticker::pipeline::{self, StickerPipeline};
use wa_sticker::provider::{Attachment, FileAttachment, HttpSource, MediaSource, build_client};
use wa_sticker::webp::{self, StickerMetadata};

#[derive(Parser, Debug)]
#[command(
    name = "sticker-cli",
    version,
    about = "WhatsApp sticker toolkit: stamp pack metadata on WebP stickers and convert media through provider chains"
)]
struct Cli {
    /// Media files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Sticker pack name (overrides config)
    #[arg(long, value_name = "NAME")]
    pack: Option<String>,

    /// Sticker publisher (overrides config)
    #[arg(long, value_name = "NAME")]
    author: Option<String>,

    /// Directory for generated files
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out: PathBuf,

    /// Display sticker pack metadata and exit
    #[arg(long = "show-metadata")]
    show_metadata: bool,

    /// Replace sticker metadata, optionally as --wm="pack|author"
    #[arg(long, value_name = "PACK|AUTHOR", num_args = 0..=1, require_equals = true, default_missing_value = "")]
    wm: Option<String>,

    /// Convert WebP stickers to PNG images
    #[arg(long = "to-image")]
    to_image: bool,

    /// Extract the first frame of each WebP as a still WebP
    #[arg(long)]
    still: bool,

    /// Create a static text sticker
    #[arg(long, value_name = "TEXT")]
    brat: Option<String>,

    /// Create an animated text sticker
    #[arg(long, value_name = "TEXT")]
    bratvid: Option<String>,

    /// Mix two emoji into a sticker (e.g. "😂+😍")
    #[arg(long, value_name = "EMOJI")]
    emojimix: Option<String>,

    /// Download media from a URL and make it a sticker
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// What happened to one input.
struct Report {
    input: String,
    output: Option<PathBuf>,
    source: Option<String>,
    failures: Vec<String>,
    error: Option<String>,
}

impl Report {
    fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: None,
            source: None,
            failures: Vec::new(),
            error: None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "input": self.input,
            "output": self.output.as_ref().map(|p| p.display().to_string()),
            "source": self.source,
            "failures": self.failures,
            "error": self.error,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let generates = cli.brat.is_some()
        || cli.bratvid.is_some()
        || cli.emojimix.is_some()
        || cli.url.is_some();
    if !generates && cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    // Handle --show-metadata
    if cli.show_metadata {
        let files = pipeline::collect_media(&cli.paths);
        if files.is_empty() {
            anyhow::bail!("No supported media files found in the specified paths.");
        }
        let mut shown = Vec::new();
        for path in &files {
            let bytes = FileAttachment::new(path).download().await?;
            let meta = webp::read_sticker_metadata(&bytes).ok().flatten();
            if cli.json {
                shown.push(serde_json::json!({
                    "path": path.display().to_string(),
                    "metadata": meta,
                }));
            } else {
                print_metadata(path, meta.as_ref());
            }
        }
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    let metadata = sticker_metadata(&cli, &config);
    let sticker_pipeline = StickerPipeline::from_config(&config);

    std::fs::create_dir_all(&cli.out)
        .with_context(|| format!("Failed to create {}", cli.out.display()))?;

    let mut reports = Vec::new();

    if let Some(ref text) = cli.brat {
        let result = sticker_pipeline.text_sticker(text, &metadata).await;
        reports.push(save(Report::new(format!("brat:{text}")), result, &cli.out.join("brat.webp")));
    }

    if let Some(ref text) = cli.bratvid {
        let result = sticker_pipeline.animated_text_sticker(text, &metadata).await;
        reports.push(save(Report::new(format!("bratvid:{text}")), result, &cli.out.join("bratvid.webp")));
    }

    if let Some(ref emoji) = cli.emojimix {
        let result = sticker_pipeline.emoji_mix(emoji, &metadata).await;
        reports.push(save(Report::new(format!("emojimix:{emoji}")), result, &cli.out.join("emojimix.webp")));
    }

    if let Some(ref url) = cli.url {
        let source = HttpSource::new(build_client(&config.http));
        let report = match source.fetch_bytes(url).await {
            Ok(bytes) => {
                let result = sticker_pipeline.make_sticker(bytes, &metadata).await;
                save(Report::new(url.as_str()), result, &cli.out.join("sticker.webp"))
            }
            Err(e) => Report {
                error: Some(format!("{e:#}")),
                ..Report::new(url.as_str())
            },
        };
        reports.push(report);
    }

    let files = pipeline::collect_media(&cli.paths);
    if !cli.paths.is_empty() && files.is_empty() {
        log::warn!("No supported media files found in the specified paths.");
    }
    let total = files.len();

    for (i, path) in files.iter().enumerate() {
        log::info!("[{}/{}] Processing: {}", i + 1, total, path.display());
        let report = process_file(&cli, &config, &sticker_pipeline, &metadata, path).await;
        reports.push(report);
    }

    for report in &reports {
        match (&report.error, &report.output) {
            (Some(err), _) => log::error!("  {}: {err}", report.input),
            (None, Some(out)) => log::info!(
                "  {} → {} ({})",
                report.input,
                out.display(),
                report.source.as_deref().unwrap_or("input")
            ),
            (None, None) => {}
        }
    }

    // JSON output
    if cli.json {
        let json: Vec<_> = reports.iter().map(Report::to_json).collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
    }

    // Summary
    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    log::info!(
        "Done: {} succeeded, {failed} failed out of {}",
        reports.len() - failed,
        reports.len()
    );

    Ok(())
}

/// Metadata from config defaults, with `--pack`/`--author` applied.
fn sticker_metadata(cli: &Cli, config: &Config) -> StickerMetadata {
    let defaults = config.sticker.metadata();
    if cli.pack.is_none() && cli.author.is_none() {
        return defaults;
    }
    let pack = cli.pack.as_deref().unwrap_or(&config.sticker.pack_name);
    let author = cli.author.as_deref().unwrap_or(&config.sticker.publisher);
    defaults.renamed(pack, author)
}

async fn process_file(
    cli: &Cli,
    config: &Config,
    sticker_pipeline: &StickerPipeline,
    metadata: &StickerMetadata,
    path: &Path,
) -> Report {
    let report = Report::new(path.display().to_string());

    let bytes = match FileAttachment::new(path).download().await {
        Ok(bytes) => bytes,
        Err(e) => {
            return Report {
                error: Some(format!("{e:#}")),
                ..report
            };
        }
    };

    if cli.still {
        let out = output_path(&cli.out, path, "still", "webp");
        return match webp::extract_still_frame(&bytes) {
            Ok(frame) => write_output(report, &frame, &out),
            Err(e) => Report {
                error: Some(e.to_string()),
                ..report
            },
        };
    }

    if cli.to_image {
        let result = sticker_pipeline.to_image(bytes).await;
        return match result {
            Ok(outcome) => {
                // A still-frame fallback is WebP, not PNG
                let ext = classify(&outcome.bytes).extension();
                let out = output_path(&cli.out, path, "image", ext);
                save(report, Ok(outcome), &out)
            }
            Err(e) => save(report, Err(e), Path::new("")),
        };
    }

    let out = output_path(&cli.out, path, "sticker", "webp");
    if let Some(ref args) = cli.wm {
        let (pack, author) = pipeline::parse_watermark_args(Some(args), &config.sticker);
        let wm_metadata = metadata.renamed(&pack, &author);
        let result = sticker_pipeline.watermark(bytes, &wm_metadata).await;
        return save(report, result, &out);
    }

    let result = sticker_pipeline.make_sticker(bytes, metadata).await;
    save(report, result, &out)
}

/// `<out>/<stem>.<suffix>.<ext>`
fn output_path(out_dir: &Path, input: &Path, suffix: &str, ext: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    out_dir.join(format!("{stem}.{suffix}.{ext}"))
}

fn save(report: Report, result: Result<Outcome, wa_sticker::StickerError>, out: &Path) -> Report {
    match result {
        Ok(outcome) => {
            let report = Report {
                source: Some(outcome.source.name().to_string()),
                failures: outcome.failures.iter().map(ToString::to_string).collect(),
                ..report
            };
            write_output(report, &outcome.bytes, out)
        }
        Err(e) => Report {
            error: Some(e.to_string()),
            ..report
        },
    }
}

fn write_output(report: Report, bytes: &[u8], out: &Path) -> Report {
    match std::fs::write(out, bytes) {
        Ok(()) => Report {
            output: Some(out.to_path_buf()),
            ..report
        },
        Err(e) => Report {
            error: Some(format!("Failed to write {}: {e}", out.display())),
            ..report
        },
    }
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Indent for continuation lines.
const INDENT: &str = "                           ";

/// Print sticker pack metadata for a file.
fn print_metadata(path: &Path, meta: Option<&StickerMetadata>) {
    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    let Some(meta) = meta else {
        println!("  {DIM}(no sticker metadata found){RESET}");
        println!();
        return;
    };

    let rows = [
        ("Pack ID", &meta.pack_id),
        ("Pack name", &meta.pack_name),
        ("Publisher", &meta.publisher),
        ("Publisher email", &meta.publisher_email),
        ("Publisher website", &meta.publisher_website),
        ("Android store link", &meta.android_app_store_link),
        ("iOS store link", &meta.ios_app_store_link),
    ];
    for (tag, val) in rows {
        if !val.is_empty() {
            print_row(tag, val);
        }
    }
    println!();
}

/// Print a single row in the metadata table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wm_without_value_leaves_path_positional() {
        let cli = Cli::try_parse_from(["sticker-cli", "--wm", "a.webp"]).unwrap();
        assert_eq!(cli.wm.as_deref(), Some(""));
        assert_eq!(cli.paths, vec![PathBuf::from("a.webp")]);
    }

    #[test]
    fn wm_takes_value_with_equals() {
        let cli = Cli::try_parse_from(["sticker-cli", "--wm=Pack|Me", "a.webp"]).unwrap();
        assert_eq!(cli.wm.as_deref(), Some("Pack|Me"));
        assert_eq!(cli.paths.len(), 1);
    }
}
