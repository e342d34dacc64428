//! reader-compose - Compose a saved article into a reader document

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Parser;
use libreader::compose::{compose, DroppedHighlight};
use libreader::config::Config;
use libreader::error::ComposeError;
use libreader::logging::{LogFormat, LoggingConfig};
use libreader::preferences::StylePreferences;
use libreader::types::{ColorScheme, Document, FontFamily, ItemIdentity, StyleConfig};
use libreader::{ReaderError, Result};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "reader-compose")]
#[command(version, about = "Compose a saved article into a self-contained reader document")]
#[command(long_about = "\
reader-compose - Compose a saved article into a reader document

DESCRIPTION:
    Reads article HTML and an optional highlights file, applies the
    highlights and the reader style, and writes the complete document
    that a rendering surface would load.

    Highlight records that cannot be anchored are dropped and reported;
    they never stop the article from rendering.

USAGE:
    # Compose a file with the configured style
    reader-compose article.html > reader.html

    # Apply highlights and override the style
    reader-compose article.html --highlights highlights.json --font-size 22 --dark

    # Read from stdin and report what happened
    cat article.html | reader-compose --format json | jq '.dropped'

CONFIGURATION:
    Configuration file: ~/.config/reader-bridge/config.toml
    (override with --config or READER_CONFIG)

    [style]
    font_size = 20
    line_height = 150
    margin = 360

    [preferences]
    preferredWebFontSize = 18

EXIT CODES:
    0 - Success
    1 - Error (configuration, serialization)
    3 - Invalid input (empty document, unreadable file, bad option)
")]
struct Cli {
    /// Article HTML file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// JSON array of highlight records
    #[arg(long, value_name = "FILE")]
    highlights: Option<PathBuf>,

    /// Item id (defaults to the input file stem)
    #[arg(long)]
    id: Option<String>,

    /// Item title
    #[arg(long)]
    title: Option<String>,

    /// Original article URL
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Item author
    #[arg(long)]
    author: Option<String>,

    /// Font size in points (overrides preferences)
    #[arg(long, value_name = "PT")]
    font_size: Option<u32>,

    /// Line height in percent (overrides preferences)
    #[arg(long, value_name = "PERCENT")]
    line_height: Option<u32>,

    /// Maximum content width in pixels (overrides preferences)
    #[arg(long, value_name = "PX")]
    margin: Option<u32>,

    /// Font family (inter, system, merriweather, lora, opendyslexic)
    #[arg(long, value_name = "FAMILY")]
    font: Option<String>,

    /// Use the dark palette
    #[arg(long)]
    dark: bool,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "html", value_name = "FORMAT")]
    #[arg(value_parser = ["html", "json"])]
    format: String,

    /// Log format on stderr
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json", "pretty"])]
    log_format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    applied: &'a [String],
    dropped: &'a [DroppedHighlight],
    html: &'a str,
}

fn main() {
    let cli = Cli::parse();

    let format = cli.log_format.parse().unwrap_or(LogFormat::Text);
    LoggingConfig::new(format, "warn".to_string(), cli.verbose).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    let style = resolve_style(&cli, &config)?;
    debug!(?style, "Resolved style");

    let raw_content = match &cli.input {
        Some(path) => read_file(path)?,
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .map_err(|e| ReaderError::InvalidInput(format!("Failed to read stdin: {}", e)))?;
            content
        }
    };
    let highlights_json = match &cli.highlights {
        Some(path) => read_file(path)?,
        None => String::new(),
    };

    let document = Document::new(raw_content, highlights_json, identity(&cli));
    let markup = compose(&document, &style)?;
    info!(
        applied = markup.applied.len(),
        dropped = markup.dropped.len(),
        "Composed {}",
        document.item.id
    );

    match cli.format.as_str() {
        "json" => {
            let report = Report {
                applied: &markup.applied,
                dropped: &markup.dropped,
                html: &markup.html,
            };
            let json = serde_json::to_string_pretty(&report)
                .map_err(ComposeError::Serialize)?;
            println!("{}", json);
        }
        _ => print!("{}", markup.html),
    }

    Ok(())
}

/// Stored preferences first, then explicit options
fn resolve_style(cli: &Cli, config: &Config) -> Result<StyleConfig> {
    let color_scheme = if cli.dark {
        ColorScheme::Dark
    } else {
        config.style.color_scheme
    };
    let mut style = StylePreferences::new(&config.preferences, &config.style).snapshot(color_scheme);

    for (name, value) in [
        ("font-size", cli.font_size),
        ("line-height", cli.line_height),
        ("margin", cli.margin),
    ] {
        if matches!(value, Some(v) if v <= 1) {
            return Err(ReaderError::InvalidInput(format!("--{} must be greater than 1", name)));
        }
    }

    if let Some(font_size) = cli.font_size {
        style.font_size = font_size;
    }
    if let Some(line_height) = cli.line_height {
        style.line_height = line_height;
    }
    if let Some(margin) = cli.margin {
        style.margin = margin;
    }
    if let Some(font) = &cli.font {
        style.font_family = font.parse::<FontFamily>()?;
    }
    Ok(style)
}

fn identity(cli: &Cli) -> ItemIdentity {
    let id = cli.id.clone().unwrap_or_else(|| {
        cli.input
            .as_deref()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "stdin".to_string())
    });
    ItemIdentity {
        slug: id.clone(),
        title: cli.title.clone().unwrap_or_else(|| id.clone()),
        original_url: cli.url.clone().unwrap_or_default(),
        author: cli.author.clone(),
        id,
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| ReaderError::InvalidInput(format!("Failed to read {}: {}", path.display(), e)))
}
