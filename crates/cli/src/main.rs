use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use ebook_assets_core::catalog::generate_catalog;
use ebook_assets_core::config::{
    catalog_options_from_config, config_path, cover_options_from_config, load_config, AppConfig,
};
use ebook_assets_core::covers::{extract_all_covers, CoverOutcome, CoverReport};
use ebook_assets_core::progress::{ProgressEvent, ProgressHandler};

type CliResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "ebook-assets")]
#[command(about = "Extract EPUB covers and generate book catalogs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract or synthesize one PNG cover per EPUB
    Covers {
        /// Directory containing EPUB files
        #[arg(long, default_value = "./Bundle Books")]
        epubs_dir: PathBuf,

        /// Directory to write <book-id>.png covers into
        #[arg(long, default_value = "./BookCovers")]
        output_dir: PathBuf,

        /// Do not create placeholder covers for books without one
        #[arg(long)]
        no_placeholders: bool,
    },

    /// Generate the JSON book catalog
    Catalog {
        /// Directory containing EPUB files
        #[arg(long, default_value = "./Bundle Books")]
        epubs_dir: PathBuf,

        /// Output catalog file
        #[arg(short, long, default_value = "./cloud_books_catalog.json")]
        output: PathBuf,

        /// Storage path prefix for EPUB URLs
        #[arg(long, alias = "firebase-path")]
        storage_path: Option<String>,

        /// Directory containing extracted cover images
        #[arg(long, default_value = "./BookCovers")]
        covers_dir: PathBuf,

        /// Format JSON with indentation
        #[arg(long)]
        pretty: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize default config file
    Init,
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Key (dot-separated path)
        key: String,
        /// Value
        value: String,
    },
}

/// Drives an indicatif bar from pipeline progress events.
struct BarProgress(ProgressBar);

impl BarProgress {
    fn new(hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        if let Ok(style) = ProgressStyle::with_template("{prefix} [{bar:30}] {pos}/{len} {msg}") {
            bar.set_style(style.progress_chars("=> "));
        }
        Self(bar)
    }

    fn finish(&self) {
        self.0.finish_and_clear();
    }
}

impl ProgressHandler for BarProgress {
    fn on_progress(&self, event: ProgressEvent) {
        self.0.set_length(event.total);
        self.0.set_prefix(event.stage.as_str());
        self.0.set_position(event.done);
        match event.book {
            Some(book) => self.0.set_message(book),
            None if event.is_finished() => self.0.set_message("done"),
            None => {}
        }
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Covers {
            epubs_dir,
            output_dir,
            no_placeholders,
        } => run_covers(epubs_dir, output_dir, *no_placeholders, cli.json),
        Commands::Catalog {
            epubs_dir,
            output,
            storage_path,
            covers_dir,
            pretty,
        } => run_catalog(
            epubs_dir,
            output,
            storage_path.as_deref(),
            covers_dir,
            *pretty,
            cli.json,
        ),
        Commands::Config { action } => run_config(action, cli.json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_covers(
    epubs_dir: &Path,
    output_dir: &Path,
    no_placeholders: bool,
    json: bool,
) -> CliResult {
    let cfg = load_config();
    let mut opts = cover_options_from_config(&cfg);
    if no_placeholders {
        opts.placeholders = false;
    }

    let progress = BarProgress::new(json);
    let report = extract_all_covers(epubs_dir, output_dir, &opts, Some(&progress));
    progress.finish();
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_cover_report(&report);
    }
    Ok(())
}

fn print_cover_report(report: &CoverReport) {
    for r in &report.results {
        let status = match &r.outcome {
            CoverOutcome::Skipped => "skipped (exists)".to_string(),
            CoverOutcome::Extracted {
                normalized: true,
                bytes,
                ..
            } => format!("extracted ({} bytes)", bytes),
            CoverOutcome::Extracted { bytes, .. } => {
                format!("extracted unprocessed ({} bytes)", bytes)
            }
            CoverOutcome::Placeholder { bytes } => format!("placeholder ({} bytes)", bytes),
            CoverOutcome::NotFound => "no cover found".to_string(),
            CoverOutcome::Failed { error } => format!("failed: {}", error),
        };
        println!("{}: {}", r.book_id, status);
    }

    println!();
    println!("Total EPUBs processed: {}", report.total);
    println!("Covers extracted:      {}", report.extracted);
    println!("Placeholders created:  {}", report.placeholders);
    println!("Skipped (existing):    {}", report.skipped);
    if report.not_found > 0 {
        println!("No cover found:        {}", report.not_found);
    }
    if report.failed > 0 {
        println!("Failed:                {}", report.failed);
    }
    println!("Output directory:      {}", report.output_dir.display());
}

fn run_catalog(
    epubs_dir: &Path,
    output: &Path,
    storage_path: Option<&str>,
    covers_dir: &Path,
    pretty: bool,
    json: bool,
) -> CliResult {
    let cfg = load_config();
    let mut opts = catalog_options_from_config(&cfg);
    if let Some(prefix) = storage_path {
        opts.storage_prefix = prefix.to_string();
    }
    opts.covers_dir = Some(covers_dir.to_path_buf());
    let pretty = pretty || cfg.catalog.pretty;

    let progress = BarProgress::new(json);
    let catalog = generate_catalog(epubs_dir, &opts, Some(&progress));
    progress.finish();
    let catalog = catalog?;

    catalog.write(output, pretty)?;
    let file_size = std::fs::metadata(output)?.len();

    if json {
        let summary = serde_json::json!({
            "output": output,
            "books": catalog.books.len(),
            "collections": catalog.collections.len(),
            "fileSizeBytes": file_size,
            "lastUpdated": catalog.last_updated,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Catalog written to {}", output.display());
        println!("Total books: {}", catalog.books.len());
        println!("Collections: {}", catalog.collections.len());
        println!("File size:   {} bytes", file_size);
    }
    Ok(())
}

fn run_config(action: &ConfigAction, json: bool) -> CliResult {
    match action {
        ConfigAction::Init => {
            let path = config_path().ok_or("Could not determine config directory")?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let toml = toml::to_string_pretty(&AppConfig::default())?;
            std::fs::write(&path, toml)?;
            println!("Wrote default config to {}", path.display());
        }
        ConfigAction::Show => {
            let cfg = load_config();
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                println!("{}", toml::to_string_pretty(&cfg)?);
            }
        }
        ConfigAction::Set { key, value } => {
            let path = config_path().ok_or("Could not determine config directory")?;
            let mut cfg: AppConfig = if path.exists() {
                let s = std::fs::read_to_string(&path)?;
                toml::from_str(&s).unwrap_or_default()
            } else {
                AppConfig::default()
            };

            set_config_key(&mut cfg, key, value)?;

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let toml = toml::to_string_pretty(&cfg)?;
            std::fs::write(&path, toml)?;
            if !json {
                println!("Updated {}", key);
            }
        }
    }
    Ok(())
}

fn set_config_key(cfg: &mut AppConfig, key: &str, value: &str) -> CliResult {
    let parts: Vec<&str> = key.splitn(2, '.').collect();
    match parts.as_slice() {
        ["covers", sub] => match *sub {
            "max_width" => cfg.covers.max_width = value.parse()?,
            "max_height" => cfg.covers.max_height = value.parse()?,
            "placeholder_width" => cfg.covers.placeholder_width = value.parse()?,
            "placeholder_height" => cfg.covers.placeholder_height = value.parse()?,
            "placeholders" => cfg.covers.placeholders = value.parse()?,
            "font_path" => cfg.covers.font_path = Some(value.to_string()),
            _ => return Err(format!("Unknown key: {}", key).into()),
        },
        ["catalog", sub] => match *sub {
            "storage_prefix" => cfg.catalog.storage_prefix = value.to_string(),
            "cover_url_prefix" => cfg.catalog.cover_url_prefix = value.to_string(),
            "default_tags" => {
                cfg.catalog.default_tags = value
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            }
            "pretty" => cfg.catalog.pretty = value.parse()?,
            _ => return Err(format!("Unknown key: {}", key).into()),
        },
        ["security", sub] => match *sub {
            "max_entries" => cfg.security.max_entries = Some(value.parse()?),
            "max_entry_size_mb" => cfg.security.max_entry_size_mb = Some(value.parse()?),
            "max_compression_ratio" => cfg.security.max_compression_ratio = Some(value.parse()?),
            _ => return Err(format!("Unknown key: {}", key).into()),
        },
        _ => return Err(format!("Unknown key: {}", key).into()),
    }
    Ok(())
}
