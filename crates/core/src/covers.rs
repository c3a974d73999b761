//! Batch cover extraction: one `<book-id>.png` per EPUB, skipping books
//! whose output already exists.

use std::path::{Path, PathBuf};

use ab_glyph::FontVec;
use serde::Serialize;

use crate::cover::{find_cover, normalize_cover, CoverSource};
use crate::epub::EpubArchive;
use crate::error::{AssetError, ImageError};
use crate::metadata::{book_id, extract_metadata};
use crate::placeholder::{load_font, render_placeholder};
use crate::progress::{book_progress, ProgressHandler, Stage};
use crate::scan::find_epubs;
use crate::security::ArchiveLimits;

#[derive(Debug, Clone)]
pub struct CoverOptions {
    /// Bounding box for extracted covers.
    pub max_width: u32,
    pub max_height: u32,
    /// Size of synthesized covers.
    pub placeholder_width: u32,
    pub placeholder_height: u32,
    pub placeholders: bool,
    pub font_path: Option<PathBuf>,
    pub limits: ArchiveLimits,
}

impl Default for CoverOptions {
    fn default() -> Self {
        Self {
            max_width: 300,
            max_height: 450,
            placeholder_width: 300,
            placeholder_height: 450,
            placeholders: true,
            font_path: None,
            limits: ArchiveLimits::default(),
        }
    }
}

/// Where a written cover came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CoverOutcome {
    /// Output already present; nothing written.
    Skipped,
    /// Embedded image written. `normalized` is false when the source
    /// bytes had to be written unchanged.
    Extracted {
        source: CoverSource,
        normalized: bool,
        bytes: u64,
    },
    Placeholder { bytes: u64 },
    /// No embedded image and placeholders disabled.
    NotFound,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverResult {
    pub book_id: String,
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(flatten)]
    pub outcome: CoverOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CoverReport {
    pub output_dir: PathBuf,
    pub total: usize,
    pub extracted: usize,
    pub placeholders: usize,
    pub skipped: usize,
    pub not_found: usize,
    pub failed: usize,
    pub results: Vec<CoverResult>,
}

impl CoverReport {
    fn record(&mut self, result: CoverResult) {
        match result.outcome {
            CoverOutcome::Skipped => self.skipped += 1,
            CoverOutcome::Extracted { .. } => self.extracted += 1,
            CoverOutcome::Placeholder { .. } => self.placeholders += 1,
            CoverOutcome::NotFound => self.not_found += 1,
            CoverOutcome::Failed { .. } => self.failed += 1,
        }
        self.results.push(result);
    }
}

/// Cover bytes for one book before anything is written.
enum CoverImage {
    Embedded {
        png: Vec<u8>,
        source: CoverSource,
        normalized: bool,
    },
    Placeholder(Vec<u8>),
}

/// Extract covers for every EPUB in `epubs_dir` into `output_dir`.
pub fn extract_all_covers(
    epubs_dir: &Path,
    output_dir: &Path,
    opts: &CoverOptions,
    progress: Option<&dyn ProgressHandler>,
) -> Result<CoverReport, AssetError> {
    let epubs = find_epubs(epubs_dir)?;
    std::fs::create_dir_all(output_dir)?;
    tracing::info!(
        "Found {} EPUB files in {}, writing covers to {}",
        epubs.len(),
        epubs_dir.display(),
        output_dir.display()
    );

    let font = if opts.placeholders {
        load_font(opts.font_path.as_deref())
    } else {
        None
    };

    let mut report = CoverReport {
        output_dir: output_dir.to_path_buf(),
        total: epubs.len(),
        ..CoverReport::default()
    };
    for (i, path) in epubs.iter().enumerate() {
        book_progress(progress, Stage::Covers, i, epubs.len(), Some(path.as_path()));
        report.record(process_book(path, output_dir, opts, font.as_ref()));
    }
    book_progress(progress, Stage::Covers, epubs.len(), epubs.len(), None);

    Ok(report)
}

/// Produce and write the cover for one EPUB.
pub fn process_book(
    path: &Path,
    output_dir: &Path,
    opts: &CoverOptions,
    font: Option<&FontVec>,
) -> CoverResult {
    let id = book_id(path);
    let output = output_dir.join(format!("{id}.png"));
    let result = |outcome| CoverResult {
        book_id: id.clone(),
        input: path.to_path_buf(),
        output: output.clone(),
        outcome,
    };

    if output.exists() {
        tracing::info!("{}: cover already exists, skipping", id);
        return result(CoverOutcome::Skipped);
    }

    let image = match cover_image(path, &id, opts, font) {
        Ok(Some(image)) => image,
        Ok(None) => {
            tracing::info!("{}: no cover found", id);
            return result(CoverOutcome::NotFound);
        }
        Err(e) => {
            tracing::warn!("{}: could not build cover: {}", id, e);
            return result(CoverOutcome::Failed { error: e.to_string() });
        }
    };

    let png = match &image {
        CoverImage::Embedded { png, .. } | CoverImage::Placeholder(png) => png,
    };
    if let Err(e) = std::fs::write(&output, png) {
        tracing::warn!("{}: could not write {}: {}", id, output.display(), e);
        return result(CoverOutcome::Failed { error: e.to_string() });
    }

    let bytes = png.len() as u64;
    let outcome = match image {
        CoverImage::Embedded {
            source, normalized, ..
        } => {
            tracing::info!("{}: extracted cover ({} bytes)", id, bytes);
            CoverOutcome::Extracted {
                source,
                normalized,
                bytes,
            }
        }
        CoverImage::Placeholder(_) => {
            tracing::info!("{}: created placeholder cover ({} bytes)", id, bytes);
            CoverOutcome::Placeholder { bytes }
        }
    };
    result(outcome)
}

/// Embedded cover if any, else a placeholder when enabled.
fn cover_image(
    path: &Path,
    id: &str,
    opts: &CoverOptions,
    font: Option<&FontVec>,
) -> Result<Option<CoverImage>, ImageError> {
    let embedded = match EpubArchive::open(path, &opts.limits) {
        Ok(mut epub) => find_cover(&mut epub),
        Err(e) => {
            tracing::warn!("{}: error reading EPUB: {}", id, e);
            None
        }
    };

    if let Some(cover) = embedded {
        let image = match normalize_cover(&cover.data, opts.max_width, opts.max_height) {
            Ok(png) => CoverImage::Embedded {
                png,
                source: cover.source,
                normalized: true,
            },
            Err(e) => {
                tracing::warn!("{}: error resizing {}: {}", id, cover.href, e);
                CoverImage::Embedded {
                    png: cover.data,
                    source: cover.source,
                    normalized: false,
                }
            }
        };
        return Ok(Some(image));
    }

    if !opts.placeholders {
        return Ok(None);
    }

    let metadata = extract_metadata(path, &opts.limits);
    let png = render_placeholder(
        id,
        &metadata.title_or_filename(path),
        &metadata.author_or_unknown(),
        opts.placeholder_width,
        opts.placeholder_height,
        font,
    )?;
    Ok(Some(CoverImage::Placeholder(png)))
}
