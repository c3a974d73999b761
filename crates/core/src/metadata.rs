//! Best-effort book metadata with filename fallbacks. Never fails.

use std::path::Path;

use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::epub::EpubArchive;
use crate::security::ArchiveLimits;

pub const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub subjects: Vec<String>,
}

impl BookMetadata {
    /// Title, or the filename-derived title when the package has none.
    pub fn title_or_filename(&self, path: &Path) -> String {
        self.title.clone().unwrap_or_else(|| title_from_filename(path))
    }

    pub fn author_or_unknown(&self) -> String {
        self.author
            .clone()
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
    }
}

/// Read title/author/language/description from an EPUB. Any failure is
/// logged and yields a record holding only the filename-derived title.
pub fn extract_metadata(path: &Path, limits: &ArchiveLimits) -> BookMetadata {
    match EpubArchive::open(path, limits) {
        Ok(epub) => {
            let meta = epub.metadata();
            BookMetadata {
                title: meta.title.as_deref().map(nfc),
                author: meta.creator.as_deref().map(nfc),
                language: meta.language.clone(),
                description: meta.description.as_deref().map(nfc),
                subjects: meta.subjects.clone(),
            }
        }
        Err(e) => {
            tracing::warn!("Could not extract metadata from {}: {}", path.display(), e);
            BookMetadata {
                title: Some(title_from_filename(path)),
                ..BookMetadata::default()
            }
        }
    }
}

/// Lower-cased file stem.
pub fn book_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// `the-time_machine.epub` → `The Time Machine`.
pub fn title_from_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let spaced = nfc(&stem.replace(['-', '_'], " "));
    title_case(&spaced)
}

/// Capitalise the first letter of every word and lower-case the rest.
pub fn title_case(s: &str) -> String {
    s.split_word_bounds()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) if first.is_alphabetic() => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                _ => word.to_string(),
            }
        })
        .collect()
}

fn nfc(s: &str) -> String {
    s.nfc().collect()
}
