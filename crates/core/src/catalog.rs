//! Catalog document: book records, derived collections, JSON output.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::{guess_age_rating, guess_genre, AgeRating};
use crate::error::{AssetError, CatalogError};
use crate::metadata::{book_id, extract_metadata};
use crate::progress::{book_progress, ProgressHandler, Stage};
use crate::scan::find_epubs;
use crate::security::ArchiveLimits;

pub const CATALOG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub age: AgeRating,
    pub genre: String,
    pub tags: Vec<String>,
    pub description: String,
    pub storage_url: String,
    pub cover_image_url: Option<String>,
    pub file_size_bytes: u64,
    pub is_featured: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub description: String,
    pub sort_order: u32,
    pub cover_image_url: Option<String>,
    pub book_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub version: u32,
    pub last_updated: String,
    pub collections: Vec<Collection>,
    pub books: Vec<Book>,
}

#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Prefix joined with the EPUB file name to form `storageUrl`.
    pub storage_prefix: String,
    /// Directory holding pre-extracted `<id>.png` covers.
    pub covers_dir: Option<PathBuf>,
    /// Prefix joined with `<id>.png` to form `coverImageUrl`.
    pub cover_url_prefix: String,
    pub tags: Vec<String>,
    pub limits: ArchiveLimits,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            storage_prefix: "epubs".to_string(),
            covers_dir: None,
            cover_url_prefix: "BookCovers".to_string(),
            tags: vec!["Classic".to_string()],
            limits: ArchiveLimits::default(),
        }
    }
}

/// Lower-case, spaces to hyphens, apostrophes dropped.
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-").replace('\'', "")
}

/// Build the catalog record for one EPUB file.
pub fn book_entry(path: &Path, opts: &CatalogOptions) -> Result<Book, AssetError> {
    let metadata = extract_metadata(path, &opts.limits);
    let id = book_id(path);
    let file_size_bytes = std::fs::metadata(path)?.len();

    let title = metadata.title_or_filename(path);
    let author = metadata.author_or_unknown();
    let genre = guess_genre(&title, &author, &opts.tags);
    let age = guess_age_rating(&title, genre, &opts.tags);

    let cover_image_url = opts
        .covers_dir
        .as_deref()
        .filter(|dir| dir.join(format!("{id}.png")).is_file())
        .map(|_| format!("{}/{id}.png", opts.cover_url_prefix));

    let description = metadata
        .description
        .clone()
        .unwrap_or_else(|| format!("A {} book by {}.", genre.to_lowercase(), author));

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Book {
        id,
        title,
        author,
        age,
        genre: genre.to_string(),
        tags: opts.tags.clone(),
        description,
        storage_url: format!("{}/{}", opts.storage_prefix, file_name),
        cover_image_url,
        file_size_bytes,
        is_featured: false,
    })
}

/// "All Books", then non-empty age buckets, then genre buckets with two or
/// more members in alphabetical order.
pub fn build_collections(books: &[Book]) -> Vec<Collection> {
    let mut genres: HashMap<&str, Vec<String>> = HashMap::new();
    let mut ages: HashMap<AgeRating, Vec<String>> = HashMap::new();
    for book in books {
        genres.entry(book.genre.as_str()).or_default().push(book.id.clone());
        ages.entry(book.age).or_default().push(book.id.clone());
    }

    let mut collections = vec![Collection {
        id: "all".to_string(),
        name: "All Books".to_string(),
        description: "Complete library collection".to_string(),
        sort_order: 0,
        cover_image_url: None,
        book_ids: books.iter().map(|b| b.id.clone()).collect(),
    }];

    for age in AgeRating::ALL {
        let Some(ids) = ages.remove(&age).filter(|ids| !ids.is_empty()) else {
            continue;
        };
        collections.push(Collection {
            id: slugify(age.as_str()),
            name: format!("{age} Books"),
            description: format!("Books suitable for {} readers", age.as_str().to_lowercase()),
            sort_order: collections.len() as u32,
            cover_image_url: None,
            book_ids: ids,
        });
    }

    let mut genres: Vec<_> = genres.into_iter().filter(|(_, ids)| ids.len() >= 2).collect();
    genres.sort_by(|a, b| a.0.cmp(b.0));
    for (genre, ids) in genres {
        collections.push(Collection {
            id: slugify(genre),
            name: genre.to_string(),
            description: format!("{genre} books from our collection"),
            sort_order: collections.len() as u32,
            cover_image_url: None,
            book_ids: ids,
        });
    }

    collections
}

impl Catalog {
    pub fn new(books: Vec<Book>, last_updated: String) -> Self {
        let collections = build_collections(&books);
        Self {
            version: CATALOG_VERSION,
            last_updated,
            collections,
            books,
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, CatalogError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    pub fn write(&self, path: &Path, pretty: bool) -> Result<(), CatalogError> {
        let mut out = BufWriter::new(File::create(path)?);
        if pretty {
            serde_json::to_writer_pretty(&mut out, self)?;
        } else {
            serde_json::to_writer(&mut out, self)?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, CatalogError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

/// Scan `epubs_dir` and build the whole catalog, dated today.
pub fn generate_catalog(
    epubs_dir: &Path,
    opts: &CatalogOptions,
    progress: Option<&dyn ProgressHandler>,
) -> Result<Catalog, AssetError> {
    let epubs = find_epubs(epubs_dir)?;
    tracing::info!("Found {} EPUB files in {}", epubs.len(), epubs_dir.display());

    if let Some(dir) = opts.covers_dir.as_deref().filter(|d| d.is_dir()) {
        let covers = std::fs::read_dir(dir)?
            .flatten()
            .filter(|e| e.path().extension().map_or(false, |x| x == "png"))
            .count();
        tracing::info!("Found {} local cover images in {}", covers, dir.display());
    }

    let mut books = Vec::with_capacity(epubs.len());
    for (i, path) in epubs.iter().enumerate() {
        book_progress(progress, Stage::Catalog, i, epubs.len(), Some(path.as_path()));

        match book_entry(path, opts) {
            Ok(book) => {
                tracing::info!(
                    "{} by {} (genre: {}, age: {}, {} bytes)",
                    book.title,
                    book.author,
                    book.genre,
                    book.age,
                    book.file_size_bytes
                );
                books.push(book);
            }
            Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
        }
    }
    book_progress(progress, Stage::Catalog, epubs.len(), epubs.len(), None);

    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    Ok(Catalog::new(books, today))
}
