//! EPUB container access: ZIP → container.xml → OPF package (metadata + manifest).
//!
//! Only what the asset pipelines need is parsed: Dublin Core fields, the
//! EPUB2 cover meta, and the manifest in document order. Content documents
//! and navigation are never touched.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;

use crate::error::ReadError;
use crate::security::ArchiveLimits;

/// Dublin Core metadata plus the EPUB2 cover reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    pub title: Option<String>,
    pub creator: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub subjects: Vec<String>,
    /// Manifest id named by `<meta name="cover" content="..."/>`.
    pub cover_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// Full path inside the archive (already resolved against the OPF directory).
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

impl ManifestItem {
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .map_or(false, |p| p.split_whitespace().any(|p| p == property))
    }

    /// Last path segment of the href.
    pub fn file_name(&self) -> &str {
        self.href.rsplit('/').next().unwrap_or(&self.href)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    pub metadata: PackageMetadata,
    pub manifest: Vec<ManifestItem>,
}

impl Package {
    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    pub fn images(&self) -> impl Iterator<Item = &ManifestItem> {
        self.manifest.iter().filter(|item| item.is_image())
    }
}

/// An opened EPUB with its package document parsed.
pub struct EpubArchive<R: Read + Seek> {
    archive: zip::ZipArchive<R>,
    package: Package,
    limits: ArchiveLimits,
}

impl EpubArchive<BufReader<File>> {
    pub fn open(path: &Path, limits: &ArchiveLimits) -> Result<Self, ReadError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), limits)
    }
}

impl<R: Read + Seek> EpubArchive<R> {
    pub fn from_reader(input: R, limits: &ArchiveLimits) -> Result<Self, ReadError> {
        let mut archive = zip::ZipArchive::new(input)
            .map_err(|e| ReadError::Malformed(format!("Invalid ZIP archive: {e}")))?;
        limits.check_entry_count(archive.len() as u64)?;

        let container = read_entry(&mut archive, "META-INF/container.xml", limits)?;
        let container = String::from_utf8_lossy(&container);
        let opf_path = find_opf_path(&container)?;
        tracing::debug!("Package document at {}", opf_path);

        let opf = read_entry(&mut archive, &opf_path, limits)?;
        let package = parse_opf(&String::from_utf8_lossy(&opf), &opf_path)?;

        Ok(Self {
            archive,
            package,
            limits: limits.clone(),
        })
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn metadata(&self) -> &PackageMetadata {
        &self.package.metadata
    }

    /// Read the raw bytes of an archive entry by its full path.
    pub fn read(&mut self, href: &str) -> Result<Vec<u8>, ReadError> {
        read_entry(&mut self.archive, href, &self.limits)
    }
}

fn read_entry<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    path: &str,
    limits: &ArchiveLimits,
) -> Result<Vec<u8>, ReadError> {
    let mut file = archive
        .by_name(path)
        .map_err(|_| ReadError::MissingContent(format!("Missing file: {path}")))?;

    limits.check_entry(path, file.compressed_size(), file.size())?;

    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)
        .map_err(|e| ReadError::Malformed(format!("Failed to read {path}: {e}")))?;
    Ok(buf)
}

fn find_opf_path(container: &str) -> Result<String, ReadError> {
    let mut reader = XmlReader::from_str(container);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.local_name().as_ref() == b"rootfile" =>
            {
                if let Some(path) = attribute(e, b"full-path") {
                    return Ok(path);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ReadError::Malformed(format!(
                    "Failed to parse container.xml: {e}"
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Err(ReadError::MissingContent(
        "No rootfile found in container.xml".into(),
    ))
}

/// Dublin Core elements captured from `<metadata>`.
#[derive(Clone, Copy)]
enum DcField {
    Title,
    Creator,
    Language,
    Description,
    Subject,
}

impl DcField {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"creator" => Some(Self::Creator),
            b"language" => Some(Self::Language),
            b"description" => Some(Self::Description),
            b"subject" => Some(Self::Subject),
            _ => None,
        }
    }
}

pub(crate) fn parse_opf(content: &str, opf_path: &str) -> Result<Package, ReadError> {
    let opf_dir = opf_path.rfind('/').map(|i| &opf_path[..i + 1]).unwrap_or("");

    let mut reader = XmlReader::from_str(content);
    let mut buf = Vec::new();
    let mut package = Package::default();

    let mut in_metadata = false;
    let mut current: Option<DcField> = None;
    // Open elements nested inside the current DC field, e.g. `<i>`.
    let mut nested = 0usize;
    let mut text = String::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| ReadError::Malformed(format!("Failed to parse OPF: {e}")))?
        {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"metadata" => in_metadata = true,
                b"meta" if in_metadata => read_cover_meta(e, &mut package.metadata),
                b"item" => package.manifest.push(manifest_item(e, opf_dir)),
                _ if current.is_some() => nested += 1,
                name if in_metadata => {
                    current = DcField::from_local_name(name);
                    text.clear();
                }
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"meta" if in_metadata => read_cover_meta(e, &mut package.metadata),
                b"item" => package.manifest.push(manifest_item(e, opf_dir)),
                _ => {}
            },
            Event::Text(ref e) if current.is_some() => {
                text.push_str(&e.unescape().unwrap_or_default());
            }
            Event::CData(ref e) if current.is_some() => {
                text.push_str(&String::from_utf8_lossy(e));
            }
            Event::End(_) if nested > 0 => nested -= 1,
            Event::End(ref e) => {
                if e.local_name().as_ref() == b"metadata" {
                    in_metadata = false;
                }
                if let Some(field) = current.take() {
                    store_field(&mut package.metadata, field, text.trim());
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(package)
}

fn store_field(meta: &mut PackageMetadata, field: DcField, value: &str) {
    if value.is_empty() {
        return;
    }
    let first = |slot: &mut Option<String>| {
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    };
    match field {
        DcField::Title => first(&mut meta.title),
        DcField::Creator => first(&mut meta.creator),
        DcField::Language => first(&mut meta.language),
        DcField::Description => first(&mut meta.description),
        DcField::Subject => meta.subjects.push(value.to_string()),
    }
}

fn read_cover_meta(e: &BytesStart<'_>, meta: &mut PackageMetadata) {
    if attribute(e, b"name").as_deref() == Some("cover") {
        if let Some(id) = attribute(e, b"content") {
            meta.cover_id = Some(id);
        }
    }
}

fn manifest_item(e: &BytesStart<'_>, opf_dir: &str) -> ManifestItem {
    let href = attribute(e, b"href").unwrap_or_default();
    ManifestItem {
        id: attribute(e, b"id").unwrap_or_default(),
        href: resolve_href(opf_dir, &href),
        media_type: attribute(e, b"media-type").unwrap_or_default(),
        properties: attribute(e, b"properties"),
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Join a manifest href onto the OPF directory, decoding `%XX` escapes and
/// collapsing `.`/`..` segments.
fn resolve_href(opf_dir: &str, href: &str) -> String {
    let decoded = percent_encoding::percent_decode_str(href).decode_utf8_lossy();
    let mut parts: Vec<&str> = opf_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}
