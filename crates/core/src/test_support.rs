//! Builds small in-memory EPUB containers for unit tests.

use std::io::{Cursor, Write};
use std::path::Path;

struct Item {
    id: String,
    href: String,
    media_type: String,
    properties: Option<String>,
    data: Vec<u8>,
}

#[derive(Default)]
pub(crate) struct EpubBuilder {
    title: Option<String>,
    creator: Option<String>,
    description: Option<String>,
    cover_meta: Option<String>,
    items: Vec<Item>,
    skip_container: bool,
}

impl EpubBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn creator(mut self, creator: &str) -> Self {
        self.creator = Some(creator.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Plain image item; media type guessed from the extension.
    pub fn image(self, href: &str, data: &[u8]) -> Self {
        self.item(href, data, None)
    }

    /// Image flagged with `properties="cover-image"`.
    pub fn cover_image(self, href: &str, data: &[u8]) -> Self {
        self.item(href, data, Some("cover-image"))
    }

    /// Image referenced by `<meta name="cover">`.
    pub fn meta_cover(mut self, href: &str, data: &[u8]) -> Self {
        self = self.item(href, data, None);
        self.cover_meta = self.items.last().map(|i| i.id.clone());
        self
    }

    pub fn without_container(mut self) -> Self {
        self.skip_container = true;
        self
    }

    fn item(mut self, href: &str, data: &[u8], properties: Option<&str>) -> Self {
        let ext = href.rsplit('.').next().unwrap_or_default().to_lowercase();
        let media_type = match ext.as_str() {
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "bmp" => "image/bmp",
            "jpg" | "jpeg" => "image/jpeg",
            _ => "application/octet-stream",
        };
        self.items.push(Item {
            id: format!("item{}", self.items.len() + 1),
            href: href.to_string(),
            media_type: media_type.to_string(),
            properties: properties.map(String::from),
            data: data.to_vec(),
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let stored: zip::write::FileOptions<'_, ()> = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        if !self.skip_container {
            zip.start_file("META-INF/container.xml", stored).unwrap();
            zip.write_all(
                br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
            )
            .unwrap();
        }

        zip.start_file("OEBPS/content.opf", stored).unwrap();
        zip.write_all(self.opf().as_bytes()).unwrap();

        for item in &self.items {
            zip.start_file(format!("OEBPS/{}", item.href), stored).unwrap();
            zip.write_all(&item.data).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.build()).unwrap();
    }

    fn opf(&self) -> String {
        let mut meta = String::new();
        if let Some(t) = &self.title {
            meta.push_str(&format!("<dc:title>{t}</dc:title>"));
        }
        if let Some(c) = &self.creator {
            meta.push_str(&format!("<dc:creator>{c}</dc:creator>"));
        }
        if let Some(d) = &self.description {
            meta.push_str(&format!("<dc:description>{d}</dc:description>"));
        }
        if let Some(id) = &self.cover_meta {
            meta.push_str(&format!(r#"<meta name="cover" content="{id}"/>"#));
        }

        let mut manifest = String::new();
        for item in &self.items {
            let props = item
                .properties
                .as_deref()
                .map(|p| format!(r#" properties="{p}""#))
                .unwrap_or_default();
            manifest.push_str(&format!(
                r#"<item id="{}" href="{}" media-type="{}"{}/>"#,
                item.id, item.href, item.media_type, props
            ));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
<metadata xmlns:dc="http://purl.org/dc/elements/1.1/">{meta}</metadata>
<manifest>{manifest}</manifest>
<spine/>
</package>"#
        )
    }
}

/// Encode a solid-colour PNG of the given size.
pub(crate) fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    image_bytes(width, height, rgba, image::ImageFormat::Png)
}

/// Encode a solid-colour image in any format the `image` features enable.
pub(crate) fn image_bytes(
    width: u32,
    height: u32,
    rgba: [u8; 4],
    format: image::ImageFormat,
) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}
