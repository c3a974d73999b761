//! Locate an embedded cover image and normalize it to a bounded RGB PNG.

use std::io::{Read, Seek};

use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, Rgb, RgbImage};
use serde::Serialize;

use crate::epub::{EpubArchive, ManifestItem, Package};
use crate::error::ImageError;

/// File names conventionally used for cover art.
const COVER_FILE_NAMES: &[&str] = &["cover.jpg", "cover.jpeg", "cover.png", "cover.gif"];

/// Which search rule located the cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverSource {
    /// Manifest item carrying `properties="cover-image"`.
    CoverImageProperty,
    /// Item named by `<meta name="cover">`.
    CoverMeta,
    /// Image whose file name looks like a cover.
    FileName,
    /// First image in the manifest.
    FirstImage,
}

#[derive(Debug, Clone)]
pub struct EmbeddedCover {
    pub href: String,
    pub media_type: String,
    pub data: Vec<u8>,
    pub source: CoverSource,
}

fn looks_like_cover(item: &ManifestItem) -> bool {
    let name = item.file_name();
    COVER_FILE_NAMES.iter().any(|c| c.eq_ignore_ascii_case(name))
        || item.href.to_lowercase().contains("cover")
}

impl CoverSource {
    /// Rules in priority order.
    pub const SEARCH_ORDER: [CoverSource; 4] = [
        CoverSource::CoverImageProperty,
        CoverSource::CoverMeta,
        CoverSource::FileName,
        CoverSource::FirstImage,
    ];

    fn matches(self, item: &ManifestItem, package: &Package) -> bool {
        match self {
            CoverSource::CoverImageProperty => item.has_property("cover-image"),
            CoverSource::CoverMeta => {
                package.metadata.cover_id.as_deref() == Some(item.id.as_str())
            }
            CoverSource::FileName => looks_like_cover(item),
            CoverSource::FirstImage => true,
        }
    }
}

/// Candidate cover items, best first. Only image items qualify, and each
/// appears once, under the first rule that matched it.
pub fn cover_candidates(package: &Package) -> Vec<(&ManifestItem, CoverSource)> {
    let mut out: Vec<(&ManifestItem, CoverSource)> = Vec::new();
    for source in CoverSource::SEARCH_ORDER {
        for item in package.images().filter(|item| source.matches(item, package)) {
            if !out.iter().any(|(seen, _)| seen.id == item.id) {
                out.push((item, source));
            }
        }
    }
    out
}

/// First readable, non-empty cover candidate, or `None` when there is none.
pub fn find_cover<R: Read + Seek>(epub: &mut EpubArchive<R>) -> Option<EmbeddedCover> {
    let candidates: Vec<(ManifestItem, CoverSource)> = cover_candidates(epub.package())
        .into_iter()
        .map(|(item, source)| (item.clone(), source))
        .collect();

    for (item, source) in candidates {
        match epub.read(&item.href) {
            Ok(data) if data.is_empty() => {
                tracing::warn!("Cover candidate {} is empty", item.href);
            }
            Ok(data) => {
                tracing::debug!("Cover {} found via {:?}", item.href, source);
                return Some(EmbeddedCover {
                    href: item.href,
                    media_type: item.media_type,
                    data,
                    source,
                });
            }
            Err(e) => tracing::warn!("Cover candidate {} unreadable: {}", item.href, e),
        }
    }
    None
}

/// Decode, flatten transparency onto white, shrink to fit within
/// `max_width`×`max_height` (never enlarge) and encode as PNG.
pub fn normalize_cover(data: &[u8], max_width: u32, max_height: u32) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(data).map_err(|e| ImageError::Decode(e.to_string()))?;
    let mut rgb = flatten_onto_white(&img);

    if rgb.width() > max_width || rgb.height() > max_height {
        rgb = DynamicImage::ImageRgb8(rgb)
            .resize(max_width, max_height, FilterType::Lanczos3)
            .to_rgb8();
    }

    encode_png(&rgb)
}

fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = a as u16;
        let blend = |c: u8| ((c as u16 * a + 255 * (255 - a)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

pub(crate) fn encode_png(img: &RgbImage) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::ArchiveLimits;
    use crate::test_support::{image_bytes, png_bytes, EpubBuilder};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn open(builder: EpubBuilder) -> EpubArchive<Cursor<Vec<u8>>> {
        EpubArchive::from_reader(Cursor::new(builder.build()), &ArchiveLimits::default()).unwrap()
    }

    #[test]
    fn cover_image_property_wins() {
        let mut epub = open(
            EpubBuilder::new()
                .image("images/first.png", b"first")
                .image("images/cover.jpg", b"named")
                .meta_cover("images/meta.png", b"meta")
                .cover_image("images/front.png", b"explicit"),
        );
        let cover = find_cover(&mut epub).unwrap();
        assert_eq!(cover.source, CoverSource::CoverImageProperty);
        assert_eq!(cover.data, b"explicit");
    }

    #[test]
    fn meta_cover_beats_names() {
        let mut epub = open(
            EpubBuilder::new()
                .image("images/Cover.JPG", b"named")
                .meta_cover("images/art.png", b"meta"),
        );
        let cover = find_cover(&mut epub).unwrap();
        assert_eq!(cover.source, CoverSource::CoverMeta);
        assert_eq!(cover.data, b"meta");
    }

    #[test]
    fn name_match_beats_first_image() {
        let mut epub = open(
            EpubBuilder::new()
                .image("images/plate1.png", b"plate")
                .image("images/bookcover-front.gif", b"named"),
        );
        let cover = find_cover(&mut epub).unwrap();
        assert_eq!(cover.source, CoverSource::FileName);
        assert_eq!(cover.data, b"named");
        assert_eq!(cover.media_type, "image/gif");
    }

    #[test]
    fn falls_back_to_first_image() {
        let mut epub = open(
            EpubBuilder::new()
                .image("images/plate1.png", b"one")
                .image("images/plate2.png", b"two"),
        );
        let cover = find_cover(&mut epub).unwrap();
        assert_eq!(cover.source, CoverSource::FirstImage);
        assert_eq!(cover.data, b"one");
    }

    #[test]
    fn empty_entry_falls_through_to_next_rule() {
        let mut epub = open(
            EpubBuilder::new()
                .cover_image("images/cover.png", b"")
                .image("images/plate1.png", b"plate"),
        );
        let cover = find_cover(&mut epub).unwrap();
        assert_eq!(cover.source, CoverSource::FirstImage);
        assert_eq!(cover.data, b"plate");

        let mut epub = open(EpubBuilder::new().cover_image("images/cover.png", b""));
        assert!(find_cover(&mut epub).is_none());
    }

    #[test]
    fn no_images_no_cover() {
        let mut epub = open(EpubBuilder::new().title("Text only"));
        assert!(find_cover(&mut epub).is_none());
    }

    #[test]
    fn candidates_are_unique() {
        let epub = open(EpubBuilder::new().cover_image("images/cover.png", b"x"));
        let candidates = cover_candidates(epub.package());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].1, CoverSource::CoverImageProperty);
    }

    #[test]
    fn normalize_shrinks_preserving_aspect() {
        let png = png_bytes(600, 600, [10, 20, 30, 255]);
        let out = normalize_cover(&png, 300, 450).unwrap();
        let img = image::load_from_memory(&out).unwrap();
        assert_eq!((img.width(), img.height()), (300, 300));
    }

    #[test]
    fn normalize_never_enlarges() {
        let png = png_bytes(100, 150, [10, 20, 30, 255]);
        let out = normalize_cover(&png, 300, 450).unwrap();
        let img = image::load_from_memory(&out).unwrap();
        assert_eq!((img.width(), img.height()), (100, 150));
    }

    #[test]
    fn transparency_becomes_white() {
        let png = png_bytes(4, 4, [0, 0, 0, 0]);
        let out = normalize_cover(&png, 300, 450).unwrap();
        let img = image::load_from_memory(&out).unwrap();
        assert!(!img.color().has_alpha());
        assert_eq!(img.to_rgb8().get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn webp_and_bmp_covers_decode() {
        for format in [image::ImageFormat::WebP, image::ImageFormat::Bmp] {
            let data = image_bytes(600, 900, [90, 120, 30, 255], format);
            let out = normalize_cover(&data, 300, 450).unwrap();
            let img = image::load_from_memory(&out).unwrap();
            assert_eq!((img.width(), img.height()), (300, 450), "{format:?}");
            assert_eq!(&out[1..4], b"PNG");
        }
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = normalize_cover(b"not an image", 300, 450).unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
    }
}
