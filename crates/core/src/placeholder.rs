//! Synthesized covers for books without embedded art: a vertical gradient
//! picked from a fixed palette by a stable hash of the book id, with the
//! wrapped title and the author drawn centred on top.

use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use sha2::{Digest, Sha256};

use crate::cover::encode_png;
use crate::error::ImageError;
use crate::metadata::UNKNOWN_AUTHOR;

/// Gradient (top, bottom) pairs: purple, pink, green, orange, blue, red.
pub const PALETTE: [([u8; 3], [u8; 3]); 6] = [
    ([139, 92, 246], [124, 58, 237]),
    ([236, 72, 153], [219, 39, 119]),
    ([16, 185, 129], [5, 150, 105]),
    ([245, 158, 11], [217, 119, 6]),
    ([59, 130, 246], [37, 99, 235]),
    ([239, 68, 68], [220, 38, 38]),
];

/// Colour of the last-resort flat cover.
pub const FALLBACK_COLOR: [u8; 3] = [100, 100, 150];

const TITLE_PX: f32 = 24.0;
const AUTHOR_PX: f32 = 16.0;
const TITLE_MAX_LINES: usize = 3;
const SIDE_MARGIN: u32 = 40;
const LINE_HEIGHT: i32 = 30;
const LINE_PITCH: i32 = 35;
const AUTHOR_GAP: i32 = 20;
const AUTHOR_OPACITY: f32 = 200.0 / 255.0;

/// Fonts tried when no font is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/System/Library/Fonts/Helvetica.ttc",
    "/Library/Fonts/Arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Palette slot for a book: first four bytes of SHA-256(id), big-endian,
/// modulo the palette size. Stable across runs and platforms.
pub fn palette_index(book_id: &str) -> usize {
    let digest = Sha256::digest(book_id.as_bytes());
    let n = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    n as usize % PALETTE.len()
}

/// Load the configured font, else the first system font that parses.
pub fn load_font(configured: Option<&Path>) -> Option<FontVec> {
    let candidates = configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(SYSTEM_FONTS.iter().map(PathBuf::from));

    for path in candidates {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        match FontVec::try_from_vec_and_index(bytes, 0) {
            Ok(font) => {
                tracing::debug!("Placeholder font: {}", path.display());
                return Some(font);
            }
            Err(e) => tracing::warn!("Unusable font {}: {}", path.display(), e),
        }
    }
    tracing::debug!("No font available, placeholders will carry no text");
    None
}

/// Render a placeholder PNG. Failures while drawing fall back to a flat
/// rectangle of the same size.
pub fn render_placeholder(
    book_id: &str,
    title: &str,
    author: &str,
    width: u32,
    height: u32,
    font: Option<&FontVec>,
) -> Result<Vec<u8>, ImageError> {
    let drawn = draw_placeholder(book_id, title, author, width, height, font)
        .and_then(|img| encode_png(&img));
    match drawn {
        Ok(png) => Ok(png),
        Err(e) => {
            tracing::warn!("Placeholder for {} failed, using flat cover: {}", book_id, e);
            flat_cover(width, height)
        }
    }
}

pub fn flat_cover(width: u32, height: u32) -> Result<Vec<u8>, ImageError> {
    encode_png(&RgbImage::from_pixel(width, height, Rgb(FALLBACK_COLOR)))
}

fn draw_placeholder(
    book_id: &str,
    title: &str,
    author: &str,
    width: u32,
    height: u32,
    font: Option<&FontVec>,
) -> Result<RgbImage, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::Placeholder(format!(
            "invalid size {width}x{height}"
        )));
    }

    let mut img = gradient(PALETTE[palette_index(book_id)], width, height);
    let Some(font) = font else {
        return Ok(img);
    };

    let title_scale = PxScale::from(TITLE_PX);
    let max_line = width.saturating_sub(SIDE_MARGIN) as f32;
    let lines = wrap_words(title, |s| text_width(font, title_scale, s), max_line);

    let mut y = height as i32 / 2 - (lines.len() as i32 * LINE_HEIGHT) / 2;
    for line in &lines {
        let x = centred_x(width, text_width(font, title_scale, line));
        draw_text(&mut img, font, title_scale, x, y, line, 1.0);
        y += LINE_PITCH;
    }

    if !author.is_empty() && author != UNKNOWN_AUTHOR {
        let author_scale = PxScale::from(AUTHOR_PX);
        let x = centred_x(width, text_width(font, author_scale, author));
        draw_text(&mut img, font, author_scale, x, y + AUTHOR_GAP, author, AUTHOR_OPACITY);
    }

    Ok(img)
}

fn gradient((top, bottom): ([u8; 3], [u8; 3]), width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::new(width, height);
    for y in 0..height {
        let ratio = y as f32 / height as f32;
        let mix = |i: usize| (top[i] as f32 + (bottom[i] as f32 - top[i] as f32) * ratio) as u8;
        let row = Rgb([mix(0), mix(1), mix(2)]);
        for x in 0..width {
            img.put_pixel(x, y, row);
        }
    }
    img
}

/// Greedy word wrap; a single word wider than `max` gets its own line.
/// At most three lines are kept.
fn wrap_words(text: &str, measure: impl Fn(&str) -> f32, max: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) <= max {
            current = candidate;
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.truncate(TITLE_MAX_LINES);
    lines
}

fn centred_x(width: u32, text_width: f32) -> i32 {
    ((width as f32 - text_width) / 2.0).floor() as i32
}

fn text_width(font: &FontVec, scale: PxScale, text: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0;
    let mut prev = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Draw white text with its top-left corner at (`x`, `top`).
fn draw_text(
    img: &mut RgbImage,
    font: &FontVec,
    scale: PxScale,
    x: i32,
    top: i32,
    text: &str,
    opacity: f32,
) {
    let scaled = font.as_scaled(scale);
    let baseline = top as f32 + scaled.ascent();
    let mut caret = x as f32;
    let mut prev = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(p) = prev {
            caret += scaled.kern(p, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);
        prev = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let px = bounds.min.x as i32 + gx as i32;
            let py = bounds.min.y as i32 + gy as i32;
            if px < 0 || py < 0 || px >= img.width() as i32 || py >= img.height() as i32 {
                return;
            }
            let alpha = (coverage * opacity).clamp(0.0, 1.0);
            let pixel = img.get_pixel_mut(px as u32, py as u32);
            for channel in pixel.0.iter_mut() {
                *channel = (*channel as f32 + (255.0 - *channel as f32) * alpha) as u8;
            }
        });
    }
}
