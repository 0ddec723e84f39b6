//! The printed book cover: flat colour with two centred lines of text.

use ab_glyph::{Font, FontArc, Glyph, PxScale, ScaleFont, point};
use image::RgbaImage;

use crate::data_structures::color::Color;

#[derive(Clone, Debug, PartialEq)]
pub struct CoverArt {
    pub size: u32,
    pub color: Color,
    pub title: String,
    pub subtitle: String,
    pub title_px: f32,
    pub subtitle_px: f32,
}

impl CoverArt {
    pub fn new(color: Color, title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            size: 1024,
            color,
            title: title.into(),
            subtitle: subtitle.into(),
            title_px: 90.0,
            subtitle_px: 80.0,
        }
    }
}

/// One centred line of text. `width` is zero when no font was available
/// to measure it.
#[derive(Clone, Debug, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub px: f32,
    pub center_x: f32,
    pub baseline: f32,
    pub width: f32,
}

pub fn cover_layout(art: &CoverArt, font: Option<&FontArc>) -> [TextLine; 2] {
    let size = art.size as f32;
    let line = |text: &str, px: f32, baseline: f32| TextLine {
        text: text.to_string(),
        px,
        center_x: size / 2.0,
        baseline,
        width: font.map_or(0.0, |f| measure(f, text, px)),
    };
    [
        line(&art.title, art.title_px, size * 0.42),
        line(&art.subtitle, art.subtitle_px, size * 0.53),
    ]
}

/// The lettering font compiled into the binary. The same file ships as
/// `assets/fonts/cover.ttf`.
pub fn builtin_font() -> anyhow::Result<FontArc> {
    let bytes: &'static [u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/fonts/cover.ttf"));
    Ok(FontArc::try_from_slice(bytes)?)
}

/// Renders the cover. Without a font only the background is painted.
pub fn render_cover(art: &CoverArt, font: Option<&FontArc>) -> RgbaImage {
    let size = art.size.max(1);
    let mut image = RgbaImage::from_pixel(size, size, art.color.to_rgba8());
    let Some(font) = font else {
        return image;
    };
    for line in cover_layout(art, Some(font)) {
        draw_line(&mut image, font, &line);
    }
    image
}

/// CSS pixel sizes are em sizes; ab_glyph scales by ascent-to-descent height.
pub fn scale_for(font: &FontArc, px: f32) -> PxScale {
    let units_per_em = font.units_per_em().unwrap_or(1.0);
    PxScale::from(px * font.height_unscaled() / units_per_em)
}

fn measure(font: &FontArc, text: &str, px: f32) -> f32 {
    let scaled = font.as_scaled(scale_for(font, px));
    let mut width = 0.0;
    let mut prev = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

fn draw_line(image: &mut RgbaImage, font: &FontArc, line: &TextLine) {
    let scale = scale_for(font, line.px);
    let scaled = font.as_scaled(scale);
    let (width, height) = image.dimensions();
    let mut pen_x = line.center_x - line.width / 2.0;
    let mut prev = None;
    for ch in line.text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            pen_x += scaled.kern(prev, id);
        }
        let glyph = Glyph {
            id,
            scale,
            position: point(pen_x, line.baseline),
        };
        if let Some(outline) = font.outline_glyph(glyph) {
            let bounds = outline.px_bounds();
            outline.draw(|x, y, coverage| {
                let px = bounds.min.x as i32 + x as i32;
                let py = bounds.min.y as i32 + y as i32;
                if px < 0 || py < 0 || px as u32 >= width || py as u32 >= height {
                    return;
                }
                let pixel = image.get_pixel_mut(px as u32, py as u32);
                let keep = 1.0 - coverage.clamp(0.0, 1.0);
                for c in pixel.0.iter_mut().take(3) {
                    *c = (*c as f32 * keep).round() as u8;
                }
            });
        }
        pen_x += scaled.h_advance(id);
        prev = Some(id);
    }
}

