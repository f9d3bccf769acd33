// ============================================================================
// TEXT — system font lookup and glyph rasterization for text annotations
// ============================================================================

use std::sync::OnceLock;

use ab_glyph::{Font, FontArc, GlyphId, ScaleFont, point};
use image::{Rgba, RgbaImage};

use crate::canvas::{BlendMode, blend_pixel};

/// Horizontal placement of each line relative to the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAlignment {
    Left,
    Center,
}

/// Block metrics returned by [`measure_text`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextMetrics {
    pub width: f32,
    pub height: f32,
    pub ascent: f32,
    pub line_height: f32,
}

/// Lay out a single line of text at x=0, returning `(glyph, x)` pairs and the
/// total advance.
fn layout_line(font: &FontArc, line: &str, font_size: f32) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(font_size);
    let mut glyphs = Vec::with_capacity(line.len());
    let mut cursor_x = 0.0f32;
    let mut last: Option<GlyphId> = None;
    for ch in line.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = last {
            cursor_x += scaled.kern(prev, id);
        }
        glyphs.push((id, cursor_x));
        cursor_x += scaled.h_advance(id);
        last = Some(id);
    }
    (glyphs, cursor_x)
}

/// Size of a (possibly multi-line) block of text.
pub fn measure_text(font: &FontArc, text: &str, font_size: f32) -> TextMetrics {
    let scaled = font.as_scaled(font_size);
    let line_height = scaled.height();
    let mut width = 0.0f32;
    let mut lines = 0usize;
    for line in text.split('\n') {
        width = width.max(layout_line(font, line, font_size).1);
        lines += 1;
    }
    TextMetrics {
        width,
        height: line_height * lines as f32,
        ascent: scaled.ascent(),
        line_height,
    }
}

/// Rasterize `text` onto `img`.  `(origin_x, origin_y)` is the top of the
/// first line; with [`TextAlignment::Center`] it is the horizontal center.
/// Glyph coverage is composited source-over in `color`.
pub fn draw_text(
    img: &mut RgbaImage,
    font: &FontArc,
    text: &str,
    font_size: f32,
    origin_x: f32,
    origin_y: f32,
    color: [u8; 4],
    alignment: TextAlignment,
) {
    if text.is_empty() || font_size <= 0.0 {
        return;
    }
    let scaled = font.as_scaled(font_size);
    let ascent = scaled.ascent();
    let line_height = scaled.height();
    let (w, h) = (img.width() as i64, img.height() as i64);

    for (line_idx, line) in text.split('\n').enumerate() {
        let (glyphs, line_width) = layout_line(font, line, font_size);
        let x_offset = match alignment {
            TextAlignment::Left => 0.0,
            TextAlignment::Center => -line_width * 0.5,
        };
        let baseline = origin_y + ascent + line_idx as f32 * line_height;

        for (id, gx) in glyphs {
            let glyph = id.with_scale_and_position(font_size, point(origin_x + x_offset + gx, baseline));
            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = bounds.min.x as i64 + px as i64;
                let y = bounds.min.y as i64 + py as i64;
                if x < 0 || y < 0 || x >= w || y >= h || coverage <= 0.0 {
                    return;
                }
                let (x, y) = (x as u32, y as u32);
                let base = *img.get_pixel(x, y);
                img.put_pixel(x, y, blend_pixel(base, Rgba(color), BlendMode::Normal, coverage.min(1.0)));
            });
        }
    }
}

/// The process-wide default sans-serif face, discovered once.  `None` when
/// the system has no usable font; callers then draw no glyphs.
pub fn default_font() -> Option<&'static FontArc> {
    static FONT: OnceLock<Option<FontArc>> = OnceLock::new();
    FONT.get_or_init(|| {
        let font = load_default_sans();
        if font.is_none() {
            crate::log_warn!("No system sans-serif font found; text annotations will render without glyphs");
        }
        font
    })
    .as_ref()
}

fn load_default_sans() -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::Properties;
    use font_kit::source::SystemSource;

    let source = SystemSource::new();
    let handle = source
        .select_best_match(&[FamilyName::SansSerif], &Properties::new())
        .ok()?;
    let font = handle.load().ok()?;
    let data = font.copy_font_data()?;
    FontArc::try_from_vec((*data).clone()).ok()
}
