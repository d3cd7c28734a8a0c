use std::path::Path;

use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};

use crate::error::{PaintError, Result};
use crate::ops::shapes::Coverage;

/// Lay out one line of text with kerning.  Returns glyphs positioned relative
/// to the line's baseline origin and the line's advance width.
pub fn layout_line(font: &FontArc, text: &str, font_size: f32) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(font_size);
    let mut glyphs = Vec::with_capacity(text.len());
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }

    (glyphs, cursor_x)
}

/// Rasterize `text` with its first baseline at `(origin_x, origin_y)`.
///
/// Lines split on `'\n'` advance by the font's line height.  Coverage is
/// clipped to the canvas; overlapping glyph pixels keep the maximum.
pub fn rasterize_text(
    font: &FontArc,
    text: &str,
    font_size: f32,
    origin_x: f32,
    origin_y: f32,
    canvas_w: u32,
    canvas_h: u32,
) -> Coverage {
    let line_height = font.as_scaled(font_size).height();

    let mut placed = Vec::new();
    for (line_idx, line) in text.split('\n').enumerate() {
        let baseline = origin_y + line_idx as f32 * line_height;
        let (glyphs, _) = layout_line(font, line, font_size);
        for (id, gx) in glyphs {
            let glyph = id.with_scale_and_position(font_size, point(origin_x + gx, baseline));
            if let Some(outlined) = font.outline_glyph(glyph) {
                placed.push(outlined);
            }
        }
    }
    if placed.is_empty() {
        return Coverage::default();
    }

    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for g in &placed {
        let b = g.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    let x0 = (min_x.floor() as i64).max(0);
    let y0 = (min_y.floor() as i64).max(0);
    let x1 = (max_x.ceil() as i64).min(canvas_w as i64);
    let y1 = (max_y.ceil() as i64).min(canvas_h as i64);
    if x1 <= x0 || y1 <= y0 {
        return Coverage::default();
    }
    let width = (x1 - x0) as u32;
    let height = (y1 - y0) as u32;
    let mut data = vec![0.0f32; width as usize * height as usize];

    for g in &placed {
        let b = g.px_bounds();
        let gx0 = b.min.x.floor() as i64;
        let gy0 = b.min.y.floor() as i64;
        g.draw(|px, py, cov| {
            let cx = gx0 + px as i64 - x0;
            let cy = gy0 + py as i64 - y0;
            if cx >= 0 && cy >= 0 && cx < width as i64 && cy < height as i64 {
                let idx = cy as usize * width as usize + cx as usize;
                data[idx] = data[idx].max(cov.clamp(0.0, 1.0));
            }
        });
    }

    Coverage {
        x0: x0 as u32,
        y0: y0 as u32,
        width,
        height,
        data,
    }
}

/// Load a font by family name, weight, and style from the system.
/// `weight` is a CSS-style weight value (100=Thin, 400=Regular, 700=Bold, etc.)
/// Returns None if the font cannot be found.
pub fn load_system_font(family: &str, weight: u16, italic: bool) -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::{Properties, Style, Weight};
    use font_kit::source::SystemSource;

    let mut props = Properties::new();
    props.weight = Weight(weight as f32);
    if italic {
        props.style = Style::Italic;
    }

    let family = match family.trim() {
        "sans-serif" => FamilyName::SansSerif,
        "serif" => FamilyName::Serif,
        "monospace" => FamilyName::Monospace,
        other => FamilyName::Title(other.to_string()),
    };

    let handle = SystemSource::new().select_best_match(&[family], &props).ok()?;
    let font_data = handle.load().ok()?;
    let bytes: Vec<u8> = (*font_data.copy_font_data()?).clone();
    FontArc::try_from_vec(bytes).ok()
}

/// First loadable family from a comma-separated preference list, falling
/// back to the system sans-serif.
pub fn load_preferred_font(families: &str) -> Option<FontArc> {
    families
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .chain(std::iter::once("sans-serif"))
        .find_map(|family| load_system_font(family, 400, false))
}

/// Load a TrueType/OpenType font file.
pub fn load_font_file(path: &Path) -> Result<FontArc> {
    let bytes = std::fs::read(path)?;
    FontArc::try_from_vec(bytes)
        .map_err(|e| PaintError::FontUnavailable(format!("{}: {}", path.display(), e)))
}
