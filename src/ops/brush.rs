// ============================================================================
// STROKE PAINTING — applies pen coverage to a layer buffer
// ============================================================================

use image::{Rgba, RgbaImage};

use crate::canvas::{blend_over, erase_pixel};
use crate::ops::color_mix::MixStrategy;
use crate::ops::shapes::{rasterize, Coverage, Primitive};

/// How covered pixels are written.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PaintMode {
    /// Source-over with the pen color at `alpha × coverage`.
    Over { color: Rgba<u8>, alpha: f32 },
    /// Destination-out: removes alpha proportional to coverage.
    Erase,
    /// Mix the existing paint toward `color` by `alpha × coverage` under
    /// `strategy`.  Pixels without paint fall back to source-over.
    Mix {
        color: Rgba<u8>,
        alpha: f32,
        strategy: MixStrategy,
    },
}

/// Write `coverage` into `pixels` using `mode`.  Returns the number of
/// pixels that changed.
pub fn apply_coverage(pixels: &mut RgbaImage, coverage: &Coverage, mode: PaintMode) -> usize {
    let (w, h) = pixels.dimensions();
    let mut changed = 0;
    for (x, y, c) in coverage.iter() {
        if x >= w || y >= h {
            continue;
        }
        let before = *pixels.get_pixel(x, y);
        let after = paint_pixel(before, c, mode);
        if after != before {
            pixels.put_pixel(x, y, after);
            changed += 1;
        }
    }
    changed
}

#[inline]
fn paint_pixel(base: Rgba<u8>, coverage: f32, mode: PaintMode) -> Rgba<u8> {
    match mode {
        PaintMode::Over { color, alpha } => blend_over(base, color, alpha.clamp(0.0, 1.0) * coverage),
        PaintMode::Erase => erase_pixel(base, coverage),
        PaintMode::Mix { color, alpha, strategy } => {
            let t = alpha.clamp(0.0, 1.0) * coverage;
            if base[3] == 0 {
                blend_over(base, color, t)
            } else {
                strategy.blend(base, color, t)
            }
        }
    }
}

/// Stroke one segment of a freehand path from `from` to `to`.
pub fn stroke_segment(
    pixels: &mut RgbaImage,
    from: (f32, f32),
    to: (f32, f32),
    pen_width: f32,
    mode: PaintMode,
) -> usize {
    let prim = Primitive::Segment { ax: from.0, ay: from.1, bx: to.0, by: to.1 };
    let (w, h) = pixels.dimensions();
    let coverage = rasterize(&prim, pen_width, w, h);
    apply_coverage(pixels, &coverage, mode)
}

/// Stroke an arbitrary primitive (figure tools).
pub fn stroke_primitive(pixels: &mut RgbaImage, prim: &Primitive, pen_width: f32, mode: PaintMode) -> usize {
    let (w, h) = pixels.dimensions();
    let coverage = rasterize(prim, pen_width, w, h);
    apply_coverage(pixels, &coverage, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::TRANSPARENT;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn opaque_stroke_replaces_centre_pixels() {
        let mut img = RgbaImage::from_pixel(100, 100, WHITE);
        let n = stroke_segment(&mut img, (10.0, 10.0), (20.0, 20.0), 1.0, PaintMode::Over { color: RED, alpha: 1.0 });
        assert!(n > 0);
        assert_eq!(*img.get_pixel(15, 15), RED);
        assert_eq!(*img.get_pixel(50, 50), WHITE);
    }

    #[test]
    fn eraser_clears_to_transparent() {
        let mut img = RgbaImage::from_pixel(20, 20, WHITE);
        stroke_segment(&mut img, (5.0, 10.0), (15.0, 10.0), 4.0, PaintMode::Erase);
        assert_eq!(*img.get_pixel(10, 10), TRANSPARENT);
        assert_eq!(*img.get_pixel(10, 2), WHITE);
    }

    #[test]
    fn half_alpha_brush_blends() {
        let mut img = RgbaImage::from_pixel(10, 10, WHITE);
        stroke_segment(&mut img, (5.0, 5.0), (5.0, 5.0), 3.0, PaintMode::Over { color: RED, alpha: 0.5 });
        let p = *img.get_pixel(5, 5);
        assert_eq!(p[0], 255);
        assert!((p[1] as i32 - 128).abs() <= 1);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn mix_mode_uses_strategy_on_painted_pixels() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([200, 100, 255, 255]));
        let mode = PaintMode::Mix { color: Rgba([128, 255, 0, 255]), alpha: 0.5, strategy: MixStrategy::Multiply };
        stroke_segment(&mut img, (5.0, 5.0), (5.0, 5.0), 3.0, mode);
        assert_eq!(*img.get_pixel(5, 5), Rgba([100, 100, 0, 255]));
    }

    #[test]
    fn mix_mode_paints_over_empty_pixels() {
        let mut img = RgbaImage::new(10, 10);
        let mode = PaintMode::Mix { color: RED, alpha: 1.0, strategy: MixStrategy::OkLab };
        stroke_segment(&mut img, (5.0, 5.0), (5.0, 5.0), 3.0, mode);
        assert_eq!(*img.get_pixel(5, 5), RED);
    }
}
