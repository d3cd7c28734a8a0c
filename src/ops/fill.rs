// ============================================================================
// FLOOD FILL — strict-match, 4-connected, runs to completion synchronously
// ============================================================================

use image::{Rgba, RgbaImage};

use crate::error::{PaintError, Result};

/// Result of a completed fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FillOutcome {
    /// Number of pixels recoloured.  Zero means the fill was a no-op.
    pub filled: usize,
    /// Inclusive bounding box `(min_x, min_y, max_x, max_y)` of the filled area.
    pub bbox: Option<(u32, u32, u32, u32)>,
}

impl FillOutcome {
    pub fn is_noop(&self) -> bool {
        self.filled == 0
    }
}

/// Flood-fill the region 4-connected to `(x, y)` whose pixels exactly equal
/// the seed's original RGBA, recolouring it with `color` (alpha forced opaque).
///
/// The seed is bounds-checked before anything else.  If the seed already has
/// the fill colour nothing happens.  With a `budget`, a region larger than
/// `budget` pixels is abandoned and the buffer is left untouched: the region
/// is collected first and only written once it is known to be complete.
pub fn flood_fill(
    pixels: &mut RgbaImage,
    x: i64,
    y: i64,
    color: Rgba<u8>,
    budget: Option<usize>,
) -> Result<FillOutcome> {
    let (w, h) = pixels.dimensions();
    if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
        return Err(PaintError::OutOfBoundsFill { x, y, width: w, height: h });
    }
    let fill = [color[0], color[1], color[2], 255];

    let wu = w as usize;
    let hu = h as usize;
    let flat: &[u8] = pixels.as_raw();

    #[inline(always)]
    fn pix(flat: &[u8], idx: usize) -> [u8; 4] {
        let o = idx * 4;
        [flat[o], flat[o + 1], flat[o + 2], flat[o + 3]]
    }

    let seed_idx = y as usize * wu + x as usize;
    let target = pix(flat, seed_idx);
    if target == fill {
        return Ok(FillOutcome::default());
    }

    // Visited mask doubles as the region membership list's dedup.
    let mut visited = vec![false; wu * hu];
    let mut region: Vec<u32> = Vec::with_capacity(1024);
    let mut stack: Vec<u32> = Vec::with_capacity(4096);
    visited[seed_idx] = true;
    stack.push(seed_idx as u32);

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (x as u32, y as u32, x as u32, y as u32);

    while let Some(idx) = stack.pop() {
        region.push(idx);
        if let Some(limit) = budget
            && region.len() > limit
        {
            return Err(PaintError::FillBudgetExceeded { budget: limit });
        }

        let cx = (idx as usize % wu) as u32;
        let cy = (idx as usize / wu) as u32;
        min_x = min_x.min(cx);
        max_x = max_x.max(cx);
        min_y = min_y.min(cy);
        max_y = max_y.max(cy);

        let mut visit = |ni: usize| {
            if !visited[ni] && pix(flat, ni) == target {
                visited[ni] = true;
                stack.push(ni as u32);
            }
        };
        if cx > 0 {
            visit(idx as usize - 1);
        }
        if cx + 1 < w {
            visit(idx as usize + 1);
        }
        if cy > 0 {
            visit(idx as usize - wu);
        }
        if cy + 1 < h {
            visit(idx as usize + wu);
        }
    }

    let raw: &mut [u8] = pixels;
    for &idx in &region {
        let o = idx as usize * 4;
        raw[o..o + 4].copy_from_slice(&fill);
    }

    Ok(FillOutcome {
        filled: region.len(),
        bbox: Some((min_x, min_y, max_x, max_y)),
    })
}
