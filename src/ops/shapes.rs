use rayon::prelude::*;

/// Figure tools: every one is stroked, never filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Line,
    Rectangle,
    /// Centred on the drag start; the radius is the drag distance.
    Circle,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Line => "line",
            ShapeKind::Rectangle => "rect",
            ShapeKind::Circle => "circle",
        }
    }
}

/// A geometric primitive stroked with a round pen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Primitive {
    /// Round-capped segment; a zero-length segment is a dot.
    Segment { ax: f32, ay: f32, bx: f32, by: f32 },
    /// Outline of the axis-aligned box spanned by two corners.
    RectOutline { x0: f32, y0: f32, x1: f32, y1: f32 },
    CircleOutline { cx: f32, cy: f32, r: f32 },
}

impl Primitive {
    /// The primitive a figure tool draws for a drag from `start` to `end`.
    pub fn for_shape(kind: ShapeKind, start: (f32, f32), end: (f32, f32)) -> Self {
        let (x0, y0) = start;
        let (x1, y1) = end;
        match kind {
            ShapeKind::Line => Primitive::Segment { ax: x0, ay: y0, bx: x1, by: y1 },
            ShapeKind::Rectangle => Primitive::RectOutline { x0, y0, x1, y1 },
            ShapeKind::Circle => Primitive::CircleOutline {
                cx: x0,
                cy: y0,
                r: (x1 - x0).hypot(y1 - y0),
            },
        }
    }

    /// Axis-aligned bounds of the centre line (pen width not included).
    fn bounds(&self) -> (f32, f32, f32, f32) {
        match *self {
            Primitive::Segment { ax, ay, bx, by } => (ax.min(bx), ay.min(by), ax.max(bx), ay.max(by)),
            Primitive::RectOutline { x0, y0, x1, y1 } => (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)),
            Primitive::CircleOutline { cx, cy, r } => (cx - r, cy - r, cx + r, cy + r),
        }
    }

    /// Distance from `(px, py)` to the primitive's centre line.
    fn distance(&self, px: f32, py: f32) -> f32 {
        match *self {
            Primitive::Segment { ax, ay, bx, by } => sdf_line_segment(px, py, ax, ay, bx, by),
            Primitive::RectOutline { x0, y0, x1, y1 } => {
                let hx = (x1 - x0).abs() * 0.5;
                let hy = (y1 - y0).abs() * 0.5;
                let cx = (x0 + x1) * 0.5;
                let cy = (y0 + y1) * 0.5;
                sdf_box(px - cx, py - cy, hx, hy).abs()
            }
            Primitive::CircleOutline { cx, cy, r } => ((px - cx).hypot(py - cy) - r).abs(),
        }
    }
}

// ============================================================================
// SDF helpers
// ============================================================================

/// SDF for a box centred at origin with half-extents (hx, hy).
#[inline]
fn sdf_box(px: f32, py: f32, hx: f32, hy: f32) -> f32 {
    let dx = px.abs() - hx;
    let dy = py.abs() - hy;
    let outside = (dx.max(0.0) * dx.max(0.0) + dy.max(0.0) * dy.max(0.0)).sqrt();
    let inside = dx.max(dy).min(0.0);
    outside + inside
}

#[inline]
fn sdf_line_segment(px: f32, py: f32, ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f32::EPSILON {
        return (px - ax).hypot(py - ay);
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    (px - cx).hypot(py - cy)
}

/// Smoothstep between edge0 and edge1.
#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

// ============================================================================
// Coverage rasterization
// ============================================================================

/// Per-pixel pen coverage (0..1) over a canvas-clipped rectangle.
#[derive(Clone, Debug, Default)]
pub struct Coverage {
    pub x0: u32,
    pub y0: u32,
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl Coverage {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Coverage at canvas pixel `(x, y)`; zero outside the rectangle.
    #[cfg(test)]
    pub(crate) fn at(&self, x: u32, y: u32) -> f32 {
        if x < self.x0 || y < self.y0 || x >= self.x0 + self.width || y >= self.y0 + self.height {
            return 0.0;
        }
        self.data[((y - self.y0) * self.width + (x - self.x0)) as usize]
    }

    /// Iterate `(x, y, coverage)` for every pixel with non-negligible coverage.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, f32)> + '_ {
        let w = self.width.max(1);
        self.data.iter().enumerate().filter(|(_, c)| **c > 0.001).map(move |(i, &c)| {
            let i = i as u32;
            (self.x0 + i % w, self.y0 + i / w, c)
        })
    }
}

/// Rasterize `prim` stroked with a round pen `pen_width` wide.
///
/// Pixel centres sit at `(x + 0.5, y + 0.5)` and edges get one pixel of
/// smoothstep anti-aliasing.
pub fn rasterize(prim: &Primitive, pen_width: f32, canvas_w: u32, canvas_h: u32) -> Coverage {
    let half = pen_width.max(0.0) * 0.5;
    let (min_x, min_y, max_x, max_y) = prim.bounds();
    let pad = half + 1.0;

    let x0 = ((min_x - pad).floor() as i64).max(0);
    let y0 = ((min_y - pad).floor() as i64).max(0);
    let x1 = ((max_x + pad).ceil() as i64).min(canvas_w as i64);
    let y1 = ((max_y + pad).ceil() as i64).min(canvas_h as i64);
    if x1 <= x0 || y1 <= y0 {
        return Coverage::default();
    }
    let width = (x1 - x0) as u32;
    let height = (y1 - y0) as u32;
    let (x0, y0) = (x0 as u32, y0 as u32);

    let mut data = vec![0.0f32; width as usize * height as usize];
    data.par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(row, row_buf)| {
            let py = (y0 + row as u32) as f32 + 0.5;
            for (col, cov) in row_buf.iter_mut().enumerate() {
                let px = (x0 + col as u32) as f32 + 0.5;
                let d = prim.distance(px, py) - half;
                *cov = smoothstep(0.5, -0.5, d);
            }
        });

    Coverage { x0, y0, width, height, data }
}
