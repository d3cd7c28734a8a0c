use image::{imageops, Rgba, RgbaImage};
use rayon::prelude::*;

use crate::error::{PaintError, Result};
use crate::{log_info, log_warn};

/// Fully transparent pixel, the cleared state of every new layer.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

// ============================================================================
// LAYER
// ============================================================================

/// One independently editable raster in the stack.
#[derive(Clone, Debug)]
pub struct Layer {
    pub name: String,
    pub visible: bool,
    /// Nominally 0..1; the composite clamps defensively.
    pub opacity: f32,
    pub pixels: RgbaImage,
}

impl Layer {
    pub fn new(name: String, width: u32, height: u32, fill_color: Rgba<u8>) -> Self {
        Self {
            name,
            visible: true,
            opacity: 1.0,
            pixels: RgbaImage::from_pixel(width.max(1), height.max(1), fill_color),
        }
    }

    pub fn clear(&mut self) {
        for px in self.pixels.pixels_mut() {
            *px = TRANSPARENT;
        }
    }
}

// ============================================================================
// CANVAS STATE — the ordered layer store (index 0 = bottom)
// ============================================================================

pub struct CanvasState {
    pub layers: Vec<Layer>,
    pub active_layer_index: usize,
    pub width: u32,
    pub height: u32,
    /// Flattened projection of the visible layers.  Never edited directly.
    output: RgbaImage,
}

impl CanvasState {
    /// A canvas with a single "Background" layer filled with `background`.
    pub fn new(width: u32, height: u32, background: Rgba<u8>) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let background = Layer::new("Background".to_string(), width, height, background);
        let mut state = Self {
            layers: vec![background],
            active_layer_index: 0,
            width,
            height,
            output: RgbaImage::new(width, height),
        };
        state.recomposite();
        state
    }

    /// Allocate a cleared, visible, fully opaque layer sized to the canvas.
    pub fn create_layer(&self, name: &str) -> Layer {
        Layer::new(name.to_string(), self.width, self.height, TRANSPARENT)
    }

    /// Append a new layer on top and make it active.  Returns its index.
    pub fn add_layer(&mut self, name: Option<&str>) -> usize {
        let name = match name {
            Some(n) => n.to_string(),
            None => format!("Layer {}", self.layers.len() + 1),
        };
        let layer = self.create_layer(&name);
        self.layers.push(layer);
        self.active_layer_index = self.layers.len() - 1;
        log_info!("Added layer '{}' at index {}", name, self.active_layer_index);
        self.active_layer_index
    }

    /// Remove the layer at `index`.  The last remaining layer can never be removed.
    pub fn remove_layer(&mut self, index: usize) -> Result<Layer> {
        let len = self.layers.len();
        if len <= 1 || index >= len {
            return Err(PaintError::InvalidLayerOperation { op: "remove", index, len });
        }
        let removed = self.layers.remove(index);
        if index == self.active_layer_index {
            self.active_layer_index = self.active_layer_index.saturating_sub(1);
        } else if index < self.active_layer_index {
            self.active_layer_index -= 1;
        }
        self.active_layer_index = self.active_layer_index.min(self.layers.len() - 1);
        log_info!("Removed layer '{}' (index {}), active is now {}", removed.name, index, self.active_layer_index);
        Ok(removed)
    }

    /// Swap the layer at `index` with the one above it.
    pub fn move_layer_up(&mut self, index: usize) -> Result<()> {
        let len = self.layers.len();
        if index + 1 >= len {
            return Err(PaintError::InvalidLayerOperation { op: "move up", index, len });
        }
        self.swap_layers(index, index + 1);
        Ok(())
    }

    /// Swap the layer at `index` with the one below it.
    pub fn move_layer_down(&mut self, index: usize) -> Result<()> {
        let len = self.layers.len();
        if index == 0 || index >= len {
            return Err(PaintError::InvalidLayerOperation { op: "move down", index, len });
        }
        self.swap_layers(index, index - 1);
        Ok(())
    }

    /// Swap two layers; the active index follows whichever layer it pointed at.
    fn swap_layers(&mut self, from: usize, to: usize) {
        self.layers.swap(from, to);
        if self.active_layer_index == from {
            self.active_layer_index = to;
        } else if self.active_layer_index == to {
            self.active_layer_index = from;
        }
    }

    pub fn set_active(&mut self, index: usize) -> Result<()> {
        self.check_index("select", index)?;
        self.active_layer_index = index;
        Ok(())
    }

    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.check_index("set visibility", index)?;
        self.layers[index].visible = visible;
        Ok(())
    }

    pub fn set_opacity(&mut self, index: usize, opacity: f32) -> Result<()> {
        self.check_index("set opacity", index)?;
        self.layers[index].opacity = opacity;
        Ok(())
    }

    pub fn rename_layer(&mut self, index: usize, name: &str) -> Result<()> {
        self.check_index("rename", index)?;
        self.layers[index].name = name.to_string();
        Ok(())
    }

    fn check_index(&self, op: &'static str, index: usize) -> Result<()> {
        if index < self.layers.len() {
            Ok(())
        } else {
            Err(PaintError::InvalidLayerOperation { op, index, len: self.layers.len() })
        }
    }

    pub fn active_layer(&self) -> &Layer {
        &self.layers[self.active_layer_index]
    }

    pub fn active_layer_mut(&mut self) -> &mut Layer {
        &mut self.layers[self.active_layer_index]
    }

    /// Clear the active layer to transparent.
    pub fn clear_active(&mut self) {
        self.active_layer_mut().clear();
    }

    /// Paint a decoded image over the active layer.  Images that do not match
    /// the canvas size are stretched to it first.
    pub fn draw_image_into_active(&mut self, image: &RgbaImage) {
        let (w, h) = (self.width, self.height);
        let resized;
        let src = if image.dimensions() == (w, h) {
            image
        } else {
            log_warn!(
                "Imported image is {}x{}, resizing to canvas {}x{}",
                image.width(),
                image.height(),
                w,
                h
            );
            resized = imageops::resize(image, w, h, imageops::FilterType::Triangle);
            &resized
        };
        let dst = &mut self.active_layer_mut().pixels;
        dst.par_chunks_mut(4)
            .zip(src.par_chunks(4))
            .for_each(|(d, s)| {
                let out = blend_over(Rgba([d[0], d[1], d[2], d[3]]), Rgba([s[0], s[1], s[2], s[3]]), 1.0);
                d.copy_from_slice(&out.0);
            });
    }

    /// Flatten visible layers bottom to top.
    ///
    /// Each visible layer is painted onto a cleared buffer exactly like a
    /// draw-image call with global alpha = opacity: the source-over operator
    /// runs once per layer with the layer's own pixel alpha scaled by its
    /// opacity.  Stacked opaque layers therefore compound their coverage; that
    /// is the defined behaviour, not an approximation of a single blend.
    pub fn composite(&self) -> RgbaImage {
        let mut result = RgbaImage::new(self.width, self.height);
        let row_bytes = self.width as usize * 4;
        let layers: Vec<(&RgbaImage, f32)> = self
            .layers
            .iter()
            .filter(|l| l.visible)
            .map(|l| (&l.pixels, sanitize_opacity(l.opacity)))
            .filter(|&(_, op)| op > 0.0)
            .collect();

        result
            .par_chunks_mut(row_bytes)
            .enumerate()
            .for_each(|(y, row)| {
                let start = y * row_bytes;
                for (pixels, opacity) in &layers {
                    let src = &pixels.as_raw()[start..start + row_bytes];
                    for (d, s) in row.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                        let out = blend_over(Rgba([d[0], d[1], d[2], d[3]]), Rgba([s[0], s[1], s[2], s[3]]), *opacity);
                        d.copy_from_slice(&out.0);
                    }
                }
            });
        result
    }

    /// Rebuild the cached composite after any pixel or metadata change.
    pub fn recomposite(&mut self) {
        self.output = self.composite();
    }

    /// The last composite produced by [`recomposite`](Self::recomposite).
    pub fn output(&self) -> &RgbaImage {
        &self.output
    }
}

fn sanitize_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) }
}

/// Source-over of `top` onto `base` with `top`'s alpha scaled by `opacity`
/// (straight, non-premultiplied channels).
pub fn blend_over(base: Rgba<u8>, top: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let opacity = sanitize_opacity(opacity);
    if top[3] == 0 || opacity <= 0.0 {
        return base;
    }
    if opacity >= 1.0 && top[3] == 255 {
        return top;
    }

    let base_a = base[3] as f32 / 255.0;
    let top_a = (top[3] as f32 / 255.0) * opacity;

    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return TRANSPARENT;
    }

    let channel = |i: usize| {
        let v = (top[i] as f32 * top_a + base[i] as f32 * base_a * (1.0 - top_a)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Destination-out: remove `coverage` (0..1) of the existing pixel's alpha.
pub fn erase_pixel(base: Rgba<u8>, coverage: f32) -> Rgba<u8> {
    let coverage = coverage.clamp(0.0, 1.0);
    let a = (base[3] as f32 * (1.0 - coverage)).round() as u8;
    if a == 0 { TRANSPARENT } else { Rgba([base[0], base[1], base[2], a]) }
}
