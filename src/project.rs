use std::path::Path;

use ab_glyph::FontArc;
use image::{Rgba, RgbaImage};
use uuid::Uuid;

use crate::canvas::CanvasState;
use crate::components::history::HistoryManager;
use crate::components::tools::{StrokeTracker, Tool, ToolProperties};
use crate::error::{PaintError, Result};
use crate::ops::brush::{apply_coverage, PaintMode};
use crate::ops::fill::{flood_fill, FillOutcome};
use crate::ops::text::{load_preferred_font, rasterize_text};
use crate::settings::Settings;
use crate::view::ViewTransform;
use crate::{log_info, log_warn};

/// One painting session: the layer store, its history, tool state and view.
///
/// Every entry point runs to completion; nothing is shared across threads.
pub struct Session {
    pub id: Uuid,
    pub canvas: CanvasState,
    pub history: HistoryManager,
    pub tools: ToolProperties,
    pub view: ViewTransform,
    tracker: StrokeTracker,
    /// Anchor (buffer space) of a text entry awaiting confirmation.
    pending_text: Option<(f32, f32)>,
    font: Option<FontArc>,
}

impl Session {
    pub fn new(settings: &Settings) -> Self {
        let mut session = Self {
            id: Uuid::new_v4(),
            canvas: CanvasState::new(settings.canvas_width, settings.canvas_height, settings.background),
            history: HistoryManager::new(settings.max_undo_steps),
            tools: settings.tool_properties(),
            view: ViewTransform::default(),
            tracker: StrokeTracker::default(),
            pending_text: None,
            font: None,
        };
        session.history.commit("New canvas", &session.canvas);
        log_info!(
            "Session {} started ({}x{})",
            session.id,
            session.canvas.width,
            session.canvas.height
        );
        session
    }

    /// A session with default settings and the given canvas size.
    pub fn with_size(width: u32, height: u32) -> Self {
        Self::new(&Settings {
            canvas_width: width,
            canvas_height: height,
            ..Settings::default()
        })
    }

    /// The flattened visible output.
    pub fn composite(&self) -> &RgbaImage {
        self.canvas.output()
    }

    pub fn export_png(&self, path: &Path) -> Result<()> {
        self.composite().save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    fn commit(&mut self, description: &str) {
        self.canvas.recomposite();
        self.history.commit(description, &self.canvas);
        log_info!(
            "Committed '{}' (entry {} of {}, {} KB held)",
            description,
            self.history.cursor() + 1,
            self.history.capacity(),
            self.history.memory_usage() / 1024
        );
    }

    /// Commit a gesture still in flight.  Anything that edits pixels or the
    /// layer list calls this first; the tracker holds a layer index.
    fn settle_gesture(&mut self) {
        if self.tracker.is_active() {
            self.pointer_up();
        }
    }

    // ------------------------------------------------------------------------
    // Pointer input (view space)
    // ------------------------------------------------------------------------

    /// Switch tools.  A gesture in flight is committed and a pending text
    /// entry is dropped.
    pub fn set_tool(&mut self, tool: Tool) {
        self.settle_gesture();
        self.cancel_text();
        self.tools.tool = tool;
    }

    /// Pointer pressed.  Fill runs immediately; its errors are returned.
    pub fn pointer_down(&mut self, view_pos: (f32, f32)) -> Result<()> {
        if self.tracker.is_active() {
            return Ok(());
        }
        let pos = self.view.to_buffer(view_pos);
        match self.tools.tool {
            Tool::Brush => {
                let brush = &self.tools.brush;
                self.tracker
                    .start_freehand(&self.canvas, pos, brush.size, brush.paint_mode(), "brush");
            }
            Tool::Eraser => {
                self.tracker
                    .start_freehand(&self.canvas, pos, self.tools.eraser.size, PaintMode::Erase, "eraser");
            }
            Tool::Line | Tool::Rectangle | Tool::Circle => {
                if let Some(kind) = self.tools.tool.shape_kind() {
                    let shape = &self.tools.shape;
                    self.tracker.start_shape(&self.canvas, kind, pos, shape.size, shape.color);
                }
            }
            Tool::Pan => self.tracker.start_pan(view_pos, self.view.pan),
            Tool::Fill => {
                self.fill_at(pos.0.floor() as i64, pos.1.floor() as i64, None)?;
            }
            Tool::Text => {
                self.begin_text(pos);
            }
        }
        Ok(())
    }

    pub fn pointer_move(&mut self, view_pos: (f32, f32)) {
        if let Some(pan) = self.tracker.pan_offset(view_pos) {
            self.view.pan = pan;
            return;
        }
        if !self.tracker.is_active() {
            return;
        }
        let pos = self.view.to_buffer(view_pos);
        if self.tracker.advance(&mut self.canvas, pos) > 0 {
            self.canvas.recomposite();
        }
    }

    /// Pointer released: a painting gesture is committed to history.
    pub fn pointer_up(&mut self) {
        if let Some(event) = self.tracker.finish() {
            self.commit(&event.description);
        }
    }

    /// Pointer left the surface; same as release.
    pub fn pointer_leave(&mut self) {
        self.pointer_up();
    }

    // ------------------------------------------------------------------------
    // Fill
    // ------------------------------------------------------------------------

    /// Flood-fill the active layer from buffer pixel `(x, y)` with `color`
    /// (or the fill tool's color).  A no-op fill does not touch history.
    pub fn fill_at(&mut self, x: i64, y: i64, color: Option<Rgba<u8>>) -> Result<FillOutcome> {
        self.settle_gesture();
        let color = color.unwrap_or(self.tools.fill.color);
        let budget = self.tools.fill.budget;
        let outcome = match flood_fill(&mut self.canvas.active_layer_mut().pixels, x, y, color, budget) {
            Ok(o) => o,
            Err(e) => {
                log_warn!("Fill rejected: {}", e);
                return Err(e);
            }
        };
        if outcome.is_noop() {
            return Ok(outcome);
        }
        log_info!("Filled {} pixels, bbox {:?}", outcome.filled, outcome.bbox);
        self.commit("fill");
        Ok(outcome)
    }

    // ------------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------------

    /// Open a text entry at `pos` (buffer space).  Ignored while one is pending.
    pub fn begin_text(&mut self, pos: (f32, f32)) -> bool {
        if self.pending_text.is_some() {
            return false;
        }
        self.pending_text = Some(pos);
        true
    }

    pub fn pending_text(&self) -> Option<(f32, f32)> {
        self.pending_text
    }

    /// Drop the pending text entry without drawing.
    pub fn cancel_text(&mut self) {
        self.pending_text = None;
    }

    /// Use `font` for text instead of looking one up on the system.
    pub fn set_font(&mut self, font: FontArc) {
        self.font = Some(font);
    }

    fn font(&mut self) -> Result<FontArc> {
        if let Some(font) = &self.font {
            return Ok(font.clone());
        }
        let families = &self.tools.text.font_families;
        let font = load_preferred_font(families)
            .ok_or_else(|| PaintError::FontUnavailable(format!("none of '{}' found", families)))?;
        self.font = Some(font.clone());
        Ok(font)
    }

    /// Draw `text` at the pending anchor (as the baseline origin) and commit.
    /// Returns `false` when nothing was pending or the text is empty.  The
    /// entry is closed either way.
    pub fn commit_text(&mut self, text: &str) -> Result<bool> {
        let Some((x, y)) = self.pending_text.take() else {
            return Ok(false);
        };
        if text.is_empty() {
            return Ok(false);
        }
        self.settle_gesture();
        let font = self.font()?;
        let settings = &self.tools.text;
        let coverage = rasterize_text(&font, text, settings.size, x, y, self.canvas.width, self.canvas.height);
        let mode = PaintMode::Over { color: settings.color, alpha: 1.0 };
        apply_coverage(&mut self.canvas.active_layer_mut().pixels, &coverage, mode);
        self.commit("text");
        Ok(true)
    }

    // ------------------------------------------------------------------------
    // Layers (structure changes are not history entries)
    // ------------------------------------------------------------------------

    fn layer_op(&mut self, op: impl FnOnce(&mut CanvasState) -> Result<()>) -> bool {
        self.settle_gesture();
        match op(&mut self.canvas) {
            Ok(()) => {
                self.canvas.recomposite();
                true
            }
            Err(e) => {
                log_warn!("Ignored: {}", e);
                false
            }
        }
    }

    pub fn add_layer(&mut self, name: Option<&str>) -> usize {
        self.settle_gesture();
        let index = self.canvas.add_layer(name);
        self.canvas.recomposite();
        index
    }

    pub fn remove_layer(&mut self, index: usize) -> bool {
        self.layer_op(|c| c.remove_layer(index).map(|_| ()))
    }

    pub fn move_layer_up(&mut self, index: usize) -> bool {
        self.layer_op(|c| c.move_layer_up(index))
    }

    pub fn move_layer_down(&mut self, index: usize) -> bool {
        self.layer_op(|c| c.move_layer_down(index))
    }

    pub fn select_layer(&mut self, index: usize) -> bool {
        self.layer_op(|c| c.set_active(index))
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> bool {
        self.layer_op(|c| c.set_visible(index, visible))
    }

    pub fn set_layer_opacity(&mut self, index: usize, opacity: f32) -> bool {
        self.layer_op(|c| c.set_opacity(index, opacity))
    }

    pub fn rename_layer(&mut self, index: usize, name: &str) -> bool {
        self.layer_op(|c| c.rename_layer(index, name))
    }

    /// Clear the active layer to transparent.
    pub fn clear_active_layer(&mut self) {
        self.settle_gesture();
        self.canvas.clear_active();
        self.commit("clear layer");
    }

    // ------------------------------------------------------------------------
    // Import
    // ------------------------------------------------------------------------

    /// Paint a decoded image into the active layer and commit.
    pub fn import_image(&mut self, image: &RgbaImage) {
        self.settle_gesture();
        self.canvas.draw_image_into_active(image);
        self.commit("import image");
    }

    pub fn import_image_file(&mut self, path: &Path) -> Result<()> {
        let image = image::open(path)?.to_rgba8();
        log_info!("Importing {} ({}x{})", path.display(), image.width(), image.height());
        self.import_image(&image);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------------

    fn abandon_gesture(&mut self) {
        if self.tracker.is_active() {
            self.tracker.cancel(&mut self.canvas);
            self.canvas.recomposite();
        }
    }

    /// A gesture in flight is abandoned first.
    pub fn undo(&mut self) -> bool {
        self.abandon_gesture();
        self.history.undo(&mut self.canvas)
    }

    pub fn redo(&mut self) -> bool {
        self.abandon_gesture();
        self.history.redo(&mut self.canvas)
    }

    // ------------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------------

    pub fn zoom_in(&mut self) {
        self.view.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.view.zoom_out();
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.view.pan_by(dx, dy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn session() -> Session {
        Session::with_size(32, 32)
    }

    #[test]
    fn starts_with_one_committed_entry() {
        let s = session();
        assert_eq!(s.history.len(), 1);
        assert_eq!(s.canvas.layers.len(), 1);
        assert!(s.composite().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn click_without_motion_still_commits() {
        let mut s = session();
        s.pointer_down((4.0, 4.0)).unwrap();
        s.pointer_up();
        assert_eq!(s.history.len(), 2);
    }

    #[test]
    fn moves_without_a_press_do_nothing() {
        let mut s = session();
        s.pointer_move((4.0, 4.0));
        s.pointer_up();
        assert_eq!(s.history.len(), 1);
    }

    #[test]
    fn pointer_positions_go_through_the_view() {
        let mut s = session();
        s.tools.brush.color = RED;
        s.tools.brush.size = 1.0;
        s.view.zoom = 2.0;
        s.pointer_down((11.0, 21.0)).unwrap();
        s.pointer_move((41.0, 21.0));
        s.pointer_up();
        // View x 11..41 at zoom 2 is buffer x 5.5..20.5 on row 10.
        assert_eq!(*s.composite().get_pixel(12, 10), RED);
        assert_eq!(*s.composite().get_pixel(25, 10), WHITE);
    }

    #[test]
    fn pan_tool_moves_the_view_without_history() {
        let mut s = session();
        s.set_tool(Tool::Pan);
        s.pointer_down((10.0, 10.0)).unwrap();
        s.pointer_move((25.0, 5.0));
        s.pointer_up();
        assert_eq!(s.view.pan, (15.0, -5.0));
        assert_eq!(s.history.len(), 1);
    }

    #[test]
    fn fill_tool_commits_and_out_of_bounds_is_reported() {
        let mut s = session();
        s.set_tool(Tool::Fill);
        s.tools.fill.color = RED;
        s.pointer_down((3.0, 3.0)).unwrap();
        assert_eq!(s.history.len(), 2);
        assert!(s.composite().pixels().all(|p| *p == RED));
        assert!(matches!(
            s.pointer_down((-5.0, 3.0)),
            Err(PaintError::OutOfBoundsFill { .. })
        ));
        assert_eq!(s.history.len(), 2);
    }

    #[test]
    fn text_entry_opens_once_and_cancels() {
        let mut s = session();
        s.set_tool(Tool::Text);
        s.pointer_down((5.0, 20.0)).unwrap();
        assert_eq!(s.pending_text(), Some((5.0, 20.0)));
        s.pointer_down((9.0, 9.0)).unwrap();
        assert_eq!(s.pending_text(), Some((5.0, 20.0)));
        s.cancel_text();
        assert_eq!(s.pending_text(), None);
        assert!(!s.commit_text("hello").unwrap());
        assert_eq!(s.history.len(), 1);
    }

    #[test]
    fn rejected_layer_ops_are_noops() {
        let mut s = session();
        assert!(!s.remove_layer(0));
        assert!(!s.move_layer_up(0));
        assert!(!s.select_layer(3));
        assert_eq!(s.canvas.layers.len(), 1);
    }

    #[test]
    fn clear_layer_is_undoable() {
        let mut s = session();
        s.clear_active_layer();
        assert_eq!(*s.composite().get_pixel(0, 0), crate::canvas::TRANSPARENT);
        assert!(s.undo());
        assert_eq!(*s.composite().get_pixel(0, 0), WHITE);
    }

    #[test]
    fn moving_a_layer_mid_shape_keeps_the_figure_on_its_own_layer() {
        let mut s = Session::with_size(20, 20);
        s.add_layer(Some("Ink"));
        s.set_tool(Tool::Rectangle);
        s.pointer_down((2.0, 2.0)).unwrap();
        s.pointer_move((10.0, 10.0));
        assert!(s.move_layer_down(1));
        s.pointer_move((12.0, 12.0));
        s.pointer_up();

        assert_eq!(s.canvas.layers[1].name, "Background");
        assert!(s.canvas.layers[1].pixels.pixels().all(|p| *p == WHITE));
        assert_eq!(s.canvas.layers[0].name, "Ink");
        assert_eq!(s.canvas.layers[0].pixels.get_pixel(2, 6)[3], 255);
        assert_eq!(s.canvas.layers[0].pixels.get_pixel(12, 12)[3], 0);
        assert_eq!(s.history.len(), 2);
    }

    #[test]
    fn removing_the_painted_layer_mid_stroke_commits_the_stroke_once() {
        let mut s = Session::with_size(20, 20);
        s.add_layer(Some("Ink"));
        s.pointer_down((2.0, 2.0)).unwrap();
        s.pointer_move((10.0, 10.0));
        assert!(s.remove_layer(1));
        assert_eq!(s.history.len(), 2);
        s.pointer_move((15.0, 2.0));
        s.pointer_up();
        assert_eq!(s.history.len(), 2);
        assert!(s.canvas.layers[0].pixels.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn fill_during_a_shape_drag_survives_the_next_move() {
        let mut s = Session::with_size(20, 20);
        s.set_tool(Tool::Rectangle);
        s.pointer_down((2.0, 2.0)).unwrap();
        s.pointer_move((10.0, 10.0));
        s.fill_at(15, 15, Some(RED)).unwrap();
        s.pointer_move((12.0, 12.0));
        s.pointer_up();
        assert_eq!(*s.composite().get_pixel(15, 15), RED);
        assert_eq!(s.history.len(), 3);
    }

    #[test]
    fn committed_text_paints_the_active_layer() {
        let mut s = session();
        let Some(font) = crate::ops::text::load_preferred_font("DejaVu Sans,Arial") else {
            return;
        };
        s.set_font(font);
        s.set_tool(Tool::Text);
        s.tools.text.color = RED;
        s.tools.text.size = 24.0;
        s.pointer_down((4.0, 26.0)).unwrap();
        assert!(s.commit_text("Hi").unwrap());

        assert_eq!(s.pending_text(), None);
        assert_eq!(s.history.len(), 2);
        let layer = &s.canvas.active_layer().pixels;
        let inked: Vec<(u32, u32)> = layer
            .enumerate_pixels()
            .filter(|(_, _, p)| **p != WHITE)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!inked.is_empty());
        assert!(inked.iter().all(|&(x, y)| x >= 3 && y <= 27));
        assert!(layer.pixels().any(|p| *p == RED));
    }

    #[test]
    fn undo_mid_shape_drops_the_preview() {
        let mut s = session();
        s.set_tool(Tool::Rectangle);
        s.pointer_down((2.0, 2.0)).unwrap();
        s.pointer_move((20.0, 20.0));
        assert!(!s.undo());
        assert!(s.composite().pixels().all(|p| *p == WHITE));
        s.pointer_up();
        assert_eq!(s.history.len(), 1);
    }
}
