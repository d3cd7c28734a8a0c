use image::{Rgba, RgbaImage};
use std::fmt;
use std::str::FromStr;

use crate::canvas::CanvasState;
use crate::ops::brush::{stroke_primitive, stroke_segment, PaintMode};
use crate::ops::color_mix::MixStrategy;
use crate::ops::shapes::{Primitive, ShapeKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
    Line,
    Rectangle,
    Circle,
    Text,
    Fill,
    Pan,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Brush => "brush",
            Tool::Eraser => "eraser",
            Tool::Line => "line",
            Tool::Rectangle => "rect",
            Tool::Circle => "circle",
            Tool::Text => "text",
            Tool::Fill => "fill",
            Tool::Pan => "pan",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[
            Tool::Brush,
            Tool::Eraser,
            Tool::Line,
            Tool::Rectangle,
            Tool::Circle,
            Tool::Text,
            Tool::Fill,
            Tool::Pan,
        ]
    }

    /// The figure drawn by a shape tool, if this is one.
    pub fn shape_kind(&self) -> Option<ShapeKind> {
        match self {
            Tool::Line => Some(ShapeKind::Line),
            Tool::Rectangle => Some(ShapeKind::Rectangle),
            Tool::Circle => Some(ShapeKind::Circle),
            _ => None,
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        match key.as_str() {
            "rectangle" => return Ok(Tool::Rectangle),
            // The legacy UI called the pan/zoom tool "zoom".
            "zoom" => return Ok(Tool::Pan),
            _ => {}
        }
        Tool::all()
            .iter()
            .copied()
            .find(|t| t.name() == key)
            .ok_or_else(|| format!("unknown tool '{}'", s.trim()))
    }
}

// ============================================================================
// TOOL PARAMETERS
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct BrushSettings {
    pub size: f32,
    /// 0..1, clamped when painting.
    pub alpha: f32,
    pub color: Rgba<u8>,
    /// When set, the brush mixes into existing paint with this strategy
    /// instead of painting source-over.
    pub mix: Option<MixStrategy>,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 5.0,
            alpha: 1.0,
            color: Rgba([0x22, 0x22, 0x3b, 255]),
            mix: None,
        }
    }
}

impl BrushSettings {
    pub fn paint_mode(&self) -> PaintMode {
        match self.mix {
            Some(strategy) => PaintMode::Mix { color: self.color, alpha: self.alpha, strategy },
            None => PaintMode::Over { color: self.color, alpha: self.alpha },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EraserSettings {
    pub size: f32,
}

impl Default for EraserSettings {
    fn default() -> Self {
        Self { size: 20.0 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShapeSettings {
    pub size: f32,
    pub color: Rgba<u8>,
}

impl Default for ShapeSettings {
    fn default() -> Self {
        Self { size: 3.0, color: Rgba([0x22, 0x22, 0x3b, 255]) }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextSettings {
    pub size: f32,
    pub color: Rgba<u8>,
    /// Comma-separated family preference list.
    pub font_families: String,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            size: 18.0,
            color: Rgba([0x22, 0x22, 0x3b, 255]),
            font_families: "Segoe UI,Arial,DejaVu Sans".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FillSettings {
    pub color: Rgba<u8>,
    /// Abandon fills larger than this many pixels.
    pub budget: Option<usize>,
}

impl Default for FillSettings {
    fn default() -> Self {
        Self { color: Rgba([255, 255, 255, 255]), budget: None }
    }
}

/// Every tool's parameters plus the current tool.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolProperties {
    pub tool: Tool,
    pub brush: BrushSettings,
    pub eraser: EraserSettings,
    pub shape: ShapeSettings,
    pub text: TextSettings,
    pub fill: FillSettings,
}

impl ToolProperties {
    /// Size of the current tool's pen, if it has one.
    pub fn size_mut(&mut self) -> Option<&mut f32> {
        match self.tool {
            Tool::Brush => Some(&mut self.brush.size),
            Tool::Eraser => Some(&mut self.eraser.size),
            Tool::Line | Tool::Rectangle | Tool::Circle => Some(&mut self.shape.size),
            Tool::Text => Some(&mut self.text.size),
            Tool::Fill | Tool::Pan => None,
        }
    }

    /// Color of the current tool, if it has one.
    pub fn color_mut(&mut self) -> Option<&mut Rgba<u8>> {
        match self.tool {
            Tool::Brush => Some(&mut self.brush.color),
            Tool::Line | Tool::Rectangle | Tool::Circle => Some(&mut self.shape.color),
            Tool::Text => Some(&mut self.text.color),
            Tool::Fill => Some(&mut self.fill.color),
            Tool::Eraser | Tool::Pan => None,
        }
    }
}

// ============================================================================
// STROKE TRACKER — the drag gesture state machine
// ============================================================================

/// State of the drag gesture.  Fill and text never enter an active state.
#[derive(Clone, Debug, Default)]
enum Gesture {
    #[default]
    Idle,
    /// Brush or eraser: each move strokes the segment from `prev`.
    Freehand {
        layer_index: usize,
        prev: (f32, f32),
        width: f32,
        mode: PaintMode,
    },
    /// Line, rectangle or circle: each move restores `before` and redraws
    /// the figure from `start`.
    Shape {
        layer_index: usize,
        kind: ShapeKind,
        start: (f32, f32),
        width: f32,
        color: Rgba<u8>,
        before: RgbaImage,
    },
    /// View drag; positions are in view space.
    Pan {
        start: (f32, f32),
        origin: (f32, f32),
    },
}

/// Emitted when a painting gesture ends and should be committed.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeEvent {
    pub description: String,
}

#[derive(Default)]
pub struct StrokeTracker {
    gesture: Gesture,
    description: String,
}

impl StrokeTracker {
    pub fn is_active(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    /// Start a brush or eraser stroke at `pos` (buffer space).
    pub fn start_freehand(&mut self, canvas: &CanvasState, pos: (f32, f32), width: f32, mode: PaintMode, description: &str) {
        self.gesture = Gesture::Freehand {
            layer_index: canvas.active_layer_index,
            prev: pos,
            width,
            mode,
        };
        self.description = description.to_string();
    }

    /// Start a figure drag; the active layer is snapshotted for preview restore.
    pub fn start_shape(
        &mut self,
        canvas: &CanvasState,
        kind: ShapeKind,
        pos: (f32, f32),
        width: f32,
        color: Rgba<u8>,
    ) {
        self.gesture = Gesture::Shape {
            layer_index: canvas.active_layer_index,
            kind,
            start: pos,
            width,
            color,
            before: canvas.active_layer().pixels.clone(),
        };
        self.description = kind.name().to_string();
    }

    pub fn start_pan(&mut self, view_pos: (f32, f32), pan_origin: (f32, f32)) {
        self.gesture = Gesture::Pan { start: view_pos, origin: pan_origin };
        self.description = "pan".to_string();
    }

    /// Advance the gesture to `pos` (buffer space), drawing into the layer
    /// the gesture started on.  Returns the number of changed pixels.
    pub fn advance(&mut self, canvas: &mut CanvasState, pos: (f32, f32)) -> usize {
        match &mut self.gesture {
            Gesture::Freehand { layer_index, prev, width, mode } => {
                let Some(layer) = canvas.layers.get_mut(*layer_index) else {
                    return 0;
                };
                let changed = stroke_segment(&mut layer.pixels, *prev, pos, *width, *mode);
                *prev = pos;
                changed
            }
            Gesture::Shape { layer_index, kind, start, width, color, before } => {
                let Some(layer) = canvas.layers.get_mut(*layer_index) else {
                    return 0;
                };
                layer.pixels.copy_from_slice(before.as_raw());
                let prim = Primitive::for_shape(*kind, *start, pos);
                stroke_primitive(&mut layer.pixels, &prim, *width, PaintMode::Over { color: *color, alpha: 1.0 })
            }
            Gesture::Pan { .. } | Gesture::Idle => 0,
        }
    }

    /// New pan offset for a pan drag at `view_pos`, or `None` outside a pan.
    pub fn pan_offset(&self, view_pos: (f32, f32)) -> Option<(f32, f32)> {
        match self.gesture {
            Gesture::Pan { start, origin } => Some((origin.0 + view_pos.0 - start.0, origin.1 + view_pos.1 - start.1)),
            _ => None,
        }
    }

    /// End the gesture.  Painting gestures yield an event to commit; pan and
    /// idle yield nothing.
    pub fn finish(&mut self) -> Option<StrokeEvent> {
        let gesture = std::mem::take(&mut self.gesture);
        let description = std::mem::take(&mut self.description);
        match gesture {
            Gesture::Freehand { .. } | Gesture::Shape { .. } => Some(StrokeEvent { description }),
            Gesture::Pan { .. } | Gesture::Idle => None,
        }
    }

    /// Abandon the gesture.  A figure preview is rolled back.
    pub fn cancel(&mut self, canvas: &mut CanvasState) {
        if let Gesture::Shape { layer_index, before, .. } = std::mem::take(&mut self.gesture)
            && let Some(layer) = canvas.layers.get_mut(layer_index)
        {
            layer.pixels = before;
        }
        self.description.clear();
    }
}
