// ============================================================================
// OPS MODULE — pixel operations on a single layer buffer
// ============================================================================
//
//   color_mix.rs — sRGB / linear / OKLab / CMYK conversions and mix strategies
//   shapes.rs    — SDF coverage rasterizer for segments and figure outlines
//   brush.rs     — writes coverage into a layer (over, erase, mix)
//   fill.rs      — strict-match 4-connected flood fill
//   text.rs      — glyph layout, rasterization and system font lookup
// ============================================================================

pub mod brush;
pub mod color_mix;
pub mod fill;
pub mod shapes;
pub mod text;

pub use color_mix::MixStrategy;
