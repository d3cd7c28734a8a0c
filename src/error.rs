//! Error taxonomy for the paint engine.
//!
//! Everything here is locally recoverable: a failed operation leaves the
//! canvas exactly as it was.

use thiserror::Error;

/// Errors surfaced by layer, fill, text and script operations.
#[derive(Debug, Error)]
pub enum PaintError {
    /// Removing the last layer, addressing a missing layer, or moving a
    /// layer past either end of the stack.
    #[error("invalid layer operation `{op}` on index {index} (layer count {len})")]
    InvalidLayerOperation {
        op: &'static str,
        index: usize,
        len: usize,
    },

    /// Fill seed outside the active layer's buffer; rejected before any pixel is touched.
    #[error("fill seed ({x}, {y}) is outside the {width}x{height} canvas")]
    OutOfBoundsFill {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },

    /// A bounded fill grew past its pixel budget and was abandoned.
    #[error("fill abandoned after exceeding its budget of {budget} pixels")]
    FillBudgetExceeded { budget: usize },

    /// No font could be loaded for the text tool.
    #[error("no usable font: {0}")]
    FontUnavailable(String),

    /// A command script line could not be parsed or executed.
    #[error("script line {line}: {message}")]
    Script { line: usize, message: String },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PaintError>;
