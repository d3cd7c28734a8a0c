//! Layered raster paint surface: layer store and compositing, color mixing
//! strategies, flood fill, stroke/shape/text tools and a bounded snapshot
//! history, driven through [`Session`].

pub mod logger;

pub mod canvas;
pub mod cli;
pub mod components;
pub mod error;
pub mod ops;
pub mod project;
pub mod script;
pub mod settings;
pub mod view;

pub use canvas::{CanvasState, Layer};
pub use error::{PaintError, Result};
pub use project::Session;
pub use settings::Settings;
