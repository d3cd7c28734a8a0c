pub mod history;
pub mod tools;

pub use history::HistoryManager;
pub use tools::{Tool, ToolProperties};
