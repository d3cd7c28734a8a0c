use image::RgbaImage;
use std::collections::VecDeque;

use crate::canvas::{CanvasState, Layer};
use crate::{log_info, log_warn};

/// Default number of retained snapshots.
pub const DEFAULT_CAPACITY: usize = 30;

// ============================================================================
// CANVAS SNAPSHOT — full copy of every layer at commit time
// ============================================================================

#[derive(Clone, Debug)]
pub struct LayerSnapshot {
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    pub pixels: RgbaImage,
}

/// One history entry: every layer's buffer, in store order at capture time.
#[derive(Clone, Debug)]
pub struct CanvasSnapshot {
    pub description: String,
    pub layers: Vec<LayerSnapshot>,
    pub active_layer_index: usize,
}

impl CanvasSnapshot {
    pub fn capture(description: &str, state: &CanvasState) -> Self {
        Self {
            description: description.to_string(),
            active_layer_index: state.active_layer_index,
            layers: state
                .layers
                .iter()
                .map(|l| LayerSnapshot {
                    name: l.name.clone(),
                    visible: l.visible,
                    opacity: l.opacity,
                    pixels: l.pixels.clone(),
                })
                .collect(),
        }
    }

    /// Write this snapshot back into `state` and recomposite.
    ///
    /// With a matching layer count only the pixel buffers are replaced, index
    /// for index; names, visibility and opacity stay as they are live.  When
    /// the count differs the whole layer list is rebuilt from the snapshot and
    /// the active index is clamped.
    pub fn restore_into(&self, state: &mut CanvasState) {
        if self.layers.len() == state.layers.len() {
            for (layer, snap) in state.layers.iter_mut().zip(&self.layers) {
                layer.pixels = snap.pixels.clone();
            }
        } else {
            log_warn!(
                "Restoring '{}' with {} layers over {} live layers; layer list replaced",
                self.description,
                self.layers.len(),
                state.layers.len()
            );
            state.layers = self
                .layers
                .iter()
                .map(|snap| Layer {
                    name: snap.name.clone(),
                    visible: snap.visible,
                    opacity: snap.opacity,
                    pixels: snap.pixels.clone(),
                })
                .collect();
            state.active_layer_index = state.active_layer_index.min(state.layers.len().saturating_sub(1));
        }
        state.recomposite();
    }

    pub fn memory_bytes(&self) -> usize {
        self.layers.iter().map(|l| l.pixels.as_raw().len() + l.name.len()).sum()
    }
}

// ============================================================================
// HISTORY MANAGER — bounded linear history with a cursor
// ============================================================================

/// Snapshot history.  `entries[cursor]` always mirrors the live canvas after
/// the most recent commit, undo or redo.
pub struct HistoryManager {
    entries: VecDeque<CanvasSnapshot>,
    cursor: usize,
    capacity: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryManager {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            cursor: 0,
            capacity,
        }
    }

    /// Snapshot `state`, discarding any redo branch, then evict from the front
    /// until the capacity holds.
    pub fn commit(&mut self, description: &str, state: &CanvasState) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push_back(CanvasSnapshot::capture(description, state));
        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                log_info!("History full, evicted '{}'", evicted.description);
            }
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back one entry.  Returns `false` at the oldest retained entry.
    pub fn undo(&mut self, state: &mut CanvasState) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.cursor -= 1;
        self.entries[self.cursor].restore_into(state);
        true
    }

    /// Step forward one entry.  Returns `false` at the newest entry.
    pub fn redo(&mut self, state: &mut CanvasState) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.cursor += 1;
        self.entries[self.cursor].restore_into(state);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn memory_usage(&self) -> usize {
        self.entries.iter().map(CanvasSnapshot::memory_bytes).sum()
    }
}
