//! Scheduled frames and global overlay windows.

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::segment::SegmentId;

/// What a card shows during one frame window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VisualState {
    /// Words spoken so far, joined in emission order
    Progressive { text: String, word_count: usize },
    /// Whole segment text, used when no word timings exist
    Full { text: String },
}

impl VisualState {
    /// Build the cumulative state for the given words.
    pub fn progressive<S: AsRef<str>>(words: &[S]) -> Self {
        let text = words
            .iter()
            .map(|w| w.as_ref().trim())
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self::Progressive {
            text,
            word_count: words.len(),
        }
    }

    pub fn full(text: impl Into<String>) -> Self {
        Self::Full { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            VisualState::Progressive { text, .. } | VisualState::Full { text } => text,
        }
    }

    pub fn is_progressive(&self) -> bool {
        matches!(self, VisualState::Progressive { .. })
    }
}

/// A window of a segment's own audio mapped to one visual state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScheduledFrame {
    pub segment_id: SegmentId,
    pub visual_state: VisualState,
    /// Seconds from the start of the segment audio (inclusive)
    pub local_start: f64,
    /// Seconds from the start of the segment audio (exclusive)
    pub local_end: f64,
}

impl ScheduledFrame {
    pub fn duration(&self) -> f64 {
        self.local_end - self.local_start
    }
}

/// Reference to a rendered frame image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AssetRef(PathBuf);

impl AssetRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// A timed overlay on the final video timeline.
///
/// The overlay is visible on the half-open interval `[global_start, global_end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OverlayWindow {
    pub segment_id: SegmentId,
    pub asset_ref: AssetRef,
    pub global_start: f64,
    pub global_end: f64,
}

impl OverlayWindow {
    pub fn duration(&self) -> f64 {
        self.global_end - self.global_start
    }

    /// Whether the overlay is visible at time `t`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.global_start && t < self.global_end
    }
}
