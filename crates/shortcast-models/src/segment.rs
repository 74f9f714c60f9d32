//! Narrated segments and their visual sources.

use std::fmt;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timing::TimingEvent;

/// Identifier of a segment within one video.
///
/// Ids are `title` for the thread title and `comment_{k}` for the k-th
/// accepted comment. Numbering is compacted: skipped candidates leave no gap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SegmentId(String);

impl SegmentId {
    /// Create an id from an arbitrary string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id of the title segment.
    pub fn title() -> Self {
        Self("title".to_string())
    }

    /// Id of the `index`-th accepted comment.
    pub fn comment(index: usize) -> Self {
        Self(format!("comment_{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_title(&self) -> bool {
        self.0 == "title"
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content the renderer needs to draw a segment's card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisualSource {
    /// Thread title card
    Title { text: String, subreddit: String },
    /// Comment card
    Comment {
        text: String,
        author: String,
        score: i64,
    },
}

impl VisualSource {
    /// The full text narrated for this segment.
    pub fn text(&self) -> &str {
        match self {
            VisualSource::Title { text, .. } | VisualSource::Comment { text, .. } => text,
        }
    }

    pub fn is_title(&self) -> bool {
        matches!(self, VisualSource::Title { .. })
    }
}

/// One independently synthesized unit of narration.
///
/// Created by the duration selector once the segment is accepted and
/// read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    /// Unique id, in narrated order
    pub id: SegmentId,
    /// Measured length of the synthesized audio in seconds
    pub audio_duration: f64,
    /// Word timings relative to this segment's audio; empty when unavailable
    #[serde(default)]
    pub events: Vec<TimingEvent>,
    /// Text and card parameters for rendering
    pub visual_source: VisualSource,
    /// Synthesized audio artifact owned by this segment
    pub audio_path: PathBuf,
}

impl Segment {
    pub fn new(
        id: SegmentId,
        audio_duration: f64,
        events: Vec<TimingEvent>,
        visual_source: VisualSource,
        audio_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            audio_duration,
            events,
            visual_source,
            audio_path: audio_path.into(),
        }
    }

    /// Whether the speech engine reported word timings for this segment.
    pub fn has_timings(&self) -> bool {
        !self.events.is_empty()
    }

    /// Full narrated text.
    pub fn text(&self) -> &str {
        self.visual_source.text()
    }
}
