//! Interfaces to the collaborators the engine drives.
//!
//! The engine never talks to a speech engine, an image renderer or a
//! content API directly. It calls these traits, which the media and worker
//! crates implement (and tests replace with in-memory fakes).

use std::path::PathBuf;

use async_trait::async_trait;

use shortcast_models::{
    AssetRef, CardStyle, RedditThread, SegmentId, TimingEvent, VisualSource, VisualState,
};

use crate::error::TimelineResult;

/// Text to speak and where to write the audio.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub output_path: PathBuf,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            text: text.into(),
            output_path: output_path.into(),
        }
    }
}

/// Result of one synthesis call.
///
/// `events` is empty when the engine that produced the audio cannot report
/// word boundaries. That is an expected outcome, not an error.
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub audio_path: PathBuf,
    pub audio_duration: f64,
    pub events: Vec<TimingEvent>,
}

impl SynthesisOutput {
    pub fn has_timings(&self) -> bool {
        !self.events.is_empty()
    }
}

/// Speech engine.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Engine name for logging and metrics.
    fn name(&self) -> &'static str;

    /// Synthesize `request.text` into `request.output_path`.
    async fn synthesize(&self, request: &SynthesisRequest) -> TimelineResult<SynthesisOutput>;
}

/// Everything a renderer needs to draw one frame image.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub segment_id: SegmentId,
    /// Index of this distinct state within its segment
    pub ordinal: usize,
    pub source: VisualSource,
    pub state: VisualState,
    pub style: CardStyle,
}

impl RenderRequest {
    /// Conventional file stem for the rendered image, e.g. `comment_2_004`.
    pub fn file_stem(&self) -> String {
        format!("{}_{:03}", self.segment_id, self.ordinal)
    }
}

/// Frame image renderer.
///
/// Identical requests must yield equivalent images.
#[async_trait]
pub trait FrameRenderer: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> TimelineResult<AssetRef>;
}

/// Ordered narration candidates: the title, then comments in selection order.
#[derive(Debug, Clone)]
pub struct Candidates {
    pub title: VisualSource,
    pub comments: Vec<VisualSource>,
}

impl Candidates {
    pub fn len(&self) -> usize {
        self.comments.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl From<&RedditThread> for Candidates {
    fn from(thread: &RedditThread) -> Self {
        Self {
            title: VisualSource::Title {
                text: thread.title.clone(),
                subreddit: thread.subreddit.clone(),
            },
            comments: thread
                .comments
                .iter()
                .map(|c| VisualSource::Comment {
                    text: c.body.clone(),
                    author: c.author.clone(),
                    score: c.score,
                })
                .collect(),
        }
    }
}

/// Supplier of thread content.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch a thread with at most `limit` comments.
    async fn fetch(&self, thread_id: &str, limit: usize) -> TimelineResult<RedditThread>;
}
