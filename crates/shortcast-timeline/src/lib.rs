//! Synchronized timeline assembly for narrated videos.
//!
//! The engine runs strictly forward:
//!
//! 1. [`DurationSelector`] synthesizes the title and comments one at a time
//!    until the narrated duration reaches the target.
//! 2. [`normalize`] places each accepted segment on the global timeline.
//! 3. [`schedule_segment`] turns word timings into per-segment frame windows.
//! 4. [`OverlayCompiler`] renders each distinct frame state and emits the
//!    global overlay windows handed to the muxer.
//!
//! Speech synthesis, frame rendering and content fetching are reached through
//! the traits in [`collaborators`].

pub mod collaborators;
pub mod compiler;
pub mod diagnostics;
pub mod error;
pub mod normalizer;
pub mod scheduler;
pub mod selector;

pub use collaborators::{
    Candidates, ContentSource, FrameRenderer, RenderRequest, SpeechSynthesizer, SynthesisOutput,
    SynthesisRequest,
};
pub use compiler::{validate_schedule, OverlayCompiler};
pub use diagnostics::{timing_records, write_timing_dump, TimingRecord};
pub use error::{TimelineError, TimelineResult};
pub use normalizer::{global_events, normalize, SegmentOffset, TimelineOffsets};
pub use scheduler::{schedule_all, schedule_segment, SchedulingMode, SegmentSchedule};
pub use selector::{
    fetch_limit, CandidateSlot, DurationSelector, Selection, SkipReason, SkippedCandidate,
    DEFAULT_SELECTION_BOUNDARY, FALLBACK_COMMENT_COUNT, MAX_FETCH_COMMENTS,
    SECONDS_PER_COMMENT_ESTIMATE,
};
