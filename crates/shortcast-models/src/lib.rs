//! Shared data models for the Shortcast pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Word timing events produced by speech synthesis
//! - Narrated segments (title and comments) and their visual sources
//! - Scheduled frames and global overlay windows
//! - Reddit thread content
//! - Factory configuration and encoding settings

pub mod config;
pub mod encoding;
pub mod frame;
pub mod segment;
pub mod thread;
pub mod timestamp;
pub mod timing;

// Re-export common types
pub use config::{
    BackgroundConfig, CardStyle, ConfigError, DurationConfig, DurationMode, FactoryConfig,
    OutputConfig, RedditConfig, SelectionBoundary, VideoConfig, VoiceConfig, VoiceEngine,
};
pub use encoding::EncodingConfig;
pub use frame::{AssetRef, OverlayWindow, ScheduledFrame, VisualState};
pub use segment::{Segment, SegmentId, VisualSource};
pub use thread::{RedditComment, RedditThread};
pub use timing::TimingEvent;
