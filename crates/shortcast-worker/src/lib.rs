//! Shortcast worker: turns Reddit threads into narrated vertical videos.
//!
//! This crate wires the timeline engine to its real collaborators:
//! - Reddit's JSON endpoint as the content source
//! - edge-tts / espeak-ng for narration
//! - FFmpeg for card rendering and the final composite
//!
//! and keeps a ledger of threads that already have a video.

pub mod config;
pub mod error;
pub mod factory;
pub mod ledger;
pub mod logging;
pub mod reddit;

pub use config::{apply_overrides, load_config, read_config_file};
pub use error::{WorkerError, WorkerResult};
pub use factory::{Assembly, ProducedVideo, VideoFactory};
pub use ledger::{ProducedEntry, ProducedLedger};
pub use logging::JobLogger;
pub use reddit::{extract_thread_id, parse_thread_response, RedditSource};
