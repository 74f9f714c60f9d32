//! Media tooling for Shortcast.
//!
//! Wraps the external programs the pipeline shells out to:
//! - `ffmpeg` / `ffprobe`: command building, progress, duration probing,
//!   card rendering and the final composite
//! - `edge-tts` / `espeak-ng`: speech synthesis with optional word timings
//!
//! All long-running operations are async and respect timeouts.

pub mod command;
pub mod error;
pub mod mux;
pub mod probe;
pub mod progress;
pub mod render;
pub mod tts;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use mux::{build_overlay_filter_graph, Background, FfmpegMuxer, MuxJob, MuxLayout, OverlayGraph};
pub use probe::{probe_duration, probe_media, MediaInfo};
pub use progress::FfmpegProgress;
pub use render::FfmpegCardRenderer;
pub use tts::{
    parse_subtitle_cues, synthesizer_from_config, EdgeTtsSynthesizer, EspeakSynthesizer,
    FallbackSynthesizer,
};
