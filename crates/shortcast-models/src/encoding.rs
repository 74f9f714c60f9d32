//! Final video encoding configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "faster";
/// Default video bitrate
pub const DEFAULT_VIDEO_BITRATE: &str = "8M";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";
/// Upper bound on encoder threads
pub const MAX_ENCODER_THREADS: usize = 8;

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264", "h264_nvenc")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "faster", "medium")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Target video bitrate
    #[serde(default = "default_video_bitrate")]
    pub video_bitrate: String,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Encoder threads; 0 lets the encoder decide
    #[serde(default)]
    pub threads: usize,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_video_bitrate() -> String {
    DEFAULT_VIDEO_BITRATE.to_string()
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            preset: default_preset(),
            video_bitrate: default_video_bitrate(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            threads: 0,
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    /// Returns a new config with a fixed thread count, capped at [`MAX_ENCODER_THREADS`].
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.min(MAX_ENCODER_THREADS);
        self
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-b:v".to_string(),
            self.video_bitrate.clone(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ];

        if self.threads > 0 {
            args.extend_from_slice(&["-threads".to_string(), self.threads.to_string()]);
        }

        args.extend(self.extra_args.clone());

        args
    }
}
