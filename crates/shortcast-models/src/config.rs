//! Factory configuration.
//!
//! Every section is fully defaulted so a partial (or empty) JSON document
//! deserializes into a usable configuration. Call [`FactoryConfig::validate`]
//! after applying overrides.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoding::EncodingConfig;

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Short-form or long-form output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DurationMode {
    #[default]
    Short,
    Long,
}

impl fmt::Display for DurationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationMode::Short => write!(f, "short"),
            DurationMode::Long => write!(f, "long"),
        }
    }
}

impl FromStr for DurationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(DurationMode::Short),
            "long" => Ok(DurationMode::Long),
            other => Err(ConfigError::UnknownVariant {
                kind: "duration mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Rule deciding whether the comment that crosses the target is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SelectionBoundary {
    /// Include the crossing comment, then stop (cumulative ends >= target).
    StopOnceReached,
    /// Discard the crossing comment, then stop (cumulative ends <= target,
    /// except that the first comment is always kept).
    StopBeforeExceeding,
}

impl Default for SelectionBoundary {
    fn default() -> Self {
        SelectionBoundary::StopOnceReached
    }
}

/// Which speech engine to call first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoiceEngine {
    /// edge-tts: neural voices with word boundaries
    #[default]
    EdgeTts,
    /// espeak-ng: offline, no word timings
    Espeak,
}

impl FromStr for VoiceEngine {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "edge_tts" | "edge" => Ok(VoiceEngine::EdgeTts),
            "espeak" | "espeak_ng" => Ok(VoiceEngine::Espeak),
            other => Err(ConfigError::UnknownVariant {
                kind: "voice engine",
                value: other.to_string(),
            }),
        }
    }
}

/// Output geometry and card compositing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Card width as a fraction of the video width
    pub card_width_ratio: f64,
    /// Alpha applied to comment cards (title cards stay opaque)
    pub comment_opacity: f64,
    pub encoding: EncodingConfig,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            card_width_ratio: 0.45,
            comment_opacity: 0.92,
            encoding: EncodingConfig::default(),
        }
    }
}

impl VideoConfig {
    /// Card width in pixels, always even for yuv420p.
    pub fn card_width(&self) -> u32 {
        let width = (self.width as f64 * self.card_width_ratio).round() as u32;
        width - width % 2
    }
}

/// Duration targeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DurationConfig {
    pub mode: DurationMode,
    /// Target for short-form videos, in seconds
    pub target_duration_secs: f64,
    /// Target for long-form videos, in seconds
    pub long_duration_secs: f64,
    /// Comments fetched for short-form videos
    pub max_comments: usize,
    pub boundary: SelectionBoundary,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            mode: DurationMode::Short,
            target_duration_secs: 90.0,
            long_duration_secs: 3600.0,
            max_comments: 12,
            boundary: SelectionBoundary::default(),
        }
    }
}

impl DurationConfig {
    /// Target for the configured mode.
    pub fn target_secs(&self) -> f64 {
        match self.mode {
            DurationMode::Short => self.target_duration_secs,
            DurationMode::Long => self.long_duration_secs,
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct VoiceConfig {
    pub engine: VoiceEngine,
    pub voice: String,
    /// Relative rate, e.g. "+12%"
    pub rate: String,
    pub volume: String,
    /// Retry a failed edge-tts call with espeak-ng (no word timings)
    pub fallback_to_espeak: bool,
    pub synthesis_timeout_secs: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            engine: VoiceEngine::EdgeTts,
            voice: "en-US-AriaNeural".to_string(),
            rate: "+12%".to_string(),
            volume: "+0%".to_string(),
            fallback_to_espeak: true,
            synthesis_timeout_secs: 60,
        }
    }
}

impl VoiceConfig {
    /// Time allowed for one candidate, covering every engine in the chain.
    ///
    /// Each engine gets `synthesis_timeout_secs` of its own, so with the
    /// espeak-ng fallback behind edge-tts a candidate may take twice that.
    pub fn candidate_timeout_secs(&self) -> u64 {
        match self.engine {
            VoiceEngine::EdgeTts if self.fallback_to_espeak => {
                self.synthesis_timeout_secs.saturating_mul(2)
            }
            _ => self.synthesis_timeout_secs,
        }
    }
}

/// Background video and music.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Looped behind the cards; a solid color is used when absent
    pub video_path: Option<PathBuf>,
    /// Mixed under the narration when present
    pub audio_path: Option<PathBuf>,
    pub audio_volume: f64,
    /// FFmpeg color used when no background video is configured
    pub color: String,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            video_path: None,
            audio_path: None,
            audio_volume: 0.12,
            color: "0x1E1E2E".to_string(),
        }
    }
}

/// Content source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RedditConfig {
    pub user_agent: String,
    pub base_url: String,
    pub prefer_top_comments: bool,
    pub request_timeout_secs: u64,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            user_agent: "shortcast/0.1".to_string(),
            base_url: "https://www.reddit.com".to_string(),
            prefer_top_comments: true,
            request_timeout_secs: 30,
        }
    }
}

/// Filesystem layout of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// Per-thread temporary assets live under `work_dir/<thread_id>`
    pub work_dir: PathBuf,
    /// Finished videos land in `results_dir/<subreddit>`
    pub results_dir: PathBuf,
    pub keep_temp: bool,
    /// Produced-videos ledger
    pub ledger_path: PathBuf,
    /// Write `timings.json` next to the temporary assets
    pub dump_timings: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("assets/temp"),
            results_dir: PathBuf::from("results"),
            keep_temp: false,
            ledger_path: PathBuf::from("produced_videos.json"),
            dump_timings: false,
        }
    }
}

/// Complete factory configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FactoryConfig {
    pub video: VideoConfig,
    pub duration: DurationConfig,
    pub voice: VoiceConfig,
    pub background: BackgroundConfig,
    pub reddit: RedditConfig,
    pub output: OutputConfig,
}

impl FactoryConfig {
    /// Validate value ranges after deserialization and overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.video.width == 0 || self.video.height == 0 {
            return Err(ConfigError::invalid("video.width/height", "must be non-zero"));
        }
        if self.video.width % 2 != 0 || self.video.height % 2 != 0 {
            return Err(ConfigError::invalid("video.width/height", "must be even"));
        }
        if self.video.fps == 0 {
            return Err(ConfigError::invalid("video.fps", "must be non-zero"));
        }
        if !(self.video.card_width_ratio > 0.0 && self.video.card_width_ratio <= 1.0) {
            return Err(ConfigError::invalid(
                "video.card_width_ratio",
                format!("{} is outside (0, 1]", self.video.card_width_ratio),
            ));
        }
        if !(0.0..=1.0).contains(&self.video.comment_opacity) {
            return Err(ConfigError::invalid(
                "video.comment_opacity",
                format!("{} is outside [0, 1]", self.video.comment_opacity),
            ));
        }
        if !self.duration.target_duration_secs.is_finite()
            || !self.duration.long_duration_secs.is_finite()
        {
            return Err(ConfigError::invalid("duration", "targets must be finite"));
        }
        if self.voice.synthesis_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "voice.synthesis_timeout_secs",
                "must be non-zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.background.audio_volume) {
            return Err(ConfigError::invalid(
                "background.audio_volume",
                format!("{} is outside [0, 1]", self.background.audio_volume),
            ));
        }
        if self.reddit.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid("reddit.user_agent", "must not be empty"));
        }
        Ok(())
    }

    /// Immutable style value handed to every render call.
    pub fn card_style(&self) -> CardStyle {
        CardStyle {
            card_width: self.video.card_width(),
            font_size: (self.video.card_width() / 18).max(12),
            title_font_size: (self.video.card_width() / 14).max(14),
            padding: (self.video.card_width() / 24).max(8),
            background_color: "0xFFFFFF".to_string(),
            text_color: "0x1A1A1B".to_string(),
            accent_color: "0xFF4500".to_string(),
            max_chars_per_line: 28,
        }
    }
}

/// Style parameters for card rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct CardStyle {
    pub card_width: u32,
    pub font_size: u32,
    pub title_font_size: u32,
    pub padding: u32,
    pub background_color: String,
    pub text_color: String,
    pub accent_color: String,
    pub max_chars_per_line: usize,
}

impl Default for CardStyle {
    fn default() -> Self {
        FactoryConfig::default().card_style()
    }
}
