//! Neural voices through the `edge-tts` CLI.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use shortcast_timeline::{SpeechSynthesizer, SynthesisOutput, SynthesisRequest, TimelineResult};

use super::{parse_subtitle_cues, run_tool};
use crate::error::MediaError;
use crate::probe::probe_duration;

const EDGE_TTS_BIN: &str = "edge-tts";

/// Synthesizer backed by `edge-tts`, with word timings from its subtitles.
#[derive(Debug, Clone)]
pub struct EdgeTtsSynthesizer {
    voice: String,
    rate: String,
    volume: String,
    timeout: Duration,
}

impl EdgeTtsSynthesizer {
    pub fn new(voice: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            rate: "+0%".to_string(),
            volume: "+0%".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_rate(mut self, rate: impl Into<String>) -> Self {
        self.rate = rate.into();
        self
    }

    pub fn with_volume(mut self, volume: impl Into<String>) -> Self {
        self.volume = volume.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_args(&self, request: &SynthesisRequest, subtitles: &std::path::Path) -> Vec<String> {
        vec![
            "--voice".to_string(),
            self.voice.clone(),
            // `=` form keeps negative values from parsing as flags
            format!("--rate={}", self.rate),
            format!("--volume={}", self.volume),
            format!("--text={}", request.text),
            "--write-media".to_string(),
            request.output_path.to_string_lossy().to_string(),
            "--write-subtitles".to_string(),
            subtitles.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl SpeechSynthesizer for EdgeTtsSynthesizer {
    fn name(&self) -> &'static str {
        EDGE_TTS_BIN
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> TimelineResult<SynthesisOutput> {
        if request.text.trim().is_empty() {
            return Err(MediaError::speech_failed(EDGE_TTS_BIN, "empty text").into());
        }
        if let Some(parent) = request.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let subtitles = request.output_path.with_extension("vtt");
        run_tool(EDGE_TTS_BIN, self.build_args(request, &subtitles), self.timeout)
            .await
            .map_err(|e| match e {
                MediaError::Timeout(_) => e,
                other => MediaError::speech_failed(EDGE_TTS_BIN, other.to_string()),
            })?;

        let audio_duration = probe_duration(&request.output_path)
            .await
            .map_err(|e| MediaError::speech_failed(EDGE_TTS_BIN, e.to_string()))?;

        let events = match tokio::fs::read_to_string(&subtitles).await {
            Ok(content) => parse_subtitle_cues(&content),
            Err(e) => {
                warn!(path = %subtitles.display(), error = %e, "edge-tts wrote no subtitles");
                Vec::new()
            }
        };
        tokio::fs::remove_file(&subtitles).await.ok();

        debug!(
            voice = %self.voice,
            duration_secs = audio_duration,
            words = events.len(),
            "edge-tts synthesis complete"
        );

        Ok(SynthesisOutput {
            audio_path: request.output_path.clone(),
            audio_duration,
            events,
        })
    }
}
