//! Offline speech through `espeak-ng`. No word timings.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use shortcast_timeline::{SpeechSynthesizer, SynthesisOutput, SynthesisRequest, TimelineResult};

use super::run_tool;
use crate::error::MediaError;
use crate::probe::probe_duration;

const ESPEAK_BIN: &str = "espeak-ng";
const BASE_WPM: f64 = 175.0;

/// Convert a relative rate such as `+12%` into espeak words per minute.
pub fn rate_to_wpm(rate: &str) -> u32 {
    let percent = rate
        .trim()
        .trim_end_matches('%')
        .parse::<f64>()
        .unwrap_or(0.0);
    (BASE_WPM * (1.0 + percent / 100.0)).round().clamp(80.0, 450.0) as u32
}

/// Synthesizer backed by `espeak-ng`, writing WAV audio.
#[derive(Debug, Clone)]
pub struct EspeakSynthesizer {
    voice: String,
    words_per_minute: u32,
    timeout: Duration,
}

impl Default for EspeakSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl EspeakSynthesizer {
    pub fn new() -> Self {
        Self {
            voice: "en-us".to_string(),
            words_per_minute: BASE_WPM as u32,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_rate(mut self, rate: &str) -> Self {
        self.words_per_minute = rate_to_wpm(rate);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SpeechSynthesizer for EspeakSynthesizer {
    fn name(&self) -> &'static str {
        ESPEAK_BIN
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> TimelineResult<SynthesisOutput> {
        if request.text.trim().is_empty() {
            return Err(MediaError::speech_failed(ESPEAK_BIN, "empty text").into());
        }
        if let Some(parent) = request.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let audio_path = request.output_path.with_extension("wav");
        // Text goes through a file so leading dashes are never read as flags
        let text_path = request.output_path.with_extension("txt");
        tokio::fs::write(&text_path, &request.text).await?;

        let args = vec![
            "-v".to_string(),
            self.voice.clone(),
            "-s".to_string(),
            self.words_per_minute.to_string(),
            "-w".to_string(),
            audio_path.to_string_lossy().to_string(),
            "-f".to_string(),
            text_path.to_string_lossy().to_string(),
        ];
        let result = run_tool(ESPEAK_BIN, args, self.timeout).await;
        tokio::fs::remove_file(&text_path).await.ok();
        result?;

        let audio_duration = probe_duration(&audio_path)
            .await
            .map_err(|e| MediaError::speech_failed(ESPEAK_BIN, e.to_string()))?;

        debug!(duration_secs = audio_duration, "espeak-ng synthesis complete");

        Ok(SynthesisOutput {
            audio_path,
            audio_duration,
            events: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_to_wpm() {
        assert_eq!(rate_to_wpm("+0%"), 175);
        assert_eq!(rate_to_wpm("+12%"), 196);
        assert_eq!(rate_to_wpm("-20%"), 140);
        assert_eq!(rate_to_wpm("garbage"), 175);
        assert_eq!(rate_to_wpm("+500%"), 450);
    }
}
