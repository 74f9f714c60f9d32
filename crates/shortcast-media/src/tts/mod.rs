//! Speech synthesis engines.
//!
//! Each engine implements [`SpeechSynthesizer`](shortcast_timeline::SpeechSynthesizer).
//! Engines that can report word boundaries return them as timing events;
//! the others return audio only and the scheduler shows full-text cards.

mod cues;
mod edge;
mod espeak;
mod fallback;

pub use cues::parse_subtitle_cues;
pub use edge::EdgeTtsSynthesizer;
pub use espeak::{rate_to_wpm, EspeakSynthesizer};
pub use fallback::FallbackSynthesizer;

use std::ffi::OsStr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use shortcast_models::{VoiceConfig, VoiceEngine};
use shortcast_timeline::SpeechSynthesizer;

use crate::error::{MediaError, MediaResult};

/// Build the synthesizer chain described by the voice configuration.
pub fn synthesizer_from_config(config: &VoiceConfig) -> Arc<dyn SpeechSynthesizer> {
    let timeout = Duration::from_secs(config.synthesis_timeout_secs);
    match config.engine {
        VoiceEngine::EdgeTts => {
            let edge = Arc::new(
                EdgeTtsSynthesizer::new(&config.voice)
                    .with_rate(&config.rate)
                    .with_volume(&config.volume)
                    .with_timeout(timeout),
            );
            if config.fallback_to_espeak {
                Arc::new(FallbackSynthesizer::new(
                    edge,
                    Arc::new(EspeakSynthesizer::new().with_rate(&config.rate).with_timeout(timeout)),
                ))
            } else {
                edge
            }
        }
        VoiceEngine::Espeak => {
            Arc::new(EspeakSynthesizer::new().with_rate(&config.rate).with_timeout(timeout))
        }
    }
}

/// Run a speech tool to completion, failing on non-zero exit or timeout.
pub(crate) async fn run_tool<I, S>(program: &str, args: I, timeout: Duration) -> MediaResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    which::which(program).map_err(|_| MediaError::tool_not_found(program))?;

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(result) => result?,
        Err(_) => return Err(MediaError::Timeout(timeout.as_secs())),
    };

    if output.status.success() {
        debug!(program, "Speech tool finished");
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(MediaError::speech_failed(
            program,
            format!(
                "exited with {:?}: {}",
                output.status.code(),
                stderr.trim().lines().last().unwrap_or("no output")
            ),
        ))
    }
}
