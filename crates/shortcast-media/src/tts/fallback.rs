//! Primary/secondary synthesizer chain.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use shortcast_timeline::{SpeechSynthesizer, SynthesisOutput, SynthesisRequest, TimelineResult};

/// Tries the primary engine, then the secondary on any failure.
///
/// Audio produced by the secondary never carries word timings, so segments
/// voiced by it are scheduled in full-text mode.
pub struct FallbackSynthesizer {
    primary: Arc<dyn SpeechSynthesizer>,
    secondary: Arc<dyn SpeechSynthesizer>,
}

impl FallbackSynthesizer {
    pub fn new(primary: Arc<dyn SpeechSynthesizer>, secondary: Arc<dyn SpeechSynthesizer>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl SpeechSynthesizer for FallbackSynthesizer {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> TimelineResult<SynthesisOutput> {
        match self.primary.synthesize(request).await {
            Ok(output) => Ok(output),
            Err(e) => {
                warn!(
                    primary = self.primary.name(),
                    secondary = self.secondary.name(),
                    error = %e,
                    "Primary speech engine failed; using fallback without word timings"
                );
                metrics::counter!("shortcast_tts_fallback_total").increment(1);
                let mut output = self.secondary.synthesize(request).await?;
                output.events.clear();
                Ok(output)
            }
        }
    }
}
