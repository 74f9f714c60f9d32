//! Duration-targeted content selection.
//!
//! Candidates are synthesized one at a time, in order, and accumulated until
//! the narrated duration reaches the target. Each candidate is synthesized at
//! most once; later decisions depend on the measured durations of earlier
//! ones, so there is no parallel or speculative synthesis.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use shortcast_models::{DurationConfig, DurationMode, Segment, SegmentId, SelectionBoundary, VisualSource};

use crate::collaborators::{Candidates, SpeechSynthesizer, SynthesisOutput, SynthesisRequest};
use crate::error::{TimelineError, TimelineResult};

/// Comments selected when the target duration is unusable.
pub const FALLBACK_COMMENT_COUNT: usize = 3;

/// Boundary rule used unless configured otherwise.
pub const DEFAULT_SELECTION_BOUNDARY: SelectionBoundary = SelectionBoundary::StopOnceReached;

/// Rough narrated length of one comment, used to size long-form fetches.
pub const SECONDS_PER_COMMENT_ESTIMATE: f64 = 15.0;

/// Upper bound on comments requested from the content source.
pub const MAX_FETCH_COMMENTS: usize = 500;

/// Default per-call synthesis timeout.
pub const DEFAULT_SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(60);

/// Number of comments to request from the content source.
///
/// Short-form uses the configured count. Long-form scales with the target so
/// a long video is not under-filled by a short candidate list.
pub fn fetch_limit(config: &DurationConfig) -> usize {
    match config.mode {
        DurationMode::Short => config.max_comments,
        DurationMode::Long => {
            let target = config.long_duration_secs;
            let estimated = if target.is_finite() && target > 0.0 {
                (target / SECONDS_PER_COMMENT_ESTIMATE).ceil() as usize
            } else {
                0
            };
            config.max_comments.max(estimated).min(MAX_FETCH_COMMENTS)
        }
    }
}

/// Position of a candidate in the input list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSlot {
    Title,
    /// Index into the comment candidates (not the compacted segment number)
    Comment(usize),
}

/// Why a candidate did not become a segment.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Failed(String),
    TimedOut,
    /// Synthesized, but would have pushed the total past the target
    ExceedsTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCandidate {
    pub slot: CandidateSlot,
    pub reason: SkipReason,
}

/// Outcome of a selection run.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Accepted segments in narrated order
    pub segments: Vec<Segment>,
    pub skipped: Vec<SkippedCandidate>,
    /// Selection stopped early on request; `segments` are still valid
    pub cancelled: bool,
}

impl Selection {
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.audio_duration).sum()
    }

    pub fn comment_count(&self) -> usize {
        self.segments.iter().filter(|s| !s.id.is_title()).count()
    }

    pub fn has_title(&self) -> bool {
        self.segments.first().map(|s| s.id.is_title()).unwrap_or(false)
    }
}

/// How comments are taken once the title has been synthesized.
enum Policy {
    /// Unusable target: take a fixed number of comments
    FixedCount(usize),
    /// Accumulate until the target is reached
    Target(f64),
}

/// Incremental, target-driven segment selector.
pub struct DurationSelector {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    work_dir: PathBuf,
    timeout: Duration,
    boundary: SelectionBoundary,
}

impl DurationSelector {
    /// Create a selector writing audio artifacts into `work_dir`.
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            synthesizer,
            work_dir: work_dir.into(),
            timeout: DEFAULT_SYNTHESIS_TIMEOUT,
            boundary: DEFAULT_SELECTION_BOUNDARY,
        }
    }

    /// Per-call synthesis timeout. A timed-out call counts as a failed candidate.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_boundary(mut self, boundary: SelectionBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Select the prefix of `candidates` to narrate for `target` seconds.
    ///
    /// Cancellation is checked before every synthesis call. On cancel the
    /// segments accepted so far are returned with `cancelled` set.
    ///
    /// Fails only when the title and every comment fail to synthesize.
    pub async fn select(
        &self,
        candidates: &Candidates,
        target: f64,
        cancel: Option<watch::Receiver<bool>>,
    ) -> TimelineResult<Selection> {
        let mut selection = Selection::default();
        let mut attempted = 0usize;
        tokio::fs::create_dir_all(&self.work_dir).await?;

        if is_cancelled(&cancel) {
            info!("Selection cancelled before title synthesis");
            selection.cancelled = true;
            return Ok(selection);
        }

        attempted += 1;
        let title_duration = match self
            .synthesize_candidate(CandidateSlot::Title, &candidates.title)
            .await
        {
            Ok(output) => {
                let duration = output.audio_duration;
                selection.segments.push(Segment::new(
                    SegmentId::title(),
                    output.audio_duration,
                    output.events,
                    candidates.title.clone(),
                    output.audio_path,
                ));
                Some(duration)
            }
            Err(reason) => {
                error!(
                    reason = ?reason,
                    "Title synthesis failed; continuing without a title segment"
                );
                selection.skipped.push(SkippedCandidate {
                    slot: CandidateSlot::Title,
                    reason,
                });
                None
            }
        };

        let policy = if !target.is_finite() || target <= 0.0 {
            warn!(
                target_secs = target,
                fallback_count = FALLBACK_COMMENT_COUNT,
                "Invalid target duration; falling back to a fixed comment count"
            );
            Policy::FixedCount(FALLBACK_COMMENT_COUNT)
        } else {
            match title_duration {
                Some(duration) if duration >= target => {
                    warn!(
                        title_secs = duration,
                        target_secs = target,
                        "Title alone meets the target duration; no comments fit"
                    );
                    return Ok(self.finish(selection, attempted));
                }
                _ => Policy::Target(target),
            }
        };

        let mut cumulative = title_duration.unwrap_or(0.0);
        let mut accepted = 0usize;

        for (index, source) in candidates.comments.iter().enumerate() {
            if let Policy::FixedCount(count) = policy {
                if accepted >= count {
                    break;
                }
            }

            if is_cancelled(&cancel) {
                info!(
                    accepted_comments = accepted,
                    "Selection cancelled; keeping segments accepted so far"
                );
                selection.cancelled = true;
                break;
            }

            attempted += 1;
            let output = match self
                .synthesize_candidate(CandidateSlot::Comment(index), source)
                .await
            {
                Ok(output) => output,
                Err(reason) => {
                    warn!(
                        candidate_index = index,
                        reason = ?reason,
                        "Skipping comment that failed synthesis"
                    );
                    selection.skipped.push(SkippedCandidate {
                        slot: CandidateSlot::Comment(index),
                        reason,
                    });
                    continue;
                }
            };

            if let Policy::Target(target) = policy {
                let would_exceed = cumulative + output.audio_duration > target;
                if self.boundary == SelectionBoundary::StopBeforeExceeding
                    && would_exceed
                    && accepted > 0
                {
                    debug!(
                        candidate_index = index,
                        cumulative_secs = cumulative,
                        candidate_secs = output.audio_duration,
                        "Discarding comment that would exceed the target"
                    );
                    discard_artifact(&output.audio_path).await;
                    selection.skipped.push(SkippedCandidate {
                        slot: CandidateSlot::Comment(index),
                        reason: SkipReason::ExceedsTarget,
                    });
                    break;
                }
            }

            cumulative += output.audio_duration;
            selection.segments.push(Segment::new(
                SegmentId::comment(accepted),
                output.audio_duration,
                output.events,
                source.clone(),
                output.audio_path,
            ));
            accepted += 1;

            if let Policy::Target(target) = policy {
                if cumulative >= target {
                    debug!(
                        cumulative_secs = cumulative,
                        target_secs = target,
                        "Target duration reached"
                    );
                    break;
                }
            }
        }

        if selection.segments.is_empty() && !selection.cancelled {
            error!(attempted, "Every candidate failed speech synthesis");
            return Err(TimelineError::TotalSelectionFailure { attempted });
        }

        Ok(self.finish(selection, attempted))
    }

    fn finish(&self, selection: Selection, attempted: usize) -> Selection {
        metrics::histogram!("shortcast_selected_comments").record(selection.comment_count() as f64);
        info!(
            segments = selection.segments.len(),
            comments = selection.comment_count(),
            skipped = selection.skipped.len(),
            attempted,
            total_secs = format!("{:.2}", selection.total_duration()),
            cancelled = selection.cancelled,
            "Selection complete"
        );
        selection
    }

    /// Synthesize one candidate with the configured timeout.
    ///
    /// Zero-length or non-finite audio counts as a failure.
    async fn synthesize_candidate(
        &self,
        slot: CandidateSlot,
        source: &VisualSource,
    ) -> Result<SynthesisOutput, SkipReason> {
        let (kind, file_name) = match slot {
            CandidateSlot::Title => ("title", "title.mp3".to_string()),
            CandidateSlot::Comment(index) => ("comment", format!("comment_{}.mp3", index)),
        };
        let request = SynthesisRequest::new(source.text(), self.work_dir.join(file_name));

        let result = tokio::time::timeout(self.timeout, self.synthesizer.synthesize(&request)).await;

        let outcome = match result {
            Err(_) => Err(SkipReason::TimedOut),
            Ok(Err(e)) => Err(SkipReason::Failed(e.to_string())),
            Ok(Ok(output)) if !(output.audio_duration.is_finite() && output.audio_duration > 0.0) => {
                discard_artifact(&output.audio_path).await;
                Err(SkipReason::Failed(format!(
                    "synthesized audio has no duration ({})",
                    output.audio_duration
                )))
            }
            Ok(Ok(output)) => Ok(output),
        };

        let label = match &outcome {
            Ok(_) => "ok",
            Err(SkipReason::TimedOut) => "timeout",
            Err(_) => "error",
        };
        metrics::counter!("shortcast_synthesis_total", "kind" => kind, "outcome" => label)
            .increment(1);

        if let Ok(output) = &outcome {
            debug!(
                engine = self.synthesizer.name(),
                kind,
                duration_secs = output.audio_duration,
                words = output.events.len(),
                "Candidate synthesized"
            );
        }

        outcome
    }
}

fn is_cancelled(cancel: &Option<watch::Receiver<bool>>) -> bool {
    cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
}

async fn discard_artifact(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!(path = %path.display(), error = %e, "Failed to remove discarded audio");
        }
    }
}
