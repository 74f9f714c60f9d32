//! Error types for timeline assembly.

use thiserror::Error;

/// Result type for timeline operations.
pub type TimelineResult<T> = Result<T, TimelineError>;

/// Errors that can occur while assembling a timeline.
#[derive(Debug, Error)]
pub enum TimelineError {
    /// One candidate failed to synthesize. The selector skips it.
    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    #[error("Speech synthesis timed out after {0} seconds")]
    SynthesisTimeout(u64),

    /// Every candidate, title included, failed to synthesize.
    #[error("Every candidate failed speech synthesis ({attempted} attempted)")]
    TotalSelectionFailure { attempted: usize },

    #[error("Frame render failed: {0}")]
    Render(String),

    #[error("Content unavailable: {0}")]
    ContentUnavailable(String),

    #[error("Invalid segment: {0}")]
    InvalidSegment(String),

    #[error("Invalid timeline: {0}")]
    InvalidTimeline(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TimelineError {
    /// Create a synthesis failure error.
    pub fn synthesis(message: impl Into<String>) -> Self {
        Self::Synthesis {
            message: message.into(),
        }
    }

    /// Create a render failure error.
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    /// Create a content source error.
    pub fn content(message: impl Into<String>) -> Self {
        Self::ContentUnavailable(message.into())
    }

    pub fn invalid_segment(message: impl Into<String>) -> Self {
        Self::InvalidSegment(message.into())
    }

    pub fn invalid_timeline(message: impl Into<String>) -> Self {
        Self::InvalidTimeline(message.into())
    }

    /// Whether this error is local to one candidate and can be skipped.
    pub fn is_candidate_local(&self) -> bool {
        matches!(self, Self::Synthesis { .. } | Self::SynthesisTimeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_local_classification() {
        assert!(TimelineError::synthesis("boom").is_candidate_local());
        assert!(TimelineError::SynthesisTimeout(60).is_candidate_local());
        assert!(!TimelineError::TotalSelectionFailure { attempted: 4 }.is_candidate_local());
        assert!(!TimelineError::render("no font").is_candidate_local());
    }
}
