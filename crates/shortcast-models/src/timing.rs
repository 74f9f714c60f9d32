//! Word timing events reported by speech synthesis.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One spoken unit (typically a word) inside a single audio segment.
///
/// `offset` is measured from the start of the segment's own audio, never
/// from the start of the final video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimingEvent {
    /// The spoken text.
    pub text: String,
    /// Seconds from the start of the segment audio.
    pub offset: f64,
    /// How long the unit is spoken, in seconds. May be an estimate.
    pub span: f64,
}

impl TimingEvent {
    /// Create a timing event, clamping negative or non-finite values to zero.
    pub fn new(text: impl Into<String>, offset: f64, span: f64) -> Self {
        Self {
            text: text.into(),
            offset: sanitize(offset),
            span: sanitize(span),
        }
    }

    /// Time at which the unit stops being spoken.
    pub fn end(&self) -> f64 {
        self.offset + self.span
    }

    /// Return a copy moved later by `delta` seconds.
    pub fn shifted(&self, delta: f64) -> Self {
        Self {
            text: self.text.clone(),
            offset: self.offset + delta,
            span: self.span,
        }
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
