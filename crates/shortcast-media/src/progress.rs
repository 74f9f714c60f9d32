//! FFmpeg progress reporting.

use serde::{Deserialize, Serialize};

/// Snapshot of FFmpeg's `-progress` output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Frames written so far
    pub frame: u64,
    pub fps: f64,
    /// Output timestamp in microseconds
    pub out_time_us: i64,
    /// Encoding speed relative to realtime (1.5 = 1.5x)
    pub speed: f64,
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Output position in seconds.
    pub fn out_time_secs(&self) -> f64 {
        self.out_time_us as f64 / 1_000_000.0
    }

    /// Percentage of `total_secs` written, capped at 100.
    pub fn percentage(&self, total_secs: f64) -> f64 {
        if self.is_complete {
            return 100.0;
        }
        if !(total_secs > 0.0) {
            return 0.0;
        }
        (self.out_time_secs() / total_secs * 100.0).clamp(0.0, 100.0)
    }

    /// Estimated seconds until `total_secs` is written.
    pub fn eta_secs(&self, total_secs: f64) -> Option<f64> {
        if self.speed <= 0.0 || self.out_time_us <= 0 {
            return None;
        }
        let remaining = total_secs - self.out_time_secs();
        if remaining <= 0.0 {
            return Some(0.0);
        }
        Some(remaining / self.speed)
    }
}

/// Emits a progress value only when it crosses the next reporting step.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    step: f64,
    next: f64,
}

impl ProgressThrottle {
    /// Report every `step` percent.
    pub fn new(step: f64) -> Self {
        let step = if step > 0.0 { step } else { 10.0 };
        Self { step, next: step }
    }

    /// Returns the percentage to report, if a new step was reached.
    pub fn update(&mut self, percentage: f64) -> Option<f64> {
        if percentage < self.next {
            return None;
        }
        while self.next <= percentage {
            self.next += self.step;
        }
        Some(percentage)
    }
}
