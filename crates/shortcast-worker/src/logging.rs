//! Structured job logging.
//!
//! Every production run gets a job id so interleaved log lines from one
//! thread can be grouped, whichever output format is active.

use tracing::{error, info, warn};
use uuid::Uuid;

/// Logger carrying the job id and thread id for one production run.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    thread_id: String,
}

impl JobLogger {
    /// Create a logger with a fresh job id.
    pub fn new(thread_id: &str) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            thread_id = %self.thread_id,
            "Job started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            thread_id = %self.thread_id,
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            thread_id = %self.thread_id,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            thread_id = %self.thread_id,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            thread_id = %self.thread_id,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_are_unique() {
        let a = JobLogger::new("abc123");
        let b = JobLogger::new("abc123");
        assert_ne!(a.job_id(), b.job_id());
        assert_eq!(a.thread_id(), "abc123");
        assert!(Uuid::parse_str(a.job_id()).is_ok());
    }
}
