//! Client-side view of a server-tracked scrape job.
//!
//! The server is authoritative: the client replaces `status` and
//! `message` wholesale on every poll response and never invents
//! transitions of its own.

use serde::{Deserialize, Serialize};

use crate::types::JobId;

/// Wire value the service reports for a successfully finished job.
pub const STATUS_FINISHED: &str = "finished";

/// Wire value the service reports for a failed job.
pub const STATUS_FAILED: &str = "failed";

/// Lifecycle of one tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Submitted, no status fetched yet.
    Pending,
    /// Last fetched status was an in-progress marker.
    Running,
    /// Terminal success.
    Finished,
    /// Terminal failure.
    Failed,
}

impl JobStatus {
    /// Map a wire status string onto the client-side lifecycle.
    ///
    /// Only `"finished"` and `"failed"` are terminal. Every other value
    /// -- including ones this client has never seen -- is treated as
    /// in-progress, so server-side status additions keep the tracker
    /// polling instead of breaking it.
    pub fn from_wire(status: &str) -> Self {
        match status {
            STATUS_FINISHED => Self::Finished,
            STATUS_FAILED => Self::Failed,
            _ => Self::Running,
        }
    }

    /// Whether no further transitions can occur.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

/// Snapshot of one tracked job.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    /// Opaque identifier assigned by the server. Never mutated client-side.
    pub id: JobId,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Human-readable status message, replaced on every poll.
    pub message: String,
    /// Result records, populated at most once after the Finished transition.
    pub result: Option<Vec<serde_json::Value>>,
}

impl Job {
    /// A freshly submitted job that has not been polled yet.
    pub fn pending(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            message: String::new(),
            result: None,
        }
    }

    /// First `n` result records, for compact display.
    ///
    /// Returns fewer when the result is shorter, and nothing while no
    /// result has been fetched.
    pub fn result_preview(&self, n: usize) -> &[serde_json::Value] {
        match &self.result {
            Some(records) => &records[..records.len().min(n)],
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_map_from_wire() {
        assert_eq!(JobStatus::from_wire("finished"), JobStatus::Finished);
        assert_eq!(JobStatus::from_wire("failed"), JobStatus::Failed);
    }

    #[test]
    fn in_progress_statuses_map_to_running() {
        assert_eq!(JobStatus::from_wire("running"), JobStatus::Running);
        assert_eq!(JobStatus::from_wire("pending"), JobStatus::Running);
        assert_eq!(JobStatus::from_wire("queued"), JobStatus::Running);
    }

    #[test]
    fn unknown_status_is_treated_as_running() {
        // Server-side additions must not break the tracker.
        assert_eq!(JobStatus::from_wire("paused_for_review"), JobStatus::Running);
        assert_eq!(JobStatus::from_wire(""), JobStatus::Running);
    }

    #[test]
    fn only_finished_and_failed_are_terminal() {
        assert!(JobStatus::Finished.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn pending_job_starts_empty() {
        let job = Job::pending("abc123".to_string());
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.message.is_empty());
        assert!(job.result.is_none());
    }

    #[test]
    fn result_preview_truncates_to_n() {
        let mut job = Job::pending("abc123".to_string());
        job.result = Some(vec![
            serde_json::json!({"a": 1}),
            serde_json::json!({"a": 2}),
            serde_json::json!({"a": 3}),
            serde_json::json!({"a": 4}),
        ]);
        let preview = job.result_preview(3);
        assert_eq!(preview.len(), 3);
        assert_eq!(preview[0], serde_json::json!({"a": 1}));
        assert_eq!(preview[2], serde_json::json!({"a": 3}));
    }

    #[test]
    fn result_preview_shorter_than_n() {
        let mut job = Job::pending("abc123".to_string());
        job.result = Some(vec![serde_json::json!({"a": 1})]);
        assert_eq!(job.result_preview(3).len(), 1);
    }

    #[test]
    fn result_preview_without_result_is_empty() {
        let job = Job::pending("abc123".to_string());
        assert!(job.result_preview(3).is_empty());
    }
}
