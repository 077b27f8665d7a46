//! Job lifecycle tracker.
//!
//! Drives a client-side view of one server-side job: poll the status
//! endpoint until a terminal state is reached, then fetch the result
//! exactly once. Polling is strictly sequential -- the next request is
//! scheduled only after the current one completes, so at most one
//! request is ever in flight. A transport failure never changes state;
//! the poll retries after a longer backoff than the normal interval,
//! without bound. Cancellation is cooperative: the token is raced
//! against every await and consulted again before every state mutation,
//! so a response in flight at cancellation time is discarded, not acted
//! upon.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use scrapedeck_core::job::{Job, JobStatus};
use scrapedeck_core::types::JobId;

use crate::api::{ApiError, ScrapeApi, StatusResponse};
use crate::config::ClientConfig;

/// Capacity of the tracker event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Poll timing knobs.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between successful status polls.
    pub interval: Duration,
    /// Delay before retrying after a failed status request. Longer
    /// than `interval`.
    pub error_backoff: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            error_backoff: Duration::from_millis(3000),
        }
    }
}

impl From<&ClientConfig> for PollConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval,
            error_backoff: config.poll_error_backoff,
        }
    }
}

/// Transport needed to track one job.
///
/// Implemented by [`ScrapeApi`]; tests substitute scripted in-memory
/// transports.
#[async_trait]
pub trait PollTransport: Send + Sync {
    /// Fetch the job's current status.
    async fn fetch_status(&self, job_id: &str) -> Result<StatusResponse, ApiError>;

    /// Fetch the job's result records.
    async fn fetch_result(&self, job_id: &str) -> Result<Vec<serde_json::Value>, ApiError>;
}

#[async_trait]
impl PollTransport for ScrapeApi {
    async fn fetch_status(&self, job_id: &str) -> Result<StatusResponse, ApiError> {
        self.status(job_id).await
    }

    async fn fetch_result(&self, job_id: &str) -> Result<Vec<serde_json::Value>, ApiError> {
        self.result(job_id).await
    }
}

/// Lifecycle notifications broadcast by a poller.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// A status poll completed; status and message were replaced.
    StatusChanged {
        /// New lifecycle state.
        status: JobStatus,
        /// New human-readable message.
        message: String,
    },
    /// The job finished and its result was fetched.
    Completed {
        /// Number of result records fetched.
        records: usize,
    },
    /// The job finished but the result fetch failed. The job stays
    /// Finished; it never reverts to Running over a retrieval failure.
    ResultFetchFailed {
        /// Description of the failure, for display.
        error: String,
    },
    /// The job reached the Failed terminal state.
    Failed {
        /// Final message reported by the service.
        message: String,
    },
    /// Tracking was cancelled before a terminal state was observed.
    Cancelled,
}

/// Errors surfaced synchronously by [`start`].
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// No job to track: the identifier was empty.
    #[error("no job to track: empty job id")]
    NoJob,
}

/// Handle to a spawned poll task.
#[derive(Debug)]
pub struct JobHandle {
    job_rx: watch::Receiver<Job>,
    event_tx: broadcast::Sender<TrackerEvent>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl JobHandle {
    /// Latest job snapshot.
    pub fn job(&self) -> Job {
        self.job_rx.borrow().clone()
    }

    /// Watch job snapshots as they change.
    pub fn subscribe(&self) -> watch::Receiver<Job> {
        self.job_rx.clone()
    }

    /// Subscribe to lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<TrackerEvent> {
        self.event_tx.subscribe()
    }

    /// Stop tracking.
    ///
    /// No further requests are issued, and a response already in flight
    /// when this is called is discarded rather than acted upon.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the poll task to exit (terminal state or cancellation).
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Start tracking `job_id`.
///
/// An empty or whitespace-only identifier yields
/// [`TrackerError::NoJob`] and no task is spawned -- "nothing to track"
/// is a state the caller displays, not a crash.
pub fn start<T>(
    transport: Arc<T>,
    job_id: impl Into<JobId>,
    config: PollConfig,
    cancel: CancellationToken,
) -> Result<JobHandle, TrackerError>
where
    T: PollTransport + 'static,
{
    let job_id: JobId = job_id.into();
    if job_id.trim().is_empty() {
        return Err(TrackerError::NoJob);
    }

    let (job_tx, job_rx) = watch::channel(Job::pending(job_id.clone()));
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    let task = tokio::spawn(run_poll_loop(
        transport,
        job_id,
        config,
        cancel.clone(),
        job_tx,
        event_tx.clone(),
    ));

    Ok(JobHandle {
        job_rx,
        event_tx,
        cancel,
        task,
    })
}

/// Core poll loop: fetch status -> fold -> sleep -> repeat, until a
/// terminal state or cancellation.
async fn run_poll_loop<T: PollTransport>(
    transport: Arc<T>,
    job_id: JobId,
    config: PollConfig,
    cancel: CancellationToken,
    job_tx: watch::Sender<Job>,
    event_tx: broadcast::Sender<TrackerEvent>,
) {
    loop {
        let response = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = event_tx.send(TrackerEvent::Cancelled);
                return;
            }
            response = transport.fetch_status(&job_id) => response,
        };

        // The token may have fired between request completion and this
        // point; a cancelled tracker must not act on the response.
        if cancel.is_cancelled() {
            let _ = event_tx.send(TrackerEvent::Cancelled);
            return;
        }

        match response {
            Ok(status_response) => {
                let status = JobStatus::from_wire(&status_response.status);
                let message = status_response.message;

                job_tx.send_modify(|job| {
                    job.status = status;
                    job.message = message.clone();
                });
                let _ = event_tx.send(TrackerEvent::StatusChanged {
                    status,
                    message: message.clone(),
                });

                match status {
                    JobStatus::Finished => {
                        fetch_result_once(&*transport, &job_id, &cancel, &job_tx, &event_tx).await;
                        return;
                    }
                    JobStatus::Failed => {
                        tracing::info!(job_id = %job_id, message = %message, "Job failed");
                        let _ = event_tx.send(TrackerEvent::Failed { message });
                        return;
                    }
                    JobStatus::Pending | JobStatus::Running => {
                        // The next poll is scheduled only after this one
                        // completed; never a fixed-rate timer.
                        tokio::select! {
                            _ = cancel.cancelled() => {
                                let _ = event_tx.send(TrackerEvent::Cancelled);
                                return;
                            }
                            _ = tokio::time::sleep(config.interval) => {}
                        }
                    }
                }
            }
            Err(e) => {
                // Transport failure: no transition, retry on the longer
                // backoff. Unbounded -- cancellation is the caller's
                // circuit breaker.
                tracing::warn!(job_id = %job_id, error = %e, "Status poll failed, backing off");
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let _ = event_tx.send(TrackerEvent::Cancelled);
                        return;
                    }
                    _ = tokio::time::sleep(config.error_backoff) => {}
                }
            }
        }
    }
}

/// Issue the single result fetch that follows the Finished transition.
async fn fetch_result_once<T: PollTransport + ?Sized>(
    transport: &T,
    job_id: &str,
    cancel: &CancellationToken,
    job_tx: &watch::Sender<Job>,
    event_tx: &broadcast::Sender<TrackerEvent>,
) {
    let response = tokio::select! {
        _ = cancel.cancelled() => {
            let _ = event_tx.send(TrackerEvent::Cancelled);
            return;
        }
        response = transport.fetch_result(job_id) => response,
    };

    if cancel.is_cancelled() {
        let _ = event_tx.send(TrackerEvent::Cancelled);
        return;
    }

    match response {
        Ok(records) => {
            tracing::info!(job_id = %job_id, records = records.len(), "Job result fetched");
            let count = records.len();
            job_tx.send_modify(move |job| job.result = Some(records));
            let _ = event_tx.send(TrackerEvent::Completed { records: count });
        }
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Result fetch failed");
            job_tx.send_modify(|job| job.message = format!("result unavailable: {e}"));
            let _ = event_tx.send(TrackerEvent::ResultFetchFailed {
                error: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    struct NeverTransport;

    #[async_trait]
    impl PollTransport for NeverTransport {
        async fn fetch_status(&self, _job_id: &str) -> Result<StatusResponse, ApiError> {
            unreachable!("must not be called for an empty job id")
        }

        async fn fetch_result(&self, _job_id: &str) -> Result<Vec<serde_json::Value>, ApiError> {
            unreachable!("must not be called for an empty job id")
        }
    }

    #[tokio::test]
    async fn empty_job_id_is_nothing_to_track() {
        let result = start(
            Arc::new(NeverTransport),
            "",
            PollConfig::default(),
            CancellationToken::new(),
        );
        assert_matches!(result, Err(TrackerError::NoJob));
    }

    #[tokio::test]
    async fn whitespace_job_id_is_nothing_to_track() {
        let result = start(
            Arc::new(NeverTransport),
            "   ",
            PollConfig::default(),
            CancellationToken::new(),
        );
        assert_matches!(result, Err(TrackerError::NoJob));
    }
}
