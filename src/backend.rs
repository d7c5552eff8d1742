//! Submission backend seam.
//!
//! DESIGN
//! ======
//! The wizard only needs "hand over a finished report, get a case id back".
//! [`SubmissionBackend`] is that contract as an async trait so tests and the
//! binary can swap implementations. [`MockBackend`] stands in for the real
//! service: it waits for a fixed delay and issues a case id locally.
//!
//! Timeouts are not the backend's job; the caller wraps every call in
//! `tokio::time::timeout` (see [`submit_with_timeout`]).

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::WizardConfig;
use crate::error::SubmissionError;
use crate::report::{IncidentForm, ReportMode, case_id, now_ms};

/// A completed report handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Identifies this attempt; a retry gets a new one.
    pub request_id: Uuid,
    pub mode: ReportMode,
    pub form: IncidentForm,
}

/// Backend acknowledgement of an accepted report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseAck {
    pub case_id: String,
    /// Milliseconds since Unix epoch when the backend accepted the report.
    pub received_at_ms: i64,
}

/// Accepts completed reports. Enables mocking in tests.
#[async_trait::async_trait]
pub trait SubmissionBackend: Send + Sync {
    async fn submit(&self, submission: &Submission) -> Result<CaseAck, SubmissionError>;
}

/// Run one backend call bounded by `timeout`, and reject acknowledgements
/// that carry no case id.
///
/// # Errors
///
/// Returns the backend's own error, [`SubmissionError::Timeout`] when the
/// deadline passes first, or [`SubmissionError::InvalidResponse`] for an
/// empty case id.
pub async fn submit_with_timeout(
    backend: &dyn SubmissionBackend,
    submission: &Submission,
    timeout: Duration,
) -> Result<CaseAck, SubmissionError> {
    let after_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    let ack = tokio::time::timeout(timeout, backend.submit(submission))
        .await
        .map_err(|_| SubmissionError::Timeout { after_ms })??;

    if ack.case_id.trim().is_empty() {
        warn!(request_id = %submission.request_id, "backend returned an empty case id");
        return Err(SubmissionError::InvalidResponse("empty case id".into()));
    }
    Ok(ack)
}

// =============================================================================
// MOCK BACKEND
// =============================================================================

/// Local stand-in for the submission service.
#[derive(Debug, Clone)]
pub struct MockBackend {
    delay: Duration,
    failure_rate: f64,
}

impl MockBackend {
    /// A backend that waits `delay` and always succeeds.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay, failure_rate: 0.0 }
    }

    /// Fail with [`SubmissionError::Unavailable`] on roughly this fraction of
    /// calls. Values outside `[0, 1]` are clamped.
    #[must_use]
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn from_config(config: &WizardConfig) -> Self {
        Self::new(config.submit_delay()).with_failure_rate(config.mock_failure_rate)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_SUBMIT_DELAY_MS))
    }
}

fn roll_failure(rate: f64) -> bool {
    rate > 0.0 && rand::rng().random_bool(rate)
}

#[async_trait::async_trait]
impl SubmissionBackend for MockBackend {
    async fn submit(&self, submission: &Submission) -> Result<CaseAck, SubmissionError> {
        tokio::time::sleep(self.delay).await;

        if roll_failure(self.failure_rate) {
            debug!(request_id = %submission.request_id, "mock backend simulating an outage");
            return Err(SubmissionError::Unavailable("simulated outage".into()));
        }

        let received_at_ms = now_ms();
        Ok(CaseAck { case_id: case_id(submission.mode, received_at_ms), received_at_ms })
    }
}

#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;
