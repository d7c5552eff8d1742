//! Error types for the incident wizard.
//!
//! DESIGN
//! ======
//! Every error carries a grepable code and a retryable flag via [`ErrorCode`]
//! so the presentation layer can decide between "fix the form" and "try
//! again" without matching on variants.
//!
//! Validation and transition errors never change wizard state: the caller
//! keeps the state it already had. Submission errors are stored inside the
//! `Failed` state together with the untouched form.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error output.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// The form does not satisfy the submission invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("an incident category is required")]
    MissingCategory,
    #[error("a description is required")]
    MissingDescription,
}

impl ErrorCode for ValidationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingCategory => "E_VALIDATION_CATEGORY",
            Self::MissingDescription => "E_VALIDATION_DESCRIPTION",
        }
    }
}

// =============================================================================
// SUBMISSION
// =============================================================================

/// Failure reported by (or on behalf of) the submission backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SubmissionError {
    /// The backend did not answer within the configured timeout.
    #[error("submission timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
    /// The backend could not be reached or is temporarily down.
    #[error("submission service unavailable: {0}")]
    Unavailable(String),
    /// The backend refused the report. Retrying the same report will not help.
    #[error("submission rejected: {0}")]
    Rejected(String),
    /// The backend answered with something unusable.
    #[error("invalid submission response: {0}")]
    InvalidResponse(String),
}

impl ErrorCode for SubmissionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "E_SUBMIT_TIMEOUT",
            Self::Unavailable(_) => "E_SUBMIT_UNAVAILABLE",
            Self::Rejected(_) => "E_SUBMIT_REJECTED",
            Self::InvalidResponse(_) => "E_SUBMIT_INVALID_RESPONSE",
        }
    }

    fn retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

// =============================================================================
// WIZARD
// =============================================================================

/// Why an event was not applied to the wizard.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("report is incomplete: {0}")]
    Validation(#[from] ValidationError),

    /// The event is not accepted in the current step.
    #[error("cannot {event} while in {state}")]
    InvalidTransition { state: &'static str, event: &'static str },

    /// A completion arrived for an attempt that is no longer in flight.
    #[error("ignoring stale completion for request {request_id}")]
    StaleCompletion { request_id: Uuid },
}

impl ErrorCode for WizardError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::InvalidTransition { .. } => "E_INVALID_TRANSITION",
            Self::StaleCompletion { .. } => "E_STALE_COMPLETION",
        }
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// A configuration value is present but out of range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be greater than zero")]
    ZeroTimeout { var: &'static str },
    #[error("{var} must be within [0, 1], got {value}")]
    RateOutOfRange { var: &'static str, value: f64 },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        "E_CONFIG"
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
