//! Incident report wizard: the report-filing state machine.
//!
//! ARCHITECTURE
//! ============
//! `ModeSelect → Filling → Submitting → Submitted`, with `Failed` as the
//! side exit of `Submitting`. [`WizardState::apply`] is the only transition
//! function: it takes the current state by reference and returns the next
//! one, so a rejected event leaves the caller holding the state it had.
//!
//! DESIGN
//! ======
//! - Entering `Submitting` mints a request id. Completion events must carry
//!   the same id; anything else is a stale write and is refused. This is what
//!   lets an abandoned or retried attempt finish late without clobbering the
//!   current state.
//! - `Failed` keeps the form verbatim so retry and cancel lose nothing.
//! - `Abandon` is accepted from every state. It models the shell unmounting
//!   the wizard mid-flow.
//!
//! The async [`submit`] helper drives one attempt end-to-end for callers that
//! do not need cancellation; `controller` builds the cancellable version on
//! the same transitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{CaseAck, Submission, SubmissionBackend, submit_with_timeout};
use crate::error::{ErrorCode, SubmissionError, WizardError};
use crate::report::{FieldEdit, IncidentForm, ReportMode, SubmissionResult};

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum WizardState {
    /// Initial step: no mode chosen, no form.
    #[default]
    ModeSelect,
    Filling {
        mode: ReportMode,
        form: IncidentForm,
    },
    /// One attempt is in flight.
    Submitting {
        mode: ReportMode,
        form: IncidentForm,
        request_id: Uuid,
    },
    /// Terminal until reset.
    Submitted {
        mode: ReportMode,
        form: IncidentForm,
        result: SubmissionResult,
    },
    Failed {
        mode: ReportMode,
        form: IncidentForm,
        error: SubmissionError,
    },
}

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    Choose(ReportMode),
    Back,
    Edit(FieldEdit),
    Submit,
    Completed { request_id: Uuid, ack: CaseAck },
    SubmitFailed { request_id: Uuid, error: SubmissionError },
    Retry,
    Cancel,
    Reset,
    Abandon,
}

impl WizardEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Choose(_) => "choose",
            Self::Back => "back",
            Self::Edit(_) => "edit",
            Self::Submit => "submit",
            Self::Completed { .. } => "complete",
            Self::SubmitFailed { .. } => "fail",
            Self::Retry => "retry",
            Self::Cancel => "cancel",
            Self::Reset => "reset",
            Self::Abandon => "abandon",
        }
    }
}

impl WizardState {
    #[must_use]
    pub fn step_name(&self) -> &'static str {
        match self {
            Self::ModeSelect => "mode_select",
            Self::Filling { .. } => "filling",
            Self::Submitting { .. } => "submitting",
            Self::Submitted { .. } => "submitted",
            Self::Failed { .. } => "failed",
        }
    }

    #[must_use]
    pub fn mode(&self) -> Option<ReportMode> {
        match self {
            Self::ModeSelect => None,
            Self::Filling { mode, .. }
            | Self::Submitting { mode, .. }
            | Self::Submitted { mode, .. }
            | Self::Failed { mode, .. } => Some(*mode),
        }
    }

    #[must_use]
    pub fn form(&self) -> Option<&IncidentForm> {
        match self {
            Self::ModeSelect => None,
            Self::Filling { form, .. }
            | Self::Submitting { form, .. }
            | Self::Submitted { form, .. }
            | Self::Failed { form, .. } => Some(form),
        }
    }

    #[must_use]
    pub fn result(&self) -> Option<&SubmissionResult> {
        match self {
            Self::Submitted { result, .. } => Some(result),
            _ => None,
        }
    }

    /// Request id of the attempt in flight, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<Uuid> {
        match self {
            Self::Submitting { request_id, .. } => Some(*request_id),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting { .. })
    }

    /// Whether the submit control should be enabled.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        match self {
            Self::Filling { form, .. } => form.is_submittable(),
            _ => false,
        }
    }

    /// Compute the state that follows `event`.
    ///
    /// # Errors
    ///
    /// - [`WizardError::Validation`] when submitting an incomplete form.
    /// - [`WizardError::StaleCompletion`] when a completion does not match
    ///   the attempt in flight.
    /// - [`WizardError::InvalidTransition`] for any other event the current
    ///   step does not accept.
    ///
    /// In every error case the current state is unchanged.
    pub fn apply(&self, event: WizardEvent) -> Result<WizardState, WizardError> {
        match (self, event) {
            (_, WizardEvent::Abandon) => Ok(Self::ModeSelect),

            (Self::ModeSelect, WizardEvent::Choose(mode)) => {
                Ok(Self::Filling { mode, form: IncidentForm::for_mode(mode) })
            }

            (Self::Filling { .. }, WizardEvent::Back) | (Self::Submitted { .. }, WizardEvent::Reset) => {
                Ok(Self::ModeSelect)
            }

            (Self::Filling { mode, form }, WizardEvent::Edit(edit)) => {
                let mut form = form.clone();
                let field = edit.field_name();
                if !form.apply_edit(edit) {
                    debug!(%mode, field, "edit ignored for this report mode");
                }
                Ok(Self::Filling { mode: *mode, form })
            }

            (Self::Filling { mode, form }, WizardEvent::Submit) => {
                form.validate()?;
                Ok(Self::Submitting { mode: *mode, form: form.clone(), request_id: Uuid::new_v4() })
            }

            (Self::Failed { mode, form, .. }, WizardEvent::Retry) => {
                Ok(Self::Submitting { mode: *mode, form: form.clone(), request_id: Uuid::new_v4() })
            }

            (Self::Failed { mode, form, .. }, WizardEvent::Cancel) => {
                Ok(Self::Filling { mode: *mode, form: form.clone() })
            }

            (Self::Submitting { mode, form, request_id }, WizardEvent::Completed { request_id: done, ack })
                if *request_id == done =>
            {
                let result = SubmissionResult::new(*mode, form, ack.case_id, ack.received_at_ms);
                Ok(Self::Submitted { mode: *mode, form: form.clone(), result })
            }

            (Self::Submitting { mode, form, request_id }, WizardEvent::SubmitFailed { request_id: done, error })
                if *request_id == done =>
            {
                Ok(Self::Failed { mode: *mode, form: form.clone(), error })
            }

            (_, WizardEvent::Completed { request_id, .. } | WizardEvent::SubmitFailed { request_id, .. }) => {
                Err(WizardError::StaleCompletion { request_id })
            }

            (state, event) => Err(WizardError::InvalidTransition { state: state.step_name(), event: event.name() }),
        }
    }

    /// The payload for the attempt in flight.
    #[must_use]
    pub fn submission(&self) -> Option<Submission> {
        match self {
            Self::Submitting { mode, form, request_id } => {
                Some(Submission { request_id: *request_id, mode: *mode, form: form.clone() })
            }
            _ => None,
        }
    }
}

// =============================================================================
// FUNCTIONAL API
// =============================================================================

/// Start a report in `mode` with an empty form.
#[must_use]
pub fn start_report(mode: ReportMode) -> WizardState {
    WizardState::Filling { mode, form: IncidentForm::for_mode(mode) }
}

/// Apply one field edit.
///
/// # Errors
///
/// Returns [`WizardError::InvalidTransition`] outside the `Filling` step.
pub fn update_field(state: &WizardState, edit: FieldEdit) -> Result<WizardState, WizardError> {
    state.apply(WizardEvent::Edit(edit))
}

/// Return to mode selection after a submitted report.
///
/// # Errors
///
/// Returns [`WizardError::InvalidTransition`] unless the report was submitted.
pub fn reset(state: &WizardState) -> Result<WizardState, WizardError> {
    state.apply(WizardEvent::Reset)
}

/// Submit the form and wait for the backend.
///
/// Resolves to `Submitted` on success or `Failed` when the backend errors or
/// misses `timeout`; both carry the submitted form. Accepts a `Filling` state
/// (submit) or a `Failed` state (retry).
///
/// # Errors
///
/// Returns [`WizardError::Validation`] for an incomplete form and
/// [`WizardError::InvalidTransition`] from any other step.
pub async fn submit(
    state: &WizardState,
    backend: &dyn SubmissionBackend,
    timeout: Duration,
) -> Result<WizardState, WizardError> {
    let event = if matches!(state, WizardState::Failed { .. }) { WizardEvent::Retry } else { WizardEvent::Submit };
    let submitting = state.apply(event)?;
    let Some(submission) = submitting.submission() else {
        return Err(WizardError::InvalidTransition { state: submitting.step_name(), event: "submit" });
    };

    info!(
        request_id = %submission.request_id,
        mode = %submission.mode,
        category = ?submission.form.category,
        emergency = submission.form.is_emergency,
        "submitting incident report"
    );

    let completion = completion_event(&submission, submit_with_timeout(backend, &submission, timeout).await);
    submitting.apply(completion)
}

/// Turn a backend outcome into the matching completion event, logging it.
pub(crate) fn completion_event(submission: &Submission, outcome: Result<CaseAck, SubmissionError>) -> WizardEvent {
    let request_id = submission.request_id;
    match outcome {
        Ok(ack) => {
            info!(%request_id, case_id = %ack.case_id, "incident report accepted");
            WizardEvent::Completed { request_id, ack }
        }
        Err(error) => {
            warn!(%request_id, error = %error, retryable = error.retryable(), "incident report submission failed");
            WizardEvent::SubmitFailed { request_id, error }
        }
    }
}

#[cfg(test)]
#[path = "wizard_test.rs"]
mod tests;
