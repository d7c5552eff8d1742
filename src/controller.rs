//! Wizard controller: one live wizard instance driven by user events.
//!
//! ARCHITECTURE
//! ============
//! The controller owns the current [`WizardState`] behind a mutex and
//! publishes every accepted transition on a `watch` channel, which is what a
//! presentation layer subscribes to. All transitions go through
//! [`WizardState::apply`]; the controller only adds the async submission
//! and the bookkeeping around it.
//!
//! CONCURRENCY
//! ===========
//! - `submit`/`retry` enter `Submitting` synchronously and spawn the backend
//!   call. At most one attempt is in flight because `Submitting` accepts no
//!   second submit.
//! - The spawned task holds a `Weak` to the shared state. Dropping the
//!   controller (unmount) or calling `abandon` aborts the task; a completion
//!   that still slips through is refused by request-id matching.
//! - The mutex is never held across an await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::{MockBackend, Submission, SubmissionBackend, submit_with_timeout};
use crate::config::WizardConfig;
use crate::error::WizardError;
use crate::report::{FieldEdit, ReportMode, SubmissionResult};
use crate::wizard::{WizardEvent, WizardState, completion_event};

struct Inner {
    state: WizardState,
    in_flight: Option<JoinHandle<()>>,
    /// Results issued during this session, oldest first.
    receipts: Vec<SubmissionResult>,
}

struct Shared {
    inner: Mutex<Inner>,
    updates: watch::Sender<WizardState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `event` to the locked state; store and publish on success.
    fn dispatch(&self, inner: &mut Inner, event: WizardEvent) -> Result<WizardState, WizardError> {
        let next = inner.state.apply(event)?;
        debug!(from = inner.state.step_name(), to = next.step_name(), "wizard transition");

        if inner.state.is_submitting() {
            if let Some(result) = next.result() {
                inner.receipts.push(result.clone());
            }
        }
        inner.state = next.clone();
        self.updates.send_replace(next.clone());
        Ok(next)
    }
}

/// Handle to one mounted wizard. Dropping it unmounts the wizard.
pub struct WizardController {
    shared: Arc<Shared>,
    backend: Arc<dyn SubmissionBackend>,
    submit_timeout: Duration,
}

impl WizardController {
    #[must_use]
    pub fn new(backend: Arc<dyn SubmissionBackend>, submit_timeout: Duration) -> Self {
        let (updates, _) = watch::channel(WizardState::default());
        let inner = Inner { state: WizardState::default(), in_flight: None, receipts: Vec::new() };
        Self { shared: Arc::new(Shared { inner: Mutex::new(inner), updates }), backend, submit_timeout }
    }

    /// Controller backed by [`MockBackend`] with the configured delay,
    /// failure rate, and timeout.
    #[must_use]
    pub fn from_config(config: &WizardConfig) -> Self {
        Self::new(Arc::new(MockBackend::from_config(config)), config.submit_timeout())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> WizardState {
        self.shared.lock().state.clone()
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.shared.lock().state.can_submit()
    }

    /// Receive every accepted transition. The receiver starts at the current state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WizardState> {
        self.shared.updates.subscribe()
    }

    /// Reports submitted since this wizard was mounted, oldest first.
    #[must_use]
    pub fn receipts(&self) -> Vec<SubmissionResult> {
        self.shared.lock().receipts.clone()
    }

    /// Look up a receipt issued this session by case id.
    #[must_use]
    pub fn track(&self, case_id: &str) -> Option<SubmissionResult> {
        self.shared.lock().receipts.iter().find(|r| r.case_id == case_id).cloned()
    }

    /// Wait until no submission is in flight and return that state.
    pub async fn wait_until_settled(&self) -> WizardState {
        let mut rx = self.subscribe();
        if let Ok(state) = rx.wait_for(|state| !state.is_submitting()).await {
            return state.clone();
        }
        self.state()
    }

    // =========================================================================
    // USER EVENTS
    // =========================================================================

    /// # Errors
    ///
    /// Returns [`WizardError::InvalidTransition`] unless in mode selection.
    pub fn choose_mode(&self, mode: ReportMode) -> Result<WizardState, WizardError> {
        self.dispatch(WizardEvent::Choose(mode))
    }

    /// # Errors
    ///
    /// Returns [`WizardError::InvalidTransition`] unless filling the form.
    pub fn edit(&self, edit: FieldEdit) -> Result<WizardState, WizardError> {
        self.dispatch(WizardEvent::Edit(edit))
    }

    /// # Errors
    ///
    /// Returns [`WizardError::InvalidTransition`] unless filling the form.
    pub fn back(&self) -> Result<WizardState, WizardError> {
        self.dispatch(WizardEvent::Back)
    }

    /// Return from a failed attempt to the form, keeping its contents.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::InvalidTransition`] unless the last attempt failed.
    pub fn cancel(&self) -> Result<WizardState, WizardError> {
        self.dispatch(WizardEvent::Cancel)
    }

    /// # Errors
    ///
    /// Returns [`WizardError::InvalidTransition`] unless a report was submitted.
    pub fn reset(&self) -> Result<WizardState, WizardError> {
        self.dispatch(WizardEvent::Reset)
    }

    /// Leave the wizard from any step. An attempt in flight is aborted and
    /// its completion, if it still arrives, is ignored.
    pub fn abandon(&self) -> WizardState {
        let mut inner = self.shared.lock();
        if let Some(handle) = inner.in_flight.take() {
            debug!("abandoning in-flight submission");
            handle.abort();
        }
        self.shared.dispatch(&mut inner, WizardEvent::Abandon).unwrap_or_default()
    }

    /// Submit the form and return the id of the new attempt. The outcome
    /// arrives later as a `Submitted` or `Failed` state.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::Validation`] for an incomplete form (state
    /// unchanged) and [`WizardError::InvalidTransition`] outside `Filling`.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn submit(&self) -> Result<Uuid, WizardError> {
        self.begin_attempt(WizardEvent::Submit)
    }

    /// Re-send a failed report as a new attempt.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::InvalidTransition`] unless the last attempt failed.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn retry(&self) -> Result<Uuid, WizardError> {
        self.begin_attempt(WizardEvent::Retry)
    }

    fn dispatch(&self, event: WizardEvent) -> Result<WizardState, WizardError> {
        let mut inner = self.shared.lock();
        self.shared.dispatch(&mut inner, event)
    }

    fn begin_attempt(&self, event: WizardEvent) -> Result<Uuid, WizardError> {
        let mut inner = self.shared.lock();
        let attempt = event.name();
        let state = self.shared.dispatch(&mut inner, event)?;
        let Some(submission) = state.submission() else {
            return Err(WizardError::InvalidTransition { state: state.step_name(), event: attempt });
        };
        let request_id = submission.request_id;

        info!(
            %request_id,
            mode = %submission.mode,
            category = ?submission.form.category,
            emergency = submission.form.is_emergency,
            attempt,
            "submitting incident report"
        );

        let handle = tokio::spawn(run_attempt(
            Arc::downgrade(&self.shared),
            Arc::clone(&self.backend),
            submission,
            self.submit_timeout,
        ));
        inner.in_flight = Some(handle);
        Ok(request_id)
    }
}

async fn run_attempt(
    shared: Weak<Shared>,
    backend: Arc<dyn SubmissionBackend>,
    submission: Submission,
    timeout: Duration,
) {
    let request_id = submission.request_id;
    let outcome = submit_with_timeout(backend.as_ref(), &submission, timeout).await;
    let event = completion_event(&submission, outcome);

    let Some(shared) = shared.upgrade() else {
        debug!(%request_id, "wizard unmounted; dropping late completion");
        return;
    };
    let mut inner = shared.lock();
    if inner.state.request_id() == Some(request_id) {
        inner.in_flight = None;
    }
    if let Err(e) = shared.dispatch(&mut inner, event) {
        debug!(%request_id, error = %e, "late completion ignored");
    }
}

impl Drop for WizardController {
    fn drop(&mut self) {
        if let Some(handle) = self.shared.lock().in_flight.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
