use super::*;
use crate::report::{EvidenceKind, IncidentCategory};

fn filling(mode: ReportMode, category: Option<IncidentCategory>, description: &str) -> WizardState {
    let state = start_report(mode);
    let state = update_field(&state, FieldEdit::Category(category)).unwrap();
    update_field(&state, FieldEdit::Description(description.into())).unwrap()
}

fn ack(case_id: &str) -> CaseAck {
    CaseAck { case_id: case_id.into(), received_at_ms: 1_700_000_123_456 }
}

struct InstantBackend;

#[async_trait::async_trait]
impl SubmissionBackend for InstantBackend {
    async fn submit(&self, submission: &Submission) -> Result<CaseAck, SubmissionError> {
        let ts = crate::report::now_ms();
        Ok(CaseAck { case_id: crate::report::case_id(submission.mode, ts), received_at_ms: ts })
    }
}

struct DownBackend;

#[async_trait::async_trait]
impl SubmissionBackend for DownBackend {
    async fn submit(&self, _submission: &Submission) -> Result<CaseAck, SubmissionError> {
        Err(SubmissionError::Unavailable("maintenance".into()))
    }
}

fn is_case_id_for(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

// =============================================================================
// mode selection
// =============================================================================

#[test]
fn default_state_is_mode_select() {
    assert_eq!(WizardState::default(), WizardState::ModeSelect);
    assert_eq!(WizardState::default().mode(), None);
    assert!(WizardState::default().form().is_none());
}

#[test]
fn choose_moves_to_filling_with_empty_form() {
    let state = WizardState::ModeSelect.apply(WizardEvent::Choose(ReportMode::Anonymous)).unwrap();
    assert_eq!(state, start_report(ReportMode::Anonymous));
    assert_eq!(state.form(), Some(&IncidentForm::for_mode(ReportMode::Anonymous)));
}

#[test]
fn choose_is_rejected_while_filling() {
    let state = start_report(ReportMode::Anonymous);
    let err = state.apply(WizardEvent::Choose(ReportMode::Identified)).unwrap_err();
    assert_eq!(err, WizardError::InvalidTransition { state: "filling", event: "choose" });
}

#[test]
fn back_from_filling_discards_everything() {
    for mode in ReportMode::ALL {
        for category in IncidentCategory::ALL {
            let mut state = filling(mode, Some(category), "details");
            state = update_field(&state, FieldEdit::Emergency(true)).unwrap();
            state = update_field(&state, FieldEdit::AttachEvidence(EvidenceKind::Audio)).unwrap();
            assert_eq!(state.apply(WizardEvent::Back).unwrap(), WizardState::ModeSelect);
        }
    }
}

#[test]
fn changing_mode_after_back_starts_fresh() {
    let state = filling(ReportMode::Anonymous, Some(IncidentCategory::Other), "x");
    let state = state.apply(WizardEvent::Back).unwrap();
    let state = state.apply(WizardEvent::Choose(ReportMode::Identified)).unwrap();
    assert_eq!(state, start_report(ReportMode::Identified));
}

// =============================================================================
// editing
// =============================================================================

#[test]
fn edit_updates_one_field() {
    let state = update_field(&start_report(ReportMode::Identified), FieldEdit::Location("library".into())).unwrap();
    let form = state.form().unwrap();
    assert_eq!(form.location.as_deref(), Some("library"));
    assert_eq!(form.category, None);
}

#[test]
fn contact_edit_in_anonymous_mode_is_a_no_op() {
    let before = start_report(ReportMode::Anonymous);
    let after = update_field(&before, FieldEdit::ContactPhone("555-0100".into())).unwrap();
    assert_eq!(before, after);
}

#[test]
fn edit_outside_filling_is_rejected() {
    let err = update_field(&WizardState::ModeSelect, FieldEdit::Emergency(true)).unwrap_err();
    assert!(matches!(err, WizardError::InvalidTransition { state: "mode_select", event: "edit" }));
}

// =============================================================================
// submit gating
// =============================================================================

#[test]
fn submit_rejected_without_category() {
    for mode in ReportMode::ALL {
        for description in ["", "something happened"] {
            let state = filling(mode, None, description);
            assert!(!state.can_submit());
            let err = state.apply(WizardEvent::Submit).unwrap_err();
            assert!(matches!(err, WizardError::Validation(crate::error::ValidationError::MissingCategory)));
        }
    }
}

#[test]
fn submit_rejected_with_empty_description() {
    for mode in ReportMode::ALL {
        for category in IncidentCategory::ALL {
            let state = filling(mode, Some(category), "");
            assert!(!state.can_submit());
            assert_eq!(
                state.apply(WizardEvent::Submit),
                Err(WizardError::Validation(crate::error::ValidationError::MissingDescription))
            );
        }
    }
}

#[test]
fn submit_with_valid_form_enters_submitting() {
    for mode in ReportMode::ALL {
        for category in IncidentCategory::ALL {
            let state = filling(mode, Some(category), "what happened");
            assert!(state.can_submit());
            let next = state.apply(WizardEvent::Submit).unwrap();
            assert!(next.is_submitting());
            assert!(!next.can_submit());
            assert_eq!(next.form(), state.form());
            assert!(next.request_id().is_some());
        }
    }
}

#[test]
fn second_submit_while_submitting_is_rejected() {
    let state = filling(ReportMode::Anonymous, Some(IncidentCategory::Stalking), "x").apply(WizardEvent::Submit).unwrap();
    let err = state.apply(WizardEvent::Submit).unwrap_err();
    assert_eq!(err, WizardError::InvalidTransition { state: "submitting", event: "submit" });
    assert_eq!(state.apply(WizardEvent::Back).unwrap_err().to_string(), "cannot back while in submitting");
}

#[test]
fn each_submit_mints_a_new_request_id() {
    let state = filling(ReportMode::Anonymous, Some(IncidentCategory::Other), "x");
    let a = state.apply(WizardEvent::Submit).unwrap().request_id();
    let b = state.apply(WizardEvent::Submit).unwrap().request_id();
    assert_ne!(a, b);
}

// =============================================================================
// completion
// =============================================================================

#[test]
fn matching_completion_produces_submitted() {
    let submitting = filling(ReportMode::Identified, Some(IncidentCategory::Harassment), "test")
        .apply(WizardEvent::Submit)
        .unwrap();
    let request_id = submitting.request_id().unwrap();
    let done = submitting.apply(WizardEvent::Completed { request_id, ack: ack("IDE-123456") }).unwrap();

    let result = done.result().unwrap();
    assert_eq!(result.case_id, "IDE-123456");
    assert_eq!(result.submitted_at_ms, 1_700_000_123_456);
    assert_eq!(result.mode, ReportMode::Identified);
    assert_eq!(result.category, Some(IncidentCategory::Harassment));
}

#[test]
fn completion_with_foreign_request_id_is_stale() {
    let submitting = filling(ReportMode::Anonymous, Some(IncidentCategory::Other), "x").apply(WizardEvent::Submit).unwrap();
    let other = Uuid::new_v4();
    let err = submitting.apply(WizardEvent::Completed { request_id: other, ack: ack("ANO-000001") }).unwrap_err();
    assert_eq!(err, WizardError::StaleCompletion { request_id: other });
}

#[test]
fn completion_after_abandon_is_stale() {
    let submitting = filling(ReportMode::Anonymous, Some(IncidentCategory::Other), "x").apply(WizardEvent::Submit).unwrap();
    let request_id = submitting.request_id().unwrap();
    let abandoned = submitting.apply(WizardEvent::Abandon).unwrap();
    assert_eq!(abandoned, WizardState::ModeSelect);

    let err = abandoned.apply(WizardEvent::Completed { request_id, ack: ack("ANO-000001") }).unwrap_err();
    assert_eq!(err, WizardError::StaleCompletion { request_id });
}

#[test]
fn failure_keeps_form_and_allows_cancel_or_retry() {
    let submitting = filling(ReportMode::Identified, Some(IncidentCategory::CyberCrime), "phishing texts")
        .apply(WizardEvent::Submit)
        .unwrap();
    let request_id = submitting.request_id().unwrap();
    let failed = submitting
        .apply(WizardEvent::SubmitFailed { request_id, error: SubmissionError::Timeout { after_ms: 10 } })
        .unwrap();
    assert_eq!(failed.step_name(), "failed");
    assert_eq!(failed.form(), submitting.form());

    let cancelled = failed.apply(WizardEvent::Cancel).unwrap();
    assert_eq!(cancelled, WizardState::Filling { mode: ReportMode::Identified, form: submitting.form().unwrap().clone() });

    let retried = failed.apply(WizardEvent::Retry).unwrap();
    assert!(retried.is_submitting());
    assert_ne!(retried.request_id(), Some(request_id));
}

// =============================================================================
// reset
// =============================================================================

#[test]
fn reset_after_submitted_returns_to_initial_state() {
    let submitting = filling(ReportMode::Anonymous, Some(IncidentCategory::PublicSafety), "broken street light")
        .apply(WizardEvent::Submit)
        .unwrap();
    let request_id = submitting.request_id().unwrap();
    let done = submitting.apply(WizardEvent::Completed { request_id, ack: ack("ANO-654321") }).unwrap();
    assert_eq!(reset(&done).unwrap(), WizardState::default());
}

#[test]
fn reset_is_only_accepted_after_submission() {
    for state in [WizardState::ModeSelect, start_report(ReportMode::Anonymous)] {
        assert!(matches!(reset(&state), Err(WizardError::InvalidTransition { event: "reset", .. })));
    }
}

#[test]
fn state_serializes_with_step_tag() {
    let json = serde_json::to_value(start_report(ReportMode::Anonymous)).unwrap();
    assert_eq!(json["step"], "filling");
    assert_eq!(json["mode"], "anonymous");
    assert!(json["form"]["contact"].is_null());
}

// =============================================================================
// async submit
// =============================================================================

#[tokio::test]
async fn identified_harassment_report_gets_ide_case_id() {
    let state = filling(ReportMode::Identified, Some(IncidentCategory::Harassment), "test");
    let done = submit(&state, &InstantBackend, Duration::from_secs(1)).await.unwrap();
    assert_eq!(done.step_name(), "submitted");
    let case_id = &done.result().unwrap().case_id;
    assert!(is_case_id_for(case_id, "IDE"), "unexpected case id {case_id}");
}

#[tokio::test]
async fn anonymous_report_gets_ano_case_id() {
    let state = filling(ReportMode::Anonymous, Some(IncidentCategory::Stalking), "seen again");
    let done = submit(&state, &InstantBackend, Duration::from_secs(1)).await.unwrap();
    assert!(is_case_id_for(&done.result().unwrap().case_id, "ANO"));
}

#[tokio::test]
async fn async_submit_rejects_incomplete_form() {
    let state = filling(ReportMode::Identified, None, "test");
    let err = submit(&state, &InstantBackend, Duration::from_secs(1)).await.unwrap_err();
    assert!(matches!(err, WizardError::Validation(_)));
}

#[tokio::test]
async fn async_submit_backend_error_lands_in_failed() {
    let state = filling(ReportMode::Identified, Some(IncidentCategory::Other), "test");
    let failed = submit(&state, &DownBackend, Duration::from_secs(1)).await.unwrap();
    assert!(matches!(&failed, WizardState::Failed { error: SubmissionError::Unavailable(_), .. }));
    assert_eq!(failed.form(), state.form());

    let done = submit(&failed, &InstantBackend, Duration::from_secs(1)).await.unwrap();
    assert!(done.result().is_some());
}
