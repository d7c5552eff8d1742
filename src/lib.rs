//! `SheSecures` incident reporting wizard.
//!
//! ARCHITECTURE
//! ============
//! - `report`: form data model, edits, validation, case ids.
//! - `wizard`: the pure state machine every transition goes through.
//! - `backend`: submission seam plus the local mock service.
//! - `controller`: one mounted wizard with async, cancellable submission.
//! - `driver`: JSON-lines front end used by the binary.

pub mod backend;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod report;
pub mod wizard;

pub use backend::{CaseAck, MockBackend, Submission, SubmissionBackend};
pub use config::WizardConfig;
pub use controller::WizardController;
pub use error::{ErrorCode, SubmissionError, ValidationError, WizardError};
pub use report::{FieldEdit, IncidentCategory, IncidentForm, ReportMode, SubmissionResult};
pub use wizard::{WizardEvent, WizardState};
