//! Incident report data model.
//!
//! DESIGN
//! ======
//! The form is a plain value. All mutation goes through [`FieldEdit`] so the
//! wizard can treat "edit one field" as a single event, and the contact block
//! only exists for identified reports: an anonymous form has no place to put
//! a phone number, so edits to it are dropped instead of stored.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Reports are promised a first review within this window.
pub const REVIEW_WINDOW_HOURS: i64 = 24;

/// Number of trailing timestamp digits used as the case id suffix.
const CASE_SUFFIX_DIGITS: u32 = 6;

// =============================================================================
// REPORT MODE
// =============================================================================

/// Whether a report is filed anonymously or with contact details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    #[serde(alias = "Anonymous")]
    Anonymous,
    #[serde(alias = "Identified")]
    Identified,
}

impl ReportMode {
    pub const ALL: [ReportMode; 2] = [ReportMode::Anonymous, ReportMode::Identified];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Anonymous => "Anonymous",
            Self::Identified => "Identified",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Anonymous => "Anonymous Report",
            Self::Identified => "Identified Report",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Anonymous => {
                "Report without sharing any personal information. Your identity remains completely private."
            }
            Self::Identified => {
                "Include your details for follow-up support and updates. Your information is encrypted and secure."
            }
        }
    }

    /// Short badges shown on the mode picker.
    #[must_use]
    pub fn highlights(self) -> &'static [&'static str] {
        match self {
            Self::Anonymous => &["Private", "Quick"],
            Self::Identified => &["Follow-up", "Secure"],
        }
    }

    /// First three characters of the mode name, uppercased.
    #[must_use]
    pub fn case_prefix(self) -> String {
        self.name().chars().take(3).collect::<String>().to_uppercase()
    }

    /// Identified reports collect contact details.
    #[must_use]
    pub fn collects_contact(self) -> bool {
        matches!(self, Self::Identified)
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// CATEGORY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentCategory {
    #[serde(alias = "Harassment")]
    Harassment,
    #[serde(alias = "Stalking")]
    Stalking,
    #[serde(alias = "Domestic Violence", alias = "DomesticViolence")]
    DomesticViolence,
    #[serde(alias = "Cyber Crime", alias = "CyberCrime")]
    CyberCrime,
    #[serde(alias = "Workplace Issues", alias = "WorkplaceIssues")]
    WorkplaceIssues,
    #[serde(alias = "Public Safety", alias = "PublicSafety")]
    PublicSafety,
    #[serde(alias = "Other")]
    Other,
}

impl IncidentCategory {
    /// All categories in picker order.
    pub const ALL: [IncidentCategory; 7] = [
        IncidentCategory::Harassment,
        IncidentCategory::Stalking,
        IncidentCategory::DomesticViolence,
        IncidentCategory::CyberCrime,
        IncidentCategory::WorkplaceIssues,
        IncidentCategory::PublicSafety,
        IncidentCategory::Other,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Harassment => "Harassment",
            Self::Stalking => "Stalking",
            Self::DomesticViolence => "Domestic Violence",
            Self::CyberCrime => "Cyber Crime",
            Self::WorkplaceIssues => "Workplace Issues",
            Self::PublicSafety => "Public Safety",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for IncidentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a category name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown incident category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for IncidentCategory {
    type Err = UnknownCategory;

    /// Accepts the display label, `snake_case`, or the bare variant name,
    /// ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ALL
            .into_iter()
            .find(|category| {
                let candidate: String = category
                    .label()
                    .chars()
                    .filter(char::is_ascii_alphanumeric)
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                candidate == wanted
            })
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

// =============================================================================
// EVIDENCE / CONTACT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    PhotoVideo,
    Audio,
}

impl EvidenceKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::PhotoVideo => "Photo/Video",
            Self::Audio => "Audio",
        }
    }
}

/// Follow-up details for identified reports. Both fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub email: Option<String>,
}

// =============================================================================
// FORM
// =============================================================================

/// The report being filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentForm {
    pub category: Option<IncidentCategory>,
    pub description: String,
    pub location: Option<String>,
    pub has_evidence: bool,
    pub is_emergency: bool,
    /// `None` for anonymous reports.
    pub contact: Option<ContactInfo>,
    pub evidence: BTreeSet<EvidenceKind>,
}

/// A change to exactly one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldEdit {
    Category(Option<IncidentCategory>),
    Description(String),
    Location(String),
    HasEvidence(bool),
    Emergency(bool),
    ContactPhone(String),
    ContactEmail(String),
    AttachEvidence(EvidenceKind),
    DetachEvidence(EvidenceKind),
}

impl FieldEdit {
    #[must_use]
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Category(_) => "category",
            Self::Description(_) => "description",
            Self::Location(_) => "location",
            Self::HasEvidence(_) => "has_evidence",
            Self::Emergency(_) => "emergency",
            Self::ContactPhone(_) => "contact_phone",
            Self::ContactEmail(_) => "contact_email",
            Self::AttachEvidence(_) => "attach_evidence",
            Self::DetachEvidence(_) => "detach_evidence",
        }
    }
}

impl IncidentForm {
    /// Empty form for the given mode.
    #[must_use]
    pub fn for_mode(mode: ReportMode) -> Self {
        Self { contact: mode.collects_contact().then(ContactInfo::default), ..Self::default() }
    }

    /// Apply one edit. Returns `false` when the edit has nowhere to go
    /// (contact details on an anonymous form) and was dropped.
    pub fn apply_edit(&mut self, edit: FieldEdit) -> bool {
        match edit {
            FieldEdit::Category(category) => self.category = category,
            FieldEdit::Description(text) => self.description = text,
            FieldEdit::Location(text) => self.location = non_empty(text),
            FieldEdit::HasEvidence(flag) => {
                self.has_evidence = flag;
                if !flag {
                    self.evidence.clear();
                }
            }
            FieldEdit::Emergency(flag) => self.is_emergency = flag,
            FieldEdit::ContactPhone(text) => {
                let Some(contact) = self.contact.as_mut() else {
                    return false;
                };
                contact.phone = non_empty(text);
            }
            FieldEdit::ContactEmail(text) => {
                let Some(contact) = self.contact.as_mut() else {
                    return false;
                };
                contact.email = non_empty(text);
            }
            FieldEdit::AttachEvidence(kind) => {
                self.has_evidence = true;
                self.evidence.insert(kind);
            }
            FieldEdit::DetachEvidence(kind) => {
                self.evidence.remove(&kind);
            }
        }
        true
    }

    /// Check the submission invariant: a category is chosen and the
    /// description is not empty.
    ///
    /// # Errors
    ///
    /// Returns the first unmet requirement, category before description.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.category.is_none() {
            return Err(ValidationError::MissingCategory);
        }
        if self.description.is_empty() {
            return Err(ValidationError::MissingDescription);
        }
        Ok(())
    }

    #[must_use]
    pub fn is_submittable(&self) -> bool {
        self.validate().is_ok()
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

// =============================================================================
// RESULT
// =============================================================================

/// Receipt for a submitted report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub case_id: String,
    /// Milliseconds since Unix epoch.
    pub submitted_at_ms: i64,
    pub mode: ReportMode,
    pub category: Option<IncidentCategory>,
    pub is_emergency: bool,
    /// `submitted_at_ms` plus [`REVIEW_WINDOW_HOURS`].
    pub review_due_at_ms: i64,
}

impl SubmissionResult {
    #[must_use]
    pub fn new(mode: ReportMode, form: &IncidentForm, case_id: String, submitted_at_ms: i64) -> Self {
        Self {
            case_id,
            submitted_at_ms,
            mode,
            category: form.category,
            is_emergency: form.is_emergency,
            review_due_at_ms: submitted_at_ms.saturating_add(REVIEW_WINDOW_HOURS * 60 * 60 * 1000),
        }
    }
}

/// Build a case id: the mode's three-letter prefix, a dash, and the last six
/// digits of the submission time in epoch milliseconds.
#[must_use]
pub fn case_id(mode: ReportMode, ts_ms: i64) -> String {
    let suffix = ts_ms.rem_euclid(10_i64.pow(CASE_SUFFIX_DIGITS));
    format!("{}-{suffix:06}", mode.case_prefix())
}

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
