use chrono::NaiveDateTime;
use serde::Serialize;

use crate::dates::{self, MISSING};

pub const UNRESOLVED_REFERENCE: &str = "N/A";

/// One decision event for a claim, normalized from a single source row.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRecord {
    pub claim_id: Option<i64>,
    pub display_reference: String,
    pub submission_type: String,
    pub status: Option<String>,
    pub reason: Option<String>,
    pub taken_by: Option<String>,
    pub decision_date: Option<NaiveDateTime>,
}

impl DecisionRecord {
    pub fn to_view(&self) -> DecisionView {
        DecisionView {
            claim_id: self.claim_id,
            display_reference: self.display_reference.clone(),
            submission_type: self.submission_type.clone(),
            status: self.status.clone().unwrap_or_default(),
            reason: self.reason.clone().unwrap_or_else(|| MISSING.to_string()),
            taken_by: self.taken_by.clone().unwrap_or_else(|| MISSING.to_string()),
            decision_date: dates::format_display(self.decision_date),
            decided_at: self.decision_date,
        }
    }
}

/// A decision record with every field rendered for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionView {
    pub claim_id: Option<i64>,
    pub display_reference: String,
    pub submission_type: String,
    pub status: String,
    pub reason: String,
    pub taken_by: String,
    pub decision_date: String,
    /// Full timestamp behind `decision_date`, kept for ordering.
    #[serde(skip)]
    pub decided_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub bank_name: String,
    pub cheque_number: String,
    pub issue_date: String,
    pub compensation_amount: String,
    pub issued_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseView {
    pub current_stage: String,
    pub decisions: Vec<DecisionView>,
    pub payments: Vec<PaymentRecord>,
}

/// A claim that matched a search, with enough context to choose between several.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub claim_id: i64,
    pub display_reference: String,
    pub worker_id: Option<uuid::Uuid>,
    pub worker_first_name: Option<String>,
    pub worker_last_name: Option<String>,
    pub incident_type: Option<String>,
}

impl Candidate {
    /// `"{reference} — {first} {last} ({incident})"`, trimmed.
    pub fn label(&self) -> String {
        let first = self.worker_first_name.as_deref().unwrap_or_default();
        let last = self.worker_last_name.as_deref().unwrap_or_default();
        let incident = self.incident_type.as_deref().unwrap_or_default();
        format!("{} — {} {} ({})", self.display_reference, first, last, incident)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub claim_id: i64,
    pub label: String,
}

impl From<&Candidate> for Choice {
    fn from(candidate: &Candidate) -> Self {
        Choice {
            claim_id: candidate.claim_id,
            label: candidate.label(),
        }
    }
}
