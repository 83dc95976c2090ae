use std::str::FromStr;

use rust_decimal::Decimal;

use crate::dates::{self, MISSING};
use crate::models::{DecisionRecord, PaymentRecord, UNRESOLVED_REFERENCE};
use crate::store::Row;

/// Integer claim key shared by every claim-scoped table.
pub const CLAIM_ID: &str = "IRN";

pub const CLAIMS_TABLE: &str = "form1112master";
pub const DISPLAY_REFERENCE: &str = "DisplayIRN";
pub const INCIDENT_TYPE: &str = "IncidentType";
pub const WORKER_ID: &str = "WorkerID";

pub const WORKERS_TABLE: &str = "workerpersonaldetails";
pub const FIRST_NAME: &str = "WorkerFirstName";
pub const LAST_NAME: &str = "WorkerLastName";

pub struct DecisionSource {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub map: fn(&Row) -> DecisionRecord,
}

pub static DECISION_SOURCES: [DecisionSource; 10] = [
    DecisionSource {
        table: "prescreeningreview",
        columns: &[CLAIM_ID, "PRStatus", "PRDecisionReason", "PRDecisionDate"],
        map: prescreening_review,
    },
    DecisionSource {
        table: "registrarreview",
        columns: &[CLAIM_ID, "RRStatus", "RRDecisionReason", "RRDecisionDate"],
        map: registrar_review,
    },
    DecisionSource {
        table: "timebarredclaimsregistrarreview",
        columns: &[CLAIM_ID, "TBCRRReviewStatus", "TBCRRDecisionReason", "TBCRRDecisionDate"],
        map: time_barred_review,
    },
    DecisionSource {
        table: "form6master",
        columns: &[CLAIM_ID, "F6MStatus", "F6MApprovalDate"],
        map: form6_notification,
    },
    DecisionSource {
        table: "form18master",
        columns: &[
            CLAIM_ID,
            "F18MStatus",
            "F18MEmployerDecisionReason",
            "F18MWorkerDecisionReason",
            "F18MEmployerAcceptedDate",
            "F18MWorkerAcceptedDate",
            "F18MPCOAcceptedDate",
        ],
        map: form18_notification,
    },
    DecisionSource {
        table: "approvedclaimscporeview",
        columns: &[CLAIM_ID, "CPORStatus", "CPORDecisionReason", "CPORApprovedDate"],
        map: pco_review,
    },
    DecisionSource {
        table: "claimsawardedcommissionersreview",
        columns: &[CLAIM_ID, "CACRReviewStatus", "CACRDecisionReason", "CACRDecisionDate"],
        map: commissioner_review,
    },
    DecisionSource {
        table: "claimsawardedregistrarreview",
        columns: &[CLAIM_ID, "CARRReviewStatus", "CARRDecisionReason", "CARRDecisionDate"],
        map: award_registrar_review,
    },
    DecisionSource {
        table: "claimsawardedchiefcommissionerreview",
        columns: &[CLAIM_ID, "CACCRReviewStatus", "CACCRDecisionReason", "CACCRDecisionDate"],
        map: award_chief_commissioner_review,
    },
    DecisionSource {
        table: "claimsawardedinsurancereview",
        columns: &[CLAIM_ID, "CAIRReviewStatus", "CAIRDecisionReason", "CAIRDecisionDate"],
        map: award_insurance_review,
    },
];

fn decision(
    row: &Row,
    submission_type: &str,
    status: Option<String>,
    reason: Option<String>,
    taken_by: Option<&str>,
    decision_date: &str,
) -> DecisionRecord {
    DecisionRecord {
        claim_id: row.int(CLAIM_ID),
        display_reference: UNRESOLVED_REFERENCE.to_string(),
        submission_type: submission_type.to_string(),
        status,
        reason,
        taken_by: taken_by.map(str::to_string),
        decision_date: row.timestamp(decision_date),
    }
}

fn prescreening_review(row: &Row) -> DecisionRecord {
    let status = row.text("PRStatus");
    let (reason, taken_by) = match status.as_deref() {
        Some("Pending") => (None, None),
        Some("Rejected") | Some("OnHold") => {
            (row.text("PRDecisionReason"), Some("Deputy Registrar"))
        }
        _ => (None, Some("Deputy Registrar")),
    };
    decision(row, "Pre-Screening", status, reason, taken_by, "PRDecisionDate")
}

fn registrar_review(row: &Row) -> DecisionRecord {
    decision(
        row,
        "Registrar Review",
        row.text("RRStatus"),
        row.text("RRDecisionReason"),
        Some("Registrar"),
        "RRDecisionDate",
    )
}

fn time_barred_review(row: &Row) -> DecisionRecord {
    decision(
        row,
        "Time-Barred Claim Review",
        row.text("TBCRRReviewStatus"),
        row.text("TBCRRDecisionReason"),
        Some("Registrar"),
        "TBCRRDecisionDate",
    )
}

fn form6_notification(row: &Row) -> DecisionRecord {
    decision(
        row,
        "Form6 Notification",
        row.text("F6MStatus"),
        None,
        Some("Employer"),
        "F6MApprovalDate",
    )
}

fn form18_notification(row: &Row) -> DecisionRecord {
    let status = row.text("F18MStatus");
    let (reason, taken_by, date) = match status.as_deref() {
        Some("EmployerAccepted") => (
            row.text("F18MEmployerDecisionReason"),
            Some("Employer"),
            "F18MEmployerAcceptedDate",
        ),
        Some("WorkerAccepted") => (
            row.text("F18MWorkerDecisionReason"),
            Some("Worker"),
            "F18MWorkerAcceptedDate",
        ),
        Some("NotifiedToPCO") => (None, Some("PCO"), "F18MPCOAcceptedDate"),
        _ => (None, None, "F18MPCOAcceptedDate"),
    };
    decision(row, "Form18 Notification", status, reason, taken_by, date)
}

fn pco_review(row: &Row) -> DecisionRecord {
    decision(
        row,
        "PCO Review",
        row.text("CPORStatus"),
        row.text("CPORDecisionReason"),
        Some("Provincial Claims Officer"),
        "CPORApprovedDate",
    )
}

fn commissioner_review(row: &Row) -> DecisionRecord {
    let status = row.text("CACRReviewStatus");
    let taken_by = match status.as_deref() {
        Some("ChiefCommissionerAccepted") => Some("Chief Commissioner"),
        Some("Pending") => None,
        _ => Some("Commissioner"),
    };
    decision(
        row,
        "Commissioner Review",
        status,
        row.text("CACRDecisionReason"),
        taken_by,
        "CACRDecisionDate",
    )
}

fn award_registrar_review(row: &Row) -> DecisionRecord {
    decision(
        row,
        "Award Review (Registrar)",
        row.text("CARRReviewStatus"),
        row.text("CARRDecisionReason"),
        Some("Registrar"),
        "CARRDecisionDate",
    )
}

fn award_chief_commissioner_review(row: &Row) -> DecisionRecord {
    decision(
        row,
        "Award Review (Chief Commissioner)",
        row.text("CACCRReviewStatus"),
        row.text("CACCRDecisionReason"),
        Some("Chief Commissioner"),
        "CACCRDecisionDate",
    )
}

fn award_insurance_review(row: &Row) -> DecisionRecord {
    decision(
        row,
        "Award Review (Insurance)",
        row.text("CAIRReviewStatus"),
        row.text("CAIRDecisionReason"),
        Some("Insurance Provider"),
        "CAIRDecisionDate",
    )
}

pub struct PaymentSource {
    pub table: &'static str,
    pub issued_by: &'static str,
}

pub static PAYMENT_SOURCES: [PaymentSource; 2] = [
    PaymentSource {
        table: "claimcompensationworkerpayment",
        issued_by: "Office of Workers Compensation",
    },
    PaymentSource {
        table: "claimcompensationinsurerpayment",
        issued_by: "Insurance Provider",
    },
];

pub const PAYMENT_COLUMNS: &[&str] = &[
    "BankName",
    "ChequeNumber",
    "IssueDate",
    "CompensationAmount",
];

impl PaymentSource {
    pub fn map(&self, row: &Row) -> PaymentRecord {
        PaymentRecord {
            bank_name: row.text("BankName").unwrap_or_else(|| MISSING.to_string()),
            cheque_number: row
                .text("ChequeNumber")
                .unwrap_or_else(|| MISSING.to_string()),
            issue_date: dates::format_display(row.timestamp("IssueDate")),
            compensation_amount: format_amount(row.text("CompensationAmount").as_deref()),
            issued_by: self.issued_by.to_string(),
        }
    }
}

fn format_amount(raw: Option<&str>) -> String {
    match raw.and_then(|s| Decimal::from_str(s).ok()) {
        Some(amount) => {
            let mut amount = amount.round_dp(2);
            amount.rescale(2);
            amount.to_string()
        }
        None => MISSING.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        Row::from_json(value).unwrap()
    }

    fn source(table: &str) -> &'static DecisionSource {
        DECISION_SOURCES
            .iter()
            .find(|s| s.table == table)
            .unwrap()
    }

    #[test]
    fn tables_are_distinct_and_all_project_the_claim_key() {
        let mut tables: Vec<_> = DECISION_SOURCES.iter().map(|s| s.table).collect();
        tables.sort();
        tables.dedup();
        assert_eq!(tables.len(), 10);
        assert!(DECISION_SOURCES.iter().all(|s| s.columns.contains(&CLAIM_ID)));
    }

    #[test]
    fn registrar_review_maps_plain_fields() {
        let record = (source("registrarreview").map)(&row(json!({
            "IRN": 77,
            "RRStatus": "Approved",
            "RRDecisionReason": "Complete file",
            "RRDecisionDate": "2024-02-15"
        })));
        assert_eq!(record.claim_id, Some(77));
        assert_eq!(record.display_reference, "N/A");
        assert_eq!(record.submission_type, "Registrar Review");
        assert_eq!(record.status.as_deref(), Some("Approved"));
        assert_eq!(record.reason.as_deref(), Some("Complete file"));
        assert_eq!(record.taken_by.as_deref(), Some("Registrar"));
        assert_eq!(dates::format_display(record.decision_date), "15/02/2024");
    }

    #[test]
    fn form18_attribution_follows_its_status() {
        let map = source("form18master").map;
        let base = json!({
            "IRN": 77,
            "F18MEmployerDecisionReason": "Employer agrees",
            "F18MWorkerDecisionReason": "Worker agrees",
            "F18MEmployerAcceptedDate": "2024-01-02",
            "F18MWorkerAcceptedDate": "2024-01-03",
            "F18MPCOAcceptedDate": "2024-01-04"
        });
        let with_status = |status: &str| {
            let mut value = base.clone();
            value["F18MStatus"] = json!(status);
            map(&row(value))
        };

        let employer = with_status("EmployerAccepted");
        assert_eq!(employer.taken_by.as_deref(), Some("Employer"));
        assert_eq!(employer.reason.as_deref(), Some("Employer agrees"));
        assert_eq!(dates::format_display(employer.decision_date), "02/01/2024");

        let worker = with_status("WorkerAccepted");
        assert_eq!(worker.taken_by.as_deref(), Some("Worker"));
        assert_eq!(worker.reason.as_deref(), Some("Worker agrees"));
        assert_eq!(dates::format_display(worker.decision_date), "03/01/2024");

        let pco = with_status("NotifiedToPCO");
        assert_eq!(pco.taken_by.as_deref(), Some("PCO"));
        assert_eq!(pco.reason, None);
        assert_eq!(dates::format_display(pco.decision_date), "04/01/2024");

        let other = with_status("Pending");
        assert_eq!(other.taken_by, None);
        assert_eq!(other.reason, None);
    }

    #[test]
    fn prescreening_reason_only_on_rejection_or_hold() {
        let map = source("prescreeningreview").map;
        let with_status = |status: serde_json::Value| {
            map(&row(json!({
                "IRN": 5,
                "PRStatus": status,
                "PRDecisionReason": "Missing medical report"
            })))
        };

        let rejected = with_status(json!("Rejected"));
        assert_eq!(rejected.reason.as_deref(), Some("Missing medical report"));
        assert_eq!(rejected.taken_by.as_deref(), Some("Deputy Registrar"));

        let on_hold = with_status(json!("OnHold"));
        assert_eq!(on_hold.reason.as_deref(), Some("Missing medical report"));

        let approved = with_status(json!("Approved"));
        assert_eq!(approved.reason, None);
        assert_eq!(approved.taken_by.as_deref(), Some("Deputy Registrar"));

        let pending = with_status(json!("Pending"));
        assert_eq!(pending.taken_by, None);

        let blank = with_status(json!(null));
        assert_eq!(blank.status, None);
        assert_eq!(blank.reason, None);
        assert_eq!(blank.taken_by.as_deref(), Some("Deputy Registrar"));

        let whitespace = with_status(json!("  "));
        assert_eq!(whitespace.taken_by.as_deref(), Some("Deputy Registrar"));
    }

    #[test]
    fn commissioner_attribution_depends_on_status() {
        let map = source("claimsawardedcommissionersreview").map;
        let taken_by = |status: &str| {
            map(&row(json!({"IRN": 1, "CACRReviewStatus": status}))).taken_by
        };
        assert_eq!(taken_by("ChiefCommissionerAccepted").as_deref(), Some("Chief Commissioner"));
        assert_eq!(taken_by("CommissionerAccepted").as_deref(), Some("Commissioner"));
        assert_eq!(taken_by("Rejected").as_deref(), Some("Commissioner"));
        assert_eq!(taken_by("Pending"), None);

        let unset = map(&row(json!({"IRN": 1, "CACRReviewStatus": null})));
        assert_eq!(unset.status, None);
        assert_eq!(unset.taken_by.as_deref(), Some("Commissioner"));
    }

    #[test]
    fn payments_render_display_strings() {
        let payment = PAYMENT_SOURCES[1].map(&row(json!({
            "BankName": "BSP",
            "ChequeNumber": "000451",
            "IssueDate": "2024-04-01T08:00:00+10:00",
            "CompensationAmount": 1500.5
        })));
        assert_eq!(payment.bank_name, "BSP");
        assert_eq!(payment.issue_date, "01/04/2024");
        assert_eq!(payment.compensation_amount, "1500.50");
        assert_eq!(payment.issued_by, "Insurance Provider");

        let sparse = PAYMENT_SOURCES[0].map(&row(json!({"IssueDate": "soon"})));
        assert_eq!(sparse.bank_name, "--");
        assert_eq!(sparse.cheque_number, "--");
        assert_eq!(sparse.issue_date, "--");
        assert_eq!(sparse.compensation_amount, "--");
        assert_eq!(sparse.issued_by, "Office of Workers Compensation");
    }
}
