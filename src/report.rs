use std::fmt::Write;
use std::path::Path;

use serde::Serialize;

use crate::models::{CaseView, Choice, DecisionView, UNRESOLVED_REFERENCE};

/// Decisions most recent first, to the second; undated ones last, otherwise in
/// record order.
pub fn by_recency(view: &CaseView) -> Vec<&DecisionView> {
    let mut decisions: Vec<&DecisionView> = view.decisions.iter().collect();
    decisions.sort_by_key(|d| std::cmp::Reverse(d.decided_at));
    decisions
}

fn claim_reference(view: &CaseView) -> &str {
    view.decisions
        .iter()
        .map(|d| d.display_reference.as_str())
        .find(|r| *r != UNRESOLVED_REFERENCE)
        .unwrap_or(UNRESOLVED_REFERENCE)
}

fn cell(value: &str) -> String {
    value.replace('|', "\\|")
}

pub fn render_text(view: &CaseView) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Current stage: {}", view.current_stage);
    let _ = writeln!(output);
    let _ = writeln!(output, "Decisions:");
    if view.decisions.is_empty() {
        let _ = writeln!(output, "  none recorded");
    }
    for decision in by_recency(view) {
        let _ = writeln!(
            output,
            "- [{}] {}: {} (by {}; reason: {})",
            decision.decision_date,
            decision.submission_type,
            decision.status,
            decision.taken_by,
            decision.reason
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Payments:");
    if view.payments.is_empty() {
        let _ = writeln!(output, "  none recorded");
    }
    for payment in &view.payments {
        let _ = writeln!(
            output,
            "- Cheque {} from {}, amount {}, issued {} by {}",
            payment.cheque_number,
            payment.bank_name,
            payment.compensation_amount,
            payment.issue_date,
            payment.issued_by
        );
    }

    output
}

pub fn render_choices(choices: &[Choice]) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{} claims match; re-run with --claim-id <ID> to pick one:",
        choices.len()
    );
    for choice in choices {
        let _ = writeln!(output, "- {}: {}", choice.claim_id, choice.label);
    }
    output
}

pub fn build_report(view: &CaseView) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Claim History Report");
    let _ = writeln!(output, "Claim {}", claim_reference(view));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Current Stage");
    let _ = writeln!(output, "{}", view.current_stage);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Decision History");

    if view.decisions.is_empty() {
        let _ = writeln!(output, "No decisions recorded for this claim.");
    } else {
        let _ = writeln!(output, "| Date | Stage | Status | Taken By | Reason |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for decision in by_recency(view) {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} |",
                decision.decision_date,
                cell(&decision.submission_type),
                cell(&decision.status),
                cell(&decision.taken_by),
                cell(&decision.reason)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Payments");

    if view.payments.is_empty() {
        let _ = writeln!(output, "No payments issued for this claim.");
    } else {
        for payment in &view.payments {
            let _ = writeln!(
                output,
                "- {}: cheque {} ({}) for {} on {}",
                payment.issued_by,
                payment.cheque_number,
                payment.bank_name,
                payment.compensation_amount,
                payment.issue_date
            );
        }
    }

    output
}

#[derive(Serialize)]
struct CsvRow<'a> {
    claim_reference: &'a str,
    submission_type: &'a str,
    status: &'a str,
    reason: &'a str,
    taken_by: &'a str,
    decision_date: &'a str,
}

const CSV_HEADERS: [&str; 6] = [
    "claim_reference",
    "submission_type",
    "status",
    "reason",
    "taken_by",
    "decision_date",
];

/// Writes the decision history to `path`. Returns the number of rows written.
pub fn export_csv(view: &CaseView, path: &Path) -> anyhow::Result<usize> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(CSV_HEADERS)?;

    let decisions = by_recency(view);
    for decision in &decisions {
        writer.serialize(CsvRow {
            claim_reference: &decision.display_reference,
            submission_type: &decision.submission_type,
            status: &decision.status,
            reason: &decision.reason,
            taken_by: &decision.taken_by,
            decision_date: &decision.decision_date,
        })?;
    }
    writer.flush()?;

    Ok(decisions.len())
}
