use std::collections::{BTreeSet, HashMap};

use futures::future::try_join_all;

use crate::dates;
use crate::error::{ClaimsError, StoreError};
use crate::models::{CaseView, DecisionRecord, PaymentRecord, UNRESOLVED_REFERENCE};
use crate::sources::{
    CLAIMS_TABLE, CLAIM_ID, DECISION_SOURCES, DISPLAY_REFERENCE, PAYMENT_COLUMNS, PAYMENT_SOURCES,
};
use crate::store::{Query, RecordStore, Value};

pub const NO_STATUS_YET: &str = "No status on record yet";

/// Builds the full decision and payment history for one claim.
///
/// The decision-source reads and both payment reads go out together; the
/// display-reference lookup follows once the claim ids are known. Any failed
/// read fails the whole view.
#[tracing::instrument(skip(store))]
pub async fn aggregate(store: &dyn RecordStore, claim_id: i64) -> Result<CaseView, ClaimsError> {
    let (mut decisions, payments) =
        tokio::try_join!(fetch_decisions(store, claim_id), fetch_payments(store, claim_id))?;

    attach_display_references(store, &mut decisions).await?;

    let current_stage = current_stage(&decisions);
    tracing::debug!(
        decisions = decisions.len(),
        payments = payments.len(),
        %current_stage,
        "claim history aggregated"
    );

    Ok(CaseView {
        current_stage,
        decisions: decisions.iter().map(DecisionRecord::to_view).collect(),
        payments,
    })
}

async fn fetch_decisions(
    store: &dyn RecordStore,
    claim_id: i64,
) -> Result<Vec<DecisionRecord>, StoreError> {
    let reads = DECISION_SOURCES.iter().map(|source| async move {
        let query = Query::new(source.table, source.columns).eq(CLAIM_ID, claim_id);
        let rows = store.select(&query).await?;
        tracing::debug!(table = source.table, rows = rows.len(), "decision source read");
        Ok::<_, StoreError>(rows.iter().map(source.map).collect::<Vec<_>>())
    });

    let batches = try_join_all(reads).await?;
    Ok(batches.into_iter().flatten().collect())
}

async fn fetch_payments(
    store: &dyn RecordStore,
    claim_id: i64,
) -> Result<Vec<PaymentRecord>, StoreError> {
    let reads = PAYMENT_SOURCES.iter().map(|source| async move {
        let query = Query::new(source.table, PAYMENT_COLUMNS).eq(CLAIM_ID, claim_id);
        let rows = store.select(&query).await?;
        if rows.len() > 1 {
            // Only the first payment row per table is reported.
            tracing::warn!(
                table = source.table,
                claim_id,
                rows = rows.len(),
                "multiple payment rows on record, keeping the first"
            );
        }
        Ok::<_, StoreError>(rows.first().map(|row| source.map(row)))
    });

    let payments = try_join_all(reads).await?;
    Ok(payments.into_iter().flatten().collect())
}

async fn attach_display_references(
    store: &dyn RecordStore,
    decisions: &mut [DecisionRecord],
) -> Result<(), StoreError> {
    let claim_ids: BTreeSet<i64> = decisions.iter().filter_map(|d| d.claim_id).collect();
    if claim_ids.is_empty() {
        return Ok(());
    }

    let query = Query::new(CLAIMS_TABLE, &[CLAIM_ID, DISPLAY_REFERENCE])
        .in_list(CLAIM_ID, claim_ids.into_iter().map(Value::Int).collect());
    let references: HashMap<i64, String> = store
        .select(&query)
        .await?
        .iter()
        .filter_map(|row| Some((row.int(CLAIM_ID)?, row.text(DISPLAY_REFERENCE)?)))
        .collect();

    for decision in decisions.iter_mut() {
        decision.display_reference = decision
            .claim_id
            .and_then(|id| references.get(&id).cloned())
            .unwrap_or_else(|| UNRESOLVED_REFERENCE.to_string());
    }
    Ok(())
}

/// One-line summary from the most recent decision that carries a status.
/// Undated decisions rank below every dated one.
pub fn current_stage(decisions: &[DecisionRecord]) -> String {
    let mut ordered: Vec<&DecisionRecord> = decisions.iter().collect();
    ordered.sort_by(|a, b| b.decision_date.cmp(&a.decision_date));

    let Some(latest) = ordered.into_iter().find(|d| d.status.is_some()) else {
        return NO_STATUS_YET.to_string();
    };

    let status = latest.status.as_deref().unwrap_or_default();
    match latest.decision_date {
        Some(date) => format!(
            "{} — {} (as of {})",
            status,
            latest.submission_type,
            dates::format_display(Some(date))
        ),
        None => format!("{} — {}", status, latest.submission_type),
    }
}
