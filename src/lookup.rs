use std::future::Future;
use std::time::Duration;

use crate::aggregate::aggregate;
use crate::error::{ClaimsError, StoreError};
use crate::models::{CaseView, Choice};
use crate::resolve::{resolve, SearchCriteria};
use crate::store::RecordStore;

/// What the caller asked for: a known claim id, or something to search on.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Claim(i64),
    Search(SearchCriteria),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Resolved(CaseView),
    /// More than one claim matched; the caller must pick one and ask again by id.
    Ambiguous(Vec<Choice>),
}

/// Resolves `target` to a single claim and aggregates its history, all under
/// one deadline. Searches matching several claims stop at `Ambiguous`.
#[tracing::instrument(skip(store))]
pub async fn lookup(
    store: &dyn RecordStore,
    target: &Target,
    limit: Duration,
) -> Result<Lookup, ClaimsError> {
    within(limit, async {
        let claim_id = match target {
            Target::Claim(claim_id) => *claim_id,
            Target::Search(criteria) => {
                let candidates = resolve(store, criteria).await?;
                match candidates.as_slice() {
                    [] => return Err(ClaimsError::NotFound(criteria.to_string())),
                    [only] => only.claim_id,
                    many => {
                        tracing::info!(candidates = many.len(), "search is ambiguous");
                        return Ok(Lookup::Ambiguous(many.iter().map(Choice::from).collect()));
                    }
                }
            }
        };

        aggregate(store, claim_id).await.map(Lookup::Resolved)
    })
    .await
}

/// Runs `request` under a single deadline. When it fires, every read still in
/// flight is dropped with it.
pub async fn within<T, F>(limit: Duration, request: F) -> Result<T, ClaimsError>
where
    F: Future<Output = Result<T, ClaimsError>>,
{
    match tokio::time::timeout(limit, request).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(?limit, "request deadline elapsed");
            Err(StoreError::Timeout(limit).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::NO_STATUS_YET;
    use crate::memory::MemoryStore;
    use serde_json::json;

    const MARY: &str = "6f1c1f7e-3b0a-4c53-9a38-5d2a3c0e9b11";
    const MARK: &str = "b2d64a50-8c1e-4e0f-a6b7-0d9f2e4c7a21";

    fn store() -> MemoryStore {
        MemoryStore::from_json(json!({
            "form1112master": [
                {"IRN": 77, "DisplayIRN": "CRN-000123", "IncidentType": "Injury", "WorkerID": MARY},
                {"IRN": 78, "DisplayIRN": "CRN-000124", "IncidentType": "Death", "WorkerID": MARK}
            ],
            "workerpersonaldetails": [
                {"WorkerID": MARY, "WorkerFirstName": "Mary", "WorkerLastName": "Kila"},
                {"WorkerID": MARK, "WorkerFirstName": "Mark", "WorkerLastName": "Kila"}
            ],
            "registrarreview": [
                {"IRN": 77, "RRStatus": "Approved", "RRDecisionDate": "2024-02-15"}
            ]
        }))
        .unwrap()
    }

    fn search(reference: Option<&str>, last: Option<&str>) -> Target {
        Target::Search(SearchCriteria {
            reference: reference.map(str::to_string),
            first_name: None,
            last_name: last.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn single_match_goes_straight_to_the_case_view() {
        let outcome = lookup(&store(), &search(Some("CRN-000123"), None), Duration::from_secs(5))
            .await
            .unwrap();
        let Lookup::Resolved(view) = outcome else {
            panic!("expected a resolved case view");
        };
        assert_eq!(view.current_stage, "Approved — Registrar Review (as of 15/02/2024)");
        assert_eq!(view.decisions[0].display_reference, "CRN-000123");
    }

    #[tokio::test]
    async fn several_matches_come_back_as_choices() {
        let outcome = lookup(&store(), &search(None, Some("kila")), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Lookup::Ambiguous(vec![
                Choice {
                    claim_id: 77,
                    label: "CRN-000123 — Mary Kila (Injury)".to_string()
                },
                Choice {
                    claim_id: 78,
                    label: "CRN-000124 — Mark Kila (Death)".to_string()
                },
            ])
        );
    }

    #[tokio::test]
    async fn chosen_claim_id_skips_resolution() {
        let store = store();
        let outcome = lookup(&store, &Target::Claim(78), Duration::from_secs(5))
            .await
            .unwrap();
        let Lookup::Resolved(view) = outcome else {
            panic!("expected a resolved case view");
        };
        assert_eq!(view.current_stage, NO_STATUS_YET);
        assert!(store
            .queries()
            .iter()
            .all(|q| q.table != crate::sources::WORKERS_TABLE));
    }

    #[tokio::test]
    async fn resolver_errors_pass_through() {
        let result = lookup(&store(), &search(Some("CRN-404"), None), Duration::from_secs(5)).await;
        assert!(matches!(result, Err(ClaimsError::NotFound(_))));

        let result = lookup(&store(), &search(None, None), Duration::from_secs(5)).await;
        assert!(matches!(result, Err(ClaimsError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn sample_fixture_resolves_end_to_end() {
        let path =
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample_claims.json");
        let store = MemoryStore::from_json_file(&path).unwrap();

        let outcome = lookup(&store, &search(Some("crn-000123"), None), Duration::from_secs(5))
            .await
            .unwrap();
        let Lookup::Resolved(view) = outcome else {
            panic!("expected a resolved case view");
        };
        assert_eq!(view.current_stage, "Approved — Registrar Review (as of 15/02/2024)");
        assert_eq!(view.decisions.len(), 3);
        assert_eq!(view.payments.len(), 1);
        assert_eq!(view.payments[0].compensation_amount, "12500.00");

        let outcome = lookup(&store, &search(None, Some("Kila")), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(matches!(outcome, Lookup::Ambiguous(choices) if choices.len() == 2));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out_the_whole_request() {
        let mut store = store();
        store.delay_on("form18master", Duration::from_secs(30));

        let result = lookup(&store, &Target::Claim(77), Duration::from_secs(2)).await;
        match result {
            Err(ClaimsError::Store(StoreError::Timeout(limit))) => {
                assert_eq!(limit, Duration::from_secs(2));
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
    }
}
