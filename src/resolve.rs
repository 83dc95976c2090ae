use std::collections::{HashMap, HashSet};
use std::fmt;

use uuid::Uuid;

use crate::error::{ClaimsError, StoreError};
use crate::models::{Candidate, UNRESOLVED_REFERENCE};
use crate::sources::{
    CLAIMS_TABLE, CLAIM_ID, DISPLAY_REFERENCE, FIRST_NAME, INCIDENT_TYPE, LAST_NAME, WORKERS_TABLE,
    WORKER_ID,
};
use crate::store::{Query, RecordStore, Row, Value};

const CLAIM_COLUMNS: &[&str] = &[CLAIM_ID, DISPLAY_REFERENCE, INCIDENT_TYPE, WORKER_ID];
const WORKER_COLUMNS: &[&str] = &[WORKER_ID, FIRST_NAME, LAST_NAME];

/// What a person typed in to find a claim. Blank fields count as not given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchCriteria {
    pub reference: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl SearchCriteria {
    fn normalized(&self) -> Self {
        let clean = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        SearchCriteria {
            reference: clean(&self.reference),
            first_name: clean(&self.first_name),
            last_name: clean(&self.last_name),
        }
    }

    fn has_name(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.reference.is_none() && !self.has_name()
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(reference) = &self.reference {
            parts.push(format!("reference '{reference}'"));
        }
        if let Some(first) = &self.first_name {
            parts.push(format!("first name '{first}'"));
        }
        if let Some(last) = &self.last_name {
            parts.push(format!("last name '{last}'"));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Candidates in discovery order, at most one per claim id.
#[derive(Debug, Default)]
struct CandidateSet {
    seen: HashSet<i64>,
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    fn push(&mut self, candidate: Candidate) {
        if self.seen.insert(candidate.claim_id) {
            self.candidates.push(candidate);
        }
    }

    fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    fn worker_ids(&self) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for worker_id in self.candidates.iter().filter_map(|c| c.worker_id) {
            if !ids.contains(&worker_id) {
                ids.push(worker_id);
            }
        }
        ids
    }

    fn attach_names(&mut self, workers: &HashMap<Uuid, (Option<String>, Option<String>)>) {
        for candidate in self.candidates.iter_mut() {
            if let Some((first, last)) = candidate.worker_id.and_then(|id| workers.get(&id)) {
                candidate.worker_first_name = first.clone();
                candidate.worker_last_name = last.clone();
            }
        }
    }
}

fn candidate_from_claim(row: &Row) -> Option<Candidate> {
    Some(Candidate {
        claim_id: row.int(CLAIM_ID)?,
        display_reference: row
            .text(DISPLAY_REFERENCE)
            .unwrap_or_else(|| UNRESOLVED_REFERENCE.to_string()),
        worker_id: row.uuid(WORKER_ID),
        worker_first_name: None,
        worker_last_name: None,
        incident_type: row.text(INCIDENT_TYPE),
    })
}

fn worker_names(rows: &[Row]) -> HashMap<Uuid, (Option<String>, Option<String>)> {
    rows.iter()
        .filter_map(|row| {
            Some((
                row.uuid(WORKER_ID)?,
                (row.text(FIRST_NAME), row.text(LAST_NAME)),
            ))
        })
        .collect()
}

/// Finds every claim a reference or worker name could point at.
///
/// A reference is matched first. Names are only consulted when the reference
/// is absent or matched nothing. Several candidates are returned as-is for the
/// caller to choose between.
#[tracing::instrument(skip(store, criteria), fields(criteria = %criteria))]
pub async fn resolve(
    store: &dyn RecordStore,
    criteria: &SearchCriteria,
) -> Result<Vec<Candidate>, ClaimsError> {
    let criteria = criteria.normalized();
    if criteria.is_empty() {
        return Err(ClaimsError::InvalidInput(
            "provide a claim reference or a worker first or last name".to_string(),
        ));
    }

    let mut candidates = CandidateSet::default();

    if let Some(reference) = &criteria.reference {
        search_by_reference(store, reference, &mut candidates).await?;
        tracing::debug!(matches = candidates.candidates.len(), "reference search done");
    }

    if candidates.is_empty() && criteria.has_name() {
        search_by_name(store, &criteria, &mut candidates).await?;
        tracing::debug!(matches = candidates.candidates.len(), "name search done");
    }

    if candidates.is_empty() {
        return Err(ClaimsError::NotFound(criteria.to_string()));
    }
    Ok(candidates.candidates)
}

async fn search_by_reference(
    store: &dyn RecordStore,
    reference: &str,
    candidates: &mut CandidateSet,
) -> Result<(), StoreError> {
    let query = Query::new(CLAIMS_TABLE, CLAIM_COLUMNS)
        .ilike(DISPLAY_REFERENCE, format!("%{reference}%"));
    for row in store.select(&query).await? {
        if let Some(candidate) = candidate_from_claim(&row) {
            candidates.push(candidate);
        }
    }

    let worker_ids = candidates.worker_ids();
    if worker_ids.is_empty() {
        return Ok(());
    }

    let query = Query::new(WORKERS_TABLE, WORKER_COLUMNS)
        .in_list(WORKER_ID, worker_ids.into_iter().map(Value::Uuid).collect());
    let workers = worker_names(&store.select(&query).await?);
    candidates.attach_names(&workers);
    Ok(())
}

async fn search_by_name(
    store: &dyn RecordStore,
    criteria: &SearchCriteria,
    candidates: &mut CandidateSet,
) -> Result<(), StoreError> {
    let mut query = Query::new(WORKERS_TABLE, WORKER_COLUMNS);
    if let Some(first) = &criteria.first_name {
        query = query.ilike(FIRST_NAME, format!("%{first}%"));
    }
    if let Some(last) = &criteria.last_name {
        query = query.ilike(LAST_NAME, format!("%{last}%"));
    }

    let worker_rows = store.select(&query).await?;
    let workers = worker_names(&worker_rows);
    if workers.is_empty() {
        return Ok(());
    }

    let mut worker_ids = Vec::new();
    for row in &worker_rows {
        if let Some(id) = row.uuid(WORKER_ID).filter(|id| !worker_ids.contains(id)) {
            worker_ids.push(id);
        }
    }

    let query = Query::new(CLAIMS_TABLE, CLAIM_COLUMNS)
        .in_list(WORKER_ID, worker_ids.into_iter().map(Value::Uuid).collect());
    for row in store.select(&query).await? {
        if let Some(candidate) = candidate_from_claim(&row) {
            candidates.push(candidate);
        }
    }
    candidates.attach_names(&workers);
    Ok(())
}
