use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;

use crate::error::StoreError;
use crate::store::{Filter, Query, RecordStore, Row, Value};

/// In-memory `RecordStore` for fixtures. Rows keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<String, Vec<Row>>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    log: Mutex<Vec<Query>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from `{ "<table>": [ {row}, ... ], ... }`.
    pub fn from_json(document: serde_json::Value) -> anyhow::Result<Self> {
        let serde_json::Value::Object(tables) = document else {
            anyhow::bail!("fixture must be a JSON object keyed by table name");
        };

        let mut store = Self::new();
        for (table, rows) in tables {
            let serde_json::Value::Array(rows) = rows else {
                anyhow::bail!("fixture table {table} must be an array of rows");
            };
            for row in rows {
                let row = Row::from_json(row)
                    .with_context(|| format!("invalid row in fixture table {table}"))?;
                store.insert(&table, row);
            }
        }
        Ok(store)
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        let document: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("fixture {} is not valid JSON", path.display()))?;
        Self::from_json(document)
    }

    pub fn insert(&mut self, table: &str, row: Row) {
        self.tables.entry(table.to_string()).or_default().push(row);
    }

    /// Makes every read against `table` fail with a backend error.
    #[cfg(test)]
    pub fn fail_on(&mut self, table: &str) {
        self.failing.insert(table.to_string());
    }

    /// Holds every read against `table` for `delay` before answering.
    #[cfg(test)]
    pub fn delay_on(&mut self, table: &str, delay: Duration) {
        self.delays.insert(table.to_string(), delay);
    }

    /// Queries served so far, in arrival order.
    #[cfg(test)]
    pub fn queries(&self) -> Vec<Query> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    fn record(&self, query: &Query) {
        if let Ok(mut log) = self.log.lock() {
            log.push(query.clone());
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        self.record(query);

        if let Some(delay) = self.delays.get(&query.table) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&query.table) {
            return Err(StoreError::Backend(format!(
                "read against {} failed",
                query.table
            )));
        }

        let Some(rows) = self.tables.get(&query.table) else {
            return Ok(Vec::new());
        };

        let matched = rows
            .iter()
            .filter(|row| query.filters.iter().all(|filter| matches(row, filter)))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|row| row.project(&query.columns))
            .collect();

        Ok(matched)
    }
}

fn matches(row: &Row, filter: &Filter) -> bool {
    match filter {
        Filter::Eq { column, value } => row.get(column).is_some_and(|cell| equals(cell, value)),
        Filter::ILike { column, pattern } => match row.get(column) {
            Some(serde_json::Value::String(s)) => like(s, pattern),
            Some(serde_json::Value::Number(n)) => like(&n.to_string(), pattern),
            _ => false,
        },
        Filter::In { column, values } => row
            .get(column)
            .is_some_and(|cell| values.iter().any(|value| equals(cell, value))),
    }
}

fn equals(cell: &serde_json::Value, value: &Value) -> bool {
    match (cell, value) {
        (serde_json::Value::Number(n), Value::Int(i)) => n.as_i64() == Some(*i),
        (serde_json::Value::String(s), Value::Int(i)) => s.trim().parse::<i64>().ok() == Some(*i),
        (serde_json::Value::String(s), Value::Text(t)) => s == t,
        (serde_json::Value::Number(n), Value::Text(t)) => n.to_string() == *t,
        (serde_json::Value::String(s), Value::Uuid(u)) => {
            uuid::Uuid::parse_str(s.trim()).ok() == Some(*u)
        }
        _ => false,
    }
}

/// Case-insensitive SQL `LIKE`: `%` is any run of characters, `_` exactly one.
fn like(text: &str, pattern: &str) -> bool {
    let mut expr = String::from("(?is)^");
    for c in pattern.chars() {
        match c {
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            c => expr.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');
    Regex::new(&expr).is_ok_and(|re| re.is_match(text))
}
