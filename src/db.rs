use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::store::{Filter, Query, RecordStore, Row, Value};

/// `RecordStore` over the hosted Postgres database.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;
        Ok(Self { pool })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Bind {
    Int(i64),
    Text(String),
    Ints(Vec<i64>),
    Texts(Vec<String>),
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Renders `query` as one statement returning each row as a JSON object.
fn render(query: &Query) -> Result<(String, Vec<Bind>), StoreError> {
    let columns = if query.columns.is_empty() {
        "*".to_string()
    } else {
        query
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut sql = format!("SELECT {columns} FROM {}", quote_ident(&query.table));
    let mut binds = Vec::new();
    let mut clauses = Vec::new();

    for filter in &query.filters {
        let column = quote_ident(filter.column());
        let clause = match filter {
            Filter::Eq { value, .. } => match value {
                Value::Int(v) => {
                    binds.push(Bind::Int(*v));
                    format!("{column} = ${}", binds.len())
                }
                Value::Text(v) => {
                    binds.push(Bind::Text(v.clone()));
                    format!("{column}::text = ${}", binds.len())
                }
                Value::Uuid(v) => {
                    binds.push(Bind::Text(v.to_string()));
                    format!("{column}::text = ${}", binds.len())
                }
            },
            Filter::ILike { pattern, .. } => {
                binds.push(Bind::Text(pattern.clone()));
                format!("{column}::text ILIKE ${}", binds.len())
            }
            Filter::In { values, .. } if values.is_empty() => "FALSE".to_string(),
            Filter::In { column: name, values } => match list_bind(name, values)? {
                bind @ Bind::Ints(_) => {
                    binds.push(bind);
                    format!("{column} = ANY(${})", binds.len())
                }
                bind => {
                    binds.push(bind);
                    format!("{column}::text = ANY(${})", binds.len())
                }
            },
        };
        clauses.push(clause);
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    Ok((format!("SELECT row_to_json(t) AS row FROM ({sql}) AS t"), binds))
}

fn list_bind(column: &str, values: &[Value]) -> Result<Bind, StoreError> {
    if values.iter().all(|v| matches!(v, Value::Int(_))) {
        let ints = values
            .iter()
            .filter_map(|v| match v {
                Value::Int(i) => Some(*i),
                _ => None,
            })
            .collect();
        return Ok(Bind::Ints(ints));
    }

    let mut texts = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Text(t) => texts.push(t.clone()),
            Value::Uuid(u) => texts.push(u.to_string()),
            Value::Int(_) => {
                return Err(StoreError::Query(format!(
                    "mixed integer and text values in list filter on {column}"
                )))
            }
        }
    }
    Ok(Bind::Texts(texts))
}

fn backend_error(table: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        // undefined_table
        if db.code().as_deref() == Some("42P01") {
            return StoreError::UnknownTable(table.to_string());
        }
    }
    err.into()
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let (sql, binds) = render(query)?;
        tracing::debug!(table = %query.table, %sql, "record store read");

        let mut statement = sqlx::query_scalar::<sqlx::Postgres, serde_json::Value>(&sql);
        for bind in binds {
            statement = match bind {
                Bind::Int(v) => statement.bind(v),
                Bind::Text(v) => statement.bind(v),
                Bind::Ints(v) => statement.bind(v),
                Bind::Texts(v) => statement.bind(v),
            };
        }

        let values = statement
            .fetch_all(&self.pool)
            .await
            .map_err(|err| backend_error(&query.table, err))?;

        values.into_iter().map(Row::from_json).collect()
    }
}
