use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Map;
use uuid::Uuid;

use crate::dates;
use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Text(String),
    Uuid(Uuid),
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Uuid(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },
    ILike { column: String, pattern: String },
    /// An empty list matches nothing.
    In { column: String, values: Vec<Value> },
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq { column, .. } | Filter::ILike { column, .. } | Filter::In { column, .. } => {
                column
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(table: &str, columns: &[&str]) -> Self {
        Query {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn ilike(mut self, column: &str, pattern: impl Into<String>) -> Self {
        self.filters.push(Filter::ILike {
            column: column.to_string(),
            pattern: pattern.into(),
        });
        self
    }

    pub fn in_list(mut self, column: &str, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In {
            column: column.to_string(),
            values,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One row as returned by the store: column name to JSON value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(Map<String, serde_json::Value>);

impl Row {
    pub fn from_json(value: serde_json::Value) -> Result<Self, StoreError> {
        match value {
            serde_json::Value::Object(columns) => Ok(Row(columns)),
            other => Err(StoreError::Backend(format!(
                "expected a JSON object per row, got {other}"
            ))),
        }
    }

    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.0.get(column).filter(|value| !value.is_null())
    }

    /// Text content of a column; blank strings read as absent.
    pub fn text(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            serde_json::Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn int(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn uuid(&self, column: &str) -> Option<Uuid> {
        self.get(column)?
            .as_str()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
    }

    pub fn timestamp(&self, column: &str) -> Option<NaiveDateTime> {
        self.get(column)?.as_str().and_then(dates::parse_timestamp)
    }

    pub fn project(&self, columns: &[String]) -> Row {
        Row(columns
            .iter()
            .filter_map(|c| self.0.get(c).map(|v| (c.clone(), v.clone())))
            .collect())
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        Row::from_json(value).unwrap()
    }

    #[test]
    fn text_treats_blank_and_null_as_absent() {
        let r = row(json!({"a": "  ", "b": null, "c": " Approved ", "d": 42}));
        assert_eq!(r.text("a"), None);
        assert_eq!(r.text("b"), None);
        assert_eq!(r.text("c").as_deref(), Some("Approved"));
        assert_eq!(r.text("d").as_deref(), Some("42"));
        assert_eq!(r.text("missing"), None);
    }

    #[test]
    fn int_accepts_numbers_and_numeric_strings() {
        let r = row(json!({"a": 77, "b": "78", "c": "seventy"}));
        assert_eq!(r.int("a"), Some(77));
        assert_eq!(r.int("b"), Some(78));
        assert_eq!(r.int("c"), None);
    }

    #[test]
    fn non_object_rows_are_rejected() {
        assert!(matches!(
            Row::from_json(json!([1, 2])),
            Err(StoreError::Backend(_))
        ));
    }

    #[test]
    fn builder_collects_filters_in_order() {
        let q = Query::new("form1112master", &["IRN", "DisplayIRN"])
            .ilike("DisplayIRN", "%crn%")
            .eq("IRN", 7_i64)
            .limit(1);
        assert_eq!(q.columns, vec!["IRN", "DisplayIRN"]);
        assert_eq!(q.filters[0].column(), "DisplayIRN");
        assert_eq!(q.filters[1], Filter::Eq { column: "IRN".into(), value: Value::Int(7) });
        assert_eq!(q.limit, Some(1));
    }
}
