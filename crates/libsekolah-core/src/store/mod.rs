//! Relational store boundary: queries, change events, and the
//! `RelationalStore` trait the client core is written against.
//!
//! Rows travel as JSON objects. The store assigns `id` and `created_at`
//! on insert and fans every successful mutation out on a per-table
//! change channel.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::SekolahError;
use crate::types::{RecordId, Table};

pub mod local;
pub mod memory;

pub use local::SledBackend;
pub use memory::MemoryBackend;

/// A stored row as it travels across the boundary
pub type Row = serde_json::Map<String, Value>;

/// Capacity of each per-table change channel. Slow subscribers lag
/// rather than block writers.
pub const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Kind of row-level change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row-level change notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub table: Table,
    /// The row after the change (for deletes, the row as it was removed)
    pub row: Row,
}

/// Filter operator. `Like` supports `%` at either end of the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

/// A single column predicate; a query's filters combine with AND
#[derive(Debug, Clone)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: Value) -> Self {
        Self {
            column: column.into(),
            op,
            value,
        }
    }

    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    /// Equality filter on the id column
    pub fn by_id(id: RecordId) -> Self {
        Self::eq("id", Value::String(id.to_string()))
    }

    fn matches(&self, row: &Row) -> bool {
        let actual = row.get(&self.column).unwrap_or(&Value::Null);
        match self.op {
            FilterOp::Eq => compare_values(actual, &self.value) == Ordering::Equal,
            FilterOp::Neq => compare_values(actual, &self.value) != Ordering::Equal,
            FilterOp::Gt => compare_values(actual, &self.value) == Ordering::Greater,
            FilterOp::Gte => compare_values(actual, &self.value) != Ordering::Less,
            FilterOp::Lt => compare_values(actual, &self.value) == Ordering::Less,
            FilterOp::Lte => compare_values(actual, &self.value) != Ordering::Greater,
            FilterOp::Like => like_matches(actual, &self.value),
        }
    }
}

/// Single-column ordering
#[derive(Debug, Clone)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Query options for `select`: optional ordering plus an AND-list of
/// filters
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub order: Option<Order>,
    pub filters: Vec<Filter>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// The relational store boundary. Implementations assign `id` and
/// `created_at` on insert (keeping a caller-supplied id, as profile
/// rows require) and emit a change event after every successful
/// mutation.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, SekolahError>;

    async fn insert(&self, table: Table, row: Row) -> Result<Row, SekolahError>;

    async fn update(&self, table: Table, id: RecordId, patch: Row) -> Result<Row, SekolahError>;

    async fn delete(&self, table: Table, id: RecordId) -> Result<(), SekolahError>;

    /// Subscribe to row-level changes for one table, all event kinds
    fn subscribe(&self, table: Table) -> broadcast::Receiver<ChangeEvent>;
}

/// Serialize a record into a row, rejecting non-object values
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, SekolahError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(SekolahError::InvalidArgs(format!(
            "a row must serialize to a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Deserialize a row into a record
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, SekolahError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// Extract the id column of a row, if present and well-formed
pub fn row_id(row: &Row) -> Option<RecordId> {
    row.get("id")
        .and_then(Value::as_str)
        .and_then(|s| RecordId::parse(s).ok())
}

/// Timestamp string for server-assigned `created_at` columns. Fixed
/// precision so lexicographic and chronological order agree.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Apply filters and ordering to a fetched row set
pub fn apply_query(mut rows: Vec<Row>, query: &Query) -> Vec<Row> {
    if !query.filters.is_empty() {
        rows.retain(|row| query.filters.iter().all(|f| f.matches(row)));
    }
    if let Some(order) = &query.order {
        rows.sort_by(|a, b| {
            let lhs = a.get(&order.column).unwrap_or(&Value::Null);
            let rhs = b.get(&order.column).unwrap_or(&Value::Null);
            let cmp = compare_values(lhs, rhs);
            if order.ascending {
                cmp
            } else {
                cmp.reverse()
            }
        });
    }
    rows
}

/// Total order over JSON values: numbers numerically, strings
/// lexicographically (chronologically when both parse as RFC 3339),
/// mixed types by type rank.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
            (Some(tx), Some(ty)) => tx.cmp(&ty),
            _ => x.cmp(y),
        },
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn like_matches(actual: &Value, pattern: &Value) -> bool {
    let (Some(actual), Some(pattern)) = (actual.as_str(), pattern.as_str()) else {
        return false;
    };
    let leading = pattern.starts_with('%');
    let trailing = pattern.ends_with('%') && pattern.len() > 1;
    let needle = pattern.trim_matches('%');
    match (leading, trailing) {
        (true, true) => actual.contains(needle),
        (true, false) => actual.ends_with(needle),
        (false, true) => actual.starts_with(needle),
        (false, false) => actual == needle,
    }
}
