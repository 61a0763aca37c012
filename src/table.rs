//! Column-oriented result tables shared by every pipeline stage.
//!
//! A [`Table`] is a list of named columns plus row-major cells. It is the
//! only shape the join engine, the aggregator and the HTTP views exchange,
//! so operations on it report unknown columns as
//! [`PipelineError::UnknownColumn`] instead of panicking.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::PipelineError;

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    List(Vec<Value>),
    /// Nested object carried through without interpretation.
    Json(serde_json::Value),
}

impl Value {
    /// Convert a raw document value into a cell.
    ///
    /// Arrays become [`Value::List`] so multi-valued columns stay inspectable;
    /// objects are kept opaque.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            obj @ serde_json::Value::Object(_) => Value::Json(obj),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::Timestamp(_) => 2,
            Value::Text(_) => 3,
            Value::List(_) => 4,
            Value::Json(_) => 5,
            Value::Null => 6,
        }
    }

    /// Total order used for sorting: nulls last, mixed types grouped by kind.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (a, b) if a.rank() == 1 && b.rank() == 1 => {
                let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Timestamp(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            Value::List(items) => items.serialize(serializer),
            Value::Json(v) => v.serialize(serializer),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items.into_iter().map(Value::Text).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Named columns over row-major cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with nulls, long rows truncated.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Like [`Table::column_index`], but a missing column is an error.
    pub fn require_column(&self, name: &str) -> Result<usize, PipelineError> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::UnknownColumn {
                column: name.to_string(),
                available: self.columns.join(", "),
            })
    }

    /// Cell at (`row`, `column`), if both exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All cells of one column, top to bottom.
    pub fn column_values(&self, column: &str) -> Result<Vec<&Value>, PipelineError> {
        let idx = self.require_column(column)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Project onto exactly `columns`, in the given order.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Table, PipelineError> {
        let indices = columns
            .iter()
            .map(|c| self.require_column(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Table {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Rows whose `column` equals `value`, order preserved.
    pub fn filter_eq(&self, column: &str, value: &Value) -> Result<Table, PipelineError> {
        let idx = self.require_column(column)?;
        Ok(Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| &row[idx] == value)
                .cloned()
                .collect(),
        })
    }

    /// Stable ascending sort on one column.
    pub fn sort_by_column(&mut self, column: &str) -> Result<(), PipelineError> {
        let idx = self.require_column(column)?;
        self.rows.sort_by(|a, b| a[idx].sort_cmp(&b[idx]));
        Ok(())
    }

    /// Append a column holding each row's current position.
    pub fn with_row_index(mut self, name: &str) -> Self {
        self.columns.push(name.to_string());
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.push(Value::Int(i as i64));
        }
        self
    }

    /// Distinct text values of a column in first-seen order.
    pub fn distinct_text(&self, column: &str) -> Result<Vec<String>, PipelineError> {
        let idx = self.require_column(column)?;
        let mut seen = HashSet::new();
        Ok(self
            .rows
            .iter()
            .filter_map(|row| row[idx].as_str())
            .filter(|s| seen.insert(*s))
            .map(str::to_string)
            .collect())
    }

    /// Column names in lexical order (the search view's column picker).
    pub fn sorted_columns(&self) -> Vec<String> {
        let mut cols = self.columns.clone();
        cols.sort();
        cols
    }
}
