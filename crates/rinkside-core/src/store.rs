//! Relational store abstraction.
//!
//! The relational collaborator executes parameterized queries and returns
//! rows as ordered field maps. Values are carried as `serde_json::Value`
//! so the seam stays database-agnostic; UUIDs and timestamps travel as
//! their canonical string forms.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreError;

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// UUID parameter.
    Uuid(Uuid),
    /// Text parameter.
    Text(String),
    /// 64-bit integer parameter.
    Int(i64),
    /// Double-precision float parameter.
    Float(f64),
    /// Boolean parameter.
    Bool(bool),
    /// Timestamp-with-timezone parameter.
    Timestamp(DateTime<Utc>),
    /// JSONB parameter.
    Json(serde_json::Value),
    /// Nullable text parameter.
    NullableText(Option<String>),
}

/// A result row: field names in select order, values as JSON.
#[derive(Debug, Clone, Default)]
pub struct SqlRow {
    fields: Vec<(String, serde_json::Value)>,
}

impl SqlRow {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field in select order.
    pub fn push(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.fields.push((name.into(), value));
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterates fields in select order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    fn required(&self, name: &str) -> Result<&serde_json::Value, CoreError> {
        self.get(name)
            .ok_or_else(|| CoreError::Internal(format!("missing column in result row: {name}")))
    }

    /// Decodes a UUID column.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Internal` if the column is absent or not a UUID.
    pub fn uuid(&self, name: &str) -> Result<Uuid, CoreError> {
        let value = self.required(name)?;
        value
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| CoreError::Internal(format!("column {name} is not a UUID: {value}")))
    }

    /// Decodes a text column.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Internal` if the column is absent or not text.
    pub fn text(&self, name: &str) -> Result<String, CoreError> {
        let value = self.required(name)?;
        value
            .as_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| CoreError::Internal(format!("column {name} is not text: {value}")))
    }

    /// Decodes an optional text column; SQL NULL becomes `None`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Internal` if the column is absent.
    pub fn opt_text(&self, name: &str) -> Result<Option<String>, CoreError> {
        let value = self.required(name)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_str()
            .map(|s| Some(s.to_owned()))
            .ok_or_else(|| CoreError::Internal(format!("column {name} is not text: {value}")))
    }

    /// Decodes an integer column.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Internal` if the column is absent or not an integer.
    pub fn int(&self, name: &str) -> Result<i64, CoreError> {
        let value = self.required(name)?;
        value
            .as_i64()
            .ok_or_else(|| CoreError::Internal(format!("column {name} is not an integer: {value}")))
    }

    /// Decodes a timestamp column carried as an RFC 3339 string.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Internal` if the column is absent or unparseable.
    pub fn timestamp(&self, name: &str) -> Result<DateTime<Utc>, CoreError> {
        let raw = self.text(name)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| CoreError::Internal(format!("column {name} is not a timestamp: {e}")))
    }
}

impl FromIterator<(String, serde_json::Value)> for SqlRow {
    fn from_iter<T: IntoIterator<Item = (String, serde_json::Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Parameterized query execution against the relational collaborator.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Runs a query and returns all result rows.
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>, CoreError>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, CoreError>;

    /// Opens a transaction.
    async fn begin(&self) -> Result<Box<dyn RelationalTransaction>, CoreError>;
}

/// An open relational transaction. Dropping without `commit` rolls back.
#[async_trait]
pub trait RelationalTransaction: Send {
    /// Runs a query inside the transaction.
    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>, CoreError>;

    /// Runs a statement inside the transaction.
    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, CoreError>;

    /// Commits the transaction.
    async fn commit(self: Box<Self>) -> Result<(), CoreError>;

    /// Rolls the transaction back.
    async fn rollback(self: Box<Self>) -> Result<(), CoreError>;
}
