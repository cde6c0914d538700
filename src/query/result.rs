//! Query results and inserted row identifiers

use crate::value::Value;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;

/// Rows returned by a select, with `first()` / `last()` via `Deref`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryResult<T>(Vec<T>);

impl<T> QueryResult<T> {
    pub fn into_first(self) -> Option<T> {
        self.0.into_iter().next()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }
}

impl<T> From<Vec<T>> for QueryResult<T> {
    fn from(rows: Vec<T>) -> Self {
        Self(rows)
    }
}

impl<T> Deref for QueryResult<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.0
    }
}

impl<T> IntoIterator for QueryResult<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a QueryResult<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A rowid that remembers which table it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RowId {
    pub table: String,
    pub id: i64,
}

impl RowId {
    pub fn new(table: impl Into<String>, id: i64) -> Self {
        Self { table: table.into(), id }
    }
}

impl PartialEq<i64> for RowId {
    fn eq(&self, other: &i64) -> bool {
        self.id == *other
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl From<RowId> for Value {
    fn from(rowid: RowId) -> Self {
        Value::Integer(rowid.id)
    }
}

impl From<&RowId> for Value {
    fn from(rowid: &RowId) -> Self {
        Value::Integer(rowid.id)
    }
}
