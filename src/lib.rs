//! # Rowgraph - object layer over embedded SQLite
//!
//! Rowgraph provides:
//! - A parser for `CREATE TABLE`, `CREATE VIEW` and `CREATE VIRTUAL TABLE`
//! - A typed schema model (tables, columns, constraints) that renders back to DDL
//! - Typed CRUD over single tables with a `column__op` filter mini-language
//! - Row objects that resolve foreign keys on demand
//! - Per-table schema versioning with forward and rollback scripts
//! - A graph overlay storing labelled edges between arbitrary rows

pub mod identifier;
pub mod schema;
pub mod parser;
pub mod value;
pub mod connection;
pub mod query;
pub mod row;
pub mod version;
pub mod graph;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use identifier::{Identifier, MultipartIdentifier, TableName};
pub use schema::{Column, Table, TableConstructor, View, VirtualTable};
pub use value::{Row, Value};
pub use connection::{Connection, Record, RowShape};
pub use query::{AdvancedTable, Filter, QueryResult, RowId, col};
pub use row::{Field, RowObject};
pub use version::{DotVersion, VersionedConnection};
pub use graph::{Edge, GraphConnection, NodeRef};

/// Result type alias for Rowgraph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Rowgraph operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error: {message} (near `{near}`)")]
    Parse { message: String, near: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Version error: {0}")]
    Version(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Build a parse error quoting at most the first 40 characters of the
    /// text where parsing stopped.
    pub(crate) fn parse(message: impl Into<String>, near: &str) -> Self {
        let near = near.trim_start();
        let near = match near.char_indices().nth(40) {
            Some((i, _)) => &near[..i],
            None => near,
        };
        Error::Parse { message: message.into(), near: near.to_string() }
    }

    /// True when this is the engine's "no such table" or "no such view"
    /// failure.
    pub fn is_no_such_object(&self) -> bool {
        match self {
            Error::Storage(err) => {
                let message = err.to_string();
                message.contains("no such table") || message.contains("no such view")
            }
            _ => false,
        }
    }
}
