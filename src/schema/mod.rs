//! Schema model - tables, views and virtual tables
//!
//! Schema objects are produced by the parser and never mutated afterwards.
//! `TableConstructor` is the one mutable builder; it renders DDL and reparses
//! it to produce a `Table`.

pub mod column;
pub mod constraint;
pub mod table;
pub mod view;

pub use column::Column;
pub use constraint::{
    Collation, ConflictClause, Constraint, ConstraintKind, ConstraintRef, DefaultValue, FkAction,
    ForeignKeyClause, IndexedColumn, SortOrder, TableConstraint, TableConstraintKind,
};
pub use table::{ColumnSource, ForeignRef, Table, TableConstructor};
pub use view::{CompoundOperator, SelectMode, SelectStatement, SimpleSelect, View, VirtualTable};

use serde::Serialize;

/// A comment captured verbatim from DDL, markers included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Comment {
    /// `-- ...` up to (not including) the newline
    Line(String),
    /// `/* ... */`
    Multiline(String),
}

impl Comment {
    pub fn text(&self) -> &str {
        match self {
            Comment::Line(s) | Comment::Multiline(s) => s,
        }
    }

    /// Text safe to splice back into DDL.
    pub(crate) fn render(&self) -> String {
        match self {
            Comment::Line(s) => format!("{}\n", s),
            Comment::Multiline(s) => s.clone(),
        }
    }
}

/// Any statement the DDL parser understands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    Table(Table),
    View(View),
    VirtualTable(VirtualTable),
}

impl Statement {
    pub fn name(&self) -> &str {
        match self {
            Statement::Table(t) => t.name(),
            Statement::View(v) => v.name.name(),
            Statement::VirtualTable(v) => v.name.name(),
        }
    }
}
