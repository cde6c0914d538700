//! Views, virtual tables and the shallow SELECT model

use super::column::Column;
use super::constraint::TableConstraint;
use crate::identifier::{Identifier, TableName};
use crate::Result;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectMode {
    None,
    Distinct,
    All,
}

/// One `SELECT` core. Result columns and everything from `FROM` onwards
/// are kept as raw text; only the statement shape is validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimpleSelect {
    pub mode: SelectMode,
    pub columns: Vec<String>,
    /// `FROM ...` and any following clauses, verbatim.
    pub tail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompoundOperator {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl CompoundOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompoundOperator::Union => "UNION",
            CompoundOperator::UnionAll => "UNION ALL",
            CompoundOperator::Intersect => "INTERSECT",
            CompoundOperator::Except => "EXCEPT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum SelectStatement {
    Simple {
        select: SimpleSelect,
        raw: String,
    },
    /// `selects[0] operators[0] selects[1] operators[1] ...`
    Compound {
        selects: Vec<SimpleSelect>,
        operators: Vec<CompoundOperator>,
        raw: String,
    },
}

impl SelectStatement {
    pub fn parse(sql: &str) -> Result<Self> {
        crate::parser::parse_select(sql)
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, SelectStatement::Compound { .. })
    }

    pub fn raw(&self) -> &str {
        match self {
            SelectStatement::Simple { raw, .. } | SelectStatement::Compound { raw, .. } => raw,
        }
    }

    pub fn selects(&self) -> Vec<&SimpleSelect> {
        match self {
            SelectStatement::Simple { select, .. } => vec![select],
            SelectStatement::Compound { selects, .. } => selects.iter().collect(),
        }
    }
}

/// `CREATE VIEW`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub name: TableName,
    pub temporary: bool,
    pub if_not_exists: bool,
    pub column_names: Option<Vec<Identifier>>,
    pub select: SelectStatement,
    pub definition: String,
}

impl View {
    pub fn parse(sql: &str) -> Result<Self> {
        crate::parser::parse_view(sql)
    }

    pub fn name(&self) -> &str {
        self.name.name()
    }
}

/// `CREATE VIRTUAL TABLE name USING module(args)`
///
/// For modules with a dedicated parser (`fts4`) the argument list is
/// additionally broken down into columns, table constraints and
/// `key=value` options; for any other module those stay empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualTable {
    pub name: TableName,
    pub if_not_exists: bool,
    pub module: Identifier,
    /// Argument text without the surrounding parentheses.
    pub args: Option<String>,
    pub columns: IndexMap<String, Column>,
    pub tableconstraints: Vec<TableConstraint>,
    pub options: Vec<String>,
    pub definition: String,
}

impl VirtualTable {
    pub fn parse(sql: &str) -> Result<Self> {
        crate::parser::parse_virtual_table(sql)
    }

    pub fn name(&self) -> &str {
        self.name.name()
    }

    /// Module names with a specialised argument parser.
    pub fn is_registered_module(module: &str) -> bool {
        module.eq_ignore_ascii_case("fts4")
    }
}
