//! Column definitions

use super::Comment;
use super::constraint::{Constraint, ConstraintKind, ForeignKeyClause};
use crate::identifier::Identifier;
use crate::Result;
use serde::Serialize;
use std::fmt;

/// One column of a table definition.
///
/// Equality compares the rendered DDL, so two columns are equal when they
/// would be declared identically.
#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub name: Identifier,
    pub datatype: Option<String>,
    pub constraints: Vec<Constraint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
}

impl Column {
    pub fn new(name: impl Into<Identifier>, datatype: Option<&str>) -> Self {
        Self {
            name: name.into(),
            datatype: datatype.map(str::to_string),
            constraints: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Parse a single column definition such as `userid INTEGER PRIMARY KEY`.
    pub fn parse(definition: &str) -> Result<Self> {
        crate::parser::parse_column(definition)
    }

    pub fn with_constraint(mut self, kind: ConstraintKind) -> Self {
        self.constraints.push(Constraint::new(kind));
        self
    }

    pub fn name(&self) -> &str {
        self.name.name()
    }

    /// Column declared `PRIMARY KEY` at column level.
    pub fn is_primary_key(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c.kind, ConstraintKind::PrimaryKey { .. }))
    }

    /// Declared datatype is exactly `INTEGER` (ASCII case-insensitive).
    /// Synonyms such as `INT` do not qualify, matching the engine.
    pub fn is_integer_type(&self) -> bool {
        self.datatype
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("INTEGER"))
    }

    pub fn is_not_null(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c.kind, ConstraintKind::NotNull { .. }))
    }

    pub fn has_default(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c.kind, ConstraintKind::Default { .. }))
    }

    /// Column-level `REFERENCES` clauses.
    pub fn references(&self) -> Vec<&ForeignKeyClause> {
        self.constraints
            .iter()
            .filter_map(|c| match &c.kind {
                ConstraintKind::References { clause } => Some(clause),
                _ => None,
            })
            .collect()
    }

    /// Canonical DDL without comments.
    pub fn to_ddl(&self) -> String {
        let mut out = self.name.raw().to_string();
        if let Some(datatype) = &self.datatype {
            out.push(' ');
            out.push_str(datatype);
        }
        for constraint in &self.constraints {
            out.push(' ');
            out.push_str(&constraint.to_string());
        }
        out
    }

    /// DDL including trailing comments; ends with a newline when the last
    /// comment is a line comment.
    pub(crate) fn to_ddl_with_comments(&self) -> String {
        let mut out = self.to_ddl();
        for comment in &self.comments {
            out.push(' ');
            out.push_str(&comment.render());
        }
        out
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.to_ddl() == other.to_ddl()
    }
}

impl Eq for Column {}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ddl())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ddl() {
        let col = Column::parse("userid INTEGER PRIMARY KEY AUTOINCREMENT").unwrap();
        assert_eq!(col.name(), "userid");
        assert_eq!(col.datatype.as_deref(), Some("INTEGER"));
        assert!(col.is_primary_key());
        assert!(col.is_integer_type());
        assert_eq!(col.to_ddl(), "userid INTEGER PRIMARY KEY AUTOINCREMENT");
    }

    #[test]
    fn test_int_is_not_integer() {
        let col = Column::parse("id INT PRIMARY KEY").unwrap();
        assert!(!col.is_integer_type());
        let col = Column::parse("id integer").unwrap();
        assert!(col.is_integer_type());
    }

    #[test]
    fn test_column_equality_by_ddl() {
        let a = Column::parse("name   TEXT  NOT NULL").unwrap();
        let b = Column::parse("name TEXT NOT NULL /* comment */").unwrap();
        assert_eq!(a, b);
        let c = Column::parse("name TEXT").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_references() {
        let col = Column::parse("userid INT REFERENCES users(userid) ON DELETE CASCADE").unwrap();
        let refs = col.references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].table.name(), "users");
    }
}
