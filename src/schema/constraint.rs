//! Column and table constraints
//!
//! Every type here renders back to canonical DDL through `Display`, which is
//! what table equality and `TableConstructor::to_table` rely on.

use crate::identifier::Identifier;
use serde::Serialize;
use std::fmt;

/// `ON CONFLICT` resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConflictClause {
    Rollback,
    Abort,
    Fail,
    Ignore,
    Replace,
}

impl ConflictClause {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictClause::Rollback => "ROLLBACK",
            ConflictClause::Abort => "ABORT",
            ConflictClause::Fail => "FAIL",
            ConflictClause::Ignore => "IGNORE",
            ConflictClause::Replace => "REPLACE",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ROLLBACK" => Some(ConflictClause::Rollback),
            "ABORT" => Some(ConflictClause::Abort),
            "FAIL" => Some(ConflictClause::Fail),
            "IGNORE" => Some(ConflictClause::Ignore),
            "REPLACE" => Some(ConflictClause::Replace),
            _ => None,
        }
    }
}

impl fmt::Display for ConflictClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ON CONFLICT {}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Built-in collating sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Collation {
    Binary,
    NoCase,
    RTrim,
}

impl Collation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collation::Binary => "BINARY",
            Collation::NoCase => "NOCASE",
            Collation::RTrim => "RTRIM",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BINARY" => Some(Collation::Binary),
            "NOCASE" => Some(Collation::NoCase),
            "RTRIM" => Some(Collation::RTrim),
            _ => None,
        }
    }
}

/// Foreign key `ON DELETE` / `ON UPDATE` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FkAction {
    SetNull,
    SetDefault,
    Cascade,
    Restrict,
    NoAction,
}

impl FkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FkAction::SetNull => "SET NULL",
            FkAction::SetDefault => "SET DEFAULT",
            FkAction::Cascade => "CASCADE",
            FkAction::Restrict => "RESTRICT",
            FkAction::NoAction => "NO ACTION",
        }
    }

    /// Accepts the keyword phrase with any internal whitespace.
    pub fn from_phrase(s: &str) -> Option<Self> {
        let words: Vec<String> = s.split_whitespace().map(|w| w.to_ascii_uppercase()).collect();
        match words.join(" ").as_str() {
            "SET NULL" => Some(FkAction::SetNull),
            "SET DEFAULT" => Some(FkAction::SetDefault),
            "CASCADE" => Some(FkAction::Cascade),
            "RESTRICT" => Some(FkAction::Restrict),
            "NO ACTION" => Some(FkAction::NoAction),
            _ => None,
        }
    }
}

/// `REFERENCES tbl(cols) [ON DELETE ..] [ON UPDATE ..] [deferrable]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ForeignKeyClause {
    pub table: Identifier,
    pub columns: Vec<Identifier>,
    pub on_delete: Option<FkAction>,
    pub on_update: Option<FkAction>,
    /// `Some(true)` for `DEFERRABLE INITIALLY DEFERRED`, `Some(false)` for
    /// `NOT DEFERRABLE` or `INITIALLY IMMEDIATE`, `None` when absent.
    pub deferred: Option<bool>,
}

impl ForeignKeyClause {
    pub fn new(table: impl Into<Identifier>, columns: Vec<Identifier>) -> Self {
        Self { table: table.into(), columns, on_delete: None, on_update: None, deferred: None }
    }
}

impl fmt::Display for ForeignKeyClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REFERENCES {}", self.table)?;
        if !self.columns.is_empty() {
            write!(f, "({})", join(&self.columns))?;
        }
        if let Some(action) = self.on_delete {
            write!(f, " ON DELETE {}", action.as_str())?;
        }
        if let Some(action) = self.on_update {
            write!(f, " ON UPDATE {}", action.as_str())?;
        }
        match self.deferred {
            Some(true) => write!(f, " DEFERRABLE INITIALLY DEFERRED"),
            Some(false) => write!(f, " NOT DEFERRABLE"),
            None => Ok(()),
        }
    }
}

/// Value of a `DEFAULT` clause, kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum DefaultValue {
    /// String or blob literal, quotes included.
    Literal(String),
    /// Signed numeric literal.
    Number(String),
    /// `NULL`, `TRUE`, `FALSE`, `CURRENT_DATE`, `CURRENT_TIME`, `CURRENT_TIMESTAMP`
    Constant(String),
    Identifier(Identifier),
    /// Parenthesized expression, parentheses included.
    Expression(String),
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(s)
            | DefaultValue::Number(s)
            | DefaultValue::Constant(s)
            | DefaultValue::Expression(s) => f.write_str(s),
            DefaultValue::Identifier(ident) => write!(f, "{}", ident),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey {
        order: Option<SortOrder>,
        conflict: Option<ConflictClause>,
        autoincrement: bool,
    },
    NotNull {
        conflict: Option<ConflictClause>,
    },
    Unique {
        conflict: Option<ConflictClause>,
    },
    /// Expression with its surrounding parentheses.
    Check { expression: String },
    Default { value: DefaultValue },
    Collate { collation: Collation },
    References { clause: ForeignKeyClause },
}

/// A column-level constraint, optionally named with `CONSTRAINT name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Constraint {
    pub name: Option<Identifier>,
    #[serde(flatten)]
    pub kind: ConstraintKind,
}

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Self {
        Self { name: None, kind }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "CONSTRAINT {} ", name)?;
        }
        match &self.kind {
            ConstraintKind::PrimaryKey { order, conflict, autoincrement } => {
                f.write_str("PRIMARY KEY")?;
                if let Some(order) = order {
                    write!(f, " {}", order.as_str())?;
                }
                if let Some(conflict) = conflict {
                    write!(f, " {}", conflict)?;
                }
                if *autoincrement {
                    f.write_str(" AUTOINCREMENT")?;
                }
                Ok(())
            }
            ConstraintKind::NotNull { conflict } => {
                f.write_str("NOT NULL")?;
                write_conflict(f, conflict)
            }
            ConstraintKind::Unique { conflict } => {
                f.write_str("UNIQUE")?;
                write_conflict(f, conflict)
            }
            ConstraintKind::Check { expression } => write!(f, "CHECK {}", expression),
            ConstraintKind::Default { value } => write!(f, "DEFAULT {}", value),
            ConstraintKind::Collate { collation } => write!(f, "COLLATE {}", collation.as_str()),
            ConstraintKind::References { clause } => write!(f, "{}", clause),
        }
    }
}

/// A column named in a table-level `PRIMARY KEY(..)` or `UNIQUE(..)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IndexedColumn {
    pub name: Identifier,
    pub collation: Option<Collation>,
    pub order: Option<SortOrder>,
}

impl IndexedColumn {
    pub fn new(name: impl Into<Identifier>) -> Self {
        Self { name: name.into(), collation: None, order: None }
    }
}

impl fmt::Display for IndexedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(collation) = self.collation {
            write!(f, " COLLATE {}", collation.as_str())?;
        }
        if let Some(order) = self.order {
            write!(f, " {}", order.as_str())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableConstraintKind {
    PrimaryKey {
        columns: Vec<IndexedColumn>,
        conflict: Option<ConflictClause>,
    },
    Unique {
        columns: Vec<IndexedColumn>,
        conflict: Option<ConflictClause>,
    },
    Check { expression: String },
    ForeignKey {
        columns: Vec<Identifier>,
        clause: ForeignKeyClause,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TableConstraint {
    pub name: Option<Identifier>,
    #[serde(flatten)]
    pub kind: TableConstraintKind,
}

impl TableConstraint {
    pub fn new(kind: TableConstraintKind) -> Self {
        Self { name: None, kind }
    }

    pub fn parse(definition: &str) -> crate::Result<Self> {
        crate::parser::parse_table_constraint(definition)
    }

    /// Columns this constraint covers, in declaration order.
    pub fn columns(&self) -> Vec<&Identifier> {
        match &self.kind {
            TableConstraintKind::PrimaryKey { columns, .. }
            | TableConstraintKind::Unique { columns, .. } => columns.iter().map(|c| &c.name).collect(),
            TableConstraintKind::ForeignKey { columns, .. } => columns.iter().collect(),
            TableConstraintKind::Check { .. } => Vec::new(),
        }
    }

    /// Position of `column` within this constraint's column list.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns().iter().position(|c| c.matches(column))
    }

    pub fn involves(&self, column: &str) -> bool {
        self.position(column).is_some()
    }
}

impl fmt::Display for TableConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "CONSTRAINT {} ", name)?;
        }
        match &self.kind {
            TableConstraintKind::PrimaryKey { columns, conflict } => {
                write!(f, "PRIMARY KEY ({})", join(columns))?;
                write_conflict(f, conflict)
            }
            TableConstraintKind::Unique { columns, conflict } => {
                write!(f, "UNIQUE ({})", join(columns))?;
                write_conflict(f, conflict)
            }
            TableConstraintKind::Check { expression } => write!(f, "CHECK {}", expression),
            TableConstraintKind::ForeignKey { columns, clause } => {
                write!(f, "FOREIGN KEY ({}) {}", join(columns), clause)
            }
        }
    }
}

/// Either kind of constraint that applies to one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintRef<'a> {
    Column(&'a Constraint),
    Table(&'a TableConstraint),
}

fn write_conflict(f: &mut fmt::Formatter<'_>, conflict: &Option<ConflictClause>) -> fmt::Result {
    match conflict {
        Some(conflict) => write!(f, " {}", conflict),
        None => Ok(()),
    }
}

pub(crate) fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_column_constraints() {
        let pk = Constraint::new(ConstraintKind::PrimaryKey {
            order: Some(SortOrder::Desc),
            conflict: Some(ConflictClause::Replace),
            autoincrement: true,
        });
        assert_eq!(pk.to_string(), "PRIMARY KEY DESC ON CONFLICT REPLACE AUTOINCREMENT");

        let mut named = Constraint::new(ConstraintKind::NotNull { conflict: None });
        named.name = Some(Identifier::new("nn"));
        assert_eq!(named.to_string(), "CONSTRAINT nn NOT NULL");
    }

    #[test]
    fn test_render_foreign_key() {
        let mut clause = ForeignKeyClause::new("users", vec![Identifier::new("userid")]);
        clause.on_delete = Some(FkAction::Cascade);
        clause.deferred = Some(true);
        assert_eq!(
            clause.to_string(),
            "REFERENCES users(userid) ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED"
        );
    }

    #[test]
    fn test_table_constraint_positions() {
        let tc = TableConstraint::new(TableConstraintKind::ForeignKey {
            columns: vec![Identifier::new("a"), Identifier::new("b")],
            clause: ForeignKeyClause::new("other", vec![Identifier::new("x"), Identifier::new("y")]),
        });
        assert_eq!(tc.position("b"), Some(1));
        assert!(!tc.involves("c"));
        assert_eq!(tc.to_string(), "FOREIGN KEY (a, b) REFERENCES other(x, y)");
    }

    #[test]
    fn test_fk_action_phrase() {
        assert_eq!(FkAction::from_phrase("set   null"), Some(FkAction::SetNull));
        assert_eq!(FkAction::from_phrase("NO ACTION"), Some(FkAction::NoAction));
        assert_eq!(FkAction::from_phrase("explode"), None);
    }
}
