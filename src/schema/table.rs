//! Tables and the table builder

use super::Comment;
use super::column::Column;
use super::constraint::{ConstraintRef, ForeignKeyClause, TableConstraint, TableConstraintKind};
use super::view::SelectStatement;
use crate::identifier::{Identifier, TableName};
use crate::value::Row;
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::Serialize;

/// An immutable table definition, usually parsed from `sqlite_master`.
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub(crate) name: TableName,
    pub(crate) temporary: bool,
    pub(crate) if_not_exists: bool,
    pub(crate) without_rowid: bool,
    pub(crate) strict: bool,
    pub(crate) columns: IndexMap<String, Column>,
    pub(crate) tableconstraints: Vec<TableConstraint>,
    pub(crate) comments: Vec<Comment>,
    /// Set for `CREATE TABLE .. AS SELECT ..`
    pub(crate) select: Option<SelectStatement>,
    pub(crate) definition: String,
}

/// Target of a foreign key as seen from one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForeignRef<'a> {
    pub table: &'a Identifier,
    /// `None` when the clause names no columns, meaning the referenced
    /// table's primary key.
    pub column: Option<&'a Identifier>,
    pub clause: &'a ForeignKeyClause,
}

impl Table {
    /// Parse a `CREATE TABLE` statement.
    pub fn parse(sql: &str) -> Result<Self> {
        crate::parser::parse_table(sql)
    }

    /// Unquoted table name without schema.
    pub fn name(&self) -> &str {
        self.name.name()
    }

    pub fn table_name(&self) -> &TableName {
        &self.name
    }

    /// Raw name, schema-qualified when a schema is present.
    pub fn fullname(&self) -> String {
        self.name.fullname()
    }

    pub fn temporary(&self) -> bool {
        self.temporary
    }

    pub fn if_not_exists(&self) -> bool {
        self.if_not_exists
    }

    pub fn without_rowid(&self) -> bool {
        self.without_rowid
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn columns(&self) -> &IndexMap<String, Column> {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Look a column up by name, falling back to a case-insensitive match.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .get(name)
            .or_else(|| self.columns.values().find(|c| c.name.matches(name)))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn tableconstraints(&self) -> &[TableConstraint] {
        &self.tableconstraints
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn select(&self) -> Option<&SelectStatement> {
        self.select.as_ref()
    }

    /// The DDL this table was parsed from.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Column constraints plus every table constraint covering the column.
    pub fn allconstraints(&self, column: &str) -> Vec<ConstraintRef<'_>> {
        let Some(col) = self.column(column) else {
            return Vec::new();
        };
        let mut all: Vec<ConstraintRef<'_>> =
            col.constraints.iter().map(ConstraintRef::Column).collect();
        all.extend(
            self.tableconstraints
                .iter()
                .filter(|tc| tc.involves(col.name()))
                .map(ConstraintRef::Table),
        );
        all
    }

    /// A column aliases the rowid when it is the sole primary key column and
    /// its declared type is exactly `INTEGER`.
    pub fn is_rowid_alias(&self, column: &str) -> bool {
        let Some(col) = self.column(column) else {
            return false;
        };
        if self.without_rowid || !col.is_integer_type() {
            return false;
        }
        col.is_primary_key()
            || self.tableconstraints.iter().any(|tc| match &tc.kind {
                TableConstraintKind::PrimaryKey { columns, .. } => {
                    columns.len() == 1 && columns[0].name.matches(col.name())
                }
                _ => false,
            })
    }

    /// Name of the column holding the row identifier: the rowid alias when
    /// one exists, otherwise `"rowid"`. `None` for `WITHOUT ROWID` tables.
    pub fn rowid(&self) -> Option<String> {
        if self.without_rowid {
            return None;
        }
        let alias = self
            .columns
            .keys()
            .find(|name| self.is_rowid_alias(name))
            .cloned();
        Some(alias.unwrap_or_else(|| "rowid".to_string()))
    }

    /// The foreign key covering `column`, if any.
    pub fn foreign_key(&self, column: &str) -> Option<ForeignRef<'_>> {
        let col = self.column(column)?;
        if let Some(clause) = col.references().into_iter().next() {
            return Some(ForeignRef {
                table: &clause.table,
                column: clause.columns.first(),
                clause,
            });
        }
        self.tableconstraints.iter().find_map(|tc| match &tc.kind {
            TableConstraintKind::ForeignKey { columns, clause } => {
                let idx = columns.iter().position(|c| c.matches(col.name()))?;
                Some(ForeignRef { table: &clause.table, column: clause.columns.get(idx), clause })
            }
            _ => None,
        })
    }

    /// Columns that must be supplied on insert: `NOT NULL` without a
    /// default, excluding the rowid alias.
    pub fn required_columns(&self) -> Vec<&str> {
        self.columns
            .values()
            .filter(|c| c.is_not_null() && !c.has_default() && !self.is_rowid_alias(c.name()))
            .map(Column::name)
            .collect()
    }

    pub fn to_constructor(&self) -> TableConstructor {
        TableConstructor {
            name: self.name.clone(),
            temporary: self.temporary,
            if_not_exists: self.if_not_exists,
            without_rowid: self.without_rowid,
            strict: self.strict,
            columns: self.columns.clone(),
            tableconstraints: self.tableconstraints.clone(),
            comments: self.comments.clone(),
        }
    }

    fn sorted_constraints(&self) -> Vec<String> {
        let mut rendered: Vec<String> = self.tableconstraints.iter().map(|c| c.to_string()).collect();
        rendered.sort();
        rendered
    }
}

/// Tables compare by full name, temporary flag, table options, ordered
/// columns and the (unordered) set of table constraints. `IF NOT EXISTS` is
/// not persisted by the engine and is ignored.
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.fullname() == other.fullname()
            && self.temporary == other.temporary
            && self.without_rowid == other.without_rowid
            && self.strict == other.strict
            && self.columns.len() == other.columns.len()
            && self.columns.values().zip(other.columns.values()).all(|(a, b)| a == b)
            && self.sorted_constraints() == other.sorted_constraints()
    }
}

/// Accepted inputs for [`TableConstructor::add_column`].
#[derive(Debug, Clone)]
pub enum ColumnSource {
    Column(Column),
    /// Full column DDL, e.g. `"value INTEGER NOT NULL"`.
    Definition(String),
    /// Column name and the rest of its DDL, e.g. `("value", "INTEGER")`.
    Pair(String, String),
}

impl From<Column> for ColumnSource {
    fn from(c: Column) -> Self {
        ColumnSource::Column(c)
    }
}

impl From<&str> for ColumnSource {
    fn from(s: &str) -> Self {
        ColumnSource::Definition(s.to_string())
    }
}

impl From<String> for ColumnSource {
    fn from(s: String) -> Self {
        ColumnSource::Definition(s)
    }
}

impl From<(&str, &str)> for ColumnSource {
    fn from((name, rest): (&str, &str)) -> Self {
        ColumnSource::Pair(name.to_string(), rest.to_string())
    }
}

impl ColumnSource {
    fn into_column(self) -> Result<Column> {
        match self {
            ColumnSource::Column(c) => Ok(c),
            ColumnSource::Definition(ddl) => Column::parse(&ddl),
            ColumnSource::Pair(name, rest) => {
                Column::parse(&format!("{} {}", Identifier::new(name).raw(), rest))
            }
        }
    }
}

/// Mutable table builder. Renders DDL with [`to_definition`] and produces
/// a parsed [`Table`] with [`to_table`].
///
/// [`to_definition`]: TableConstructor::to_definition
/// [`to_table`]: TableConstructor::to_table
#[derive(Debug, Clone)]
pub struct TableConstructor {
    pub name: TableName,
    pub temporary: bool,
    pub if_not_exists: bool,
    pub without_rowid: bool,
    pub strict: bool,
    columns: IndexMap<String, Column>,
    pub tableconstraints: Vec<TableConstraint>,
    pub comments: Vec<Comment>,
}

impl TableConstructor {
    pub fn new(name: impl Into<TableName>) -> Self {
        Self {
            name: name.into(),
            temporary: false,
            if_not_exists: false,
            without_rowid: false,
            strict: false,
            columns: IndexMap::new(),
            tableconstraints: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Builder form of [`add_column`](Self::add_column) over `(name, rest)`
    /// pairs: `TableConstructor::new("t").with_columns([("a", "TEXT")])`.
    pub fn with_columns<'a, I>(mut self, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for pair in columns {
            self.add_column(pair)?;
        }
        Ok(self)
    }

    pub fn if_not_exists(mut self, value: bool) -> Self {
        self.if_not_exists = value;
        self
    }

    pub fn columns(&self) -> &IndexMap<String, Column> {
        &self.columns
    }

    /// Add a column; a column with the same name is a schema error.
    pub fn add_column(&mut self, column: impl Into<ColumnSource>) -> Result<&mut Self> {
        let column = column.into().into_column()?;
        if self.columns.keys().any(|k| k.eq_ignore_ascii_case(column.name())) {
            return Err(Error::Schema(format!(
                "duplicate column {} in table {}",
                column.name(),
                self.name
            )));
        }
        self.columns.insert(column.name().to_string(), column);
        Ok(self)
    }

    /// Remove a column and every table constraint that mentions it.
    pub fn remove_column(&mut self, name: &str) -> Result<Column> {
        let key = self
            .columns
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| Error::Schema(format!("no column {} in table {}", name, self.name)))?;
        self.tableconstraints.retain(|tc| !tc.involves(&key));
        self.columns
            .shift_remove(&key)
            .ok_or_else(|| Error::Schema(format!("no column {} in table {}", name, self.name)))
    }

    pub fn add_constraint(&mut self, constraint: TableConstraint) -> &mut Self {
        self.tableconstraints.push(constraint);
        self
    }

    /// Render the `CREATE TABLE` statement.
    pub fn to_definition(&self) -> String {
        let mut out = String::from("CREATE ");
        if self.temporary {
            out.push_str("TEMPORARY ");
        }
        out.push_str("TABLE ");
        if self.if_not_exists {
            out.push_str("IF NOT EXISTS ");
        }
        out.push_str(&self.name.fullname());
        out.push_str(" (");
        for comment in &self.comments {
            out.push(' ');
            out.push_str(&comment.render());
        }

        let mut items: Vec<String> = self
            .columns
            .values()
            .map(Column::to_ddl_with_comments)
            .collect();
        items.extend(self.tableconstraints.iter().map(|tc| tc.to_string()));
        out.push_str("\n    ");
        out.push_str(&items.join(",\n    "));
        out.push_str("\n)");

        let mut options = Vec::new();
        if self.without_rowid {
            options.push("WITHOUT ROWID");
        }
        if self.strict {
            options.push("STRICT");
        }
        if !options.is_empty() {
            out.push(' ');
            out.push_str(&options.join(", "));
        }
        out
    }

    pub fn to_table(&self) -> Result<Table> {
        if self.columns.is_empty() {
            return Err(Error::Schema(format!("table {} has no columns", self.name)));
        }
        Table::parse(&self.to_definition())
    }

    /// Build a constructor whose columns cover every key seen in `rows`.
    /// Each column's datatype comes from its first non-null value.
    pub fn infer_from_rows(name: impl Into<TableName>, rows: &[Row]) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::Schema("cannot infer a table from zero rows".to_string()));
        }
        let mut types: IndexMap<&str, Option<&'static str>> = IndexMap::new();
        for row in rows {
            for (key, value) in row {
                let slot = types.entry(key.as_str()).or_insert(None);
                if slot.is_none() && !value.is_null() {
                    *slot = Some(value.type_name());
                }
            }
        }
        let mut constructor = Self::new(name);
        for (key, datatype) in types {
            constructor.add_column(Column::new(Identifier::new(key), datatype))?;
        }
        Ok(constructor)
    }
}

impl From<&Table> for TableConstructor {
    fn from(table: &Table) -> Self {
        table.to_constructor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Value, row};

    #[test]
    fn test_rowid_rules() {
        let t = Table::parse("CREATE TABLE t (a TEXT, b INTEGER)").unwrap();
        assert_eq!(t.rowid().as_deref(), Some("rowid"));

        let t = Table::parse("CREATE TABLE t (id INTEGER PRIMARY KEY, b TEXT)").unwrap();
        assert_eq!(t.rowid().as_deref(), Some("id"));

        let t = Table::parse("CREATE TABLE t (id INT PRIMARY KEY, b TEXT)").unwrap();
        assert_eq!(t.rowid().as_deref(), Some("rowid"));

        let t = Table::parse("CREATE TABLE t (id INTEGER, b TEXT, PRIMARY KEY (id))").unwrap();
        assert_eq!(t.rowid().as_deref(), Some("id"));

        let t = Table::parse("CREATE TABLE t (id INTEGER, b TEXT, PRIMARY KEY (id, b))").unwrap();
        assert_eq!(t.rowid().as_deref(), Some("rowid"));

        let t = Table::parse("CREATE TABLE t (id TEXT PRIMARY KEY) WITHOUT ROWID").unwrap();
        assert_eq!(t.rowid(), None);
    }

    #[test]
    fn test_allconstraints_includes_table_constraints() {
        let t = Table::parse(
            "CREATE TABLE t (a INTEGER NOT NULL, b TEXT, UNIQUE (a, b), CHECK (a > 0))",
        )
        .unwrap();
        assert_eq!(t.allconstraints("a").len(), 2);
        assert_eq!(t.allconstraints("b").len(), 1);
        assert!(t.allconstraints("missing").is_empty());
    }

    #[test]
    fn test_foreign_key_lookup() {
        let t = Table::parse(
            "CREATE TABLE t (a INT, b INT, c INT REFERENCES other, FOREIGN KEY (a, b) REFERENCES pair(x, y))",
        )
        .unwrap();
        let fk = t.foreign_key("b").unwrap();
        assert_eq!(fk.table.name(), "pair");
        assert_eq!(fk.column.map(|c| c.name()), Some("y"));

        let fk = t.foreign_key("c").unwrap();
        assert_eq!(fk.table.name(), "other");
        assert!(fk.column.is_none());
    }

    #[test]
    fn test_constructor_roundtrip() {
        let t = Table::parse(
            "CREATE TEMP TABLE IF NOT EXISTS main.t (\n  id INTEGER PRIMARY KEY, -- the key\n  name TEXT NOT NULL DEFAULT 'x' /* name */,\n  CONSTRAINT u UNIQUE (name COLLATE NOCASE DESC) ON CONFLICT IGNORE\n) WITHOUT ROWID",
        )
        .unwrap();
        let rebuilt = t.to_constructor().to_table().unwrap();
        assert_eq!(rebuilt, t);
        assert_eq!(rebuilt.column("name").unwrap().comments.len(), 1);
    }

    #[test]
    fn test_constructor_from_pairs() {
        let table = TableConstructor::new("name")
            .with_columns([("a", "TEXT"), ("b", "INTEGER")])
            .unwrap()
            .to_table()
            .unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.column("b").unwrap().datatype.as_deref(), Some("INTEGER"));
    }

    #[test]
    fn test_constructor_rejects_duplicates() {
        let mut constructor = TableConstructor::new("t");
        constructor.add_column("a TEXT").unwrap();
        assert!(matches!(constructor.add_column(("A", "INTEGER")), Err(Error::Schema(_))));
        constructor.add_column(Column::new("b", None)).unwrap();
        assert_eq!(constructor.columns().len(), 2);
    }

    #[test]
    fn test_remove_column_drops_constraints() {
        let t = Table::parse("CREATE TABLE t (a TEXT, b TEXT, UNIQUE (a, b))").unwrap();
        let mut constructor = t.to_constructor();
        constructor.remove_column("b").unwrap();
        let t = constructor.to_table().unwrap();
        assert_eq!(t.column_names(), vec!["a"]);
        assert!(t.tableconstraints().is_empty());
    }

    #[test]
    fn test_table_equality_ignores_constraint_order_and_if_not_exists() {
        let a = Table::parse("CREATE TABLE t (a INT, b INT, UNIQUE (a), CHECK (b > 1))").unwrap();
        let b = Table::parse("CREATE TABLE IF NOT EXISTS t (a INT, b INT, CHECK (b > 1), UNIQUE (a))").unwrap();
        assert_eq!(a, b);
        let c = Table::parse("CREATE TABLE t (b INT, a INT, UNIQUE (a), CHECK (b > 1))").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_required_columns() {
        let t = Table::parse(
            "CREATE TABLE t (id INTEGER PRIMARY KEY NOT NULL, a TEXT NOT NULL, b TEXT NOT NULL DEFAULT 'x', c TEXT)",
        )
        .unwrap();
        assert_eq!(t.required_columns(), vec!["a"]);
    }

    #[test]
    fn test_infer_from_rows() {
        let rows = vec![
            row([("name", Value::Null), ("age", Value::from(3))]),
            row([("name", Value::from("x")), ("score", Value::from(1.5))]),
        ];
        let t = TableConstructor::infer_from_rows("people", &rows).unwrap().to_table().unwrap();
        assert_eq!(t.column_names(), vec!["name", "age", "score"]);
        assert_eq!(t.column("name").unwrap().datatype.as_deref(), Some("TEXT"));
        assert_eq!(t.column("score").unwrap().datatype.as_deref(), Some("REAL"));
        assert!(TableConstructor::infer_from_rows("empty", &[]).is_err());
    }
}
