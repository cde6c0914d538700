//! `AdvancedTable`: CRUD over a single table

use super::filter::{col, is_rowid_name, resolve_column, Filter, Placeholders};
use super::result::{QueryResult, RowId};
use crate::connection::{Connection, Record, RowShape};
use crate::identifier::Identifier;
use crate::row::RowObject;
use crate::schema::{ColumnSource, Table};
use crate::value::{NamedParams, Row, Value};
use crate::{Error, Result};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::info;

/// Upper bound on bound parameters in one generated `INSERT`.
pub const REPLACEMENT_LIMIT: usize = 900;

/// Rows per multi-row `INSERT` over `columns` columns.
pub(crate) fn batch_size(columns: usize) -> Result<usize> {
    if columns == 0 {
        return Ok(1);
    }
    match REPLACEMENT_LIMIT / columns {
        0 => Err(Error::Query(format!(
            "cannot insert {} columns within {} parameters",
            columns, REPLACEMENT_LIMIT
        ))),
        rows => Ok(rows),
    }
}

/// One planned `INSERT`: the shared columns, the input rows it writes and
/// the position of the rowid among the columns.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InsertBatch {
    pub columns: Vec<String>,
    pub members: Vec<usize>,
    pub rowid: Option<usize>,
}

/// Options for [`AdvancedTable::select`].
#[derive(Debug, Clone, Default)]
pub struct Select {
    filter: Filter,
    query: String,
    params: NamedParams,
    rowid: bool,
    columns: Option<Vec<String>>,
    limit: Option<usize>,
    distinct: bool,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = self.filter.and(filter.into());
        self
    }

    /// Raw SQL appended after the `WHERE` clause, e.g. `ORDER BY name`.
    /// Avoid `:pN` parameter names; filters bind those.
    pub fn query(mut self, sql: impl Into<String>) -> Self {
        self.query = sql.into();
        self
    }

    /// Bind a named parameter used by the raw query text.
    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        let name = if name.starts_with(':') { name.to_string() } else { format!(":{}", name) };
        self.params.push((name, value.into()));
        self
    }

    /// Put the rowid column first unless it is already selected.
    pub fn rowid(mut self, rowid: bool) -> Self {
        self.rowid = rowid;
        self
    }

    pub fn columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }
}

/// A row to insert.
///
/// Plain rows are strict: every key must name a column. Row objects are
/// lenient: keys that are not columns of the target table are skipped.
#[derive(Debug, Clone)]
pub enum NewRow {
    Values(Row),
    Object(Row),
}

impl From<Row> for NewRow {
    fn from(row: Row) -> Self {
        NewRow::Values(row)
    }
}

impl From<&Row> for NewRow {
    fn from(row: &Row) -> Self {
        NewRow::Values(row.clone())
    }
}

impl From<RowObject> for NewRow {
    fn from(obj: RowObject) -> Self {
        NewRow::Object(obj.into_row())
    }
}

impl From<&RowObject> for NewRow {
    fn from(obj: &RowObject) -> Self {
        NewRow::Object(obj.row().clone())
    }
}

/// One table bound to a connection.
///
/// Carries an optional row shape that overrides the connection default for
/// every statement issued through it.
#[derive(Debug, Clone)]
pub struct AdvancedTable {
    table: Arc<Table>,
    conn: Connection,
    shape: Option<RowShape>,
}

impl AdvancedTable {
    pub(crate) fn new(table: Table, conn: Connection) -> Self {
        Self { table: Arc::new(table), conn, shape: None }
    }

    pub fn name(&self) -> &str {
        self.table.name()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Effective row shape: this table's override, else the connection's.
    pub fn shape(&self) -> RowShape {
        self.shape.unwrap_or_else(|| self.conn.default_shape())
    }

    /// A copy of this table that always uses `shape`.
    pub fn with_shape(&self, shape: RowShape) -> Self {
        Self { shape: Some(shape), ..self.clone() }
    }

    pub fn set_shape(&mut self, shape: Option<RowShape>) {
        self.shape = shape;
    }

    /// Name of the rowid column, or an error for `WITHOUT ROWID` tables.
    pub fn rowid_column(&self) -> Result<String> {
        self.table
            .rowid()
            .ok_or_else(|| Error::Query(format!("table {} has no rowid", self.name())))
    }

    fn sql_name(&self) -> String {
        self.table.fullname()
    }

    // ========== Select ==========

    pub fn select(&self, select: Select) -> Result<QueryResult<Record>> {
        self.select_as(select, self.shape())
    }

    pub(crate) fn select_as(&self, select: Select, shape: RowShape) -> Result<QueryResult<Record>> {
        let mut selection = match &select.columns {
            Some(columns) => columns
                .iter()
                .map(|c| resolve_column(&self.table, c))
                .collect::<Result<Vec<_>>>()?,
            None => vec!["*".to_string()],
        };

        let want_rowid = select.rowid || (shape == RowShape::Object && !self.table.without_rowid());
        if want_rowid {
            let rowid = self.rowid_column()?;
            let already = match &select.columns {
                None => rowid != "rowid",
                Some(columns) => columns.iter().any(|c| {
                    c == "pk"
                        || c.eq_ignore_ascii_case(&rowid)
                        || (rowid == "rowid" && is_rowid_name(c))
                }),
            };
            if !already {
                selection.insert(0, Identifier::new(rowid).raw().to_string());
            }
        }

        let mut placeholders = Placeholders::default();
        let mut sql = format!(
            "SELECT {}{} FROM {}",
            if select.distinct { "DISTINCT " } else { "" },
            selection.join(", "),
            self.sql_name()
        );
        if let Some(condition) = select.filter.to_sql(&self.table, &mut placeholders)? {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }
        if !select.query.trim().is_empty() {
            sql.push(' ');
            sql.push_str(select.query.trim());
        }
        if let Some(limit) = select.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut params = placeholders.into_params();
        params.extend(select.params);
        let rows = self.conn.query(&sql, &params)?;
        Ok(QueryResult::from(rows.into_records(shape, Some(self))))
    }

    pub fn selectall(&self, rowid: bool) -> Result<QueryResult<Record>> {
        self.select(Select::new().rowid(rowid))
    }

    pub fn quickselect(&self, filter: impl Into<Filter>) -> Result<QueryResult<Record>> {
        self.select(Select::new().filter(filter))
    }

    pub fn count(&self, filter: impl Into<Filter>) -> Result<i64> {
        let mut placeholders = Placeholders::default();
        let mut sql = format!("SELECT count(*) FROM {}", self.sql_name());
        if let Some(condition) = filter.into().to_sql(&self.table, &mut placeholders)? {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }
        let rows = self.conn.query(&sql, &placeholders.into_params())?;
        Ok(rows
            .rows
            .first()
            .and_then(|r| r.first())
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }

    /// The row whose primary key is `pk`.
    pub fn get(&self, pk: impl Into<Value>) -> Result<Record> {
        let pk = pk.into();
        self.quickselect(col("pk").eq(pk.clone()))?
            .into_first()
            .ok_or_else(|| Error::NotFound(format!("{} row with pk {}", self.name(), pk)))
    }

    // ========== Insert ==========

    /// Resolve a new row's keys to SQL column names.
    fn insert_values(&self, row: NewRow) -> Result<Vec<(String, Value)>> {
        match row {
            NewRow::Values(row) => row
                .into_iter()
                .map(|(key, value)| Ok((resolve_column(&self.table, &key)?, value)))
                .collect(),
            NewRow::Object(row) => Ok(row
                .into_iter()
                .filter_map(|(key, value)| {
                    let column = self.table.column(&key)?;
                    Some((column.name.raw().to_string(), value))
                })
                .collect()),
        }
    }

    /// `INSERT` of `rows` (all over `columns`) with its bound parameters.
    pub(crate) fn insert_statement(&self, columns: &[String], rows: Vec<Vec<Value>>) -> (String, NamedParams) {
        if columns.is_empty() {
            return (format!("INSERT INTO {} DEFAULT VALUES", self.sql_name()), Vec::new());
        }
        let mut placeholders = Placeholders::default();
        let tuples: Vec<String> = rows
            .into_iter()
            .map(|values| {
                let names: Vec<String> = values.into_iter().map(|v| placeholders.bind(v)).collect();
                format!("({})", names.join(", "))
            })
            .collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.sql_name(),
            columns.join(", "),
            tuples.join(", ")
        );
        (sql, placeholders.into_params())
    }

    /// Insert `rows` in one statement, returning the last assigned rowid.
    fn insert_batch(&self, columns: &[String], rows: Vec<Vec<Value>>) -> Result<i64> {
        let (sql, params) = self.insert_statement(columns, rows);
        self.conn.insert(&sql, &params)
    }

    /// True when the resolved column `column` writes the rowid.
    fn is_rowid_key(&self, column: &str) -> bool {
        let Some(rowid) = self.table.rowid() else {
            return false;
        };
        is_rowid_name(column)
            || column == Identifier::new(rowid.clone()).raw()
            || self.table.column(&rowid).is_some_and(|c| c.name.raw() == column)
    }

    /// Partition resolved rows into multi-row `INSERT`s.
    ///
    /// Rows are grouped by the set of columns they specify and each group is
    /// cut into batches of at most [`REPLACEMENT_LIMIT`] parameters. A group
    /// that writes the rowid with anything but integers is inserted row by
    /// row so every assigned id can be read back.
    pub(crate) fn insert_plan(&self, rows: &[Vec<(String, Value)>]) -> Result<Vec<InsertBatch>> {
        let mut groups: IndexMap<Vec<String>, Vec<usize>> = IndexMap::new();
        for (index, row) in rows.iter().enumerate() {
            let mut key: Vec<String> = row.iter().map(|(column, _)| column.clone()).collect();
            key.sort();
            groups.entry(key).or_default().push(index);
        }

        let mut plan = Vec::new();
        for (columns, members) in groups {
            let rowid = columns.iter().position(|c| self.is_rowid_key(c));
            let opaque_ids = rowid.is_some_and(|at| {
                members
                    .iter()
                    .any(|&index| !matches!(lookup(&rows[index], &columns[at]), Value::Integer(_)))
            });
            let per_batch = if opaque_ids { 1 } else { batch_size(columns.len())? };
            for chunk in members.chunks(per_batch) {
                plan.push(InsertBatch { columns: columns.clone(), members: chunk.to_vec(), rowid });
            }
        }
        Ok(plan)
    }

    pub fn addrow(&self, row: impl Into<NewRow>) -> Result<RowId> {
        let values = self.insert_values(row.into())?;
        let (columns, values): (Vec<String>, Vec<Value>) = values.into_iter().unzip();
        let id = self.insert_batch(&columns, vec![values])?;
        Ok(RowId::new(self.name(), id))
    }

    /// Insert many rows, returning their rowids in input order.
    ///
    /// With `grouping`, rows are partitioned by the set of columns they
    /// specify and each partition is written with multi-row `INSERT`s of at
    /// most [`REPLACEMENT_LIMIT`] parameters. Partitions are written one
    /// after another, so the database sees rows in partition order rather
    /// than input order; the returned ids are still in input order.
    pub fn addmultiple<I>(&self, rows: I, grouping: bool) -> Result<Vec<RowId>>
    where
        I: IntoIterator,
        I::Item: Into<NewRow>,
    {
        let rows: Vec<Vec<(String, Value)>> = rows
            .into_iter()
            .map(|row| self.insert_values(row.into()))
            .collect::<Result<_>>()?;

        if !grouping {
            return rows
                .into_iter()
                .map(|row| {
                    let (columns, values): (Vec<String>, Vec<Value>) = row.into_iter().unzip();
                    let id = self.insert_batch(&columns, vec![values])?;
                    Ok(RowId::new(self.name(), id))
                })
                .collect();
        }

        let mut ids = vec![0i64; rows.len()];
        for batch in self.insert_plan(&rows)? {
            let values: Vec<Vec<Value>> = batch
                .members
                .iter()
                .map(|&index| batch.columns.iter().map(|c| lookup(&rows[index], c)).collect())
                .collect();
            let explicit: Option<Vec<i64>> = match batch.rowid {
                Some(at) if batch.members.len() > 1 => {
                    values.iter().map(|row| row[at].as_i64()).collect()
                }
                _ => None,
            };
            let last = self.insert_batch(&batch.columns, values)?;
            match explicit {
                Some(explicit) => {
                    for (&index, id) in batch.members.iter().zip(explicit) {
                        ids[index] = id;
                    }
                }
                None => {
                    let first = last - batch.members.len() as i64 + 1;
                    for (offset, &index) in batch.members.iter().enumerate() {
                        ids[index] = first + offset as i64;
                    }
                }
            }
        }
        Ok(ids.into_iter().map(|id| RowId::new(self.name(), id)).collect())
    }

    /// Return the rowid of a row matching every supplied column, inserting
    /// one when none matches. All required columns must be supplied.
    pub fn get_or_addrow(&self, row: Row) -> Result<RowId> {
        let missing: Vec<&str> = self
            .table
            .required_columns()
            .into_iter()
            .filter(|required| !row.keys().any(|k| k.eq_ignore_ascii_case(required)))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Query(format!(
                "missing required columns for {}: {}",
                self.name(),
                missing.join(", ")
            )));
        }

        let filter = row
            .iter()
            .fold(Filter::new(), |filter, (key, value)| filter.and(col(key.as_str()).eq(value)));
        let rowid = self.rowid_column()?;
        let found = self.select_as(Select::new().filter(filter).rowid(true).limit(1), RowShape::Map)?;
        if let Some(id) = found.first().and_then(|r| r.get(&rowid)).and_then(Value::as_i64) {
            return Ok(RowId::new(self.name(), id));
        }
        self.addrow(row)
    }

    // ========== Update / delete ==========

    /// `UPDATE .. SET set WHERE filter`. Nothing to set is a no-op.
    pub fn quickupdate(&self, filter: impl Into<Filter>, set: &Row) -> Result<usize> {
        if set.is_empty() {
            return Ok(0);
        }
        let mut placeholders = Placeholders::default();
        let assignments = set
            .iter()
            .map(|(key, value)| {
                let column = resolve_column(&self.table, key)?;
                Ok(format!("{} = {}", column, placeholders.bind(value.clone())))
            })
            .collect::<Result<Vec<_>>>()?;
        let mut sql = format!("UPDATE {} SET {}", self.sql_name(), assignments.join(", "));
        if let Some(condition) = filter.into().to_sql(&self.table, &mut placeholders)? {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }
        self.conn.run(&sql, &placeholders.into_params())
    }

    /// `DELETE .. WHERE filter`. An empty filter is refused; use
    /// [`deleteall`](Self::deleteall).
    pub fn quickdelete(&self, filter: impl Into<Filter>) -> Result<usize> {
        let mut placeholders = Placeholders::default();
        let condition = filter
            .into()
            .to_sql(&self.table, &mut placeholders)?
            .ok_or_else(|| Error::Query("quickdelete needs a filter; use deleteall".to_string()))?;
        let sql = format!("DELETE FROM {} WHERE {}", self.sql_name(), condition);
        self.conn.run(&sql, &placeholders.into_params())
    }

    pub fn deleteall(&self) -> Result<usize> {
        self.conn.run(&format!("DELETE FROM {}", self.sql_name()), &Vec::new())
    }

    // ========== Schema ==========

    /// `ALTER TABLE .. ADD COLUMN`, then reload the stored definition.
    pub fn add_column(&mut self, column: impl Into<ColumnSource>) -> Result<()> {
        let mut constructor = self.table.to_constructor();
        constructor.add_column(column)?;
        let ddl = constructor
            .columns()
            .last()
            .map(|(_, column)| column.to_ddl())
            .ok_or_else(|| Error::Schema(format!("no column to add to {}", self.name())))?;
        self.conn
            .execute_batch(&format!("ALTER TABLE {} ADD COLUMN {}", self.sql_name(), ddl))?;
        info!(table = self.name(), column = %ddl, "added column");
        self.table = Arc::new(self.conn.get_table(self.name())?);
        Ok(())
    }
}

fn lookup(row: &[(String, Value)], column: &str) -> Value {
    row.iter()
        .find(|(name, _)| name == column)
        .map(|(_, value)| value.clone())
        .unwrap_or(Value::Null)
}
