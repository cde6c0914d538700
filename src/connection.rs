//! Connection wrapper: schema discovery, table management, row shapes

use crate::config::DatabaseConfig;
use crate::identifier::Identifier;
use crate::query::{AdvancedTable, QueryResult};
use crate::row::RowObject;
use crate::schema::{Table, TableConstructor};
use crate::value::{NamedParams, Row, Value};
use crate::{Error, Result};
use rusqlite::types::ToSql;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// How result rows are materialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowShape {
    /// Positional values
    #[default]
    Tuple,
    /// Column name to value
    Map,
    /// [`RowObject`] bound to its table
    Object,
}

impl std::str::FromStr for RowShape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tuple" => Ok(RowShape::Tuple),
            "map" => Ok(RowShape::Map),
            "object" => Ok(RowShape::Object),
            other => Err(Error::Config(format!("unknown row shape: {}", other))),
        }
    }
}

/// One result row in the requested shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Tuple(Vec<Value>),
    Map(Row),
    Object(RowObject),
}

impl Record {
    /// Values in selection order, whatever the shape.
    pub fn values(&self) -> Vec<Value> {
        match self {
            Record::Tuple(values) => values.clone(),
            Record::Map(row) => row.values().cloned().collect(),
            Record::Object(obj) => obj.row().values().cloned().collect(),
        }
    }

    /// Value by column name. Always `None` for tuples.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Record::Tuple(_) => None,
            Record::Map(row) => row.get(name),
            Record::Object(obj) => obj.value(name),
        }
    }

    pub fn as_map(&self) -> Option<&Row> {
        match self {
            Record::Map(row) => Some(row),
            Record::Object(obj) => Some(obj.row()),
            Record::Tuple(_) => None,
        }
    }

    pub fn into_object(self) -> Option<RowObject> {
        match self {
            Record::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

/// Raw statement output before shaping.
#[derive(Debug, Default)]
pub(crate) struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Rows {
    pub fn into_maps(self) -> Vec<Row> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|values| columns.iter().cloned().zip(values).collect())
            .collect()
    }

    /// Shape every row. `owner` is required for [`RowShape::Object`]; without
    /// one, objects degrade to maps.
    pub fn into_records(self, shape: RowShape, owner: Option<&AdvancedTable>) -> Vec<Record> {
        match (shape, owner) {
            (RowShape::Tuple, _) => self.rows.into_iter().map(Record::Tuple).collect(),
            (RowShape::Object, Some(table)) => {
                let table = table.with_shape(RowShape::Object);
                self.into_maps()
                    .into_iter()
                    .map(|row| Record::Object(RowObject::new(table.clone(), row)))
                    .collect()
            }
            (RowShape::Map, _) | (RowShape::Object, None) => {
                self.into_maps().into_iter().map(Record::Map).collect()
            }
        }
    }
}

/// Anything that names a table: a plain name or a schema object.
pub trait TableRef {
    fn table_name(&self) -> &str;

    /// Name as it should appear in SQL.
    fn sql_name(&self) -> String {
        Identifier::new(self.table_name()).raw().to_string()
    }
}

impl TableRef for str {
    fn table_name(&self) -> &str {
        self
    }
}

impl TableRef for String {
    fn table_name(&self) -> &str {
        self
    }
}

impl TableRef for Table {
    fn table_name(&self) -> &str {
        self.name()
    }

    fn sql_name(&self) -> String {
        self.fullname()
    }
}

impl TableRef for TableConstructor {
    fn table_name(&self) -> &str {
        self.name.name()
    }

    fn sql_name(&self) -> String {
        self.name.fullname()
    }
}

impl TableRef for AdvancedTable {
    fn table_name(&self) -> &str {
        self.name()
    }

    fn sql_name(&self) -> String {
        self.table().fullname()
    }
}

/// Inputs accepted by [`Connection::add_tables`].
pub trait IntoTable {
    fn into_table(self) -> Result<Table>;
}

impl IntoTable for Table {
    fn into_table(self) -> Result<Table> {
        Ok(self)
    }
}

impl IntoTable for &Table {
    fn into_table(self) -> Result<Table> {
        Ok(self.clone())
    }
}

impl IntoTable for TableConstructor {
    fn into_table(self) -> Result<Table> {
        self.to_table()
    }
}

impl IntoTable for &TableConstructor {
    fn into_table(self) -> Result<Table> {
        self.to_table()
    }
}

/// DDL text
impl IntoTable for &str {
    fn into_table(self) -> Result<Table> {
        Table::parse(self)
    }
}

struct Inner {
    db: Mutex<rusqlite::Connection>,
    path: Option<PathBuf>,
    shape: RwLock<RowShape>,
    registry: RwLock<HashMap<String, RowShape>>,
}

/// A shareable handle on one SQLite database.
///
/// Clones share the underlying connection, the default row shape and the
/// per-table shape registry.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.inner.path)
            .field("shape", &self.default_shape())
            .finish()
    }
}

impl Connection {
    /// Open a database file (created if missing).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = rusqlite::Connection::open(path)?;
        Self::from_rusqlite(db, Some(path.to_path_buf()), &DatabaseConfig::default())
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let db = rusqlite::Connection::open_in_memory()?;
        Self::from_rusqlite(db, None, &DatabaseConfig::default())
    }

    /// Open a database file with timeout, foreign-key enforcement and shape
    /// taken from `config`.
    pub fn open_with(path: impl AsRef<Path>, config: &DatabaseConfig) -> Result<Self> {
        let path = path.as_ref();
        let db = rusqlite::Connection::open(path)?;
        Self::from_rusqlite(db, Some(path.to_path_buf()), config)
    }

    fn from_rusqlite(
        db: rusqlite::Connection,
        path: Option<PathBuf>,
        config: &DatabaseConfig,
    ) -> Result<Self> {
        db.busy_timeout(Duration::from_secs(config.busy_timeout_secs))?;
        // The bundled engine enforces foreign keys unless told otherwise.
        db.pragma_update(None, "foreign_keys", config.foreign_keys)?;
        Ok(Self {
            inner: Arc::new(Inner {
                db: Mutex::new(db),
                path,
                shape: RwLock::new(config.default_shape),
                registry: RwLock::new(HashMap::new()),
            }),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    fn db(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.inner.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether the engine currently enforces foreign keys.
    pub fn foreign_keys(&self) -> Result<bool> {
        Ok(self.db().pragma_query_value(None, "foreign_keys", |row| row.get::<_, bool>(0))?)
    }

    pub fn default_shape(&self) -> RowShape {
        *self.inner.shape.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_default_shape(&self, shape: RowShape) {
        *self.inner.shape.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = shape;
    }

    /// Give every [`AdvancedTable`] later opened for `table` its own shape.
    pub fn register(&self, table: &str, shape: RowShape) {
        self.inner
            .registry
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(table.to_string(), shape);
    }

    pub fn registered_shape(&self, table: &str) -> Option<RowShape> {
        self.inner
            .registry
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(table)
            .copied()
    }

    // ========== Statement primitives ==========

    pub(crate) fn query(&self, sql: &str, params: &NamedParams) -> Result<Rows> {
        debug!(sql, params = params.len(), "query");
        let db = self.db();
        let mut stmt = db.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let bound = bind(params);
        let mut rows = stmt.query(bound.as_slice())?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(Value::from_ref(row.get_ref(i)?));
            }
            out.push(values);
        }
        Ok(Rows { columns, rows: out })
    }

    /// Run a data-changing statement, returning the number of changed rows.
    pub(crate) fn run(&self, sql: &str, params: &NamedParams) -> Result<usize> {
        debug!(sql, params = params.len(), "execute");
        let db = self.db();
        let bound = bind(params);
        Ok(db.execute(sql, bound.as_slice())?)
    }

    /// Run an `INSERT`, returning the last inserted rowid.
    pub(crate) fn insert(&self, sql: &str, params: &NamedParams) -> Result<i64> {
        debug!(sql, params = params.len(), "insert");
        let db = self.db();
        let bound = bind(params);
        db.execute(sql, bound.as_slice())?;
        Ok(db.last_insert_rowid())
    }

    /// Run a script of `;`-separated statements without parameters.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        debug!(sql, "batch");
        self.db().execute_batch(sql)?;
        Ok(())
    }

    /// Run arbitrary SQL with named parameters.
    ///
    /// Parameter names may be given with or without the leading `:`.
    /// [`RowShape::Object`] has no owning table here and falls back to
    /// [`RowShape::Map`].
    pub fn execute(
        &self,
        sql: &str,
        params: &[(&str, Value)],
        shape: RowShape,
    ) -> Result<QueryResult<Record>> {
        let params: NamedParams = params
            .iter()
            .map(|(name, value)| {
                let name = if name.starts_with([':', '@', '$']) {
                    name.to_string()
                } else {
                    format!(":{}", name)
                };
                (name, value.clone())
            })
            .collect();
        let rows = self.query(sql, &params)?;
        Ok(QueryResult::from(rows.into_records(shape, None)))
    }

    // ========== Schema discovery ==========

    /// Names of all tables, excluding the engine's own.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        self.list_objects("table")
    }

    pub fn list_views(&self) -> Result<Vec<String>> {
        self.list_objects("view")
    }

    fn list_objects(&self, kind: &str) -> Result<Vec<String>> {
        let sql = "SELECT name FROM sqlite_master WHERE type = :kind AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
                   UNION ALL
                   SELECT name FROM sqlite_temp_master WHERE type = :kind AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'";
        let rows = self.query(sql, &vec![(":kind".to_string(), Value::from(kind))])?;
        Ok(rows
            .rows
            .into_iter()
            .filter_map(|mut values| match values.pop() {
                Some(Value::Text(name)) => Some(name),
                _ => None,
            })
            .collect())
    }

    fn object_sql(&self, kind: &str, name: &str) -> Result<Option<(String, bool)>> {
        let sql = "SELECT sql, 0 FROM sqlite_master WHERE type = :kind AND name = :name
                   UNION ALL
                   SELECT sql, 1 FROM sqlite_temp_master WHERE type = :kind AND name = :name";
        let params = vec![
            (":kind".to_string(), Value::from(kind)),
            (":name".to_string(), Value::from(name)),
        ];
        let rows = self.query(sql, &params)?;
        Ok(rows.rows.into_iter().next().and_then(|values| match values.as_slice() {
            [Value::Text(sql), temp] => Some((sql.clone(), *temp == 1)),
            _ => None,
        }))
    }

    pub fn table_exists(&self, table: &(impl TableRef + ?Sized)) -> Result<bool> {
        Ok(self.object_sql("table", table.table_name())?.is_some())
    }

    pub fn view_exists(&self, view: &(impl TableRef + ?Sized)) -> Result<bool> {
        Ok(self.object_sql("view", view.table_name())?.is_some())
    }

    /// Parse the stored definition of `name`.
    pub fn get_table(&self, name: &str) -> Result<Table> {
        let (sql, temporary) = self
            .object_sql("table", name)?
            .ok_or_else(|| Error::NotFound(format!("table {}", name)))?;
        let mut table = Table::parse(&sql)?;
        // The engine stores temporary tables as plain CREATE TABLE text.
        table.temporary |= temporary;
        Ok(table)
    }

    /// Open the table stored at `rowid` in `sqlite_master`.
    pub fn get_table_by_id(&self, rowid: i64) -> Result<AdvancedTable> {
        let rows = self.query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND rowid = :id",
            &vec![(":id".to_string(), Value::from(rowid))],
        )?;
        match rows.rows.into_iter().next().as_deref() {
            Some([Value::Text(name)]) => self.get_advanced_table(name),
            _ => Err(Error::NotFound(format!("table with rowid {}", rowid))),
        }
    }

    pub fn get_all_tables(&self) -> Result<Vec<AdvancedTable>> {
        self.list_tables()?
            .iter()
            .map(|name| self.get_advanced_table(name))
            .collect()
    }

    /// Bind an [`AdvancedTable`] for `name`, applying any registered shape.
    pub fn get_advanced_table(&self, name: &str) -> Result<AdvancedTable> {
        let table = match self.get_table(name) {
            Ok(table) => table,
            Err(Error::NotFound(_)) => {
                return Err(Error::Schema(format!("table {} is not in this database", name)));
            }
            Err(err) => return Err(err),
        };
        let advanced = AdvancedTable::new(table, self.clone());
        Ok(match self.registered_shape(name) {
            Some(shape) => advanced.with_shape(shape),
            None => advanced,
        })
    }

    // ========== Schema mutation ==========

    /// Create each table that does not exist yet.
    ///
    /// Returns `(success, fail)`. An existing table counts as a success only
    /// when its definition says `IF NOT EXISTS`.
    pub fn add_tables<I>(&self, tables: I) -> Result<(Vec<Table>, Vec<Table>)>
    where
        I: IntoIterator,
        I::Item: IntoTable,
    {
        let mut success = Vec::new();
        let mut fail = Vec::new();
        for table in tables {
            let table = table.into_table()?;
            if self.table_exists(&table)? {
                if table.if_not_exists() {
                    success.push(table);
                } else {
                    warn!(table = table.name(), "table already exists");
                    fail.push(table);
                }
                continue;
            }
            self.execute_batch(table.definition())?;
            info!(table = table.name(), "created table");
            success.push(table);
        }
        Ok((success, fail))
    }

    /// [`add_tables`](Self::add_tables), then compare every stored
    /// definition with its input. Mismatches move to `fail`.
    pub fn add_and_validate_tables<I>(&self, tables: I) -> Result<(Vec<Table>, Vec<Table>)>
    where
        I: IntoIterator,
        I::Item: IntoTable,
    {
        let (added, mut fail) = self.add_tables(tables)?;
        let mut success = Vec::new();
        for table in added {
            if self.get_table(table.name())? == table {
                success.push(table);
            } else {
                warn!(table = table.name(), "stored definition differs");
                fail.push(table);
            }
        }
        Ok((success, fail))
    }

    /// Drop a table. An already absent table is not an error.
    pub fn remove_table(&self, table: &(impl TableRef + ?Sized)) -> Result<()> {
        self.drop_object("TABLE", table)
    }

    pub fn remove_view(&self, view: &(impl TableRef + ?Sized)) -> Result<()> {
        self.drop_object("VIEW", view)
    }

    fn drop_object(&self, kind: &str, object: &(impl TableRef + ?Sized)) -> Result<()> {
        match self.execute_batch(&format!("DROP {} {}", kind, object.sql_name())) {
            Ok(()) => {
                info!(name = object.table_name(), kind, "dropped");
                Ok(())
            }
            Err(err) if err.is_no_such_object() => {
                warn!(name = object.table_name(), kind, "nothing to drop");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

fn bind(params: &NamedParams) -> Vec<(&str, &dyn ToSql)> {
    params
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect()
}
