//! Per-table schema versioning
//!
//! Versions live in the `_versions` bookkeeping table, one row per applied
//! change. The newest row for a table is its current version; rolling back
//! deletes that row and runs its rollback script.

pub mod dotversion;
pub mod script;

pub use dotversion::DotVersion;
pub use script::{drop_columns_script, rebuild_table_script};

use crate::config::DatabaseConfig;
use crate::connection::{Connection, IntoTable};
use crate::schema::Table;
use crate::value::{NamedParams, Value};
use crate::{Error, Result};
use serde::Serialize;
use std::ops::Deref;
use tracing::{info, warn};

pub const VERSIONS_TABLE: &str = "_versions";
const SAVEPOINT: &str = "__rowgraph_version";

const VERSIONS_DDL: &str = "CREATE TABLE IF NOT EXISTS _versions (
    tablename TEXT NOT NULL REFERENCES sqlite_master(name),
    version TEXT NOT NULL,
    update_script TEXT DEFAULT '',
    rollback_script TEXT DEFAULT ''
)";

/// One row of `_versions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionRecord {
    pub tablename: String,
    pub version: DotVersion,
    pub update_script: Option<String>,
    pub rollback_script: Option<String>,
}

/// A [`Connection`] with the versioning overlay enabled.
#[derive(Debug, Clone)]
pub struct VersionedConnection {
    conn: Connection,
    default_version: DotVersion,
    default_increment: DotVersion,
}

impl Deref for VersionedConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl VersionedConnection {
    /// Enable versioning with the default `1.0` start and increment.
    pub fn new(conn: Connection) -> Result<Self> {
        let one = DotVersion::new([1, 0]);
        Self::with_defaults(conn, one.clone(), one)
    }

    pub fn from_config(conn: Connection, config: &DatabaseConfig) -> Result<Self> {
        Self::with_defaults(
            conn,
            config.default_version.parse()?,
            config.default_increment.parse()?,
        )
    }

    /// Enable versioning. Creating `_versions` records every existing table
    /// at `0.0`.
    ///
    /// `_versions.tablename` references `sqlite_master`, which the engine
    /// cannot enforce, so the connection must not enforce foreign keys.
    pub fn with_defaults(
        conn: Connection,
        default_version: DotVersion,
        default_increment: DotVersion,
    ) -> Result<Self> {
        if conn.foreign_keys()? {
            return Err(Error::Version(
                "version tracking needs foreign key enforcement off".to_string(),
            ));
        }
        let versioned = Self { conn, default_version, default_increment };
        if !versioned.conn.table_exists(VERSIONS_TABLE)? {
            versioned.conn.execute_batch(VERSIONS_DDL)?;
            let baseline = DotVersion::new([0, 0]);
            for table in versioned.conn.list_tables()? {
                if table != VERSIONS_TABLE {
                    versioned.record(&table, &baseline, None, None)?;
                }
            }
            info!("initialised version tracking");
        }
        Ok(versioned)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside a savepoint, undoing everything it did on error.
    fn atomically<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.conn.execute_batch(&format!("SAVEPOINT {}", SAVEPOINT))?;
        match f() {
            Ok(value) => {
                self.conn.execute_batch(&format!("RELEASE {}", SAVEPOINT))?;
                Ok(value)
            }
            Err(err) => {
                let undo = format!("ROLLBACK TO {0}; RELEASE {0}", SAVEPOINT);
                if let Err(undo_err) = self.conn.execute_batch(&undo) {
                    warn!(error = %undo_err, "could not undo failed version change");
                }
                Err(err)
            }
        }
    }

    fn record(
        &self,
        table: &str,
        version: &DotVersion,
        update_script: Option<&str>,
        rollback_script: Option<&str>,
    ) -> Result<()> {
        let params: NamedParams = vec![
            (":t".into(), Value::from(table)),
            (":v".into(), Value::from(version.to_string())),
            (":u".into(), Value::from(update_script.unwrap_or(""))),
            (":r".into(), Value::from(rollback_script.unwrap_or(""))),
        ];
        self.conn.insert(
            "INSERT INTO _versions (tablename, version, update_script, rollback_script) VALUES (:t, :v, :u, :r)",
            &params,
        )?;
        Ok(())
    }

    /// All version records for `table`, oldest first, with their rowids.
    fn records(&self, table: &str) -> Result<Vec<(i64, VersionRecord)>> {
        let rows = self.conn.query(
            "SELECT rowid, tablename, version, update_script, rollback_script FROM _versions WHERE tablename = :t ORDER BY rowid",
            &vec![(":t".into(), Value::from(table))],
        )?;
        rows.rows
            .into_iter()
            .map(|values| match values.as_slice() {
                [Value::Integer(id), Value::Text(tablename), Value::Text(version), update, rollback] => {
                    Ok((
                        *id,
                        VersionRecord {
                            tablename: tablename.clone(),
                            version: version.parse()?,
                            update_script: script(update),
                            rollback_script: script(rollback),
                        },
                    ))
                }
                _ => Err(Error::Version(format!("malformed version record for {}", table))),
            })
            .collect()
    }

    /// Current version of `table`; `None` when it is not under version
    /// control.
    pub fn get_version(&self, table: &str) -> Result<Option<DotVersion>> {
        Ok(self.records(table)?.pop().map(|(_, record)| record.version))
    }

    pub fn version_history(&self, table: &str) -> Result<Vec<VersionRecord>> {
        Ok(self.records(table)?.into_iter().map(|(_, record)| record).collect())
    }

    /// Record a new version of `table` and run its update script. Both
    /// happen or neither does; scripts must not BEGIN or COMMIT themselves.
    ///
    /// `version` defaults to the current version plus the default increment
    /// (or the increment itself for an untracked table) and must be strictly
    /// greater than the current version.
    pub fn update_version(
        &self,
        table: &str,
        version: Option<DotVersion>,
        update_script: Option<&str>,
        rollback_script: Option<&str>,
    ) -> Result<DotVersion> {
        let current = self.get_version(table)?;
        let version = match (version, &current) {
            (Some(version), _) => version,
            (None, Some(current)) => current + &self.default_increment,
            (None, None) => self.default_increment.clone(),
        };
        if let Some(current) = &current {
            if version <= *current {
                return Err(Error::Version(format!(
                    "new version {} of {} is not greater than {}",
                    version, table, current
                )));
            }
        }

        self.atomically(|| {
            self.record(table, &version, update_script, rollback_script)?;
            if let Some(script) = update_script.filter(|s| !s.trim().is_empty()) {
                self.conn.execute_batch(script)?;
            }
            Ok(())
        })?;
        info!(table, version = %version, "applied version");
        Ok(version)
    }

    /// Remove the current version of `table` and run its rollback script,
    /// keeping the record if the script fails.
    pub fn rollback_version(&self, table: &str) -> Result<VersionRecord> {
        let (id, record) = self
            .records(table)?
            .pop()
            .ok_or_else(|| Error::Version(format!("{} is not under version control", table)))?;
        self.atomically(|| {
            self.conn
                .run("DELETE FROM _versions WHERE rowid = :id", &vec![(":id".into(), Value::from(id))])?;
            if let Some(script) = &record.rollback_script {
                self.conn.execute_batch(script)?;
            }
            Ok(())
        })?;
        info!(table, version = %record.version, "rolled back version");
        Ok(record)
    }

    /// [`Connection::add_tables`], recording the default version for each
    /// added table not yet under version control.
    pub fn add_tables<I>(&self, tables: I) -> Result<(Vec<Table>, Vec<Table>)>
    where
        I: IntoIterator,
        I::Item: IntoTable,
    {
        let (success, fail) = self.conn.add_tables(tables)?;
        self.track(&success)?;
        Ok((success, fail))
    }

    pub fn add_and_validate_tables<I>(&self, tables: I) -> Result<(Vec<Table>, Vec<Table>)>
    where
        I: IntoIterator,
        I::Item: IntoTable,
    {
        let (success, fail) = self.conn.add_and_validate_tables(tables)?;
        self.track(&success)?;
        Ok((success, fail))
    }

    fn track(&self, tables: &[Table]) -> Result<()> {
        for table in tables {
            if self.get_version(table.name())?.is_none() {
                self.record(table.name(), &self.default_version, None, None)?;
            }
        }
        Ok(())
    }
}

fn script(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
