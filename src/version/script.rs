//! Table rebuild scripts
//!
//! SQLite only learned `DROP COLUMN` late and still refuses it for many
//! column kinds. These scripts rebuild a table into a new shape instead:
//! copy the surviving columns to a temporary table, drop and recreate the
//! original, then copy the rows back.

use crate::identifier::Identifier;
use crate::schema::Table;
use crate::Result;

const ROWID_COPY: &str = "__rowgraph_rowid";
// Savepoint, so the script can also run inside a version update.
const SAVEPOINT: &str = "__rowgraph_rebuild";

/// Script that rebuilds `table`'s storage so it matches `target`, keeping
/// rows and the columns both definitions share.
pub fn rebuild_table_script(table: &str, target: &Table) -> String {
    let name = Identifier::new(table).raw().to_string();
    let scratch = Identifier::new(format!("__rowgraph_rebuild_{}", table)).raw().to_string();
    let columns: Vec<String> = target
        .columns()
        .values()
        .map(|c| c.name.raw().to_string())
        .collect();
    let columns = columns.join(", ");

    // Implicit rowids are renumbered by a plain copy; carry them across.
    let keep_rowid = target.rowid().as_deref() == Some("rowid");
    let (copy_out, copy_in) = if keep_rowid {
        (
            format!("SELECT rowid AS {}, {} FROM {}", ROWID_COPY, columns, name),
            format!("INSERT INTO {} (rowid, {}) SELECT {}, {} FROM {}", name, columns, ROWID_COPY, columns, scratch),
        )
    } else {
        (
            format!("SELECT {} FROM {}", columns, name),
            format!("INSERT INTO {} ({}) SELECT {} FROM {}", name, columns, columns, scratch),
        )
    };

    let mut definition = target.to_constructor();
    definition.name = table.into();
    definition.if_not_exists = false;
    definition.temporary = false;

    [
        format!("SAVEPOINT {}", SAVEPOINT),
        format!("CREATE TEMPORARY TABLE {} AS {}", scratch, copy_out),
        format!("DROP TABLE {}", name),
        definition.to_definition(),
        copy_in,
        format!("DROP TABLE {}", scratch),
        format!("RELEASE {}", SAVEPOINT),
    ]
    .join(";\n")
        + ";\n"
}

/// Script that removes `columns` from `table`, along with every table
/// constraint that mentions them.
pub fn drop_columns_script(table: &Table, columns: &[&str]) -> Result<String> {
    let mut target = table.to_constructor();
    for column in columns {
        target.remove_column(column)?;
    }
    Ok(rebuild_table_script(table.name(), &target.to_table()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::value::{row, Value};

    #[test]
    fn test_drop_columns_keeps_rows_and_rowids() {
        let conn = Connection::open_in_memory().unwrap();
        conn.add_tables(["CREATE TABLE t (a TEXT, b INTEGER, c TEXT, UNIQUE (b, c))"]).unwrap();
        let t = conn.get_advanced_table("t").unwrap();
        t.addmultiple(
            [
                row([("a", Value::from("x")), ("b", Value::from(1))]),
                row([("a", Value::from("y")), ("b", Value::from(2))]),
            ],
            true,
        )
        .unwrap();
        t.quickdelete(crate::col("a").eq("x")).unwrap();

        let script = drop_columns_script(t.table(), &["b"]).unwrap();
        assert!(script.starts_with("SAVEPOINT __rowgraph_rebuild;"));
        assert!(script.trim_end().ends_with("RELEASE __rowgraph_rebuild;"));
        conn.execute_batch(&script).unwrap();

        let table = conn.get_table("t").unwrap();
        assert_eq!(table.column_names(), vec!["a", "c"]);
        assert!(table.tableconstraints().is_empty());
        let t = conn.get_advanced_table("t").unwrap();
        let rows = t.selectall(true).unwrap();
        assert_eq!(rows[0].values(), vec![Value::from(2), Value::from("y"), Value::Null]);
    }

    #[test]
    fn test_rebuild_with_rowid_alias() {
        let conn = Connection::open_in_memory().unwrap();
        conn.add_tables(["CREATE TABLE u (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)"]).unwrap();
        conn.execute_batch("INSERT INTO u (id, name, age) VALUES (7, 'a', 3)").unwrap();
        let target = Table::parse("CREATE TABLE u (id INTEGER PRIMARY KEY, name TEXT)").unwrap();
        conn.execute_batch(&rebuild_table_script("u", &target)).unwrap();
        assert_eq!(conn.get_table("u").unwrap(), target);
        let u = conn.get_advanced_table("u").unwrap();
        assert_eq!(u.get(7).unwrap().values(), vec![Value::from(7), Value::from("a")]);
    }

    #[test]
    fn test_unknown_column_is_schema_error() {
        let table = Table::parse("CREATE TABLE t (a TEXT)").unwrap();
        assert!(drop_columns_script(&table, &["zzz"]).is_err());
        assert!(drop_columns_script(&table, &["a"]).is_err());
    }
}
