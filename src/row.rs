//! Row objects
//!
//! A [`RowObject`] is one row plus the [`AdvancedTable`] it came from.
//! Columns are read with [`get`](RowObject::get); foreign keys are followed
//! with [`get_ref`](RowObject::get_ref), which always yields row objects
//! whatever the connection's or table's current default shape is.

use crate::connection::{Record, RowShape};
use crate::query::{col, AdvancedTable};
use crate::value::{Row, Value};
use crate::{Error, Result};
use serde::{Serialize, Serializer};

/// A column read through a row object.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Value(Value),
    /// Foreign key target; `None` when the key is null or dangling.
    Row(Option<RowObject>),
}

#[derive(Debug, Clone)]
pub struct RowObject {
    table: AdvancedTable,
    row: Row,
}

impl RowObject {
    pub(crate) fn new(table: AdvancedTable, row: Row) -> Self {
        Self { table, row }
    }

    pub fn table(&self) -> &AdvancedTable {
        &self.table
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn into_row(self) -> Row {
        self.row
    }

    /// Value of the table's rowid column.
    pub fn pk(&self) -> Option<&Value> {
        self.value(&self.table.table().rowid()?)
    }

    /// Stored value of `name` without following foreign keys.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.row.get(name).or_else(|| {
            self.row
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    /// Read a column, following it when it is a foreign key.
    pub fn get(&self, name: &str) -> Result<Field> {
        let table = self.table.table();
        if table.foreign_key(name).is_some() {
            return self.get_ref(name).map(Field::Row);
        }
        if name == "pk" {
            return Ok(Field::Value(self.pk().cloned().unwrap_or(Value::Null)));
        }
        if !table.has_column(name) && self.value(name).is_none() {
            return Err(Error::Query(format!("table {} has no column {}", table.name(), name)));
        }
        Ok(Field::Value(self.value(name).cloned().unwrap_or(Value::Null)))
    }

    /// Follow the foreign key on `name` to the referenced row.
    pub fn get_ref(&self, name: &str) -> Result<Option<RowObject>> {
        let table = self.table.table();
        let fk = table.foreign_key(name).ok_or_else(|| {
            Error::Query(format!("{}.{} is not a foreign key", table.name(), name))
        })?;
        let value = match self.value(name) {
            None | Some(Value::Null) => return Ok(None),
            Some(value) => value.clone(),
        };

        let target = self
            .table
            .connection()
            .get_advanced_table(fk.table.name())?
            .with_shape(RowShape::Object);
        let column = fk.column.map(|c| c.name()).unwrap_or("pk");
        let found = target.quickselect(col(column).eq(value))?.into_first();
        Ok(found.and_then(Record::into_object))
    }

    /// Delete this row from its table.
    pub fn drop(self) -> Result<()> {
        let pk = self
            .pk()
            .cloned()
            .ok_or_else(|| Error::Query(format!("row of {} has no pk", self.table.name())))?;
        self.table.quickdelete(col("pk").eq(pk))?;
        Ok(())
    }
}

/// Row objects compare by table definition and row contents.
impl PartialEq for RowObject {
    fn eq(&self, other: &Self) -> bool {
        self.table.table() == other.table.table() && self.row == other.row
    }
}

impl Serialize for RowObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.row.serialize(serializer)
    }
}

/// A row object used as a value stands for its primary key.
impl From<&RowObject> for Value {
    fn from(obj: &RowObject) -> Self {
        obj.pk().cloned().unwrap_or(Value::Null)
    }
}

impl From<RowObject> for Value {
    fn from(obj: RowObject) -> Self {
        Value::from(&obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::value::row;

    fn blog() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.add_tables([
            "CREATE TABLE users (userid INTEGER PRIMARY KEY, fname TEXT)",
            "CREATE TABLE posts (postid INTEGER PRIMARY KEY, userid INT REFERENCES users(userid), post BLOB)",
            "CREATE TABLE comments (body TEXT, postid INT, FOREIGN KEY (postid) REFERENCES posts)",
        ])
        .unwrap();
        let users = conn.get_advanced_table("users").unwrap();
        let posts = conn.get_advanced_table("posts").unwrap();
        let comments = conn.get_advanced_table("comments").unwrap();
        users.addrow(row([("fname", "John")])).unwrap();
        posts.addrow(row([("userid", Value::from(1)), ("post", Value::from("hi"))])).unwrap();
        comments.addrow(row([("body", Value::from("nice")), ("postid", Value::from(1))])).unwrap();
        conn
    }

    fn object(conn: &Connection, table: &str, pk: i64) -> RowObject {
        let table = conn.get_advanced_table(table).unwrap().with_shape(RowShape::Object);
        table.get(pk).unwrap().into_object().unwrap()
    }

    #[test]
    fn test_foreign_key_dereference() {
        let conn = blog();
        let post = object(&conn, "posts", 1);
        let user = post.get_ref("userid").unwrap().unwrap();
        assert_eq!(user.get("fname").unwrap(), Field::Value(Value::from("John")));
        assert!(matches!(post.get("userid").unwrap(), Field::Row(Some(_))));
        assert_eq!(post.value("userid"), Some(&Value::from(1)));
    }

    #[test]
    fn test_deep_traversal_through_table_constraint() {
        let conn = blog();
        let comments = conn.get_advanced_table("comments").unwrap().with_shape(RowShape::Object);
        let comment = comments.selectall(false).unwrap().into_first().unwrap().into_object().unwrap();
        let post = comment.get_ref("postid").unwrap().unwrap();
        let user = post.get_ref("userid").unwrap().unwrap();
        assert_eq!(user.value("fname"), Some(&Value::from("John")));
    }

    #[test]
    fn test_dereference_ignores_later_default_changes() {
        let conn = blog();
        conn.set_default_shape(RowShape::Object);
        let post = object(&conn, "posts", 1);
        conn.set_default_shape(RowShape::Tuple);
        conn.register("users", RowShape::Map);
        let user = post.get_ref("userid").unwrap().unwrap();
        assert_eq!(user.table().shape(), RowShape::Object);
    }

    #[test]
    fn test_null_and_plain_columns() {
        let conn = blog();
        let posts = conn.get_advanced_table("posts").unwrap();
        posts.addrow(row([("post", "orphan")])).unwrap();
        let orphan = object(&conn, "posts", 2);
        assert_eq!(orphan.get("userid").unwrap(), Field::Row(None));
        assert!(matches!(orphan.get_ref("post"), Err(Error::Query(_))));
        assert!(matches!(orphan.get("missing"), Err(Error::Query(_))));
        assert_eq!(orphan.get("pk").unwrap(), Field::Value(Value::from(2)));
    }

    #[test]
    fn test_object_as_filter_value_and_drop() {
        let conn = blog();
        let user = object(&conn, "users", 1);
        let posts = conn.get_advanced_table("posts").unwrap();
        assert_eq!(posts.count(col("userid").eq(&user)).unwrap(), 1);

        let post = object(&conn, "posts", 1);
        assert_eq!(post, object(&conn, "posts", 1));
        post.drop().unwrap();
        assert_eq!(posts.count(crate::Filter::new()).unwrap(), 0);
    }

    #[test]
    fn test_drop_respects_enforced_foreign_keys() {
        let conn = blog();
        conn.execute_batch("PRAGMA foreign_keys = ON").unwrap();
        let post = object(&conn, "posts", 1);
        assert!(matches!(post.clone().drop(), Err(Error::Storage(_))));

        // The comment is referenced by nothing; once it is gone the post can go.
        object(&conn, "comments", 1).drop().unwrap();
        post.drop().unwrap();
        let posts = conn.get_advanced_table("posts").unwrap();
        assert_eq!(posts.count(crate::Filter::new()).unwrap(), 0);
    }
}
