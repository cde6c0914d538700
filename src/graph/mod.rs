//! Graph overlay
//!
//! Stores labelled edges between arbitrary rows of arbitrary tables in two
//! bookkeeping tables. User tables are never modified.
//!
//! - `graphdb_edges` - concrete edges between two rows
//! - `graphdb_auto_edges` - templates for edges between rows of two tables

pub mod edge;

pub use edge::{AsNode, AutoEdge, Edge, NodeRef};

use crate::config::DatabaseConfig;
use crate::connection::{Connection, RowShape};
use crate::query::{col, AdvancedTable, RowId, Select};
use crate::value::{row, Value};
use crate::{Error, Result};
use std::ops::Deref;
use tracing::info;

pub const EDGES_TABLE: &str = "graphdb_edges";
pub const AUTO_EDGES_TABLE: &str = "graphdb_auto_edges";

const GRAPH_DDL: &str = "CREATE TABLE IF NOT EXISTS graphdb_edges (
    node1table TEXT NOT NULL,
    node1row INTEGER NOT NULL,
    node1relation TEXT,
    node2table TEXT NOT NULL,
    node2row INTEGER NOT NULL,
    node2relation TEXT
);
CREATE TABLE IF NOT EXISTS graphdb_auto_edges (
    node1table TEXT NOT NULL,
    node1relation TEXT,
    node2table TEXT NOT NULL,
    node2relation TEXT
);";

const TOUCHES: &str = "((node1table = :table AND node1row = :row) OR (node2table = :table AND node2row = :row))";

/// A [`Connection`] with the graph overlay enabled.
#[derive(Debug, Clone)]
pub struct GraphConnection {
    conn: Connection,
}

impl Deref for GraphConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl GraphConnection {
    /// Enable the overlay, creating its tables when missing.
    pub fn new(conn: Connection) -> Result<Self> {
        if !conn.table_exists(EDGES_TABLE)? || !conn.table_exists(AUTO_EDGES_TABLE)? {
            conn.execute_batch(GRAPH_DDL)?;
            info!("initialised graph tables");
        }
        conn.register(EDGES_TABLE, RowShape::Object);
        Ok(Self { conn })
    }

    /// The overlay for `conn` when `config.graph` asks for it or its tables
    /// already exist, `None` otherwise.
    pub fn from_config(conn: Connection, config: &DatabaseConfig) -> Result<Option<Self>> {
        if config.graph || conn.table_exists(EDGES_TABLE)? {
            return Self::new(conn).map(Some);
        }
        Ok(None)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn edges_table(&self) -> Result<AdvancedTable> {
        Ok(self.conn.get_advanced_table(EDGES_TABLE)?.with_shape(RowShape::Object))
    }

    fn auto_edges_table(&self) -> Result<AdvancedTable> {
        Ok(self.conn.get_advanced_table(AUTO_EDGES_TABLE)?.with_shape(RowShape::Map))
    }

    // ========== Edges ==========

    /// Link `node1` to `node2`, labelling each side with an optional
    /// relation. Returns the new edge's rowid.
    pub fn create_edge(
        &self,
        node1: impl AsNode,
        node2: impl AsNode,
        node1relation: Option<&str>,
        node2relation: Option<&str>,
    ) -> Result<RowId> {
        let (node1, node2) = (node1.node()?, node2.node()?);
        let id = self.edges_table()?.addrow(row([
            ("node1table", Value::from(node1.table.as_str())),
            ("node1row", Value::from(node1.rowid)),
            ("node1relation", Value::from(node1relation)),
            ("node2table", Value::from(node2.table.as_str())),
            ("node2row", Value::from(node2.rowid)),
            ("node2relation", Value::from(node2relation)),
        ]))?;
        info!(edge = id.id, from = %node1, to = %node2, "created edge");
        Ok(id)
    }

    pub fn get_edge(&self, pk: i64) -> Result<Edge> {
        let record = self.edges_table()?.get(pk)?;
        let object = record
            .into_object()
            .ok_or_else(|| Error::NotFound(format!("edge {}", pk)))?;
        Edge::from_object(object)
    }

    pub fn remove_edge(&self, pk: i64) -> Result<()> {
        if self.edges_table()?.quickdelete(col("pk").eq(pk))? == 0 {
            return Err(Error::NotFound(format!("edge {}", pk)));
        }
        info!(edge = pk, "removed edge");
        Ok(())
    }

    fn select_edges(&self, condition: &str, node: &NodeRef, relation: Option<&str>) -> Result<Vec<Edge>> {
        let mut select = Select::new()
            .query(format!("WHERE {} ORDER BY rowid", condition))
            .param("table", node.table.as_str())
            .param("row", node.rowid);
        if let Some(relation) = relation {
            select = select.param("relation", relation);
        }
        self.edges_table()?
            .select(select)?
            .into_iter()
            .filter_map(|record| record.into_object())
            .map(Edge::from_object)
            .collect()
    }

    /// Every edge touching `node`.
    pub fn edges(&self, node: impl AsNode) -> Result<Vec<Edge>> {
        self.select_edges(TOUCHES, &node.node()?, None)
    }

    /// Edges touching `node` where either side carries `relation`.
    pub fn edges_by_relation(&self, node: impl AsNode, relation: &str) -> Result<Vec<Edge>> {
        let condition = format!(
            "{} AND (node1relation = :relation OR node2relation = :relation)",
            TOUCHES
        );
        self.select_edges(&condition, &node.node()?, Some(relation))
    }

    /// Edges where `node` itself is the side labelled `relation`.
    pub fn edges_with_self_relation(&self, node: impl AsNode, relation: &str) -> Result<Vec<Edge>> {
        let condition = "(node1table = :table AND node1row = :row AND node1relation = :relation) \
             OR (node2table = :table AND node2row = :row AND node2relation = :relation)";
        self.select_edges(condition, &node.node()?, Some(relation))
    }

    // ========== Auto edges ==========

    /// Register a template for edges between rows of `table1` and `table2`.
    pub fn create_auto_edge(
        &self,
        table1: &str,
        table2: &str,
        node1relation: Option<&str>,
        node2relation: Option<&str>,
    ) -> Result<RowId> {
        let id = self.auto_edges_table()?.addrow(row([
            ("node1table", Value::from(table1)),
            ("node1relation", Value::from(node1relation)),
            ("node2table", Value::from(table2)),
            ("node2relation", Value::from(node2relation)),
        ]))?;
        info!(template = id.id, table1, table2, "created auto edge");
        Ok(id)
    }

    /// Templates mentioning `table` on either side, oldest first.
    pub fn auto_edges(&self, table: &str) -> Result<Vec<AutoEdge>> {
        let select = Select::new()
            .query("WHERE node1table = :table OR node2table = :table ORDER BY rowid")
            .param("table", table)
            .rowid(true);
        self.auto_edges_table()?
            .select(select)?
            .into_iter()
            .map(|record| {
                let text = |name: &str| record.get(name).and_then(Value::as_str).map(str::to_string);
                match (record.get("rowid").and_then(Value::as_i64), text("node1table"), text("node2table")) {
                    (Some(id), Some(node1table), Some(node2table)) => Ok(AutoEdge {
                        id,
                        node1table,
                        node1relation: text("node1relation"),
                        node2table,
                        node2relation: text("node2relation"),
                    }),
                    _ => Err(Error::Query(format!("malformed auto edge {:?}", record.values()))),
                }
            })
            .collect()
    }

    /// Create an edge between two rows from the first template registered
    /// for their tables, in either orientation.
    pub fn link(&self, node1: impl AsNode, node2: impl AsNode) -> Result<RowId> {
        let (node1, node2) = (node1.node()?, node2.node()?);
        for template in self.auto_edges(&node1.table)? {
            let (rel1, rel2) = (template.node1relation.as_deref(), template.node2relation.as_deref());
            if template.node1table == node1.table && template.node2table == node2.table {
                return self.create_edge(&node1, &node2, rel1, rel2);
            }
            if template.node1table == node2.table && template.node2table == node1.table {
                return self.create_edge(&node2, &node1, rel1, rel2);
            }
        }
        Err(Error::NotFound(format!(
            "auto edge between {} and {}",
            node1.table, node2.table
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::RowObject;

    fn graph() -> GraphConnection {
        let conn = Connection::open_in_memory().unwrap();
        conn.add_tables([
            "CREATE TABLE users (name TEXT)",
            "CREATE TABLE pets (name TEXT)",
        ])
        .unwrap();
        let users = conn.get_advanced_table("users").unwrap();
        users.addmultiple([row([("name", "Alice")]), row([("name", "Bob")])], true).unwrap();
        conn.get_advanced_table("pets").unwrap().addrow(row([("name", "Doge")])).unwrap();
        GraphConnection::new(conn).unwrap()
    }

    fn node(db: &GraphConnection, table: &str, id: i64) -> RowObject {
        let table = db.get_advanced_table(table).unwrap().with_shape(RowShape::Object);
        table.get(id).unwrap().into_object().unwrap()
    }

    #[test]
    fn test_edge_endpoints_and_relations() {
        let db = graph();
        let bob = node(&db, "users", 2);
        let doge = node(&db, "pets", 1);
        let id = db.create_edge(&bob, &doge, Some("owner"), Some("owned by")).unwrap();

        let edge = db.get_edge(id.id).unwrap();
        assert_eq!(edge.node1().unwrap(), bob);
        assert_eq!(edge.node2().unwrap(), doge);
        assert_eq!(edge.noderelation(&bob), Some("owner"));
        assert_eq!(edge.noderelation(&doge), Some("owned by"));
        assert_eq!(edge.noderelation(("users", 1)), None);
        assert_eq!(edge.other(&bob).unwrap(), doge);
        assert_eq!(edge.other(&doge).unwrap(), bob);
    }

    #[test]
    fn test_relation_lookups() {
        let db = graph();
        let doge = NodeRef::new("pets", 1);
        db.create_edge(("users", 2), &doge, Some("owner"), Some("owned by")).unwrap();
        db.create_edge(("users", 1), ("users", 2), Some("sister"), Some("sister")).unwrap();

        assert_eq!(db.edges(("users", 2)).unwrap().len(), 2);
        assert_eq!(db.edges_by_relation(("users", 2), "owner").unwrap().len(), 1);
        assert_eq!(db.edges_by_relation(&doge, "owner").unwrap().len(), 1);
        assert!(db.edges_with_self_relation(&doge, "owner").unwrap().is_empty());
        assert_eq!(db.edges_with_self_relation(&doge, "owned by").unwrap().len(), 1);
        assert_eq!(db.edges_with_self_relation(("users", 1), "sister").unwrap().len(), 1);
        assert!(db.edges(("users", 9)).unwrap().is_empty());
    }

    #[test]
    fn test_remove_edge() {
        let db = graph();
        let id = db.create_edge(("users", 1), ("pets", 1), None, None).unwrap();
        db.remove_edge(id.id).unwrap();
        assert!(matches!(db.get_edge(id.id), Err(Error::NotFound(_))));
        assert!(matches!(db.remove_edge(id.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_link_uses_template_in_either_orientation() {
        let db = graph();
        assert!(matches!(db.link(("users", 1), ("pets", 1)), Err(Error::NotFound(_))));

        db.create_auto_edge("users", "pets", Some("owner"), Some("owned by")).unwrap();
        assert_eq!(db.auto_edges("pets").unwrap().len(), 1);

        let id = db.link(("pets", 1), ("users", 1)).unwrap();
        let edge = db.get_edge(id.id).unwrap();
        assert_eq!(edge.node1_ref(), &NodeRef::new("users", 1));
        assert_eq!(edge.noderelation(("pets", 1)), Some("owned by"));
    }

    #[test]
    fn test_from_config_follows_graph_flag() {
        let conn = Connection::open_in_memory().unwrap();
        let off = DatabaseConfig::default();
        assert!(GraphConnection::from_config(conn.clone(), &off).unwrap().is_none());
        assert!(!conn.table_exists(EDGES_TABLE).unwrap());

        let on = DatabaseConfig { graph: true, ..Default::default() };
        let db = GraphConnection::from_config(conn.clone(), &on).unwrap().unwrap();
        assert!(db.edges(("users", 1)).unwrap().is_empty());

        // Existing tables are picked up without the flag.
        assert!(GraphConnection::from_config(conn, &off).unwrap().is_some());
    }

    #[test]
    fn test_reopen_keeps_edges() {
        let db = graph();
        db.create_edge(("users", 1), ("pets", 1), None, None).unwrap();
        let again = GraphConnection::new(db.connection().clone()).unwrap();
        assert_eq!(again.edges(("pets", 1)).unwrap().len(), 1);
    }
}
