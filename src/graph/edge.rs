//! Edge types
//!
//! An [`Edge`] links two rows, each side optionally labelled with a
//! relation name. An [`AutoEdge`] is a template naming two tables and the
//! relations an edge between their rows should carry.

use crate::connection::RowShape;
use crate::row::RowObject;
use crate::query::RowId;
use crate::value::Value;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;

/// A row addressed by table name and rowid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NodeRef {
    pub table: String,
    pub rowid: i64,
}

impl NodeRef {
    pub fn new(table: impl Into<String>, rowid: i64) -> Self {
        Self { table: table.into(), rowid }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.table, self.rowid)
    }
}

/// Anything that can stand for a graph node.
pub trait AsNode {
    fn node(&self) -> Result<NodeRef>;
}

impl AsNode for NodeRef {
    fn node(&self) -> Result<NodeRef> {
        Ok(self.clone())
    }
}

impl AsNode for RowId {
    fn node(&self) -> Result<NodeRef> {
        Ok(NodeRef::new(self.table.clone(), self.id))
    }
}

impl AsNode for (&str, i64) {
    fn node(&self) -> Result<NodeRef> {
        Ok(NodeRef::new(self.0, self.1))
    }
}

impl AsNode for RowObject {
    fn node(&self) -> Result<NodeRef> {
        let rowid = self.pk().and_then(Value::as_i64).ok_or_else(|| {
            Error::Query(format!("row of {} has no integer rowid", self.table().name()))
        })?;
        Ok(NodeRef::new(self.table().name(), rowid))
    }
}

impl<T: AsNode + ?Sized> AsNode for &T {
    fn node(&self) -> Result<NodeRef> {
        (**self).node()
    }
}

/// One row of `graphdb_edges`.
#[derive(Debug, Clone, Serialize)]
pub struct Edge {
    #[serde(skip)]
    row: RowObject,
    id: i64,
    node1: NodeRef,
    node1relation: Option<String>,
    node2: NodeRef,
    node2relation: Option<String>,
}

impl Edge {
    pub(crate) fn from_object(row: RowObject) -> Result<Self> {
        let id = row.pk().and_then(Value::as_i64);
        let text = |name: &str| row.value(name).and_then(Value::as_str).map(str::to_string);
        let node = |table: &str, rowid: &str| {
            Some(NodeRef::new(text(table)?, row.value(rowid).and_then(Value::as_i64)?))
        };
        let node1relation = text("node1relation");
        let node2relation = text("node2relation");
        match (id, node("node1table", "node1row"), node("node2table", "node2row")) {
            (Some(id), Some(node1), Some(node2)) => {
                Ok(Self { row, id, node1, node1relation, node2, node2relation })
            }
            _ => Err(Error::Query(format!("malformed edge row {:?}", row.row()))),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// The underlying `graphdb_edges` row.
    pub fn row(&self) -> &RowObject {
        &self.row
    }

    pub fn node1_ref(&self) -> &NodeRef {
        &self.node1
    }

    pub fn node2_ref(&self) -> &NodeRef {
        &self.node2
    }

    pub fn node1relation(&self) -> Option<&str> {
        self.node1relation.as_deref()
    }

    pub fn node2relation(&self) -> Option<&str> {
        self.node2relation.as_deref()
    }

    pub fn node1(&self) -> Result<RowObject> {
        self.resolve(&self.node1)
    }

    pub fn node2(&self) -> Result<RowObject> {
        self.resolve(&self.node2)
    }

    fn resolve(&self, node: &NodeRef) -> Result<RowObject> {
        let table = self
            .row
            .table()
            .connection()
            .get_advanced_table(&node.table)?
            .with_shape(RowShape::Object);
        table
            .get(node.rowid)?
            .into_object()
            .ok_or_else(|| Error::NotFound(format!("node {}", node)))
    }

    /// The relation this edge assigns to `node`, if `node` is an endpoint.
    pub fn noderelation(&self, node: impl AsNode) -> Option<&str> {
        let node = node.node().ok()?;
        if node == self.node1 {
            self.node1relation()
        } else if node == self.node2 {
            self.node2relation()
        } else {
            None
        }
    }

    /// `node2` when `node` is `node1`, otherwise `node1`.
    pub fn other(&self, node: impl AsNode) -> Result<RowObject> {
        if node.node()? == self.node1 {
            self.node2()
        } else {
            self.node1()
        }
    }

    /// True when `node` is either endpoint.
    pub fn touches(&self, node: &NodeRef) -> bool {
        *node == self.node1 || *node == self.node2
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.node1 == other.node1
            && self.node2 == other.node2
            && self.node1relation == other.node1relation
            && self.node2relation == other.node2relation
    }
}

/// One row of `graphdb_auto_edges`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoEdge {
    pub id: i64,
    pub node1table: String,
    pub node1relation: Option<String>,
    pub node2table: String,
    pub node2relation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_conversions() {
        let id = RowId::new("users", 3);
        assert_eq!(id.node().unwrap(), NodeRef::new("users", 3));
        assert_eq!(("pets", 1).node().unwrap(), NodeRef::new("pets", 1));
        assert_eq!((&NodeRef::new("a", 2)).node().unwrap().to_string(), "a#2");
    }
}
