//! End-to-end walkthroughs over an in-memory or file-backed database

use rowgraph::graph::NodeRef;
use rowgraph::query::Operand;
use rowgraph::value::row;
use rowgraph::version::rebuild_table_script;
use rowgraph::{
    Connection, DotVersion, Field, Filter, GraphConnection, RowShape, Value, VersionedConnection,
};

fn values(records: &[rowgraph::Record]) -> Vec<Vec<Value>> {
    records.iter().map(|r| r.values()).collect()
}

fn tuple(name: &str, value: i64) -> Vec<Value> {
    vec![Value::from(name), Value::from(value)]
}

fn testtable() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    let (success, fail) = conn
        .add_and_validate_tables(["CREATE TABLE testtable(name TEXT, value INTEGER);"])
        .unwrap();
    assert_eq!(success.len(), 1);
    assert!(fail.is_empty());
    conn
}

fn hello_world() -> Connection {
    let conn = testtable();
    let table = conn.get_advanced_table("testtable").unwrap();
    let ids = table
        .addmultiple(
            [
                row([("name", Value::from("Hello")), ("value", Value::from(1))]),
                row([("name", Value::from("World")), ("value", Value::from(2))]),
            ],
            true,
        )
        .unwrap();
    assert_eq!(ids, vec![1, 2]);
    conn
}

#[test]
fn parse_and_add() {
    let conn = testtable();
    assert!(conn.list_tables().unwrap().contains(&"testtable".to_string()));
    assert_eq!(conn.get_table("testtable").unwrap().column_names(), vec!["name", "value"]);
}

#[test]
fn insert_and_select() {
    let conn = hello_world();
    let table = conn.get_advanced_table("testtable").unwrap();
    assert_eq!(
        values(&table.selectall(false).unwrap()),
        vec![tuple("Hello", 1), tuple("World", 2)]
    );
    assert_eq!(
        values(&table.selectall(true).unwrap()),
        vec![
            vec![Value::from(1), Value::from("Hello"), Value::from(1)],
            vec![Value::from(2), Value::from("World"), Value::from(2)],
        ]
    );
}

#[test]
fn filter_mini_language() {
    let conn = hello_world();
    let table = conn.get_advanced_table("testtable").unwrap();

    let lt = table.quickselect(Filter::parse([("value__lt", 2)]).unwrap()).unwrap();
    assert_eq!(values(&lt), vec![tuple("Hello", 1)]);

    let like = table.quickselect(Filter::parse([("name__likeany", "orl")]).unwrap()).unwrap();
    assert_eq!(values(&like), vec![tuple("World", 2)]);

    let within = Filter::parse([("value__in", Operand::list([1, 2]))]).unwrap();
    let first = table.quickselect(within).unwrap().into_first().unwrap();
    assert_eq!(first.values(), tuple("Hello", 1));

    let by_pk = table.quickselect(Filter::parse([("pk", 2)]).unwrap()).unwrap().into_first().unwrap();
    assert_eq!(by_pk.values(), tuple("World", 2));
}

#[test]
fn null_filters_partition_the_table() {
    let conn = hello_world();
    let table = conn.get_advanced_table("testtable").unwrap();
    table.addrow(row([("name", "Nobody")])).unwrap();

    let bare = table.quickselect(Filter::parse([("value", Value::Null)]).unwrap()).unwrap();
    let eq = table.quickselect(Filter::parse([("value__eq", Value::Null)]).unwrap()).unwrap();
    let ne = table.quickselect(Filter::parse([("value__ne", Value::Null)]).unwrap()).unwrap();
    assert_eq!(values(&bare), values(&eq));
    assert_eq!(bare.len(), 1);
    assert_eq!(ne.len(), 2);
}

#[test]
fn foreign_key_dereference() {
    let conn = Connection::open_in_memory().unwrap();
    conn.add_tables([
        "CREATE TABLE users (userid INTEGER PRIMARY KEY, fname TEXT)",
        "CREATE TABLE posts (postid INTEGER PRIMARY KEY, userid INT REFERENCES users(userid), post BLOB)",
    ])
    .unwrap();
    let users = conn.get_advanced_table("users").unwrap();
    let posts = conn.get_advanced_table("posts").unwrap();
    assert_eq!(users.addrow(row([("fname", "John")])).unwrap(), 1);
    assert_eq!(
        posts.addrow(row([("userid", Value::from(1)), ("post", Value::from("hi"))])).unwrap(),
        1
    );

    conn.set_default_shape(RowShape::Object);
    let post = posts.get(1).unwrap().into_object().unwrap();
    let Field::Row(Some(user)) = post.get("userid").unwrap() else {
        panic!("userid should resolve to a user row");
    };
    assert_eq!(user.get("fname").unwrap(), Field::Value(Value::from("John")));
}

#[test]
fn versioning_with_drop_column_rollback() {
    let db = VersionedConnection::new(Connection::open_in_memory().unwrap()).unwrap();
    db.add_tables(["CREATE TABLE a (name TEXT);"]).unwrap();
    assert!(db.get_version("a").unwrap().unwrap() == "1.0");

    let rollback = rebuild_table_script("a", &db.get_table("a").unwrap());
    let version = db
        .update_version("a", None, Some("ALTER TABLE a ADD COLUMN value INTEGER;"), Some(&rollback))
        .unwrap();
    assert_eq!(version, DotVersion::new([2, 0]));
    assert!(db.get_version("a").unwrap().unwrap() == "2.0");
    assert_eq!(db.get_table("a").unwrap().column_names(), vec!["name", "value"]);

    db.rollback_version("a").unwrap();
    assert!(db.get_version("a").unwrap().unwrap() == "1.0");
    assert_eq!(db.get_table("a").unwrap().column_names(), vec!["name"]);
}

#[test]
fn versions_survive_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");
    {
        let db = VersionedConnection::new(Connection::open(&path).unwrap()).unwrap();
        db.add_tables(["CREATE TABLE a (name TEXT)"]).unwrap();
        db.update_version("a", Some("1.5".parse().unwrap()), None, None).unwrap();
    }
    let db = VersionedConnection::new(Connection::open(&path).unwrap()).unwrap();
    assert!(db.get_version("a").unwrap().unwrap() == "1.5");
    assert_eq!(db.version_history("a").unwrap().len(), 2);
}

#[test]
fn graph_edges_between_rows() {
    let conn = Connection::open_in_memory().unwrap();
    conn.add_tables(["CREATE TABLE users (name TEXT)", "CREATE TABLE pets (name TEXT)"]).unwrap();
    let users = conn.get_advanced_table("users").unwrap().with_shape(RowShape::Object);
    let pets = conn.get_advanced_table("pets").unwrap().with_shape(RowShape::Object);
    users.addmultiple([row([("name", "Alice")]), row([("name", "Bob")])], true).unwrap();
    pets.addrow(row([("name", "Doge")])).unwrap();

    let graph = GraphConnection::new(conn).unwrap();
    let bob = users.quickselect(Filter::parse([("name", "Bob")]).unwrap()).unwrap();
    let bob = bob.into_first().unwrap().into_object().unwrap();
    let doge = pets.get(1).unwrap().into_object().unwrap();

    let k = graph.create_edge(&bob, &doge, Some("owner"), Some("owned by")).unwrap();
    let edge = graph.get_edge(k.id).unwrap();
    assert_eq!(edge.node1().unwrap(), bob);
    assert_eq!(edge.node2().unwrap(), doge);
    assert_eq!(edge.noderelation(&bob), Some("owner"));
    assert_eq!(edge.other(&bob).unwrap(), doge);

    let owned = graph.edges_by_relation(&bob, "owner").unwrap();
    assert_eq!(owned, vec![edge]);
    assert!(graph.edges(NodeRef::new("users", 1)).unwrap().is_empty());
}
