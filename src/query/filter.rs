//! Filter mini-language
//!
//! Filters are built either with the builder (`col("value").lt(2)`) or from
//! `column__op` keys (`Filter::parse([("value__lt", 2)])`). Both produce the
//! same list of AND-joined conditions, rendered to parameterised SQL against
//! a table's schema.

use crate::schema::Table;
use crate::value::{NamedParams, Value};
use crate::{Error, Result};
use std::fmt;

/// Comparison operator, one per `__suffix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    /// `LIKE '%value%'`
    LikeAny,
    In,
    NotIn,
}

impl Op {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "eq" => Op::Eq,
            "ne" => Op::Ne,
            "lt" => Op::Lt,
            "lte" => Op::Lte,
            "gt" => Op::Gt,
            "gte" => Op::Gte,
            "like" => Op::Like,
            "likeany" => Op::LikeAny,
            "in" => Op::In,
            "notin" => Op::NotIn,
            _ => return None,
        })
    }

    fn sql(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Like | Op::LikeAny => "LIKE",
            Op::In => "IN",
            Op::NotIn => "NOT IN",
        }
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    List(Vec<Value>),
}

macro_rules! operand_from {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Operand {
            fn from(value: $ty) -> Self {
                Operand::Value(value.into())
            }
        })*
    };
}

operand_from!(Value, &Value, i64, i32, u32, bool, f64, &str, String);

impl From<Vec<Value>> for Operand {
    fn from(values: Vec<Value>) -> Self {
        Operand::List(values)
    }
}

impl Operand {
    pub fn list<T: Into<Value>>(values: impl IntoIterator<Item = T>) -> Self {
        Operand::List(values.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: Op,
    pub operand: Operand,
}

/// AND-joined conditions. The empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

/// Start a condition on `name`. `"pk"` names the rowid column.
pub fn col(name: impl Into<String>) -> ColumnRef {
    ColumnRef { name: name.into() }
}

pub struct ColumnRef {
    name: String,
}

impl ColumnRef {
    fn condition(self, op: Op, operand: Operand) -> Filter {
        Filter { conditions: vec![Condition { column: self.name, op, operand }] }
    }

    pub fn eq(self, rhs: impl Into<Value>) -> Filter {
        self.condition(Op::Eq, Operand::Value(rhs.into()))
    }

    pub fn ne(self, rhs: impl Into<Value>) -> Filter {
        self.condition(Op::Ne, Operand::Value(rhs.into()))
    }

    pub fn lt(self, rhs: impl Into<Value>) -> Filter {
        self.condition(Op::Lt, Operand::Value(rhs.into()))
    }

    pub fn lte(self, rhs: impl Into<Value>) -> Filter {
        self.condition(Op::Lte, Operand::Value(rhs.into()))
    }

    pub fn gt(self, rhs: impl Into<Value>) -> Filter {
        self.condition(Op::Gt, Operand::Value(rhs.into()))
    }

    pub fn gte(self, rhs: impl Into<Value>) -> Filter {
        self.condition(Op::Gte, Operand::Value(rhs.into()))
    }

    pub fn like(self, pattern: impl Into<Value>) -> Filter {
        self.condition(Op::Like, Operand::Value(pattern.into()))
    }

    /// Substring match: `LIKE '%text%'`.
    pub fn likeany(self, text: impl Into<Value>) -> Filter {
        self.condition(Op::LikeAny, Operand::Value(text.into()))
    }

    pub fn is_in<T: Into<Value>>(self, values: impl IntoIterator<Item = T>) -> Filter {
        self.condition(Op::In, Operand::list(values))
    }

    pub fn not_in<T: Into<Value>>(self, values: impl IntoIterator<Item = T>) -> Filter {
        self.condition(Op::NotIn, Operand::list(values))
    }

    pub fn is_null(self) -> Filter {
        self.eq(Value::Null)
    }

    pub fn is_not_null(self) -> Filter {
        self.ne(Value::Null)
    }
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `column__op` keys. A key without a suffix means `__eq`.
    pub fn parse<K, V, I>(pairs: I) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<Operand>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut filter = Filter::new();
        for (key, operand) in pairs {
            filter = filter.with(key.as_ref(), operand)?;
        }
        Ok(filter)
    }

    /// Add one `column__op` condition.
    pub fn with(mut self, key: &str, operand: impl Into<Operand>) -> Result<Self> {
        let (column, op) = match key.rsplit_once("__") {
            Some((column, suffix)) => {
                let op = Op::from_suffix(suffix)
                    .ok_or_else(|| Error::Query(format!("unknown filter option `{}` in `{}`", suffix, key)))?;
                (column, op)
            }
            None => (key, Op::Eq),
        };
        if column.is_empty() {
            return Err(Error::Query(format!("filter key `{}` names no column", key)));
        }
        self.conditions.push(Condition { column: column.to_string(), op, operand: operand.into() });
        Ok(self)
    }

    pub fn and(mut self, other: Filter) -> Self {
        self.conditions.extend(other.conditions);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Render to a SQL boolean expression, binding values into `params`.
    /// `None` for the empty filter.
    pub(crate) fn to_sql(&self, table: &Table, params: &mut Placeholders) -> Result<Option<String>> {
        if self.conditions.is_empty() {
            return Ok(None);
        }
        let mut parts = Vec::with_capacity(self.conditions.len());
        for condition in &self.conditions {
            let column = resolve_column(table, &condition.column)?;
            parts.push(render(&column, condition, params)?);
        }
        Ok(Some(parts.join(" AND ")))
    }
}

fn render(column: &str, condition: &Condition, params: &mut Placeholders) -> Result<String> {
    let Condition { op, operand, .. } = condition;
    match (op, operand) {
        (Op::In | Op::NotIn, Operand::List(values)) => {
            let names: Vec<String> = values.iter().map(|v| params.bind(v.clone())).collect();
            Ok(format!("{} {} ({})", column, op.sql(), names.join(", ")))
        }
        (Op::In | Op::NotIn, Operand::Value(_)) => Err(Error::Query(format!(
            "`{}` with {} needs a list of values",
            condition.column,
            op.sql()
        ))),
        (_, Operand::List(_)) => Err(Error::Query(format!(
            "`{}` with {} takes a single value",
            condition.column,
            op.sql()
        ))),
        (Op::Eq, Operand::Value(Value::Null)) => Ok(format!("{} IS NULL", column)),
        (Op::Ne, Operand::Value(Value::Null)) => Ok(format!("{} IS NOT NULL", column)),
        (Op::LikeAny, Operand::Value(value)) => {
            let name = params.bind(Value::Text(format!("%{}%", value)));
            Ok(format!("{} LIKE {}", column, name))
        }
        (_, Operand::Value(value)) => {
            let name = params.bind(value.clone());
            Ok(format!("{} {} {}", column, op.sql(), name))
        }
    }
}

/// Map a filter or assignment column onto SQL, checking it exists.
/// `pk` resolves to the table's rowid column.
pub(crate) fn resolve_column(table: &Table, name: &str) -> Result<String> {
    if name == "pk" {
        let rowid = table.rowid().ok_or_else(|| {
            Error::Query(format!("table {} is WITHOUT ROWID and has no pk", table.name()))
        })?;
        return Ok(quote(&rowid));
    }
    if let Some(column) = table.column(name) {
        return Ok(column.name.raw().to_string());
    }
    if is_rowid_name(name) && !table.without_rowid() {
        return Ok(name.to_string());
    }
    Err(Error::Query(format!("table {} has no column {}", table.name(), name)))
}

pub(crate) fn is_rowid_name(name: &str) -> bool {
    ["rowid", "oid", "_rowid_"].iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn quote(name: &str) -> String {
    crate::identifier::Identifier::new(name).raw().to_string()
}

/// Generates `:p0, :p1, ...` and collects their values, so names stay unique
/// across every clause of one statement.
#[derive(Debug, Default)]
pub(crate) struct Placeholders {
    params: NamedParams,
}

impl Placeholders {
    pub fn bind(&mut self, value: Value) -> String {
        let name = format!(":p{}", self.params.len());
        self.params.push((name.clone(), value));
        name
    }

    pub fn into_params(self) -> NamedParams {
        self.params
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .conditions
            .iter()
            .map(|c| format!("{}__{:?}", c.column, c.op).to_lowercase())
            .collect();
        write!(f, "{}", parts.join(" & "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::parse("CREATE TABLE t (name TEXT, value INTEGER)").unwrap()
    }

    fn render_filter(filter: &Filter) -> (Option<String>, NamedParams) {
        let mut params = Placeholders::default();
        let sql = filter.to_sql(&table(), &mut params).unwrap();
        (sql, params.into_params())
    }

    #[test]
    fn test_builder_and_keys_agree() {
        let built = col("value").lt(2).and(col("name").likeany("orl"));
        let parsed = Filter::parse([("value__lt", Operand::from(2)), ("name__likeany", "orl".into())])
            .unwrap();
        assert_eq!(built, parsed);

        let (sql, params) = render_filter(&built);
        assert_eq!(sql.as_deref(), Some("value < :p0 AND name LIKE :p1"));
        assert_eq!(params[1].1, Value::from("%orl%"));
    }

    #[test]
    fn test_null_rewriting() {
        let (sql, params) = render_filter(&Filter::parse([("name", Value::Null)]).unwrap());
        assert_eq!(sql.as_deref(), Some("name IS NULL"));
        assert!(params.is_empty());

        let (sql, _) = render_filter(&col("name").eq(Value::Null));
        assert_eq!(sql.as_deref(), Some("name IS NULL"));

        let (sql, _) = render_filter(&Filter::new().with("name__ne", Value::Null).unwrap());
        assert_eq!(sql.as_deref(), Some("name IS NOT NULL"));
    }

    #[test]
    fn test_in_lists_number_placeholders_uniquely() {
        let filter = col("value").is_in([1, 2]).and(col("name").not_in(["a"])).and(col("pk").gte(1));
        let (sql, params) = render_filter(&filter);
        assert_eq!(
            sql.as_deref(),
            Some("value IN (:p0, :p1) AND name NOT IN (:p2) AND rowid >= :p3")
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_errors() {
        let t = table();
        let mut params = Placeholders::default();
        assert!(matches!(Filter::new().with("value__between", 1), Err(Error::Query(_))));
        assert!(matches!(
            col("missing").eq(1).to_sql(&t, &mut params),
            Err(Error::Query(_))
        ));
        assert!(matches!(
            Filter::new().with("value__in", 1).unwrap().to_sql(&t, &mut params),
            Err(Error::Query(_))
        ));
        assert!(matches!(
            Filter::new().with("value", Operand::list([1, 2])).unwrap().to_sql(&t, &mut params),
            Err(Error::Query(_))
        ));
    }

    #[test]
    fn test_pk_uses_rowid_alias() {
        let t = Table::parse("CREATE TABLE u (userid INTEGER PRIMARY KEY, fname TEXT)").unwrap();
        let mut params = Placeholders::default();
        let sql = col("pk").eq(3).to_sql(&t, &mut params).unwrap();
        assert_eq!(sql.as_deref(), Some("userid = :p0"));
    }

    #[test]
    fn test_empty_filter_renders_nothing() {
        assert_eq!(render_filter(&Filter::new()).0, None);
    }
}
