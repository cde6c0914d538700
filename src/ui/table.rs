use crate::ui::output;
use crate::value::Value;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// One line of the `tables` listing.
#[derive(Tabled, Serialize)]
pub struct TableSummary {
    #[tabled(rename = "Table")]
    pub name: String,
    #[tabled(rename = "Rowid")]
    pub rowid: String,
    #[tabled(rename = "Columns")]
    pub columns: usize,
    #[tabled(rename = "Rows")]
    pub rows: i64,
}

/// One column of the `schema` listing.
#[derive(Tabled)]
pub struct ColumnSummary {
    #[tabled(rename = "Column")]
    pub name: String,
    #[tabled(rename = "Type")]
    pub datatype: String,
    #[tabled(rename = "Constraints")]
    pub constraints: String,
}

pub fn rows_table<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Grid of query results under `columns`.
pub fn records_table(columns: &[String], records: &[Vec<Value>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| output::key(c)));
    for record in records {
        builder.push_record(record.iter().map(output::value));
    }
    builder.build().with(Style::rounded()).to_string()
}
