//! DDL parser
//!
//! Hand-written recursive descent over a regex keyword scanner. Each entry
//! point consumes its whole input or fails with [`Error::Parse`].
//!
//! [`Error::Parse`]: crate::Error::Parse

mod ddl;
mod scanner;
mod select;

pub use ddl::{
    parse_column, parse_script, parse_statement, parse_table, parse_table_constraint, parse_view,
    parse_virtual_table,
};
pub use select::parse_select;
