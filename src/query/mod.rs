//! Table query layer
//!
//! [`AdvancedTable`] binds one table to a connection and offers CRUD driven
//! by the [`Filter`] mini-language.

pub mod filter;
pub mod result;
pub mod table;

pub use filter::{col, ColumnRef, Condition, Filter, Op, Operand};
pub use result::{QueryResult, RowId};
pub use table::{AdvancedTable, NewRow, Select, REPLACEMENT_LIMIT};
