pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{empty, field, header, key, relation, success, value};
pub use table::{records_table, rows_table, ColumnSummary, TableSummary};
pub use theme::{theme, Theme};
