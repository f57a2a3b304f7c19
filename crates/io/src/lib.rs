// File I/O: sheet import, report export, system-side query backends

pub mod csv;
pub mod json;
pub mod sqlite;
pub mod table_source;
pub mod xlsx;

pub use table_source::{read_table, SpreadsheetQuery, TableFormat};
