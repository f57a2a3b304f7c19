//! `conciliador-recon`: delivery order reconciliation engine.
//!
//! Pure engine crate: format adapters turn loaded sheets into canonical
//! records, the matcher pairs them by exact (date, amount), and the report
//! assembler flattens the result. No file or database IO.

pub mod adapter;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod query;
pub mod report;
pub mod table;

pub use adapter::{AdapterOutput, AdapterWarning, SideLabels};
pub use config::AdapterSpec;
pub use engine::run;
pub use error::ReconError;
pub use matcher::{reconcile, reconcile_by};
pub use model::{CanonicalRecord, MatchKey, MatchStatus, MatchedPair, ReconInput, ReconResult, Reconciliation};
pub use query::{QueryFilter, SystemQuery};
pub use report::{assemble, ColumnMapping, Report, ReportOptions};
pub use table::{Cell, Table};
