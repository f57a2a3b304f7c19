// Format dispatch for sheet import, and the spreadsheet-backed system query

use std::path::{Path, PathBuf};

use conciliador_recon::query::{QueryFilter, SystemQuery};
use conciliador_recon::{AdapterSpec, CanonicalRecord, ReconError, SideLabels, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// xlsx, xlsm, xls, xlsb, ods (anything calamine opens)
    Excel,
    Csv,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Excel),
            "csv" | "tsv" | "txt" => Ok(Self::Csv),
            "" => Err(format!("{}: missing file extension", path.display())),
            other => Err(format!("{}: unsupported file type '.{other}'", path.display())),
        }
    }
}

/// Load a sheet from disk. `sheet` selects a worksheet in Excel files and is
/// ignored for CSV.
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table, String> {
    match TableFormat::from_path(path)? {
        TableFormat::Excel => crate::xlsx::import(path, sheet),
        TableFormat::Csv => crate::csv::import(path),
    }
}

/// System-side records read from an exported sheet (e.g. `ifood_db`,
/// `delivery_db`) instead of the live database.
///
/// Only the date range of the filter applies; store, client and payment
/// method are assumed to be pre-selected by whoever produced the export.
pub struct SpreadsheetQuery {
    path: PathBuf,
    sheet: Option<String>,
    adapter: AdapterSpec,
}

impl SpreadsheetQuery {
    pub fn new(path: impl Into<PathBuf>, adapter: AdapterSpec) -> Self {
        Self {
            path: path.into(),
            sheet: None,
            adapter,
        }
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }
}

impl SystemQuery for SpreadsheetQuery {
    fn fetch(&self, filter: &QueryFilter) -> Result<Vec<CanonicalRecord>, ReconError> {
        filter.validate()?;
        let table = read_table(&self.path, self.sheet.as_deref()).map_err(ReconError::Io)?;
        let output = self.adapter.apply(&table)?;

        let total = output.records.len();
        let records: Vec<CanonicalRecord> = output
            .records
            .into_iter()
            .filter(|r| r.date.map_or(true, |d| filter.contains(d)))
            .collect();

        log::debug!(
            "{}: {} of {} system rows within {}..{}",
            self.path.display(),
            records.len(),
            total,
            filter.start,
            filter.end
        );
        Ok(records)
    }

    fn labels(&self) -> SideLabels {
        self.adapter.side_labels()
    }
}
