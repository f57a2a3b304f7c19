// Excel import (xlsx, xls, xlsb, ods) and report export (xlsx only)
//
// Import: first (or named) sheet, header at the first non-empty row.
// Export: the consolidated report as a single formatted sheet.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};

use conciliador_recon::normalize::excel_serial_to_datetime;
use conciliador_recon::report::{ColumnKind, Report, ReportCell};
use conciliador_recon::{Cell, Table};

/// Sheet name of the exported report.
pub const REPORT_SHEET: &str = "Consolidado";
/// Number format applied to money cells.
pub const CURRENCY_FORMAT: &str = "R$ #,##0.00";
const COLUMN_WIDTH: f64 = 18.0;

/// Import one sheet of an Excel-family file into a table.
pub fn import(path: &Path, sheet: Option<&str>) -> Result<Table, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| format!("Sheet '{name}' not found (available: {})", sheet_names.join(", ")))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| "Excel file contains no sheets".to_string())?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for row in range.rows() {
        let cells: Vec<Cell> = row.iter().map(convert_cell).collect();
        match headers {
            None => {
                if cells.iter().all(Cell::is_blank) {
                    continue;
                }
                headers = Some(cells.iter().map(Cell::display).collect());
            }
            Some(_) => rows.push(cells),
        }
    }

    log::debug!("{}: sheet '{}', {} data rows", path.display(), sheet_name, rows.len());
    Ok(Table::new(headers.unwrap_or_default(), rows))
}

fn convert_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => {
            // 1900 date system assumed
            let serial = dt.as_f64();
            match excel_serial_to_datetime(serial) {
                Some(value) => Cell::Date(value),
                None => Cell::Number(serial),
            }
        }
        Data::DateTimeIso(s) => Cell::text(s.as_str()),
        Data::DurationIso(s) => Cell::text(s.as_str()),
    }
}

/// Export the report to an `.xlsx` file.
pub fn export_report(report: &Report, path: &Path) -> Result<(), String> {
    let mut workbook = build_workbook(report)?;
    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))
}

/// Export the report to an in-memory `.xlsx` file.
pub fn report_to_buffer(report: &Report) -> Result<Vec<u8>, String> {
    let mut workbook = build_workbook(report)?;
    workbook
        .save_to_buffer()
        .map_err(|e| format!("Failed to build XLSX file: {}", e))
}

fn build_workbook(report: &Report) -> Result<XlsxWorkbook, String> {
    let mut workbook = XlsxWorkbook::new();

    let header_format = Format::new().set_bold();
    let money_format = Format::new().set_num_format(CURRENCY_FORMAT);
    let text_format = Format::new();
    let total_money_format = Format::new().set_bold().set_num_format(CURRENCY_FORMAT);
    let total_text_format = Format::new().set_bold();

    let worksheet = workbook
        .add_worksheet()
        .set_name(REPORT_SHEET)
        .map_err(|e| format!("Failed to create sheet '{}': {}", REPORT_SHEET, e))?;

    for (col, column) in report.columns.iter().enumerate() {
        let col = col as u16;
        worksheet
            .write_string_with_format(0, col, &column.header, &header_format)
            .map_err(|e| format!("Failed to write header: {}", e))?;
        worksheet
            .set_column_width(col, COLUMN_WIDTH)
            .map_err(|e| format!("Failed to set column width: {}", e))?;
    }

    let body = report.rows.iter().map(|r| (&r.cells, false));
    let totals = std::iter::once((&report.totals, true));
    for (offset, (cells, is_total)) in body.chain(totals).enumerate() {
        let row = offset as u32 + 1;
        let (text_fmt, money_fmt) = if is_total {
            (&total_text_format, &total_money_format)
        } else {
            (&text_format, &money_format)
        };

        for (col, cell) in cells.iter().enumerate() {
            let col_u16 = col as u16;
            match cell {
                ReportCell::Blank => {
                    // Keep the currency format on empty money cells
                    if report.columns.get(col).map(|c| c.kind) == Some(ColumnKind::Money) {
                        worksheet
                            .write_blank(row, col_u16, money_fmt)
                            .map_err(|e| format!("Failed to write cell: {}", e))?;
                    }
                }
                ReportCell::Text(s) => {
                    worksheet
                        .write_string_with_format(row, col_u16, s, text_fmt)
                        .map_err(|e| format!("Failed to write cell: {}", e))?;
                }
                ReportCell::Money(cents) => {
                    worksheet
                        .write_number_with_format(row, col_u16, *cents as f64 / 100.0, money_fmt)
                        .map_err(|e| format!("Failed to write cell: {}", e))?;
                }
            }
        }
    }

    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| format!("Failed to freeze header row: {}", e))?;

    Ok(workbook)
}
