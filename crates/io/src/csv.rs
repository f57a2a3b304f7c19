// CSV import (partner exports) and report export

use std::io::{Read, Write};
use std::path::Path;

use conciliador_recon::normalize::format_decimal;
use conciliador_recon::report::{Report, ReportCell};
use conciliador_recon::{Cell, Table};

pub fn import(path: &Path) -> Result<Table, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(&content, delimiter)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Higher field count breaks ties
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Excel on pt-BR Windows saves CSV as Windows-1252
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Parse CSV text into a table. The first non-empty record is the header row.
pub fn import_from_string(content: &str, delimiter: u8) -> Result<Table, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        match headers {
            None => {
                if record.iter().all(|f| f.trim().is_empty()) {
                    continue;
                }
                headers = Some(record.iter().map(|f| f.trim().to_string()).collect());
            }
            Some(_) => rows.push(record.iter().map(Cell::text).collect()),
        }
    }

    Ok(Table::new(headers.unwrap_or_default(), rows))
}

pub fn export_report(report: &Report, path: &Path) -> Result<(), String> {
    let file = std::fs::File::create(path).map_err(|e| format!("{}: {e}", path.display()))?;
    write_report(report, file)
}

/// Write the report as CSV: header, one line per row, then the totals line.
/// Money cells are plain decimals (`1234.56`).
pub fn write_report<W: Write>(report: &Report, out: W) -> Result<(), String> {
    let mut writer = csv::WriterBuilder::new().from_writer(out);

    writer
        .write_record(report.headers())
        .map_err(|e| e.to_string())?;
    for row in &report.rows {
        writer
            .write_record(row.cells.iter().map(cell_text))
            .map_err(|e| e.to_string())?;
    }
    writer
        .write_record(report.totals.iter().map(cell_text))
        .map_err(|e| e.to_string())?;

    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}

fn cell_text(cell: &ReportCell) -> String {
    match cell {
        ReportCell::Blank => String::new(),
        ReportCell::Text(s) => s.clone(),
        ReportCell::Money(cents) => format_decimal(*cents),
    }
}
