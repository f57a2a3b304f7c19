// JSON export of a reconciliation result

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use conciliador_recon::ReconResult;

/// Export the full result (meta, summary, pairs, report) as pretty JSON.
pub fn export_result(result: &ReconResult, path: &Path) -> Result<(), String> {
    let file = File::create(path).map_err(|e| format!("{}: {e}", path.display()))?;
    write_result(result, BufWriter::new(file))
}

pub fn write_result<W: Write>(result: &ReconResult, mut out: W) -> Result<(), String> {
    serde_json::to_writer_pretty(&mut out, result).map_err(|e| e.to_string())?;
    writeln!(out).map_err(|e| e.to_string())?;
    out.flush().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    use chrono::NaiveDate;
    use conciliador_recon::report::{ColumnMapping, ReportOptions};
    use conciliador_recon::{run, CanonicalRecord, ReconInput};

    #[test]
    fn test_json_export() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 5);
        let result = run(
            "goomer",
            ReconInput {
                left: vec![CanonicalRecord::new("G1", d, Some(2590)).with_extra("Cupom", "BEMVINDO")],
                right: vec![],
            },
            &ColumnMapping::standard(),
            &ReportOptions::default(),
        );

        let dir = tempdir().unwrap();
        let path = dir.path().join("result.json");
        export_result(&result, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert_eq!(parsed["meta"]["run_name"], "goomer");
        assert_eq!(parsed["summary"]["left_only"], 1);
        let pair = &parsed["reconciliation"]["pairs"][0];
        assert_eq!(pair["kind"], "left_only");
        assert_eq!(pair["left"]["date"], "2024-01-05");
        assert_eq!(pair["left"]["amount_cents"], 2590);
        assert_eq!(pair["left"]["extras"]["Cupom"], "BEMVINDO");
        assert_eq!(parsed["report"]["rows"][0]["cells"][2], 2590);
        assert!(parsed["report"]["rows"][0]["cells"][3].is_null());
    }
}
