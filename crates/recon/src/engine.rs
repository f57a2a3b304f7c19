use crate::evidence::compute_summary;
use crate::matcher::reconcile;
use crate::model::{ReconInput, ReconMeta, ReconResult};
use crate::report::{assemble, ColumnMapping, ReportOptions};

/// Reconcile pre-loaded records and assemble the report.
///
/// Never fails: data problems surface as unmatched rows, not errors.
pub fn run(
    name: &str,
    input: ReconInput,
    mapping: &ColumnMapping,
    options: &ReportOptions,
) -> ReconResult {
    let left_count = input.left.len();
    let right_count = input.right.len();

    let reconciliation = reconcile(input.left, input.right);
    let summary = compute_summary(&reconciliation);
    let report = assemble(&reconciliation, mapping, options);

    log::info!(
        "{name}: {left_count} delivery / {right_count} system records, {} matched, {} unmatched",
        summary.matched,
        summary.unmatched()
    );

    ReconResult {
        meta: ReconMeta {
            run_name: name.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        reconciliation,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CanonicalRecord;
    use chrono::NaiveDate;

    #[test]
    fn run_produces_consistent_result() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1);
        let input = ReconInput {
            left: vec![CanonicalRecord::new("A", d, Some(1000))],
            right: vec![CanonicalRecord::new("B", d, Some(1000))],
        };
        let result = run("teste", input, &ColumnMapping::standard(), &ReportOptions::default());

        assert_eq!(result.meta.run_name, "teste");
        assert_eq!(result.meta.engine_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(result.summary.matched, 1);
        assert_eq!(result.report.rows.len(), result.reconciliation.len());
    }
}
