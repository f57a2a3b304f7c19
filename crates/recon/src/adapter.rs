use serde::Serialize;

use crate::config::{AdapterSpec, AmountCombine, UnparsedAmount};
use crate::error::ReconError;
use crate::model::CanonicalRecord;
use crate::normalize::{parse_amount, parse_date};
use crate::table::{Cell, Table};

/// Non-fatal problems found while normalizing a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdapterWarning {
    UnparsedDate { row: usize, value: String },
    UnparsedAmount { row: usize, column: String, value: String },
}

impl std::fmt::Display for AdapterWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnparsedDate { row, value } => {
                write!(f, "row {row}: unparseable date '{value}'")
            }
            Self::UnparsedAmount { row, column, value } => {
                write!(f, "row {row}: unparseable amount '{value}' in column '{column}'")
            }
        }
    }
}

/// Report headers for one side, as declared by the adapter (or query).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideLabels {
    pub order_id: String,
    pub date: String,
    pub amount: String,
    /// Extra field labels, in declaration order.
    pub extras: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AdapterOutput {
    pub records: Vec<CanonicalRecord>,
    pub warnings: Vec<AdapterWarning>,
    pub labels: SideLabels,
}

impl AdapterSpec {
    pub fn side_labels(&self) -> SideLabels {
        SideLabels {
            order_id: self.order_id_label().to_string(),
            date: self.date_label().to_string(),
            amount: self.amount_label().to_string(),
            extras: self.extra_columns.iter().map(|e| e.label().to_string()).collect(),
        }
    }

    /// Normalize a sheet into canonical records.
    ///
    /// Every required column must be present in the header row. Rows are
    /// numbered as in the spreadsheet (header = 1) for warnings.
    pub fn apply(&self, table: &Table) -> Result<AdapterOutput, ReconError> {
        let idx = |column: &str| -> Result<usize, ReconError> {
            table.column_index(column).ok_or_else(|| ReconError::MissingColumn {
                adapter: self.name.clone(),
                column: column.to_string(),
            })
        };

        for column in &self.required_columns {
            idx(column)?;
        }

        let id_idx = idx(&self.order_id_column)?;
        let date_idx = idx(&self.date_column)?;
        let amount_idx: Vec<(usize, &str)> = self
            .amount
            .columns
            .iter()
            .map(|c| idx(c).map(|i| (i, c.as_str())))
            .collect::<Result<_, _>>()?;
        let extra_idx: Vec<(usize, &str)> = self
            .extra_columns
            .iter()
            .map(|e| idx(&e.column).map(|i| (i, e.label())))
            .collect::<Result<_, _>>()?;

        let mut records = Vec::with_capacity(table.len());
        let mut warnings = Vec::new();

        for row in 0..table.len() {
            if table.row_is_blank(row) {
                continue;
            }
            let source_row = row + 2;

            let date_cell = table.cell(row, date_idx);
            let date = parse_date(date_cell);
            if date.is_none() {
                warnings.push(AdapterWarning::UnparsedDate {
                    row: source_row,
                    value: date_cell.display(),
                });
            }

            let mut coerced = false;
            let mut total: i64 = 0;
            for &(col, name) in &amount_idx {
                let cell = table.cell(row, col);
                match parse_amount(cell) {
                    Some(cents) => match total.checked_add(cents) {
                        Some(sum) => total = sum,
                        None => {
                            coerced = true;
                            total = 0;
                            warnings.push(AdapterWarning::UnparsedAmount {
                                row: source_row,
                                column: name.to_string(),
                                value: cell.display(),
                            });
                            break;
                        }
                    },
                    None => {
                        if self.amount.combine == AmountCombine::Sum && matches!(cell, Cell::Empty) {
                            // blank discount/fee columns are zero
                            continue;
                        }
                        coerced = true;
                        warnings.push(AdapterWarning::UnparsedAmount {
                            row: source_row,
                            column: name.to_string(),
                            value: cell.display(),
                        });
                    }
                }
            }
            let amount_cents = if coerced && self.unparsed_amount == UnparsedAmount::Null {
                None
            } else {
                Some(total)
            };

            let mut record = CanonicalRecord::new(table.cell(row, id_idx).display(), date, amount_cents)
                .with_source_row(source_row);
            record.amount_coerced = coerced;
            for &(col, label) in &extra_idx {
                record = record.with_extra(label, table.cell(row, col).display());
            }
            records.push(record);
        }

        for w in &warnings {
            log::warn!("{}: {w}", self.name);
        }
        log::debug!(
            "{}: {} records from {} rows, {} warnings",
            self.name,
            records.len(),
            table.len(),
            warnings.len()
        );

        Ok(AdapterOutput {
            records,
            warnings,
            labels: self.side_labels(),
        })
    }
}
