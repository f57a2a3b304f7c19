//! Report assembler: turns a reconciliation into a flat, presentation-ready
//! table (mapped columns for both sides, status, difference, totals row).

use serde::{Deserialize, Serialize};

use crate::adapter::SideLabels;
use crate::model::{CanonicalRecord, MatchStatus, MatchedPair, Reconciliation};

const DATE_FORMAT: &str = "%d/%m/%Y";

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "field", content = "name", rename_all = "snake_case")]
pub enum ReportField {
    OrderId,
    Date,
    Amount,
    Extra(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub header: String,
    pub field: ReportField,
}

impl ColumnSpec {
    pub fn new(header: impl Into<String>, field: ReportField) -> Self {
        Self {
            header: header.into(),
            field,
        }
    }
}

/// Output columns for the delivery (left) and system (right) sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub left: Vec<ColumnSpec>,
    pub right: Vec<ColumnSpec>,
}

impl ColumnMapping {
    /// The consolidated layout: `Pedido Delivery | Data Delivery | Valor
    /// Delivery | ID Venda Sistema | Data Sistema | Valor Sistema`.
    pub fn standard() -> Self {
        Self {
            left: vec![
                ColumnSpec::new("Pedido Delivery", ReportField::OrderId),
                ColumnSpec::new("Data Delivery", ReportField::Date),
                ColumnSpec::new("Valor Delivery", ReportField::Amount),
            ],
            right: vec![
                ColumnSpec::new("ID Venda Sistema", ReportField::OrderId),
                ColumnSpec::new("Data Sistema", ReportField::Date),
                ColumnSpec::new("Valor Sistema", ReportField::Amount),
            ],
        }
    }

    /// Columns named after each side's own labels. A right-side header that
    /// collides with an earlier one gets a ` Sistema` suffix.
    pub fn from_labels(left: &SideLabels, right: &SideLabels) -> Self {
        let left_cols = side_columns(left);
        let mut taken: Vec<String> = left_cols.iter().map(|c| c.header.clone()).collect();

        let mut right_cols = side_columns(right);
        for col in &mut right_cols {
            if taken.contains(&col.header) {
                col.header = format!("{} Sistema", col.header);
            }
            taken.push(col.header.clone());
        }

        Self {
            left: left_cols,
            right: right_cols,
        }
    }

    /// Append extra-field columns to each side, headed by their labels.
    /// Right-side extras that collide with a header already present get
    /// the ` Sistema` suffix.
    pub fn with_extras(mut self, left: &[String], right: &[String]) -> Self {
        self.left
            .extend(left.iter().map(|l| ColumnSpec::new(l.clone(), ReportField::Extra(l.clone()))));
        for label in right {
            let taken = self
                .left
                .iter()
                .chain(&self.right)
                .any(|c| c.header == *label);
            let header = if taken { format!("{label} Sistema") } else { label.clone() };
            self.right.push(ColumnSpec::new(header, ReportField::Extra(label.clone())));
        }
        self
    }

    pub fn width(&self) -> usize {
        self.left.len() + self.right.len()
    }
}

fn side_columns(labels: &SideLabels) -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new(labels.order_id.clone(), ReportField::OrderId),
        ColumnSpec::new(labels.date.clone(), ReportField::Date),
        ColumnSpec::new(labels.amount.clone(), ReportField::Amount),
    ]
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOrder {
    /// Pair order as produced by the matcher.
    #[default]
    Engine,
    /// Stable sort by left date, else right date; undated rows last.
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportOptions {
    pub order: ReportOrder,
    pub status_header: String,
    pub difference_header: String,
    pub total_label: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            order: ReportOrder::Engine,
            status_header: "Discrepância Inicial".into(),
            difference_header: "Diferença".into(),
            total_label: "Total".into(),
        }
    }
}

impl ReportOptions {
    pub fn from_toml(s: &str) -> Result<Self, crate::ReconError> {
        toml::from_str(s).map_err(|e| crate::ReconError::ConfigParse(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportColumn {
    pub header: String,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReportCell {
    Blank,
    Text(String),
    /// Centavos.
    Money(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub cells: Vec<ReportCell>,
    pub status: MatchStatus,
    pub difference_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub columns: Vec<ReportColumn>,
    pub rows: Vec<ReportRow>,
    /// Trailing totals row, same width as `columns`.
    pub totals: Vec<ReportCell>,
}

impl Report {
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.header.as_str()).collect()
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.header == header)
    }
}

/// Build the report for a reconciliation.
///
/// One row per pair. Cells for an absent side are blank. The difference is
/// left minus right (the lone amount when a side is absent); the totals row
/// sums every amount column plus the absolute differences.
pub fn assemble(recon: &Reconciliation, mapping: &ColumnMapping, options: &ReportOptions) -> Report {
    let mut columns: Vec<ReportColumn> = mapping
        .left
        .iter()
        .chain(mapping.right.iter())
        .map(|c| ReportColumn {
            header: c.header.clone(),
            kind: if c.field == ReportField::Amount {
                ColumnKind::Money
            } else {
                ColumnKind::Text
            },
        })
        .collect();
    columns.push(ReportColumn {
        header: options.status_header.clone(),
        kind: ColumnKind::Text,
    });
    columns.push(ReportColumn {
        header: options.difference_header.clone(),
        kind: ColumnKind::Money,
    });

    let mut order: Vec<&MatchedPair> = recon.pairs.iter().collect();
    if options.order == ReportOrder::Date {
        order.sort_by_key(|p| {
            let date = p.date();
            (date.is_none(), date)
        });
    }

    let rows: Vec<ReportRow> = order
        .into_iter()
        .map(|pair| {
            let mut cells = Vec::with_capacity(columns.len());
            side_cells(&mut cells, &mapping.left, pair.left());
            side_cells(&mut cells, &mapping.right, pair.right());
            let status = pair.status();
            let difference_cents = pair.difference_cents();
            cells.push(ReportCell::Text(status.label().to_string()));
            cells.push(ReportCell::Money(difference_cents));
            ReportRow {
                cells,
                status,
                difference_cents,
            }
        })
        .collect();

    let totals = totals_row(&columns, &rows, &options.total_label);

    Report {
        columns,
        rows,
        totals,
    }
}

fn side_cells(
    out: &mut Vec<ReportCell>,
    specs: &[ColumnSpec],
    record: Option<&CanonicalRecord>,
) {
    for spec in specs {
        let cell = match record {
            None => ReportCell::Blank,
            Some(rec) => match &spec.field {
                ReportField::OrderId => ReportCell::Text(rec.order_id.clone()),
                ReportField::Date => match rec.date {
                    Some(d) => ReportCell::Text(d.format(DATE_FORMAT).to_string()),
                    None => ReportCell::Blank,
                },
                ReportField::Amount => match rec.amount_cents {
                    Some(c) => ReportCell::Money(c),
                    None => ReportCell::Blank,
                },
                ReportField::Extra(name) => match rec.extras.get(name) {
                    Some(v) if !v.is_empty() => ReportCell::Text(v.clone()),
                    _ => ReportCell::Blank,
                },
            },
        };
        out.push(cell);
    }
}

fn totals_row(columns: &[ReportColumn], rows: &[ReportRow], label: &str) -> Vec<ReportCell> {
    let last = columns.len().saturating_sub(1);
    let mut totals: Vec<ReportCell> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| match col.kind {
            ColumnKind::Text => ReportCell::Blank,
            ColumnKind::Money if i == last => {
                ReportCell::Money(
                    rows.iter()
                        .map(|r| r.difference_cents.saturating_abs())
                        .fold(0, i64::saturating_add),
                )
            }
            ColumnKind::Money => ReportCell::Money(
                rows.iter()
                    .map(|r| match r.cells.get(i) {
                        Some(ReportCell::Money(c)) => *c,
                        _ => 0,
                    })
                    .fold(0, i64::saturating_add),
            ),
        })
        .collect();

    if let Some(i) = columns.iter().position(|c| c.kind == ColumnKind::Text) {
        totals[i] = ReportCell::Text(label.to_string());
    }
    totals
}
