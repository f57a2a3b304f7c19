use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single normalized order from either side of the reconciliation.
///
/// Amounts are integer centavos so that key equality is exact. A record with
/// no date or no amount has no match key and always surfaces as unmatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalRecord {
    pub order_id: String,
    pub date: Option<NaiveDate>,
    pub amount_cents: Option<i64>,
    /// Auxiliary display fields, keyed by display label.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
    /// 1-based row in the source sheet (header = row 1), 0 when not from a sheet.
    pub source_row: usize,
    /// Amount was unparseable and replaced by the adapter's fallback.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub amount_coerced: bool,
}

impl CanonicalRecord {
    pub fn new(order_id: impl Into<String>, date: Option<NaiveDate>, amount_cents: Option<i64>) -> Self {
        Self {
            order_id: order_id.into(),
            date,
            amount_cents,
            extras: BTreeMap::new(),
            source_row: 0,
            amount_coerced: false,
        }
    }

    pub fn with_extra(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(label.into(), value.into());
        self
    }

    pub fn with_source_row(mut self, row: usize) -> Self {
        self.source_row = row;
        self
    }

    pub fn key(&self) -> Option<MatchKey> {
        MatchKey::of(self)
    }
}

/// Pre-loaded records for one run: delivery export on the left, system on the right.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub left: Vec<CanonicalRecord>,
    pub right: Vec<CanonicalRecord>,
}

// ---------------------------------------------------------------------------
// Match key
// ---------------------------------------------------------------------------

/// Exact (date, amount) key. No tolerance on either component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MatchKey {
    pub date: NaiveDate,
    pub amount_cents: i64,
}

impl MatchKey {
    pub fn of(record: &CanonicalRecord) -> Option<Self> {
        Some(Self {
            date: record.date?,
            amount_cents: record.amount_cents?,
        })
    }
}

// ---------------------------------------------------------------------------
// Pairs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    Unmatched,
}

impl MatchStatus {
    /// Label written to the report's status column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Matched => "Correspondente",
            Self::Unmatched => "Diferença",
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched => write!(f, "matched"),
            Self::Unmatched => write!(f, "unmatched"),
        }
    }
}

/// One output unit of a reconciliation. A pair with both sides absent
/// cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchedPair {
    Matched {
        left: CanonicalRecord,
        right: CanonicalRecord,
    },
    LeftOnly {
        left: CanonicalRecord,
    },
    RightOnly {
        right: CanonicalRecord,
    },
}

impl MatchedPair {
    pub fn left(&self) -> Option<&CanonicalRecord> {
        match self {
            Self::Matched { left, .. } | Self::LeftOnly { left } => Some(left),
            Self::RightOnly { .. } => None,
        }
    }

    pub fn right(&self) -> Option<&CanonicalRecord> {
        match self {
            Self::Matched { right, .. } | Self::RightOnly { right } => Some(right),
            Self::LeftOnly { .. } => None,
        }
    }

    pub fn status(&self) -> MatchStatus {
        match self {
            Self::Matched { .. } => MatchStatus::Matched,
            Self::LeftOnly { .. } | Self::RightOnly { .. } => MatchStatus::Unmatched,
        }
    }

    /// Left minus right; the lone amount when one side is absent.
    /// A missing amount counts as zero.
    pub fn difference_cents(&self) -> i64 {
        match self {
            Self::Matched { left, right } => {
                left.amount_cents.unwrap_or(0) - right.amount_cents.unwrap_or(0)
            }
            Self::LeftOnly { left } => left.amount_cents.unwrap_or(0),
            Self::RightOnly { right } => right.amount_cents.unwrap_or(0),
        }
    }

    /// Left date when present, otherwise right date.
    pub fn date(&self) -> Option<NaiveDate> {
        self.left()
            .and_then(|r| r.date)
            .or_else(|| self.right().and_then(|r| r.date))
    }
}

/// Ordered pairs produced by one `reconcile` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub pairs: Vec<MatchedPair>,
}

impl Reconciliation {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatchedPair> {
        self.pairs.iter()
    }

    pub fn matched_count(&self) -> usize {
        self.pairs.iter().filter(|p| p.status() == MatchStatus::Matched).count()
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub total_pairs: usize,
    pub matched: usize,
    pub left_only: usize,
    pub right_only: usize,
    pub left_total_cents: i64,
    pub right_total_cents: i64,
    pub abs_difference_cents: i64,
    /// Records whose amount was coerced by an adapter.
    pub coerced_amounts: usize,
    /// Records without a usable match key.
    pub keyless: usize,
}

impl ReconSummary {
    pub fn unmatched(&self) -> usize {
        self.left_only + self.right_only
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub run_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub reconciliation: Reconciliation,
    pub report: crate::report::Report,
}
