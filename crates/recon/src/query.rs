use chrono::NaiveDate;
use serde::Serialize;

use crate::adapter::SideLabels;
use crate::error::ReconError;
use crate::model::CanonicalRecord;

/// Selection criteria for the system-side record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryFilter {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub store_id: u32,
    /// Client ids identifying the delivery partner; empty means any.
    pub client_ids: Vec<u32>,
    /// Payment method ids; empty means any.
    pub payment_methods: Vec<u32>,
}

impl QueryFilter {
    pub fn new(start: NaiveDate, end: NaiveDate, store_id: u32) -> Self {
        Self {
            start,
            end,
            store_id,
            client_ids: Vec::new(),
            payment_methods: Vec::new(),
        }
    }

    pub fn with_clients(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.client_ids = ids.into_iter().collect();
        self
    }

    pub fn with_payment_methods(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.payment_methods = ids.into_iter().collect();
        self
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.start > self.end {
            return Err(ReconError::InvalidFilter(format!(
                "start date {} is after end date {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    /// Inclusive on both ends.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Source of system-side (right) records for one reconciliation run.
///
/// Implementations must fail as a whole: a backend error yields
/// `ReconError::Query` and no partial record set.
pub trait SystemQuery {
    fn fetch(&self, filter: &QueryFilter) -> Result<Vec<CanonicalRecord>, ReconError>;

    /// Report headers for the records this source produces.
    fn labels(&self) -> SideLabels;
}

/// Fixed record set, filtered by date only. Used in tests and for
/// records already loaded by the caller.
#[derive(Debug, Clone)]
pub struct MemoryQuery {
    records: Vec<CanonicalRecord>,
    labels: SideLabels,
}

impl MemoryQuery {
    pub fn new(records: Vec<CanonicalRecord>, labels: SideLabels) -> Self {
        Self { records, labels }
    }
}

impl SystemQuery for MemoryQuery {
    fn fetch(&self, filter: &QueryFilter) -> Result<Vec<CanonicalRecord>, ReconError> {
        filter.validate()?;
        Ok(self
            .records
            .iter()
            .filter(|r| r.date.map_or(true, |d| filter.contains(d)))
            .cloned()
            .collect())
    }

    fn labels(&self) -> SideLabels {
        self.labels.clone()
    }
}
