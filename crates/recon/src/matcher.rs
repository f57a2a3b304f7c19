use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use crate::model::{CanonicalRecord, MatchKey, MatchedPair, Reconciliation};

/// Greedy one-to-one matching on exact (date, amount).
///
/// Both sides are stably sorted by (date, amount, order_id), records without a
/// key last. Each left record, in that order, claims the earliest unclaimed
/// right record sharing its key. Output is every left record in sorted order
/// (matched or not), followed by the unclaimed right records in sorted order.
pub fn reconcile(left: Vec<CanonicalRecord>, right: Vec<CanonicalRecord>) -> Reconciliation {
    reconcile_by(left, right, MatchKey::of)
}

/// Same algorithm as [`reconcile`] with a caller-supplied key.
///
/// Records for which `key_of` returns `None` never match.
pub fn reconcile_by<K, F>(
    mut left: Vec<CanonicalRecord>,
    mut right: Vec<CanonicalRecord>,
    key_of: F,
) -> Reconciliation
where
    K: Eq + Hash,
    F: Fn(&CanonicalRecord) -> Option<K>,
{
    sort_records(&mut left);
    sort_records(&mut right);

    // key -> right indices in sorted order, consumed front to back
    let mut available: HashMap<K, VecDeque<usize>> = HashMap::new();
    for (idx, rec) in right.iter().enumerate() {
        if let Some(key) = key_of(rec) {
            available.entry(key).or_default().push_back(idx);
        }
    }

    let mut right_slots: Vec<Option<CanonicalRecord>> = right.into_iter().map(Some).collect();
    let mut pairs = Vec::with_capacity(left.len() + right_slots.len());

    for rec in left {
        let claimed = match key_of(&rec) {
            Some(key) => available.get_mut(&key).and_then(VecDeque::pop_front),
            None => None,
        };
        match claimed.and_then(|idx| right_slots[idx].take()) {
            Some(partner) => pairs.push(MatchedPair::Matched {
                left: rec,
                right: partner,
            }),
            None => pairs.push(MatchedPair::LeftOnly { left: rec }),
        }
    }

    pairs.extend(
        right_slots
            .into_iter()
            .flatten()
            .map(|rec| MatchedPair::RightOnly { right: rec }),
    );

    let result = Reconciliation { pairs };
    log::debug!(
        "reconcile: {} pairs, {} matched",
        result.len(),
        result.matched_count()
    );
    result
}

/// Stable sort by (date, amount, order_id); missing dates and amounts sort last.
pub fn sort_records(records: &mut [CanonicalRecord]) {
    records.sort_by(|a, b| {
        (a.date.is_none(), a.date, a.amount_cents.is_none(), a.amount_cents)
            .cmp(&(b.date.is_none(), b.date, b.amount_cents.is_none(), b.amount_cents))
            .then_with(|| a.order_id.cmp(&b.order_id))
    });
}
