// Property-based tests for the (date, amount) matcher.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use conciliador_recon::model::{CanonicalRecord, MatchKey, MatchedPair};
use conciliador_recon::reconcile;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Mostly a handful of January days, sometimes missing.
fn arb_date() -> impl Strategy<Value = Option<NaiveDate>> {
    prop_oneof![
        6 => (1u32..=4).prop_map(|d| NaiveDate::from_ymd_opt(2024, 1, d)),
        1 => Just(None),
    ]
}

/// Few distinct amounts so keys collide often; zero is a valid amount.
fn arb_amount() -> impl Strategy<Value = Option<i64>> {
    prop_oneof![
        6 => prop::sample::select(vec![0i64, 1000, 1001, 2500, -500]).prop_map(Some),
        1 => Just(None),
    ]
}

fn arb_side(prefix: &'static str, max: usize) -> impl Strategy<Value = Vec<CanonicalRecord>> {
    proptest::collection::vec((arb_date(), arb_amount()), 0..=max).prop_map(move |fields| {
        fields
            .into_iter()
            .enumerate()
            .map(|(i, (date, amount))| CanonicalRecord::new(format!("{prefix}{i:03}"), date, amount))
            .collect()
    })
}

fn key_counts(records: &[CanonicalRecord]) -> HashMap<MatchKey, usize> {
    let mut counts = HashMap::new();
    for r in records {
        if let Some(k) = r.key() {
            *counts.entry(k).or_insert(0) += 1;
        }
    }
    counts
}

fn pair_ids(pair: &MatchedPair) -> (Option<String>, Option<String>) {
    (
        pair.left().map(|r| r.order_id.clone()),
        pair.right().map(|r| r.order_id.clone()),
    )
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn every_record_appears_exactly_once(left in arb_side("L", 12), right in arb_side("R", 12)) {
        let out = reconcile(left.clone(), right.clone());

        let mut seen_left = HashSet::new();
        let mut seen_right = HashSet::new();
        for pair in out.iter() {
            if let Some(l) = pair.left() {
                prop_assert!(seen_left.insert(l.order_id.clone()), "left {} twice", l.order_id);
            }
            if let Some(r) = pair.right() {
                prop_assert!(seen_right.insert(r.order_id.clone()), "right {} twice", r.order_id);
            }
        }
        prop_assert_eq!(seen_left.len(), left.len());
        prop_assert_eq!(seen_right.len(), right.len());
        prop_assert_eq!(out.len(), left.len() + right.len() - out.matched_count());
    }

    #[test]
    fn matched_pairs_share_their_key(left in arb_side("L", 12), right in arb_side("R", 12)) {
        let out = reconcile(left, right);
        for pair in out.iter() {
            if let MatchedPair::Matched { left, right } = pair {
                prop_assert!(left.key().is_some());
                prop_assert_eq!(left.key(), right.key());
                prop_assert_eq!(pair.difference_cents(), 0);
            }
        }
    }

    #[test]
    fn match_count_is_maximal(left in arb_side("L", 12), right in arb_side("R", 12)) {
        let lc = key_counts(&left);
        let rc = key_counts(&right);
        let expected: usize = lc
            .iter()
            .map(|(k, n)| (*n).min(rc.get(k).copied().unwrap_or(0)))
            .sum();

        let out = reconcile(left, right);
        prop_assert_eq!(out.matched_count(), expected);
    }

    #[test]
    fn keyless_records_never_match(left in arb_side("L", 12), right in arb_side("R", 12)) {
        let out = reconcile(left, right);
        for pair in out.iter() {
            if let MatchedPair::Matched { left, right } = pair {
                prop_assert!(left.date.is_some() && left.amount_cents.is_some());
                prop_assert!(right.date.is_some() && right.amount_cents.is_some());
            }
        }
    }

    #[test]
    fn result_independent_of_input_order(
        (left, shuffled_left) in arb_side("L", 10).prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())),
        (right, shuffled_right) in arb_side("R", 10).prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())),
    ) {
        let a: Vec<_> = reconcile(left, right).iter().map(pair_ids).collect();
        let b: Vec<_> = reconcile(shuffled_left, shuffled_right).iter().map(pair_ids).collect();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn left_rows_precede_right_leftovers(left in arb_side("L", 12), right in arb_side("R", 12)) {
        let out = reconcile(left, right);
        let first_right_only = out
            .iter()
            .position(|p| matches!(p, MatchedPair::RightOnly { .. }))
            .unwrap_or(out.len());
        for pair in &out.pairs[first_right_only..] {
            prop_assert!(matches!(pair, MatchedPair::RightOnly { .. }), "expected RightOnly, got {:?}", pair);
        }
    }
}
