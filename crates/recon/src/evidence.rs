use crate::model::{MatchedPair, ReconSummary, Reconciliation};

/// Compute summary statistics from a reconciliation.
pub fn compute_summary(recon: &Reconciliation) -> ReconSummary {
    let mut summary = ReconSummary {
        total_pairs: recon.len(),
        ..ReconSummary::default()
    };

    for pair in recon.iter() {
        match pair {
            MatchedPair::Matched { .. } => summary.matched += 1,
            MatchedPair::LeftOnly { .. } => summary.left_only += 1,
            MatchedPair::RightOnly { .. } => summary.right_only += 1,
        }
        summary.abs_difference_cents = summary
            .abs_difference_cents
            .saturating_add(pair.difference_cents().saturating_abs());

        if let Some(left) = pair.left() {
            summary.left_total_cents = summary
                .left_total_cents
                .saturating_add(left.amount_cents.unwrap_or(0));
        }
        if let Some(right) = pair.right() {
            summary.right_total_cents = summary
                .right_total_cents
                .saturating_add(right.amount_cents.unwrap_or(0));
        }
        for rec in pair.left().into_iter().chain(pair.right()) {
            if rec.amount_coerced {
                summary.coerced_amounts += 1;
            }
            if rec.key().is_none() {
                summary.keyless += 1;
            }
        }
    }

    summary
}
