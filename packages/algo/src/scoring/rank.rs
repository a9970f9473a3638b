//! Lag Rank
//!
//! Percentile rank of each observed transition among the transitions that
//! were possible at that step, scored so that shorter lags rank higher.
//! 1.0 means the closest item was always recalled next, 0.5 is chance.

use super::{per_subject, CrpOptions};
use crate::table::TableView;
use crate::transitions::{Transition, TransitionMasker};
use crate::types::{RankRow, TrialRecord};

/// Percentile rank of `actual` within `possible`.
///
/// `possible` must include `actual`. Ties share the average of their ranks.
/// Returns `None` when fewer than two values are possible, since there is
/// nothing to rank against.
pub fn percentile_rank(actual: f64, possible: &[f64]) -> Option<f64> {
    let n = possible.len();
    if n < 2 {
        return None;
    }
    let below = possible.iter().filter(|&&v| v < actual).count() as f64;
    let ties = possible.iter().filter(|&&v| v == actual).count() as f64;
    let rank = below + (ties + 1.0) / 2.0;
    Some((rank - 1.0) / (n as f64 - 1.0))
}

/// Mean lag percentile rank per subject
pub fn lag_rank(view: &TableView<'_>, options: &CrpOptions) -> Vec<RankRow> {
    let test = |prev: &TrialRecord, curr: &TrialRecord| options.accepts(prev, curr);

    per_subject(view, |subject, records| {
        let mut ranks = Vec::new();
        for split in records.split_lists() {
            let masker =
                TransitionMasker::from_split(&split).with_test(&test, options.restrict_possible());
            ranks.extend(masker.filter_map(|t| transition_rank(&t)));
        }
        vec![RankRow {
            subject: subject.to_string(),
            rank: mean(&ranks),
        }]
    })
}

fn transition_rank(transition: &Transition<'_>) -> Option<f64> {
    let actual = -(transition.lag().abs() as f64);
    let possible: Vec<f64> = transition
        .possible_lags()
        .map(|lag| -(lag.abs() as f64))
        .collect();
    percentile_rank(actual, &possible)
}

/// Arithmetic mean, NaN for an empty slice
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
