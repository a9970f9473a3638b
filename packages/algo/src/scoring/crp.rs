//! Lag Conditional Response Probability
//!
//! For every lag `l` (`l != 0`, `|l| < N`): transitions observed at lag `l`
//! divided by the transitions that were possible at lag `l`. At each step
//! the possible set is every not-yet-recalled study item, measured from the
//! item just recalled.
//!
//! Reference: Kahana, M. J. (1996). Associative retrieval processes in free recall.

use super::{per_subject, ratio, CrpOptions};
use crate::table::TableView;
use crate::transitions::{RecordMask, TransitionMasker};
use crate::types::{LagCrpRow, TrialRecord};

/// Lag-CRP for every subject in `view`
pub fn lag_crp(view: &TableView<'_>, options: &CrpOptions) -> Vec<LagCrpRow> {
    lag_crp_masked(view, options, None, None)
}

/// Lag-CRP restricted to transitions from records accepted by `from` and to
/// records accepted by `to`. Masked transitions still consume their items.
pub fn lag_crp_masked(
    view: &TableView<'_>,
    options: &CrpOptions,
    from: Option<&RecordMask<'_>>,
    to: Option<&RecordMask<'_>>,
) -> Vec<LagCrpRow> {
    let test = |prev: &TrialRecord, curr: &TrialRecord| options.accepts(prev, curr);

    per_subject(view, |subject, records| {
        let splits = records.split_lists();
        let list_length = splits.iter().map(|s| s.list_length()).max().unwrap_or(0);
        let width = list_length.saturating_sub(1) as i64;

        let mut counts = LagCounts::new(width);
        for split in &splits {
            let mut masker =
                TransitionMasker::from_split(split).with_test(&test, options.restrict_possible());
            if let Some(mask) = from {
                masker = masker.with_from_mask(mask);
            }
            if let Some(mask) = to {
                masker = masker.with_to_mask(mask);
            }

            for transition in masker {
                counts.actual(transition.lag());
                for lag in transition.possible_lags() {
                    counts.possible(lag);
                }
            }
        }

        counts.into_rows(subject)
    })
}

/// Actual and possible tallies indexed by lag + width
struct LagCounts {
    width: i64,
    actual: Vec<u32>,
    possible: Vec<u32>,
}

impl LagCounts {
    fn new(width: i64) -> Self {
        let size = (2 * width + 1) as usize;
        Self {
            width,
            actual: vec![0; size],
            possible: vec![0; size],
        }
    }

    fn index(&self, lag: i64) -> Option<usize> {
        (lag.abs() <= self.width).then_some((lag + self.width) as usize)
    }

    fn actual(&mut self, lag: i64) {
        if let Some(i) = self.index(lag) {
            self.actual[i] += 1;
        }
    }

    fn possible(&mut self, lag: i64) {
        if let Some(i) = self.index(lag) {
            self.possible[i] += 1;
        }
    }

    fn into_rows(self, subject: &str) -> Vec<LagCrpRow> {
        (-self.width..=self.width)
            .filter(|&lag| lag != 0)
            .map(|lag| {
                let i = (lag + self.width) as usize;
                LagCrpRow {
                    subject: subject.to_string(),
                    lag: lag as i32,
                    actual: self.actual[i],
                    possible: self.possible[i],
                    prob: ratio(self.actual[i], self.possible[i]),
                }
            })
            .collect()
    }
}
