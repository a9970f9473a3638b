//! Transition Masker
//!
//! Walks the recall sequence of one list and yields every scorable
//! transition together with the items that could have been recalled next.
//!
//! Rules:
//! - the pool starts as every study row of the list
//! - each recalled item leaves the pool once the walk passes it, whether or
//!   not its transitions are masked
//! - a transition is skipped when either end is not in the pool (intrusions,
//!   repeats), when a mask rejects it, or when the pairwise test fails
//! - the possible set holds every item still in the pool, including the one
//!   actually recalled next

use crate::table::ListSplit;
use crate::types::TrialRecord;

/// Predicate on a single record
pub type RecordMask<'f> = dyn Fn(&TrialRecord) -> bool + Sync + 'f;

/// Predicate on a (previous, next) pair
pub type PairTest<'f> = dyn Fn(&TrialRecord, &TrialRecord) -> bool + Sync + 'f;

/// One scorable step of a recall sequence
#[derive(Debug, Clone)]
pub struct Transition<'a> {
    pub prev: &'a TrialRecord,
    pub curr: &'a TrialRecord,
    /// Items still available at this step, ordered by input position
    pub possible: Vec<&'a TrialRecord>,
}

impl<'a> Transition<'a> {
    /// Serial position distance from `prev` to `curr`
    pub fn lag(&self) -> i64 {
        input_lag(self.prev, self.curr)
    }

    /// Lag to every possible next item
    pub fn possible_lags(&self) -> impl Iterator<Item = i64> + '_ {
        self.possible.iter().map(move |r| input_lag(self.prev, r))
    }
}

fn input_lag(from: &TrialRecord, to: &TrialRecord) -> i64 {
    let from = i64::from(from.input_position.unwrap_or(0));
    let to = i64::from(to.input_position.unwrap_or(0));
    to - from
}

/// Iterator over the transitions of one list
pub struct TransitionMasker<'a, 'f> {
    pool: Vec<&'a TrialRecord>,
    /// `available[k]` is true while `pool[k]` has not been recalled
    available: Vec<bool>,
    /// input position - 1 -> index into `pool`
    slots: Vec<Option<usize>>,
    recalls: Vec<&'a TrialRecord>,
    cursor: usize,
    from_mask: Option<&'f RecordMask<'f>>,
    to_mask: Option<&'f RecordMask<'f>>,
    test: Option<&'f PairTest<'f>>,
    test_possible: bool,
}

impl<'a, 'f> TransitionMasker<'a, 'f> {
    /// `pool` holds the study rows, `recalls` every recall attempt in output order
    pub fn new(pool: Vec<&'a TrialRecord>, recalls: Vec<&'a TrialRecord>) -> Self {
        let length = pool
            .iter()
            .filter_map(|r| r.input_position)
            .max()
            .unwrap_or(0) as usize;

        let mut slots = vec![None; length];
        for (index, record) in pool.iter().enumerate() {
            if let Some(position) = record.input_position.filter(|&p| p > 0) {
                slots[position as usize - 1] = Some(index);
            }
        }

        Self {
            available: vec![true; pool.len()],
            pool,
            slots,
            recalls,
            cursor: 0,
            from_mask: None,
            to_mask: None,
            test: None,
            test_possible: false,
        }
    }

    pub fn from_split(split: &ListSplit<'a>) -> Self {
        Self::new(split.study.clone(), split.recalls.clone())
    }

    /// Only score transitions starting from records accepted by `mask`
    pub fn with_from_mask(mut self, mask: &'f RecordMask<'f>) -> Self {
        self.from_mask = Some(mask);
        self
    }

    /// Only score transitions ending on records accepted by `mask`
    pub fn with_to_mask(mut self, mask: &'f RecordMask<'f>) -> Self {
        self.to_mask = Some(mask);
        self
    }

    /// Only score transitions accepted by `test`.
    ///
    /// With `restrict_possible` the same test also filters the possible set,
    /// so the denominator only counts items that would have passed.
    pub fn with_test(mut self, test: &'f PairTest<'f>, restrict_possible: bool) -> Self {
        self.test = Some(test);
        self.test_possible = restrict_possible;
        self
    }

    fn slot(&self, record: &TrialRecord) -> Option<usize> {
        if record.is_intrusion || record.is_repeat {
            return None;
        }
        let position = record.input_position?.checked_sub(1)? as usize;
        self.slots.get(position).copied().flatten()
    }

    fn is_available(&self, record: &TrialRecord) -> bool {
        self.slot(record).is_some_and(|k| self.available[k])
    }

    /// Remove `record` from the pool; false if it was not there
    fn take(&mut self, record: &TrialRecord) -> bool {
        match self.slot(record) {
            Some(k) if self.available[k] => {
                self.available[k] = false;
                true
            }
            _ => false,
        }
    }

    fn possible(&self, prev: &TrialRecord) -> Vec<&'a TrialRecord> {
        self.pool
            .iter()
            .zip(&self.available)
            .filter(|(_, &open)| open)
            .map(|(&record, _)| record)
            .filter(|record| match (self.test, self.test_possible) {
                (Some(test), true) => test(prev, *record),
                _ => true,
            })
            .collect()
    }
}

impl<'a> Iterator for TransitionMasker<'a, '_> {
    type Item = Transition<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor + 1 < self.recalls.len() {
            let prev = self.recalls[self.cursor];
            let curr = self.recalls[self.cursor + 1];
            self.cursor += 1;

            if !self.take(prev) || !self.is_available(curr) {
                continue;
            }
            if self.from_mask.is_some_and(|mask| !mask(prev)) {
                continue;
            }
            if self.to_mask.is_some_and(|mask| !mask(curr)) {
                continue;
            }
            if self.test.is_some_and(|test| !test(prev, curr)) {
                continue;
            }

            return Some(Transition {
                prev,
                curr,
                possible: self.possible(prev),
            });
        }
        None
    }
}
