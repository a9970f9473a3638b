//! Probability of Nth Recall
//!
//! For output position `o` and input position `i`: the share of lists
//! reaching recall attempt `o` whose `o`-th attempt was the first recall of
//! the item studied at `i`. Repeats and intrusions use up an attempt, so
//! they count toward the denominator but never toward a numerator.

use std::collections::{BTreeSet, HashMap};

use super::{per_subject, ratio};
use crate::table::TableView;
use crate::types::PnrRow;

/// Probability of nth recall for every subject in `view`.
///
/// Rows cover output positions up to the longest recall sequence and input
/// positions up to the longest list. With `category` set, the numerator is
/// split by the category of the recalled item, giving one block of rows per
/// category that sum to at most the uncategorized probability.
pub fn pnr(view: &TableView<'_>, category: Option<&str>) -> Vec<PnrRow> {
    per_subject(view, |subject, records| {
        let splits = records.split_lists();

        let list_length = splits.iter().map(|s| s.list_length()).max().unwrap_or(0);
        let max_attempts = splits.iter().map(|s| s.attempts()).max().unwrap_or(0);

        // lists reaching each output position
        let mut reached = vec![0u32; max_attempts as usize];
        for split in &splits {
            for slot in reached.iter_mut().take(split.attempts() as usize) {
                *slot += 1;
            }
        }

        let mut groups: BTreeSet<Option<String>> = BTreeSet::new();
        let mut counts: HashMap<(Option<String>, u32, u32), u32> = HashMap::new();
        for split in &splits {
            if category.is_some() {
                groups.extend(split.study.iter().map(|r| category.and_then(|key| r.label(key))));
            }
            for record in split.recalls.iter().filter(|r| r.is_correct_recall()) {
                let (Some(output), Some(input)) = (record.output_position, record.input_position) else {
                    continue;
                };
                let group = category.and_then(|key| record.label(key));
                *counts.entry((group, output, input)).or_insert(0) += 1;
            }
        }
        if category.is_none() {
            groups.insert(None);
        }

        let mut rows = Vec::with_capacity(groups.len() * reached.len() * list_length as usize);
        for group in &groups {
            for (output, &lists) in (1u32..).zip(&reached) {
                for input in 1..=list_length {
                    let hits = counts
                        .get(&(group.clone(), output, input))
                        .copied()
                        .unwrap_or(0);
                    rows.push(PnrRow {
                        subject: subject.to_string(),
                        category: group.clone(),
                        output_position: output,
                        input_position: input,
                        prob: ratio(hits, lists),
                    });
                }
            }
        }
        rows
    })
}
