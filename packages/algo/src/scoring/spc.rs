//! Serial Position Curve
//!
//! Recall probability by input position: recalled study events over all
//! study events at that position. Intrusions and repeats are not study
//! events; omissions count as failures.

use std::collections::BTreeMap;

use super::{per_subject, ratio};
use crate::table::TableView;
use crate::types::SpcRow;

/// Serial position curve for every subject in `view`.
///
/// With `category` set, each subject gets one curve per category label of
/// the studied items, and positions never studied in that category are left
/// out. Without it every position from 1 to the longest list is reported.
pub fn spc(view: &TableView<'_>, category: Option<&str>) -> Vec<SpcRow> {
    per_subject(view, |subject, records| {
        // category -> (recalled, studied) per position
        let mut curves: BTreeMap<Option<String>, Vec<(u32, u32)>> = BTreeMap::new();

        for record in records.iter().filter(|r| r.is_study()) {
            let Some(position) = record.input_position.filter(|&p| p > 0) else {
                continue;
            };
            let group = category.and_then(|key| record.label(key));
            let counts = curves.entry(group).or_default();
            let index = position as usize - 1;
            if counts.len() <= index {
                counts.resize(index + 1, (0, 0));
            }
            counts[index].1 += 1;
            if record.recalled() {
                counts[index].0 += 1;
            }
        }

        curves
            .into_iter()
            .flat_map(|(group, counts)| {
                (1u32..)
                    .zip(counts)
                    .filter(|(_, (_, studied))| *studied > 0)
                    .map(move |(position, (recalled, studied))| SpcRow {
                        subject: subject.to_string(),
                        category: group.clone(),
                        input_position: position,
                        recall: ratio(recalled, studied),
                    })
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_events;
    use crate::types::RawEvent;

    fn recall_values(rows: &[SpcRow]) -> Vec<f64> {
        rows.iter().map(|r| r.recall).collect()
    }

    #[test]
    fn test_spc_over_two_lists() {
        let events = vec![
            RawEvent::study("1", 1, "absence", 1).with_attr("task", 1),
            RawEvent::study("1", 1, "hollow", 2).with_attr("task", 2),
            RawEvent::study("1", 1, "pupil", 3).with_attr("task", 1),
            RawEvent::recall("1", 1, "hollow", 1),
            RawEvent::recall("1", 1, "pupil", 2),
            RawEvent::recall("1", 1, "empty", 3),
            RawEvent::study("1", 2, "fountain", 1).with_attr("task", 1),
            RawEvent::study("1", 2, "piano", 2).with_attr("task", 2),
            RawEvent::study("1", 2, "pillow", 3).with_attr("task", 1),
            RawEvent::recall("1", 2, "pillow", 1),
            RawEvent::recall("1", 2, "fountain", 2),
            RawEvent::recall("1", 2, "pillow", 3),
        ];
        let table = merge_events(&events).unwrap();

        let rows = spc(&table.view(), None);
        assert_eq!(recall_values(&rows), vec![0.5, 0.5, 1.0]);
        assert!(rows.iter().all(|r| r.category.is_none()));

        let by_task = spc(&table.view(), Some("task"));
        let cells: Vec<(Option<&str>, u32, f64)> = by_task
            .iter()
            .map(|r| (r.category.as_deref(), r.input_position, r.recall))
            .collect();
        assert_eq!(
            cells,
            vec![
                (Some("1"), 1, 0.5),
                (Some("1"), 3, 1.0),
                (Some("2"), 2, 0.5),
            ]
        );
    }

    #[test]
    fn test_spc_per_subject() {
        let events = vec![
            RawEvent::study("b", 1, "x", 1),
            RawEvent::study("b", 1, "y", 2),
            RawEvent::recall("b", 1, "y", 1),
            RawEvent::study("a", 1, "x", 1),
            RawEvent::study("a", 1, "y", 2),
            RawEvent::recall("a", 1, "x", 1),
        ];
        let table = merge_events(&events).unwrap();
        let rows = spc(&table.view(), None);

        let cells: Vec<(&str, u32, f64)> = rows
            .iter()
            .map(|r| (r.subject.as_str(), r.input_position, r.recall))
            .collect();
        assert_eq!(
            cells,
            vec![("b", 1, 0.0), ("b", 2, 1.0), ("a", 1, 1.0), ("a", 2, 0.0)]
        );
    }

    #[test]
    fn test_lists_of_different_length() {
        let events = vec![
            RawEvent::study("s", 1, "a", 1),
            RawEvent::recall("s", 1, "a", 1),
            RawEvent::study("s", 2, "b", 1),
            RawEvent::study("s", 2, "c", 2),
            RawEvent::recall("s", 2, "c", 1),
        ];
        let table = merge_events(&events).unwrap();

        assert_eq!(recall_values(&spc(&table.view(), None)), vec![0.5, 1.0]);
    }

    #[test]
    fn test_empty_view() {
        let table = merge_events(&[]).unwrap();
        assert!(spc(&table.view(), None).is_empty());
    }
}
