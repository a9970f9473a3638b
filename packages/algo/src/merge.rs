//! Merge Engine
//!
//! Joins the study and recall streams of each (subject, list) unit into
//! trial records:
//! - first recall of a studied item is merged onto its study row
//! - later recalls of the same item become repeat rows
//! - recalls of items that were never studied become intrusion rows
//! - studied items that are never recalled stay as omissions
//!
//! Units share no state, so whole sessions are merged in parallel (Rayon)
//! and concatenated in the order units first appear in the input.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::error::{FrError, FrResult};
use crate::table::EventTable;
use crate::types::{Attrs, RawEvent, TrialRecord, TrialType};

/// Events of one (subject, list) unit, in input order
struct Unit<'a> {
    subject: &'a str,
    list: u32,
    events: Vec<&'a RawEvent>,
}

/// Merge every unit in `events` into one event table.
///
/// Fails with the error of the first offending unit in input order; other
/// units are still merged independently but their rows are discarded.
pub fn merge_events(events: &[RawEvent]) -> FrResult<EventTable> {
    let units = partition_units(events);

    let merged: Vec<FrResult<Vec<TrialRecord>>> = units
        .par_iter()
        .map(|unit| merge_unit(unit.subject, unit.list, &unit.events))
        .collect();

    let mut records = Vec::with_capacity(events.len());
    for result in merged {
        match result {
            Ok(unit_records) => records.extend(unit_records),
            Err(err) => {
                tracing::warn!(error = %err, "merge aborted");
                return Err(err);
            }
        }
    }

    tracing::debug!(units = units.len(), records = records.len(), "merged study and recall events");
    Ok(EventTable::new(records))
}

/// Merge the events of a single list.
///
/// `events` may interleave study and recall events; study events must carry
/// the serial positions 1..=N exactly once and recall positions must increase
/// in event order. Recall attempts are renumbered 1, 2, 3... in that order.
pub fn merge_list(subject: &str, list: u32, events: &[RawEvent]) -> FrResult<Vec<TrialRecord>> {
    let events: Vec<&RawEvent> = events.iter().collect();
    merge_unit(subject, list, &events)
}

fn partition_units(events: &[RawEvent]) -> Vec<Unit<'_>> {
    let mut slots: HashMap<(&str, u32), usize> = HashMap::new();
    let mut units: Vec<Unit<'_>> = Vec::new();

    for event in events {
        let key = (event.subject.as_str(), event.list);
        let slot = *slots.entry(key).or_insert_with(|| {
            units.push(Unit {
                subject: key.0,
                list: key.1,
                events: Vec::new(),
            });
            units.len() - 1
        });
        units[slot].events.push(event);
    }

    units
}

fn merge_unit(subject: &str, list: u32, events: &[&RawEvent]) -> FrResult<Vec<TrialRecord>> {
    let (study, recall): (Vec<&RawEvent>, Vec<&RawEvent>) = events
        .iter()
        .copied()
        .partition(|event| event.trial_type == TrialType::Study);

    check_study_positions(subject, list, &study)?;
    check_recall_positions(subject, list, &recall)?;

    let mut study_index: HashMap<&str, usize> = HashMap::with_capacity(study.len());
    let mut records: Vec<TrialRecord> = Vec::with_capacity(study.len() + recall.len());

    for event in &study {
        if study_index.insert(event.item.as_str(), records.len()).is_some() {
            return Err(FrError::DuplicateStudyItem {
                subject: subject.to_string(),
                list,
                item: event.item.clone(),
            });
        }
        records.push(TrialRecord {
            subject: subject.to_string(),
            list,
            item: event.item.clone(),
            input_position: Some(event.position),
            output_position: None,
            repeat: 0,
            is_repeat: false,
            is_intrusion: false,
            study_attrs: event.attrs.clone(),
            recall_attrs: Attrs::new(),
        });
    }

    let mut times_recalled: HashMap<&str, u32> = HashMap::new();
    for (output, event) in (1u32..).zip(&recall) {
        let count = times_recalled.entry(event.item.as_str()).or_insert(0);
        let repeat = *count;
        *count += 1;

        match study_index.get(event.item.as_str()) {
            Some(&slot) if repeat == 0 => {
                let record = &mut records[slot];
                record.output_position = Some(output);
                record.recall_attrs = event.attrs.clone();
            }
            Some(&slot) => {
                let studied = &records[slot];
                let record = TrialRecord {
                    subject: subject.to_string(),
                    list,
                    item: event.item.clone(),
                    input_position: studied.input_position,
                    output_position: Some(output),
                    repeat,
                    is_repeat: true,
                    is_intrusion: false,
                    study_attrs: studied.study_attrs.clone(),
                    recall_attrs: event.attrs.clone(),
                };
                records.push(record);
            }
            None => records.push(TrialRecord {
                subject: subject.to_string(),
                list,
                item: event.item.clone(),
                input_position: None,
                output_position: Some(output),
                repeat,
                is_repeat: repeat > 0,
                is_intrusion: true,
                study_attrs: Attrs::new(),
                recall_attrs: event.attrs.clone(),
            }),
        }
    }

    // study order first, intrusions last, ties by recall order
    records.sort_by_key(|r| {
        (
            r.input_position.unwrap_or(u32::MAX),
            r.output_position.unwrap_or(u32::MAX),
        )
    });

    tracing::trace!(subject, list, rows = records.len(), "merged list");
    Ok(records)
}

/// Study positions must be exactly 1..=N
fn check_study_positions(subject: &str, list: u32, study: &[&RawEvent]) -> FrResult<()> {
    let mut positions: Vec<u32> = study.iter().map(|e| e.position).collect();
    positions.sort_unstable();

    if let Some(pair) = positions.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(FrError::DuplicateInputPosition {
            subject: subject.to_string(),
            list,
            position: pair[0],
        });
    }

    for (expected, &position) in (1u32..).zip(&positions) {
        if position != expected {
            return Err(FrError::NonContiguousInputPositions {
                subject: subject.to_string(),
                list,
                missing: expected,
            });
        }
    }

    Ok(())
}

fn check_recall_positions(subject: &str, list: u32, recall: &[&RawEvent]) -> FrResult<()> {
    for pair in recall.windows(2) {
        let (previous, position) = (pair[0].position, pair[1].position);
        if position <= previous {
            return Err(FrError::NonMonotonicOutputPosition {
                subject: subject.to_string(),
                list,
                position,
                previous,
            });
        }
    }
    Ok(())
}
