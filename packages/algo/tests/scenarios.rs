//! End-to-end scenarios: raw rows -> event table -> statistics

use serde_json::{json, Map, Value};

use freerecall_algo::scoring::{distance_rank, lag_crp, lag_rank, pnr, spc};
use freerecall_algo::{
    merge_events, parse_records, CrpOptions, DistanceMatrix, DistanceModel, FrError, RawEvent,
};

// ============================================================================
// Helpers
// ============================================================================

/// Study `length` items, then recall the given input positions; 0 is an intrusion
fn list(subject: &str, list: u32, length: u32, recalls: &[u32]) -> Vec<RawEvent> {
    let mut events: Vec<RawEvent> = (1..=length)
        .map(|p| RawEvent::study(subject, list, format!("{subject}-{list}-{p}"), p))
        .collect();
    for (output, &input) in (1u32..).zip(recalls) {
        let item = match input {
            0 => format!("never-studied-{output}"),
            p => format!("{subject}-{list}-{p}"),
        };
        events.push(RawEvent::recall(subject, list, item, output));
    }
    events
}

fn rows(values: Value) -> Vec<Map<String, Value>> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row.as_object().unwrap().clone())
        .collect()
}

/// Two lists of three with one intrusion and one repeat
fn frame() -> Vec<Map<String, Value>> {
    rows(json!([
        {"subject": 1, "list": 1, "trial_type": "study", "position": 1, "item": "absence", "item_index": 0, "task": 1},
        {"subject": 1, "list": 1, "trial_type": "study", "position": 2, "item": "hollow", "item_index": 1, "task": 2},
        {"subject": 1, "list": 1, "trial_type": "study", "position": 3, "item": "pupil", "item_index": 2, "task": 1},
        {"subject": 1, "list": 1, "trial_type": "recall", "position": 1, "item": "hollow"},
        {"subject": 1, "list": 1, "trial_type": "recall", "position": 2, "item": "pupil"},
        {"subject": 1, "list": 1, "trial_type": "recall", "position": 3, "item": "empty"},
        {"subject": 1, "list": 2, "trial_type": "study", "position": 1, "item": "fountain", "item_index": 3, "task": 1},
        {"subject": 1, "list": 2, "trial_type": "study", "position": 2, "item": "piano", "item_index": 4, "task": 2},
        {"subject": 1, "list": 2, "trial_type": "study", "position": 3, "item": "pillow", "item_index": 5, "task": 1},
        {"subject": 1, "list": 2, "trial_type": "recall", "position": 1, "item": "pillow"},
        {"subject": 1, "list": 2, "trial_type": "recall", "position": 2, "item": "fountain"},
        {"subject": 1, "list": 2, "trial_type": "recall", "position": 3, "item": "pillow"}
    ]))
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn skipped_item_scenario() {
    let table = merge_events(&list("s", 1, 4, &[3, 1, 4])).unwrap();

    let curve: Vec<f64> = spc(&table.view(), None).iter().map(|r| r.recall).collect();
    assert_eq!(curve, vec![1.0, 0.0, 1.0, 1.0]);

    let crp = lag_crp(&table.view(), &CrpOptions::default());
    let counts: Vec<(i32, u32, u32)> = crp.iter().map(|r| (r.lag, r.actual, r.possible)).collect();
    assert_eq!(
        counts,
        vec![(-3, 0, 0), (-2, 1, 1), (-1, 0, 1), (1, 0, 2), (2, 0, 0), (3, 1, 1)]
    );
}

#[test]
fn perfect_forward_recall() {
    let table = merge_events(&list("s", 1, 6, &[1, 2, 3, 4, 5, 6])).unwrap();

    assert!(spc(&table.view(), None).iter().all(|r| r.recall == 1.0));
    for row in lag_crp(&table.view(), &CrpOptions::default()) {
        let expected = if row.lag == 1 { 1.0 } else { 0.0 };
        if row.possible > 0 {
            assert_eq!(row.prob, expected, "lag {}", row.lag);
        } else {
            assert!(row.prob.is_nan());
        }
    }
}

#[test]
fn intrusion_scenario() {
    let table = merge_events(&list("s", 1, 3, &[1, 0, 2])).unwrap();

    let intrusion = table.iter().find(|r| r.is_intrusion).unwrap();
    assert_eq!(intrusion.input_position, None);
    assert_eq!(intrusion.output_position, Some(2));

    // not a study event: positions 1..3 only, two of three recalled
    let curve = spc(&table.view(), None);
    assert_eq!(curve.len(), 3);
    assert_eq!(curve.iter().map(|r| r.recall).sum::<f64>(), 2.0);

    // 1 -> intrusion and intrusion -> 2 are both dropped
    let crp = lag_crp(&table.view(), &CrpOptions::default());
    assert_eq!(crp.iter().map(|r| r.actual).sum::<u32>(), 0);
    assert_eq!(crp.iter().map(|r| r.possible).sum::<u32>(), 0);
}

#[test]
fn repeat_scenario() {
    let table = merge_events(&list("s", 1, 3, &[2, 2, 3])).unwrap();

    let repeat = table.iter().find(|r| r.is_repeat).unwrap();
    assert_eq!(repeat.input_position, Some(2));
    assert_eq!(repeat.output_position, Some(2));

    let curve: Vec<f64> = spc(&table.view(), None).iter().map(|r| r.recall).collect();
    assert_eq!(curve, vec![0.0, 1.0, 1.0]);

    // the repeat fills the second attempt but is nobody's first recall
    let second: f64 = pnr(&table.view(), None)
        .iter()
        .filter(|r| r.output_position == 2)
        .map(|r| r.prob)
        .sum();
    assert_eq!(second, 0.0);

    let crp = lag_crp(&table.view(), &CrpOptions::default());
    assert_eq!(crp.iter().map(|r| r.actual).sum::<u32>(), 0);
}

#[test]
fn subjects_are_scored_independently() {
    let mut events = list("b", 1, 3, &[1, 2, 3]);
    events.extend(list("a", 1, 3, &[3, 2, 1]));
    let table = merge_events(&events).unwrap();

    let ranks = lag_rank(&table.view(), &CrpOptions::default());
    let subjects: Vec<&str> = ranks.iter().map(|r| r.subject.as_str()).collect();
    assert_eq!(subjects, vec!["b", "a"]);
    assert!(ranks.iter().all(|r| r.rank == 1.0));

    let only_a = lag_crp(&table.subject("a"), &CrpOptions::default());
    assert!(only_a.iter().all(|r| r.subject == "a"));
    assert_eq!(only_a.iter().find(|r| r.lag == -1).unwrap().prob, 1.0);
}

#[test]
fn frame_from_raw_rows() {
    let events = parse_records(&frame()).unwrap();
    let table = merge_events(&events).unwrap();

    assert_eq!(table.len(), 8);
    assert_eq!(table.iter().filter(|r| r.is_intrusion).count(), 1);
    assert_eq!(table.iter().filter(|r| r.is_repeat).count(), 1);

    let rank = lag_rank(&table.view(), &CrpOptions::default());
    assert!((rank[0].rank - 0.25).abs() < 1e-12);

    let matrix = DistanceMatrix::from_rows(vec![
        vec![0.0, 1.0, 2.0, 2.0, 2.0, 2.0],
        vec![1.0, 0.0, 1.0, 2.0, 2.0, 2.0],
        vec![2.0, 1.0, 0.0, 2.0, 2.0, 2.0],
        vec![2.0, 2.0, 2.0, 0.0, 2.0, 3.0],
        vec![2.0, 2.0, 2.0, 2.0, 0.0, 2.0],
        vec![2.0, 2.0, 2.0, 3.0, 2.0, 0.0],
    ])
    .unwrap();
    let model = DistanceModel::new("item_index", matrix);
    let rank = distance_rank(&table.view(), &model, &CrpOptions::default()).unwrap();
    assert!((rank[0].rank - 0.25).abs() < 1e-12);
}

#[test]
fn category_curves_from_raw_rows() {
    let events = parse_records(&frame()).unwrap();
    let table = merge_events(&events).unwrap();

    let by_task = spc(&table.view(), Some("task"));
    let cells: Vec<(&str, u32, f64)> = by_task
        .iter()
        .map(|r| (r.category.as_deref().unwrap(), r.input_position, r.recall))
        .collect();
    assert_eq!(cells, vec![("1", 1, 0.5), ("1", 3, 1.0), ("2", 2, 0.5)]);
}

#[test]
fn integrity_errors_name_the_unit() {
    let mut events = list("s", 1, 3, &[1]);
    events.push(RawEvent::study("s", 1, "extra", 2));

    let err = merge_events(&events).unwrap_err();
    assert_eq!(
        err,
        FrError::DuplicateInputPosition {
            subject: "s".into(),
            list: 1,
            position: 2
        }
    );
    assert!(err.to_string().contains("subject s list 1"));
}

#[test]
fn filtered_views_feed_scoring() {
    let mut events = list("s", 1, 3, &[1, 2]);
    events.extend(list("s", 2, 3, &[3]));
    let table = merge_events(&events).unwrap();

    let first = spc(&table.list(1), None);
    assert_eq!(first.iter().map(|r| r.recall).collect::<Vec<_>>(), vec![1.0, 1.0, 0.0]);

    let both = spc(&table.view(), None);
    assert_eq!(both.iter().map(|r| r.recall).collect::<Vec<_>>(), vec![0.5, 0.5, 0.5]);
}
