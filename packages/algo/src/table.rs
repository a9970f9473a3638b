//! Event Table and read-only views
//!
//! `EventTable` owns the merged trial records. Every selection returns a
//! `TableView` of borrowed rows, so filtering never copies or mutates records.
//! Grouping keeps groups in first-appearance order.

use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;
use serde_json::Value;

use crate::types::TrialRecord;

/// Merged trial records for a whole session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventTable {
    records: Vec<TrialRecord>,
}

impl EventTable {
    pub fn new(records: Vec<TrialRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrialRecord> {
        self.records.iter()
    }

    /// View over every row
    pub fn view(&self) -> TableView<'_> {
        TableView {
            records: self.records.iter().collect(),
        }
    }

    pub fn subject(&self, subject: &str) -> TableView<'_> {
        self.view().subject(subject)
    }

    pub fn list(&self, list: u32) -> TableView<'_> {
        self.view().list(list)
    }

    pub fn filter<F>(&self, predicate: F) -> TableView<'_>
    where
        F: Fn(&TrialRecord) -> bool,
    {
        self.view().filter(predicate)
    }

    pub fn where_attr(&self, key: &str, value: &Value) -> TableView<'_> {
        self.view().where_attr(key, value)
    }

    pub fn split_lists(&self) -> Vec<ListSplit<'_>> {
        self.view().split_lists()
    }
}

/// Borrowed subset of an event table, in table order
#[derive(Debug, Clone, Default)]
pub struct TableView<'a> {
    records: Vec<&'a TrialRecord>,
}

impl<'a> TableView<'a> {
    pub fn records(&self) -> &[&'a TrialRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a TrialRecord> + '_ {
        self.records.iter().copied()
    }

    pub fn filter<F>(&self, predicate: F) -> TableView<'a>
    where
        F: Fn(&TrialRecord) -> bool,
    {
        TableView {
            records: self.iter().filter(|&r| predicate(r)).collect(),
        }
    }

    pub fn subject(&self, subject: &str) -> TableView<'a> {
        self.filter(|r| r.subject == subject)
    }

    pub fn list(&self, list: u32) -> TableView<'a> {
        self.filter(|r| r.list == list)
    }

    /// Rows whose attribute `key` equals `value`
    pub fn where_attr(&self, key: &str, value: &Value) -> TableView<'a> {
        self.filter(|r| r.attr(key) == Some(value))
    }

    /// Group rows by an arbitrary key.
    ///
    /// Groups come back in the order their first row appears; rows keep
    /// table order inside each group.
    pub fn group_by<K, F>(&self, key: F) -> Vec<(K, TableView<'a>)>
    where
        K: Eq + Hash + Clone,
        F: Fn(&'a TrialRecord) -> K,
    {
        let mut slots: HashMap<K, usize> = HashMap::new();
        let mut groups: Vec<(K, TableView<'a>)> = Vec::new();

        for record in self.iter() {
            let group_key = key(record);
            let slot = match slots.get(&group_key) {
                Some(&slot) => slot,
                None => {
                    slots.insert(group_key.clone(), groups.len());
                    groups.push((group_key, TableView::default()));
                    groups.len() - 1
                }
            };
            groups[slot].1.records.push(record);
        }

        groups
    }

    pub fn by_subject(&self) -> Vec<(&'a str, TableView<'a>)> {
        self.group_by(|r| r.subject.as_str())
    }

    pub fn by_list(&self) -> Vec<((&'a str, u32), TableView<'a>)> {
        self.group_by(|r| (r.subject.as_str(), r.list))
    }

    /// Study and recall sequences of every list in the view
    pub fn split_lists(&self) -> Vec<ListSplit<'a>> {
        self.by_list()
            .into_iter()
            .map(|((subject, list), rows)| {
                let mut study: Vec<&'a TrialRecord> = rows.iter().filter(|r| r.is_study()).collect();
                study.sort_by_key(|r| r.input_position);

                let mut recalls: Vec<&'a TrialRecord> = rows.iter().filter(|r| r.recalled()).collect();
                recalls.sort_by_key(|r| r.output_position);

                ListSplit {
                    subject,
                    list,
                    study,
                    recalls,
                }
            })
            .collect()
    }
}

/// One list seen from both sides
#[derive(Debug, Clone)]
pub struct ListSplit<'a> {
    pub subject: &'a str,
    pub list: u32,
    /// Study rows ordered by input position
    pub study: Vec<&'a TrialRecord>,
    /// Every recall attempt (repeats and intrusions included) ordered by output position
    pub recalls: Vec<&'a TrialRecord>,
}

impl ListSplit<'_> {
    /// Highest study position in the list
    pub fn list_length(&self) -> u32 {
        self.study
            .iter()
            .filter_map(|r| r.input_position)
            .max()
            .unwrap_or(0)
    }

    /// Number of recall attempts made
    pub fn attempts(&self) -> u32 {
        self.recalls
            .iter()
            .filter_map(|r| r.output_position)
            .max()
            .unwrap_or(0)
    }
}
