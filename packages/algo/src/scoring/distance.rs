//! Distance CRP and Distance Rank
//!
//! Transition statistics over an arbitrary item-to-item distance matrix
//! (semantic similarity, spatial layout) instead of serial position. Each
//! study item names its matrix row through an integer attribute.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::rank::{mean, percentile_rank};
use super::{ratio, try_per_subject, CrpOptions};
use crate::error::{FrError, FrResult};
use crate::table::{ListSplit, TableView};
use crate::transitions::{Transition, TransitionMasker};
use crate::types::{as_index, DistanceCrpRow, RankRow, TrialRecord};

// ==================== Distance Matrix ====================

/// Square matrix of pairwise item distances, stored row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct DistanceMatrix {
    size: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> FrResult<Self> {
        let size = rows.len();
        let mut values = Vec::with_capacity(size * size);
        for (row, entries) in rows.into_iter().enumerate() {
            if entries.len() != size {
                return Err(FrError::InvalidDistanceMatrix {
                    row,
                    len: entries.len(),
                    size,
                });
            }
            values.extend(entries);
        }
        Ok(Self { size, values })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Distance from item `from` to item `to`; both must be below [`size`](Self::size)
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.values[from * self.size + to]
    }

    fn check_index(&self, index: usize) -> FrResult<usize> {
        if index < self.size {
            Ok(index)
        } else {
            Err(FrError::InvalidDistanceIndex {
                index,
                size: self.size,
            })
        }
    }
}

impl TryFrom<Vec<Vec<f64>>> for DistanceMatrix {
    type Error = FrError;

    fn try_from(rows: Vec<Vec<f64>>) -> FrResult<Self> {
        Self::from_rows(rows)
    }
}

impl From<DistanceMatrix> for Vec<Vec<f64>> {
    fn from(matrix: DistanceMatrix) -> Self {
        if matrix.size == 0 {
            return Vec::new();
        }
        matrix
            .values
            .chunks(matrix.size)
            .map(|row| row.to_vec())
            .collect()
    }
}

/// Distance matrix plus the attribute that maps study items onto it
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceModel {
    pub index_key: String,
    pub matrix: DistanceMatrix,
}

impl DistanceModel {
    pub fn new(index_key: impl Into<String>, matrix: DistanceMatrix) -> Self {
        Self {
            index_key: index_key.into(),
            matrix,
        }
    }

    /// Matrix index of every study row in the list, keyed by input position
    fn indices(&self, split: &ListSplit<'_>) -> FrResult<Vec<Option<usize>>> {
        let mut indices = vec![None; split.list_length() as usize];
        for record in &split.study {
            let Some(position) = record.input_position.filter(|&p| p > 0) else {
                continue;
            };
            let index = record
                .attr(&self.index_key)
                .and_then(as_index)
                .ok_or_else(|| FrError::MissingAttribute {
                    key: self.index_key.clone(),
                    subject: record.subject.clone(),
                    list: record.list,
                    item: record.item.clone(),
                })?;
            indices[position as usize - 1] = Some(self.matrix.check_index(index as usize)?);
        }
        Ok(indices)
    }
}

/// Study-position lookup into a [`DistanceModel`] for one list
struct ListDistances<'m> {
    matrix: &'m DistanceMatrix,
    indices: Vec<Option<usize>>,
}

impl ListDistances<'_> {
    fn index(&self, record: &TrialRecord) -> Option<usize> {
        let position = record.input_position?.checked_sub(1)? as usize;
        self.indices.get(position).copied().flatten()
    }

    fn between(&self, from: &TrialRecord, to: &TrialRecord) -> Option<f64> {
        Some(self.matrix.get(self.index(from)?, self.index(to)?))
    }

    fn actual(&self, transition: &Transition<'_>) -> Option<f64> {
        self.between(transition.prev, transition.curr)
    }

    fn possible(&self, transition: &Transition<'_>) -> Vec<f64> {
        transition
            .possible
            .iter()
            .filter_map(|r| self.between(transition.prev, r))
            .collect()
    }
}

// ==================== Bins ====================

/// Histogram bin edges.
///
/// Bin `i` covers `[edges[i], edges[i + 1])`; the last bin also includes its
/// upper edge. Values outside the edges fall in no bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct DistanceBins {
    edges: Vec<f64>,
}

impl DistanceBins {
    pub fn new(edges: Vec<f64>) -> FrResult<Self> {
        let valid = edges.len() >= 2
            && edges.iter().all(|e| e.is_finite())
            && edges.windows(2).all(|w| w[0] < w[1]);
        if !valid {
            return Err(FrError::InvalidBinEdges);
        }
        Ok(Self { edges })
    }

    /// Number of bins
    pub fn len(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Bin holding `value`, if any
    pub fn locate(&self, value: f64) -> Option<usize> {
        let above = self.edges.partition_point(|&edge| edge <= value);
        match above {
            0 => None,
            n if n == self.edges.len() => (value == self.edges[n - 1]).then_some(n - 2),
            n => Some(n - 1),
        }
    }

    pub fn lower(&self, bin: usize) -> f64 {
        self.edges[bin]
    }

    pub fn upper(&self, bin: usize) -> f64 {
        self.edges[bin + 1]
    }

    pub fn center(&self, bin: usize) -> f64 {
        (self.lower(bin) + self.upper(bin)) / 2.0
    }
}

impl TryFrom<Vec<f64>> for DistanceBins {
    type Error = FrError;

    fn try_from(edges: Vec<f64>) -> FrResult<Self> {
        Self::new(edges)
    }
}

impl From<DistanceBins> for Vec<f64> {
    fn from(bins: DistanceBins) -> Self {
        bins.edges
    }
}

// ==================== Statistics ====================

/// Walk every scorable transition of every list of one subject
fn for_each_transition<F>(
    records: &TableView<'_>,
    model: &DistanceModel,
    options: &CrpOptions,
    mut visit: F,
) -> FrResult<()>
where
    F: FnMut(&ListDistances<'_>, &Transition<'_>),
{
    let test = |prev: &TrialRecord, curr: &TrialRecord| options.accepts(prev, curr);
    for split in records.split_lists() {
        let distances = ListDistances {
            matrix: &model.matrix,
            indices: model.indices(&split)?,
        };
        let masker =
            TransitionMasker::from_split(&split).with_test(&test, options.restrict_possible());
        for transition in masker {
            visit(&distances, &transition);
        }
    }
    Ok(())
}

/// Distance CRP per subject and bin.
///
/// With `count_unique` each bin counts at most once per transition in the
/// possible tally, however many remaining items fall into it.
pub fn distance_crp(
    view: &TableView<'_>,
    model: &DistanceModel,
    bins: &DistanceBins,
    count_unique: bool,
    options: &CrpOptions,
) -> FrResult<Vec<DistanceCrpRow>> {
    try_per_subject(view, |subject, records| {
        let mut actual = vec![0u32; bins.len()];
        let mut possible = vec![0u32; bins.len()];

        for_each_transition(records, model, options, |distances, transition| {
            if let Some(bin) = distances.actual(transition).and_then(|d| bins.locate(d)) {
                actual[bin] += 1;
            }
            let hit = distances
                .possible(transition)
                .into_iter()
                .filter_map(|d| bins.locate(d));
            if count_unique {
                for bin in hit.collect::<BTreeSet<_>>() {
                    possible[bin] += 1;
                }
            } else {
                for bin in hit {
                    possible[bin] += 1;
                }
            }
        })?;

        Ok((0..bins.len())
            .map(|bin| DistanceCrpRow {
                subject: subject.to_string(),
                bin,
                lower: bins.lower(bin),
                upper: bins.upper(bin),
                center: bins.center(bin),
                actual: actual[bin],
                possible: possible[bin],
                prob: ratio(actual[bin], possible[bin]),
            })
            .collect())
    })
}

/// Mean distance percentile rank per subject; closer items rank higher
pub fn distance_rank(
    view: &TableView<'_>,
    model: &DistanceModel,
    options: &CrpOptions,
) -> FrResult<Vec<RankRow>> {
    try_per_subject(view, |subject, records| {
        let mut ranks = Vec::new();
        for_each_transition(records, model, options, |distances, transition| {
            let Some(actual) = distances.actual(transition) else {
                return;
            };
            let possible: Vec<f64> = distances
                .possible(transition)
                .into_iter()
                .map(|d| -d)
                .collect();
            ranks.extend(percentile_rank(-actual, &possible));
        })?;

        Ok(vec![RankRow {
            subject: subject.to_string(),
            rank: mean(&ranks),
        }])
    })
}
