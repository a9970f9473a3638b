//! Scoring Engine
//!
//! Every statistic is computed per subject, one Rayon task per subject,
//! and never averaged across subjects. Results come back in the order
//! subjects first appear in the view.
//!
//! - [`spc`] - serial position curve
//! - [`pnr`] - probability of nth recall
//! - [`crp`] - lag conditional response probability
//! - [`rank`] - lag percentile rank
//! - [`distance`] - distance CRP and distance rank over an item distance matrix

pub mod crp;
pub mod distance;
pub mod pnr;
pub mod rank;
pub mod spc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::FrResult;
use crate::table::TableView;
use crate::types::TrialRecord;

pub use crp::{lag_crp, lag_crp_masked};
pub use distance::{distance_crp, distance_rank, DistanceBins, DistanceMatrix, DistanceModel};
pub use pnr::pnr;
pub use rank::{lag_rank, percentile_rank};
pub use spc::spc;

// ==================== Options ====================

/// Which category pairs count as a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryTransitions {
    /// Both items share a category
    #[default]
    Within,
    /// The items belong to different categories
    Between,
}

/// What the possible-transition denominator counts under category conditioning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryDenominator {
    /// Only remaining items that satisfy the same category condition
    #[default]
    Matching,
    /// Every remaining item
    All,
}

/// Options shared by the transition statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrpOptions {
    /// Attribute holding the item category; `None` disables conditioning
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub transitions: CategoryTransitions,
    #[serde(default)]
    pub denominator: CategoryDenominator,
}

impl CrpOptions {
    pub fn within(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    pub fn between(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            transitions: CategoryTransitions::Between,
            ..Self::default()
        }
    }

    pub fn with_denominator(mut self, denominator: CategoryDenominator) -> Self {
        self.denominator = denominator;
        self
    }

    /// Whether a transition between `prev` and `curr` satisfies the category condition.
    ///
    /// Items without a category label never satisfy a condition.
    pub fn accepts(&self, prev: &TrialRecord, curr: &TrialRecord) -> bool {
        let Some(key) = self.category.as_deref() else {
            return true;
        };
        match (prev.label(key), curr.label(key)) {
            (Some(a), Some(b)) => match self.transitions {
                CategoryTransitions::Within => a == b,
                CategoryTransitions::Between => a != b,
            },
            _ => false,
        }
    }

    pub(crate) fn restrict_possible(&self) -> bool {
        self.category.is_some() && self.denominator == CategoryDenominator::Matching
    }
}

// ==================== Helpers ====================

/// Run `score` on every subject in parallel and concatenate in subject order
pub(crate) fn per_subject<'a, R, F>(view: &TableView<'a>, score: F) -> Vec<R>
where
    R: Send,
    F: Fn(&'a str, &TableView<'a>) -> Vec<R> + Sync,
{
    let subjects = view.by_subject();
    let rows: Vec<Vec<R>> = subjects
        .par_iter()
        .map(|(subject, records)| {
            tracing::debug!(subject = *subject, records = records.len(), "scoring subject");
            score(*subject, records)
        })
        .collect();
    rows.into_iter().flatten().collect()
}

/// Fallible variant of [`per_subject`]; the first failing subject in order wins
pub(crate) fn try_per_subject<'a, R, F>(view: &TableView<'a>, score: F) -> FrResult<Vec<R>>
where
    R: Send,
    F: Fn(&'a str, &TableView<'a>) -> FrResult<Vec<R>> + Sync,
{
    let subjects = view.by_subject();
    let results: Vec<FrResult<Vec<R>>> = subjects
        .par_iter()
        .map(|(subject, records)| score(*subject, records))
        .collect();

    let mut rows = Vec::new();
    for result in results {
        rows.extend(result?);
    }
    Ok(rows)
}

/// `numerator / denominator`, NaN when nothing was possible
pub(crate) fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        f64::from(numerator) / f64::from(denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_list;
    use crate::types::RawEvent;

    fn pair(first: &str, second: Option<&str>) -> Vec<TrialRecord> {
        let a = RawEvent::study("s", 1, "a", 1).with_attr("category", first);
        let mut b = RawEvent::study("s", 1, "b", 2);
        if let Some(category) = second {
            b = b.with_attr("category", category);
        }
        merge_list("s", 1, &[a, b]).unwrap()
    }

    #[test]
    fn test_no_category_accepts_everything() {
        let records = pair("x", Some("y"));
        assert!(CrpOptions::default().accepts(&records[0], &records[1]));
        assert!(!CrpOptions::default().restrict_possible());
    }

    #[test]
    fn test_within_and_between() {
        let same = pair("x", Some("x"));
        let diff = pair("x", Some("y"));

        assert!(CrpOptions::within("category").accepts(&same[0], &same[1]));
        assert!(!CrpOptions::within("category").accepts(&diff[0], &diff[1]));
        assert!(CrpOptions::between("category").accepts(&diff[0], &diff[1]));
        assert!(!CrpOptions::between("category").accepts(&same[0], &same[1]));
    }

    #[test]
    fn test_missing_category_never_matches() {
        let records = pair("x", None);
        assert!(!CrpOptions::within("category").accepts(&records[0], &records[1]));
        assert!(!CrpOptions::between("category").accepts(&records[0], &records[1]));
    }

    #[test]
    fn test_denominator_mode() {
        assert!(CrpOptions::within("category").restrict_possible());
        assert!(!CrpOptions::within("category")
            .with_denominator(CategoryDenominator::All)
            .restrict_possible());
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: CrpOptions =
            serde_json::from_str(r#"{"category": "cat", "denominator": "all"}"#).unwrap();

        assert_eq!(options.category.as_deref(), Some("cat"));
        assert_eq!(options.transitions, CategoryTransitions::Within);
        assert_eq!(options.denominator, CategoryDenominator::All);
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(1, 4), 0.25);
        assert!(ratio(0, 0).is_nan());
    }
}
