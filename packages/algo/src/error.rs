//! Error Types
//!
//! Schema errors come from malformed raw rows, integrity errors from a
//! (subject, list) unit whose events break the study/recall invariants.
//! Omissions, intrusions, repeats and empty denominators are data, not errors.

/// Errors raised while validating, merging or scoring free recall data
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrError {
    // ==================== Schema ====================
    #[error("required column `{column}` is missing (row {row})")]
    MissingColumn { column: &'static str, row: usize },

    #[error("column `{column}` has invalid value {value} (row {row})")]
    InvalidField {
        column: &'static str,
        row: usize,
        value: String,
    },

    #[error("trial_type must be \"study\" or \"recall\", got {value} (row {row})")]
    InvalidTrialType { row: usize, value: String },

    // ==================== Integrity ====================
    #[error("subject {subject} list {list}: input position {position} appears more than once")]
    DuplicateInputPosition {
        subject: String,
        list: u32,
        position: u32,
    },

    #[error("subject {subject} list {list}: study positions are not contiguous from 1 (missing {missing})")]
    NonContiguousInputPositions {
        subject: String,
        list: u32,
        missing: u32,
    },

    #[error("subject {subject} list {list}: item `{item}` is studied more than once")]
    DuplicateStudyItem {
        subject: String,
        list: u32,
        item: String,
    },

    #[error("subject {subject} list {list}: recall position {position} does not follow {previous}")]
    NonMonotonicOutputPosition {
        subject: String,
        list: u32,
        position: u32,
        previous: u32,
    },

    // ==================== Scoring arguments ====================
    #[error("subject {subject} list {list}: item `{item}` has no usable `{key}` attribute")]
    MissingAttribute {
        key: String,
        subject: String,
        list: u32,
        item: String,
    },

    #[error("item index {index} is outside the {size}x{size} distance matrix")]
    InvalidDistanceIndex { index: usize, size: usize },

    #[error("distance matrix is not square: row {row} has {len} entries, expected {size}")]
    InvalidDistanceMatrix { row: usize, len: usize, size: usize },

    #[error("bin edges must be finite, strictly increasing and contain at least two values")]
    InvalidBinEdges,
}

pub type FrResult<T> = Result<T, FrError>;
