//! # freerecall-algo - free recall analysis core
//!
//! Turns raw study/recall event rows into a merged event table and scores
//! recall behavior from it.
//!
//! - **Merge Engine** - aligns each recall attempt with the studied item it names
//! - **Event Table** - filterable, groupable view over merged trial records
//! - **Transition Masker** - walks recall sequences and tracks what was still recallable
//! - **Scoring Engine** - SPC, PNR, Lag-CRP, lag rank, distance CRP and distance rank
//!
//! ## Modules
//!
//! - [`types`] - raw events, trial records and result rows
//! - [`error`] - schema, integrity and scoring errors
//! - [`merge`] - per (subject, list) merging
//! - [`table`] - event table and views
//! - [`transitions`] - transition iteration with masks
//! - [`scoring`] - per-subject statistics
//!
//! ## Example
//!
//! ```rust
//! use freerecall_algo::{merge_events, scoring, RawEvent};
//!
//! let events = vec![
//!     RawEvent::study("s1", 1, "apple", 1),
//!     RawEvent::study("s1", 1, "river", 2),
//!     RawEvent::recall("s1", 1, "river", 1),
//! ];
//! let table = merge_events(&events).unwrap();
//! let curve = scoring::spc(&table.view(), None);
//! assert_eq!(curve[1].recall, 1.0);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod error;
pub mod merge;
pub mod scoring;
pub mod table;
pub mod transitions;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{FrError, FrResult};
pub use merge::{merge_events, merge_list};
pub use scoring::{
    CategoryDenominator, CategoryTransitions, CrpOptions, DistanceBins, DistanceMatrix,
    DistanceModel,
};
pub use table::{EventTable, ListSplit, TableView};
pub use transitions::{Transition, TransitionMasker};
pub use types::{
    parse_records, DistanceCrpRow, LagCrpRow, PnrRow, RankRow, RawEvent, SpcRow, TrialRecord,
    TrialType,
};
