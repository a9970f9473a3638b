//! Common Types
//!
//! Raw study/recall events, merged trial records and the result rows
//! produced by the scoring functions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{FrError, FrResult};

// ==================== Constants ====================

/// Columns every raw event row must carry
pub const REQUIRED_COLUMNS: [&str; 5] = ["subject", "list", "item", "position", "trial_type"];

/// Auxiliary attributes carried through merging without interpretation
pub type Attrs = BTreeMap<String, Value>;

// ==================== Raw Events ====================

/// Kind of event in a free recall session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialType {
    Study,
    Recall,
}

impl TrialType {
    /// Exact, case-sensitive match against `study` / `recall`
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "study" => Some(TrialType::Study),
            "recall" => Some(TrialType::Recall),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrialType::Study => "study",
            TrialType::Recall => "recall",
        }
    }
}

impl fmt::Display for TrialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One study presentation or recall attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawEvent {
    pub subject: String,
    pub list: u32,
    pub item: String,
    /// Serial position for study events, attempt order for recall events
    pub position: u32,
    pub trial_type: TrialType,
    #[serde(flatten)]
    pub attrs: Attrs,
}

impl RawEvent {
    pub fn study(subject: impl Into<String>, list: u32, item: impl Into<String>, position: u32) -> Self {
        Self::new(subject, list, item, position, TrialType::Study)
    }

    pub fn recall(subject: impl Into<String>, list: u32, item: impl Into<String>, position: u32) -> Self {
        Self::new(subject, list, item, position, TrialType::Recall)
    }

    fn new(
        subject: impl Into<String>,
        list: u32,
        item: impl Into<String>,
        position: u32,
        trial_type: TrialType,
    ) -> Self {
        Self {
            subject: subject.into(),
            list,
            item: item.into(),
            position,
            trial_type,
            attrs: Attrs::new(),
        }
    }

    /// Attach an auxiliary attribute
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Validate one untyped row.
    ///
    /// `row` is only used to locate the offending record in errors. Every
    /// column other than the required ones is kept as an auxiliary attribute.
    pub fn from_record(row: usize, record: &Map<String, Value>) -> FrResult<Self> {
        let field = |column: &'static str| {
            record
                .get(column)
                .ok_or(FrError::MissingColumn { column, row })
        };
        let invalid = |column: &'static str, value: &Value| FrError::InvalidField {
            column,
            row,
            value: value.to_string(),
        };

        let subject = field("subject")?;
        let list = field("list")?;
        let item = field("item")?;
        let position = field("position")?;
        let trial_type = field("trial_type")?;

        let trial_type = trial_type
            .as_str()
            .and_then(TrialType::parse)
            .ok_or_else(|| FrError::InvalidTrialType {
                row,
                value: trial_type.to_string(),
            })?;

        let attrs = record
            .iter()
            .filter(|(key, _)| !REQUIRED_COLUMNS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            subject: attr_label(subject).ok_or_else(|| invalid("subject", subject))?,
            list: as_index(list).ok_or_else(|| invalid("list", list))?,
            item: attr_label(item).ok_or_else(|| invalid("item", item))?,
            position: as_index(position).ok_or_else(|| invalid("position", position))?,
            trial_type,
            attrs,
        })
    }
}

/// Validate a whole table of rows, stopping at the first bad one
pub fn parse_records(records: &[Map<String, Value>]) -> FrResult<Vec<RawEvent>> {
    records
        .iter()
        .enumerate()
        .map(|(row, record)| RawEvent::from_record(row, record))
        .collect()
}

/// Text label for a scalar attribute value.
///
/// Integral numbers render without a fractional part so that `1` and `1.0`
/// name the same subject or category. Null, arrays and objects have no label.
pub fn attr_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i.to_string()),
            None => n.as_f64().map(|f| {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", f as i64)
                } else {
                    f.to_string()
                }
            }),
        },
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Non-negative integer from a JSON number, an integral float or a numeric string
pub fn as_index(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(u) => u32::try_from(u).ok(),
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                .map(|f| f as u32),
        },
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ==================== Trial Records ====================

/// One row of the event table: a studied item, a recall attempt, or both.
///
/// Study rows keep `output_position` empty until their first recall is
/// merged onto them. Repeats and intrusions are separate rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub subject: String,
    pub list: u32,
    pub item: String,
    /// Serial position at study, `None` for intrusions
    pub input_position: Option<u32>,
    /// Recall attempt order, `None` for omissions
    pub output_position: Option<u32>,
    /// Number of earlier recalls of the same item in this list
    pub repeat: u32,
    pub is_repeat: bool,
    pub is_intrusion: bool,
    /// Attributes of the study event (also copied onto repeat rows)
    pub study_attrs: Attrs,
    /// Attributes of the recall event
    pub recall_attrs: Attrs,
}

impl TrialRecord {
    pub fn recalled(&self) -> bool {
        self.output_position.is_some()
    }

    /// Row produced by a study event
    pub fn is_study(&self) -> bool {
        self.input_position.is_some() && !self.is_repeat
    }

    /// First recall of a studied item
    pub fn is_correct_recall(&self) -> bool {
        self.recalled() && !self.is_repeat && !self.is_intrusion
    }

    /// Attribute lookup, study event first
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.study_attrs
            .get(key)
            .or_else(|| self.recall_attrs.get(key))
    }

    pub fn label(&self, key: &str) -> Option<String> {
        self.attr(key).and_then(attr_label)
    }
}

// ==================== Results ====================

/// Empty cells are written as `null`; read them back as NaN
fn nan_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Serial position curve cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpcRow {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub input_position: u32,
    /// Fraction of study events at this position that were recalled
    #[serde(deserialize_with = "nan_if_null")]
    pub recall: f64,
}

/// Probability of nth recall cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnrRow {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub output_position: u32,
    pub input_position: u32,
    #[serde(deserialize_with = "nan_if_null")]
    pub prob: f64,
}

/// Lag conditional response probability cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagCrpRow {
    pub subject: String,
    pub lag: i32,
    pub actual: u32,
    pub possible: u32,
    /// NaN when the lag was never available (serialized as null)
    #[serde(deserialize_with = "nan_if_null")]
    pub prob: f64,
}

/// Distance conditional response probability cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceCrpRow {
    pub subject: String,
    pub bin: usize,
    #[serde(deserialize_with = "nan_if_null")]
    pub lower: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub upper: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub center: f64,
    pub actual: u32,
    pub possible: u32,
    #[serde(deserialize_with = "nan_if_null")]
    pub prob: f64,
}

/// Mean percentile rank of observed transitions for one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankRow {
    pub subject: String,
    #[serde(deserialize_with = "nan_if_null")]
    pub rank: f64,
}
