use std::path::PathBuf;

use freerecall_algo::{CategoryDenominator, CategoryTransitions, CrpOptions};

use crate::error::CliError;

/// Distance statistics settings; present only when an item index and a matrix are configured
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceConfig {
    pub item_index: String,
    pub matrix: PathBuf,
    /// Bin edges for the distance CRP; without them only distance rank is computed
    pub edges: Option<Vec<f64>>,
    pub count_unique: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub input: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub category: Option<String>,
    pub transitions: CategoryTransitions,
    pub denominator: CategoryDenominator,
    pub distance: Option<DistanceConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, CliError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let transitions = match get("FR_TRANSITIONS").as_deref().map(str::trim) {
            Some("between") => CategoryTransitions::Between,
            _ => CategoryTransitions::Within,
        };

        let denominator = match get("FR_CATEGORY_DENOMINATOR").as_deref().map(str::trim) {
            Some("all") => CategoryDenominator::All,
            _ => CategoryDenominator::Matching,
        };

        let distance = match (get("FR_ITEM_INDEX"), get("FR_DISTANCE_MATRIX")) {
            (Some(item_index), Some(matrix)) => Some(DistanceConfig {
                item_index,
                matrix: PathBuf::from(matrix),
                edges: get("FR_DISTANCE_EDGES").map(|raw| parse_edges(&raw)).transpose()?,
                count_unique: get("FR_COUNT_UNIQUE")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(false),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(CliError::Config(
                    "FR_ITEM_INDEX is set but FR_DISTANCE_MATRIX is not".to_string(),
                ))
            }
            (None, Some(_)) => {
                return Err(CliError::Config(
                    "FR_DISTANCE_MATRIX is set but FR_ITEM_INDEX is not".to_string(),
                ))
            }
        };

        Ok(Self {
            input: get("FR_INPUT").map(PathBuf::from),
            output_dir: get("FR_OUTPUT_DIR").map(PathBuf::from),
            category: get("FR_CATEGORY"),
            transitions,
            denominator,
            distance,
        })
    }

    /// A positional argument takes precedence over `FR_INPUT`
    pub fn with_args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        if let Some(path) = args.into_iter().next() {
            self.input = Some(PathBuf::from(path));
        }
        self
    }

    pub fn crp_options(&self) -> CrpOptions {
        CrpOptions {
            category: self.category.clone(),
            transitions: self.transitions,
            denominator: self.denominator,
        }
    }
}

fn parse_edges(raw: &str) -> Result<Vec<f64>, CliError> {
    raw.split(',')
        .map(|edge| {
            edge.trim()
                .parse::<f64>()
                .map_err(|_| CliError::Config(format!("FR_DISTANCE_EDGES: `{}` is not a number", edge.trim())))
        })
        .collect()
}
