//! Load raw events, merge, score, write the result tables.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use freerecall_algo::scoring::{
    distance_crp, distance_rank, lag_crp, lag_rank, pnr, spc, DistanceBins, DistanceMatrix,
    DistanceModel,
};
use freerecall_algo::{
    merge_events, CrpOptions, DistanceCrpRow, EventTable, LagCrpRow, PnrRow, RankRow, RawEvent,
    SpcRow,
};

use crate::config::{Config, DistanceConfig};
use crate::error::CliError;

/// Every table produced by one run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Number of merged trial records
    pub records: usize,
    pub spc: Vec<SpcRow>,
    pub pnr: Vec<PnrRow>,
    pub lag_crp: Vec<LagCrpRow>,
    pub lag_rank: Vec<RankRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_crp: Option<Vec<DistanceCrpRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_rank: Option<Vec<RankRow>>,
}

/// Distance model and optional bins, loaded from a [`DistanceConfig`]
#[derive(Debug, Clone)]
pub struct DistanceSettings {
    pub model: DistanceModel,
    pub bins: Option<DistanceBins>,
    pub count_unique: bool,
}

impl DistanceSettings {
    pub fn load(config: &DistanceConfig) -> Result<Self, CliError> {
        let text = fs::read_to_string(&config.matrix)
            .map_err(|err| CliError::io(&config.matrix, err))?;
        let matrix: DistanceMatrix =
            serde_json::from_str(&text).map_err(|err| CliError::json(&config.matrix, err))?;
        let bins = config.edges.clone().map(DistanceBins::new).transpose()?;

        Ok(Self {
            model: DistanceModel::new(config.item_index.clone(), matrix),
            bins,
            count_unique: config.count_unique,
        })
    }
}

/// Read events from a JSON array of objects, or one object per line for
/// `.jsonl` / `.ndjson` files.
///
/// Records are located by their 0-based element index in an array and by
/// their 1-based line in a JSON Lines file; schema errors report that
/// location as their `row`.
pub fn load_events(path: &Path) -> Result<Vec<RawEvent>, CliError> {
    let text = fs::read_to_string(path).map_err(|err| CliError::io(path, err))?;

    let lines = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("jsonl") | Some("ndjson")
    );
    let values: Vec<(usize, Value)> = if lines {
        text.lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line))
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(line, record)| {
                serde_json::from_str::<Value>(record)
                    .map(|value| (line, value))
                    .map_err(|source| CliError::JsonLine {
                        path: path.to_path_buf(),
                        line,
                        source,
                    })
            })
            .collect::<Result<_, _>>()?
    } else {
        match serde_json::from_str::<Value>(&text).map_err(|err| CliError::json(path, err))? {
            Value::Array(values) => values.into_iter().enumerate().collect(),
            _ => {
                return Err(CliError::InvalidInput {
                    path: path.to_path_buf(),
                    reason: "expected a JSON array of event objects".to_string(),
                })
            }
        }
    };

    let unit = if lines { "line" } else { "row" };
    values
        .into_iter()
        .map(|(row, value)| match value {
            Value::Object(record) => RawEvent::from_record(row, &record).map_err(CliError::from),
            _ => Err(CliError::InvalidInput {
                path: path.to_path_buf(),
                reason: format!("{unit} {row} is not an object"),
            }),
        })
        .collect()
}

/// Score a merged table
pub fn analyze(
    table: &EventTable,
    options: &CrpOptions,
    distance: Option<&DistanceSettings>,
) -> Result<Report, CliError> {
    let view = table.view();
    let category = options.category.as_deref();

    let (distance_table, distance_ranks) = match distance {
        Some(settings) => {
            let crp = settings
                .bins
                .as_ref()
                .map(|bins| distance_crp(&view, &settings.model, bins, settings.count_unique, options))
                .transpose()?;
            let rank = distance_rank(&view, &settings.model, options)?;
            (crp, Some(rank))
        }
        None => (None, None),
    };

    Ok(Report {
        records: table.len(),
        spc: spc(&view, category),
        pnr: pnr(&view, category),
        lag_crp: lag_crp(&view, options),
        lag_rank: lag_rank(&view, options),
        distance_crp: distance_table,
        distance_rank: distance_ranks,
    })
}

/// Write one `<table>.json` per table into `dir`, returning the files written
pub fn write_tables(report: &Report, dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    fs::create_dir_all(dir).map_err(|err| CliError::io(dir, err))?;

    let mut tables: Vec<(&str, Value)> = vec![
        ("spc", to_value(dir, &report.spc)?),
        ("pnr", to_value(dir, &report.pnr)?),
        ("lag_crp", to_value(dir, &report.lag_crp)?),
        ("lag_rank", to_value(dir, &report.lag_rank)?),
    ];
    if let Some(rows) = &report.distance_crp {
        tables.push(("distance_crp", to_value(dir, rows)?));
    }
    if let Some(rows) = &report.distance_rank {
        tables.push(("distance_rank", to_value(dir, rows)?));
    }

    let mut written = Vec::with_capacity(tables.len());
    for (name, value) in tables {
        let path = dir.join(format!("{name}.json"));
        let text = serde_json::to_string_pretty(&value).map_err(|err| CliError::json(&path, err))?;
        fs::write(&path, text).map_err(|err| CliError::io(&path, err))?;
        written.push(path);
    }
    Ok(written)
}

fn to_value<T: Serialize>(dir: &Path, rows: &T) -> Result<Value, CliError> {
    serde_json::to_value(rows).map_err(|err| CliError::json(dir, err))
}

/// Full run as configured; the report goes to `FR_OUTPUT_DIR` or stdout
pub fn run(config: &Config) -> Result<Report, CliError> {
    let input = config.input.as_deref().ok_or(CliError::MissingInput)?;

    let events = load_events(input)?;
    tracing::info!(path = %input.display(), events = events.len(), "loaded events");

    let table = merge_events(&events)?;
    tracing::info!(records = table.len(), "merged event table");

    let distance = config.distance.as_ref().map(DistanceSettings::load).transpose()?;
    let report = analyze(&table, &config.crp_options(), distance.as_ref())?;

    match &config.output_dir {
        Some(dir) => {
            let written = write_tables(&report, dir)?;
            tracing::info!(dir = %dir.display(), tables = written.len(), "wrote result tables");
        }
        None => {
            let text = serde_json::to_string_pretty(&report)
                .map_err(|err| CliError::json(input, err))?;
            println!("{text}");
        }
    }

    Ok(report)
}
