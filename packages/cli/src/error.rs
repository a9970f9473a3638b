use std::path::PathBuf;

use freerecall_algo::FrError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("no input file: set FR_INPUT or pass a path as the first argument")]
    MissingInput,

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: invalid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}:{line}: invalid JSON: {source}", path.display())]
    JsonLine {
        path: PathBuf,
        /// 1-based line of the file
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: {reason}", path.display())]
    InvalidInput { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Analysis(#[from] FrError),
}

impl CliError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CliError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        CliError::Json {
            path: path.into(),
            source,
        }
    }
}
