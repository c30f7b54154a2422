use std::fmt;
use std::path::PathBuf;

/// Machine-readable error codes for operators and scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidConfiguration,
    ConfigParseError,
    DatasetParseError,
    ExtractionFailed,
    FetchFailed,
    IoFailed,
    TableFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidConfiguration => "E1001",
            Self::ConfigParseError => "E1002",
            Self::DatasetParseError => "E2001",
            Self::ExtractionFailed => "E2002",
            Self::FetchFailed => "E3001",
            Self::IoFailed => "E5001",
            Self::TableFailed => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidConfiguration => "Invalid configuration",
            Self::ConfigParseError => "Config file parse error",
            Self::DatasetParseError => "Dataset does not match the expected shape",
            Self::ExtractionFailed => "Row is missing an expected field or has the wrong shape",
            Self::FetchFailed => "Dataset download failed",
            Self::IoFailed => "File system error",
            Self::TableFailed => "Table read/write error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidConfiguration => {
                Some("Pick one of the conflicting options and check asct.toml.")
            }
            Self::ConfigParseError => Some("Fix syntax in the config file and retry."),
            Self::DatasetParseError => {
                Some("Expected a JSON object of organ tables, each with a `data` list.")
            }
            Self::ExtractionFailed => {
                Some("Every row needs anatomical_structures and cell_types lists of {id, rdfs_label, name}.")
            }
            Self::FetchFailed => Some("Check network access or pass --input with a local copy."),
            Self::IoFailed => Some("Check paths and write permissions."),
            Self::TableFailed => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by the graph construction pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AsctError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("dataset parse error: {0}")]
    DatasetParse(String),

    /// A row or one of its records lacks a field the extractor requires, or
    /// holds a value of the wrong JSON type.
    ///
    /// `row` is the 0-based index into the organ table's `data` list.
    #[error("organ `{organ}` row {row}: missing or malformed field `{field}`")]
    Extraction {
        organ: String,
        row: usize,
        field: String,
    },

    #[error("failed to fetch {url}: {detail}")]
    Fetch { url: String, detail: String },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("table error: {0}")]
    Csv(#[from] csv::Error),
}

impl AsctError {
    /// The stable [`ErrorCode`] for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidConfiguration(_) => ErrorCode::InvalidConfiguration,
            Self::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Self::DatasetParse(_) => ErrorCode::DatasetParseError,
            Self::Extraction { .. } => ErrorCode::ExtractionFailed,
            Self::Fetch { .. } => ErrorCode::FetchFailed,
            Self::Io { .. } => ErrorCode::IoFailed,
            Self::Csv(_) => ErrorCode::TableFailed,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AsctError>;
