use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("No table matching selector '{selector}' (occurrence {n}) in {source_name}")]
    TableNotFound {
        selector: String,
        n: usize,
        source_name: String,
    },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Cannot parse {value:?} in column '{column}'")]
    Parse { column: String, value: String },

    #[error("Duplicate {index} index value: {value}")]
    DuplicateIndex { index: String, value: i64 },

    #[error("Column '{column}' is not aligned with index '{index}': missing {missing:?}, unexpected {unexpected:?}")]
    IndexMismatch {
        column: String,
        index: String,
        missing: Vec<i64>,
        unexpected: Vec<i64>,
    },
}

impl MetadataError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        MetadataError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn parse(column: impl Into<String>, value: impl Into<String>) -> Self {
        MetadataError::Parse {
            column: column.into(),
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
