//! colord error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ColordError {
    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Division undefined: {0}")]
    DivisionUndefined(String),

    #[error("Workload error: {0}")]
    Workload(String),

    #[error("Order-by selection error: {0}")]
    OrderBy(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Cache drop error: {0}")]
    CacheDrop(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ColordError {
    /// Errors that belong to the metadata side of an evaluation
    /// (bad table directory, unreadable footers, empty layouts).
    pub fn is_metadata(&self) -> bool {
        matches!(
            self,
            ColordError::Directory(_)
                | ColordError::Metadata(_)
                | ColordError::DivisionUndefined(_)
                | ColordError::Parquet(_)
        )
    }

    /// Short label of the failing concern, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            e if e.is_metadata() => "metadata",
            ColordError::Workload(_) => "workload",
            ColordError::OrderBy(_) => "order-by",
            ColordError::Execution(_) | ColordError::Arrow(_) | ColordError::DataFusion(_) => {
                "execution"
            }
            ColordError::CacheDrop(_) => "cache drop",
            ColordError::Config(_) | ColordError::Toml(_) | ColordError::TomlParse(_) => {
                "configuration"
            }
            _ => "i/o",
        }
    }
}

pub type Result<T> = std::result::Result<T, ColordError>;
