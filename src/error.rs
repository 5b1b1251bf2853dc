use std::path::PathBuf;

use thiserror::Error;

/// Error kinds surfaced by the corpus loader, retriever, and maintenance
/// pipeline. Most variants are recoverable: the caller logs and continues
/// rather than aborting (see module docs on `maintenance` and `corpus`).
#[derive(Debug, Error)]
pub enum AssocMemError {
    #[error("required configuration `{0}` is not set")]
    ConfigMissing(&'static str),

    #[error("corpus directory not found: {0}")]
    CorpusMissing(PathBuf),

    #[error("failed to parse header in {path}: {source}")]
    NoteParseWarning {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("associator call failed: {0}")]
    AssociatorFailure(String),

    #[error("failed to persist {path}: {source}")]
    PersistFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, AssocMemError>;
