use thiserror::Error;

#[derive(Error, Debug)]
pub enum FindashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Could not read transactions from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown range: {0} (expected all, 6m or 1m)")]
    InvalidRange(String),

    #[error("Unknown basket mode: {0} (expected cat, item or dow)")]
    InvalidMode(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FindashError>;
