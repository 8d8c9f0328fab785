use thiserror::Error;

pub type HistoryResult<T> = Result<T, HistoryError>;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("panel `{path}` not found in configuration store")]
    ConfigNotFound { path: String },

    #[error("history is not configured: {0}")]
    BackendUnavailable(String),

    #[error("history read failed: {0}")]
    BackendRead(String),

    #[error("no data ever written for the requested variables")]
    NoDataEver,

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
