use thiserror::Error;
use uuid::Uuid;

/// Infrastructure failures from a backing store. These always surface to the
/// caller; the engine never maps them to zeroed metrics that could be read as
/// real data.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Duplicate external id: {0}")]
    DuplicateExternalId(String),
    #[error("Active alert already exists for key: {0}")]
    DuplicateActiveAlert(String),
    #[error("Record not found: {0}")]
    NotFound(Uuid),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Invalid alert transition: {0}")]
    InvalidTransition(String),
    #[error("Invalid forecast request: {0}")]
    InvalidForecast(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
