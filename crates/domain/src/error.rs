use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("resource not found")]
    NotFound,
    #[error("resource already exists")]
    Conflict,
    /// The backing store failed or could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
