use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FireError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Computation failed: {0}")]
    ComputationFailed(String),
}
