//! Error types for query execution

use sql_policy::Rejection;
use thiserror::Error;

/// Failure of a single `Gate::execute` call
#[derive(Debug, Error)]
pub enum GateError {
    #[error("invalid input: query must not be empty")]
    InvalidInput,

    #[error("policy violation: {0}")]
    PolicyViolation(Rejection),

    #[error("execution failure: {0}")]
    ExecutionFailure(#[from] sqlx::Error),
}

impl From<Rejection> for GateError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Empty => GateError::InvalidInput,
            other => GateError::PolicyViolation(other),
        }
    }
}
