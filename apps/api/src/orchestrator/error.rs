use thiserror::Error;

use crate::services::ServiceError;

/// Errors surfaced by orchestrator operations.
#[derive(Debug, Error)]
pub enum RunError {
    /// Another search or send is in flight for this session.
    #[error("Session busy: {0}")]
    Busy(String),

    /// The operation is not allowed in the session's current phase.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or rejected credentials. Aborts the run.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Service(ServiceError),
}

impl From<ServiceError> for RunError {
    fn from(error: ServiceError) -> Self {
        if error.is_configuration() {
            RunError::Configuration(error.to_string())
        } else {
            RunError::Service(error)
        }
    }
}
