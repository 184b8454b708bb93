//! Domain errors for the ideaflow experiment platform.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::GroupRole;

/// Domain-level errors that can occur in the ideaflow system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Experiment not found: {0}")]
    ExperimentNotFound(Uuid),

    #[error("Experiment is not running: {0}")]
    ExperimentNotRunning(Uuid),

    #[error("Ideas group not found: {0}")]
    GroupNotFound(Uuid),

    #[error("Idea not found: {0}")]
    IdeaNotFound(Uuid),

    #[error("Participation not found: {0}")]
    ParticipationNotFound(Uuid),

    #[error("Group {group} is already attached to experiment {experiment}")]
    GroupAlreadyAttached { experiment: Uuid, group: Uuid },

    #[error("No stimulus left in the {0} pool at draw time")]
    EmptyPool(GroupRole),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
