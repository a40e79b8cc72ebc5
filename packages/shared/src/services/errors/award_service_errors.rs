use thiserror::Error;

use crate::repositories::errors::award_repository_errors::AwardRepositoryError;
use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::repositories::errors::user_repository_errors::UserRepositoryError;

/// A record points at something that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingReference {
    Game(String),
    /// Keyed by the mobile number carried on the record.
    User(String),
}

impl std::fmt::Display for MissingReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingReference::Game(id) => write!(f, "game {}", id),
            MissingReference::User(mobile) => write!(f, "user with mobile {}", mobile),
        }
    }
}

/// Reconciliation failures. Neither leaves a record partially awarded.
#[derive(Debug, Error)]
pub enum AwardError {
    /// Retried once the dangling reference is fixed, usually via backfill.
    #[error("Reference not found: {0}")]
    ReferenceNotFound(MissingReference),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AwardError {
    /// Whether replaying the same event without operator action can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AwardError::StoreUnavailable(_))
    }
}

impl From<GameRepositoryError> for AwardError {
    fn from(error: GameRepositoryError) -> Self {
        AwardError::StoreUnavailable(error.to_string())
    }
}

impl From<UserRepositoryError> for AwardError {
    fn from(error: UserRepositoryError) -> Self {
        AwardError::StoreUnavailable(error.to_string())
    }
}

impl From<AwardRepositoryError> for AwardError {
    fn from(error: AwardRepositoryError) -> Self {
        AwardError::StoreUnavailable(error.to_string())
    }
}
