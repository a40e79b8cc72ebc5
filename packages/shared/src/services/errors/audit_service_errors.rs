use thiserror::Error;

use crate::repositories::errors::booking_repository_errors::BookingRepositoryError;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Repository error: {0}")]
    RepositoryError(#[from] BookingRepositoryError),
}
