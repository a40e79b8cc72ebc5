use thiserror::Error;

/// Shared by the online and offline booking repositories.
#[derive(Debug, Error)]
pub enum BookingRepositoryError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
}
