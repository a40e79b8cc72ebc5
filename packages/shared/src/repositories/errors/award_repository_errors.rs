use thiserror::Error;

#[derive(Debug, Error)]
pub enum AwardRepositoryError {
    #[error("Transaction error: {0}")]
    Transaction(String),
    /// Another transaction touched the same items mid-flight; safe to retry.
    #[error("Transaction contended: {0}")]
    Contended(String),
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
}
