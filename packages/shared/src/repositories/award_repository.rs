use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::{
    AttributeValue, CancellationReason, ReturnValuesOnConditionCheckFailure, TransactWriteItem,
    Update,
};
use aws_sdk_dynamodb::Client;
use serde_dynamo::to_attribute_value;

use crate::config::StoreConfig;
use crate::models::award::{AwardCommit, CommitOutcome, RecordKind};
use crate::repositories::errors::award_repository_errors::AwardRepositoryError;

#[cfg(test)]
use mockall::automock;

const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailed";
const TRANSACTION_CONFLICT: &str = "TransactionConflict";

/// Applies an award as a single all-or-nothing write.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AwardRepository: Send + Sync {
    /// Credits the user and flags the record in one transaction. The record
    /// write is conditioned on it still qualifying and not being awarded, so
    /// only one of any number of concurrent commits can succeed.
    async fn commit_award(&self, commit: &AwardCommit)
        -> Result<CommitOutcome, AwardRepositoryError>;
}

pub struct DynamoDbAwardRepository {
    pub client: Client,
    pub bookings_table: String,
    pub offline_bookings_table: String,
    pub users_table: String,
}

impl DynamoDbAwardRepository {
    pub fn new(client: Client, config: &StoreConfig) -> Self {
        Self {
            client,
            bookings_table: config.bookings_table.clone(),
            offline_bookings_table: config.offline_bookings_table.clone(),
            users_table: config.users_table.clone(),
        }
    }

    fn record_update(&self, commit: &AwardCommit) -> Result<Update, AwardRepositoryError> {
        let (table_name, state_attribute, qualifying_value) = match commit.kind {
            RecordKind::Booking => (&self.bookings_table, "status", "Confirmed"),
            RecordKind::OfflineBooking => (&self.offline_bookings_table, "settlement", "SETTLED"),
        };
        let awarded_at = to_attribute_value(commit.awarded_at)
            .map_err(|e| AwardRepositoryError::Transaction(e.to_string()))?;

        Update::builder()
            .table_name(table_name)
            .key("id", AttributeValue::S(commit.record_id.clone()))
            .update_expression(
                "SET coinsAwarded = :true, coinsAwardedAt = :awarded_at, coinsAwardedAmount = :amount",
            )
            .condition_expression(
                "attribute_exists(id) AND #state = :qualifying AND (attribute_not_exists(coinsAwarded) OR coinsAwarded = :false)",
            )
            .expression_attribute_names("#state", state_attribute)
            .expression_attribute_values(":qualifying", AttributeValue::S(qualifying_value.into()))
            .expression_attribute_values(":true", AttributeValue::Bool(true))
            .expression_attribute_values(":false", AttributeValue::Bool(false))
            .expression_attribute_values(":awarded_at", awarded_at)
            .expression_attribute_values(":amount", AttributeValue::N(commit.amount.to_string()))
            // Lets a failed condition tell "already awarded" from "gone or changed".
            .return_values_on_condition_check_failure(ReturnValuesOnConditionCheckFailure::AllOld)
            .build()
            .map_err(|e| AwardRepositoryError::Transaction(e.to_string()))
    }

    fn balance_update(&self, commit: &AwardCommit) -> Result<Update, AwardRepositoryError> {
        // ADD is applied server-side, so concurrent credits never lose updates.
        Update::builder()
            .table_name(&self.users_table)
            .key("id", AttributeValue::S(commit.user_id.clone()))
            .update_expression("ADD clubCoins :amount")
            .condition_expression("attribute_exists(id)")
            .expression_attribute_values(":amount", AttributeValue::N(commit.amount.to_string()))
            .build()
            .map_err(|e| AwardRepositoryError::Transaction(e.to_string()))
    }
}

#[async_trait]
impl AwardRepository for DynamoDbAwardRepository {
    async fn commit_award(
        &self,
        commit: &AwardCommit,
    ) -> Result<CommitOutcome, AwardRepositoryError> {
        // Order matters: cancellation reasons are reported per item index.
        let transaction_items = vec![
            TransactWriteItem::builder()
                .update(self.record_update(commit)?)
                .build(),
            TransactWriteItem::builder()
                .update(self.balance_update(commit)?)
                .build(),
        ];

        let result = self
            .client
            .transact_write_items()
            .set_transact_items(Some(transaction_items))
            .send()
            .await;

        match result {
            Ok(_) => Ok(CommitOutcome::Committed),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if let TransactWriteItemsError::TransactionCanceledException(cancelled) =
                        service_err.err()
                    {
                        return classify_cancellation(cancelled.cancellation_reasons());
                    }
                }
                Err(AwardRepositoryError::DynamoDb(e.to_string()))
            }
        }
    }
}

/// Maps the per-item cancellation reasons of an award transaction
/// (record update first, balance update second) to an outcome.
pub fn classify_cancellation(
    reasons: &[CancellationReason],
) -> Result<CommitOutcome, AwardRepositoryError> {
    let code = |index: usize| reasons.get(index).and_then(|reason| reason.code());

    if code(0) == Some(CONDITIONAL_CHECK_FAILED) {
        // The record update asks for the old item, which is absent if it was deleted.
        let already_awarded = reasons[0]
            .item()
            .and_then(|item| item.get("coinsAwarded"))
            .and_then(|flag| flag.as_bool().ok())
            .copied()
            .unwrap_or(false);
        return Ok(if already_awarded {
            CommitOutcome::AlreadyAwarded
        } else {
            CommitOutcome::NoLongerQualifying
        });
    }
    if code(1) == Some(CONDITIONAL_CHECK_FAILED) {
        return Ok(CommitOutcome::UserMissing);
    }

    let codes: Vec<&str> = reasons.iter().filter_map(|reason| reason.code()).collect();
    if codes.contains(&TRANSACTION_CONFLICT) {
        return Err(AwardRepositoryError::Contended(codes.join(", ")));
    }
    Err(AwardRepositoryError::Transaction(format!(
        "award transaction cancelled: [{}]",
        codes.join(", ")
    )))
}
