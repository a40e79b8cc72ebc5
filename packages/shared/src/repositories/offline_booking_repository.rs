use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;

use crate::models::offline_booking::OfflineBooking;
use crate::repositories::booking_repository::decode_scanned;
use crate::repositories::errors::booking_repository_errors::BookingRepositoryError;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait OfflineBookingRepository: Send + Sync {
    /// Settled offline bookings whose coins were never credited.
    async fn list_unawarded_settled(&self) -> Result<Vec<OfflineBooking>, BookingRepositoryError>;
}

pub struct DynamoDbOfflineBookingRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbOfflineBookingRepository {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl OfflineBookingRepository for DynamoDbOfflineBookingRepository {
    async fn list_unawarded_settled(&self) -> Result<Vec<OfflineBooking>, BookingRepositoryError> {
        let mut bookings = Vec::new();
        let mut start_key = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression(
                    "settlement = :settled AND (attribute_not_exists(coinsAwarded) OR coinsAwarded = :false)",
                )
                .expression_attribute_values(":settled", AttributeValue::S("SETTLED".into()))
                .expression_attribute_values(":false", AttributeValue::Bool(false))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| BookingRepositoryError::DynamoDb(e.to_string()))?;

            bookings.extend(decode_scanned::<OfflineBooking>(
                &self.table_name,
                output.items.unwrap_or_default(),
            ));

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(bookings)
    }
}
