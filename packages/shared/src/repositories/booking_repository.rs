use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde::de::DeserializeOwned;
use serde_dynamo::from_item;
use tracing::warn;

use crate::models::booking::Booking;
use crate::repositories::errors::booking_repository_errors::BookingRepositoryError;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Confirmed bookings whose coins were never credited.
    async fn list_unawarded_confirmed(&self) -> Result<Vec<Booking>, BookingRepositoryError>;
}

pub struct DynamoDbBookingRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbBookingRepository {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl BookingRepository for DynamoDbBookingRepository {
    async fn list_unawarded_confirmed(&self) -> Result<Vec<Booking>, BookingRepositoryError> {
        let mut bookings = Vec::new();
        let mut start_key = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression(
                    "#status = :confirmed AND (attribute_not_exists(coinsAwarded) OR coinsAwarded = :false)",
                )
                .expression_attribute_names("#status", "status")
                .expression_attribute_values(":confirmed", AttributeValue::S("Confirmed".into()))
                .expression_attribute_values(":false", AttributeValue::Bool(false))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| BookingRepositoryError::DynamoDb(e.to_string()))?;

            bookings.extend(decode_scanned::<Booking>(
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

/// Decodes one page of scan results. Items that do not decode are logged and
/// skipped rather than failing the whole scan.
pub(crate) fn decode_scanned<T: DeserializeOwned>(
    table_name: &str,
    items: Vec<HashMap<String, AttributeValue>>,
) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| {
            let id = item
                .get("id")
                .and_then(|id| id.as_s().ok())
                .cloned()
                .unwrap_or_default();
            match from_item(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(table = %table_name, id = %id, error = %e, "Skipping undecodable item");
                    None
                }
            }
        })
        .collect()
}
