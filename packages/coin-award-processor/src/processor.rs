use std::collections::HashMap;

use aws_lambda_events::event::dynamodb::Event;
use lambda_runtime::Error;
use serde::de::DeserializeOwned;
use serde_dynamo::{from_item, AttributeValue, Item};
use shared::config::StoreConfig;
use shared::models::award::{AwardOutcome, AwardableRecord, RecordKind};
use shared::models::booking::Booking;
use shared::models::offline_booking::OfflineBooking;
use shared::services::coin_award_service::CoinAwardService;
use shared::services::errors::award_service_errors::AwardError;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Could not decode stream image: {0}")]
    Decode(String),
    #[error(transparent)]
    Award(#[from] AwardError),
}

/// Feeds booking and offline-booking stream changes into the coin reconciler.
#[derive(Clone)]
pub struct CoinAwardProcessor {
    service: CoinAwardService,
    bookings_table: String,
    offline_bookings_table: String,
}

impl CoinAwardProcessor {
    pub fn new(service: CoinAwardService, config: &StoreConfig) -> Self {
        Self {
            service,
            bookings_table: config.bookings_table.clone(),
            offline_bookings_table: config.offline_bookings_table.clone(),
        }
    }

    /// Streams deliver at least once and batches are replayed whole on error,
    /// which reconciliation tolerates. Only store outages fail the batch;
    /// dangling references are logged for the audit to pick up.
    pub async fn process_event(&self, event: Event) -> Result<(), Error> {
        info!("Processing {} records", event.records.len());

        for record in event.records {
            let Some(kind) = self.record_kind(record.event_source_arn.as_deref()) else {
                warn!(
                    "Ignoring record from unexpected source: {:?}",
                    record.event_source_arn
                );
                continue;
            };

            let result = self
                .process_change(
                    kind,
                    &record.event_name,
                    record.change.old_image,
                    record.change.new_image,
                )
                .await;

            match result {
                Ok(Some(outcome)) => debug!(%kind, ?outcome, "Record reconciled"),
                Ok(None) => {}
                Err(ProcessorError::Award(e)) if e.is_transient() => {
                    error!(%kind, error = %e, "Store unavailable, failing batch for retry");
                    return Err(e.into());
                }
                Err(e) => {
                    error!(%kind, error = %e, "Failed to process record");
                }
            }
        }

        Ok(())
    }

    pub fn record_kind(&self, event_source_arn: Option<&str>) -> Option<RecordKind> {
        let table = table_name_from_arn(event_source_arn?)?;
        if table == self.bookings_table {
            Some(RecordKind::Booking)
        } else if table == self.offline_bookings_table {
            Some(RecordKind::OfflineBooking)
        } else {
            None
        }
    }

    pub async fn process_change(
        &self,
        kind: RecordKind,
        event_name: &str,
        old_image: Item,
        new_image: Item,
    ) -> Result<Option<AwardOutcome>, ProcessorError> {
        match event_name {
            "INSERT" | "MODIFY" => match kind {
                RecordKind::Booking => self.reconcile_images::<Booking>(old_image, new_image).await,
                RecordKind::OfflineBooking => {
                    self.reconcile_images::<OfflineBooking>(old_image, new_image)
                        .await
                }
            },
            _ => {
                debug!("Unhandled event type: {}", event_name);
                Ok(None)
            }
        }
    }

    async fn reconcile_images<R>(
        &self,
        old_image: Item,
        new_image: Item,
    ) -> Result<Option<AwardOutcome>, ProcessorError>
    where
        R: AwardableRecord + DeserializeOwned + Send + Sync,
    {
        let Some(current) = decode::<R>(new_image)? else {
            warn!("Change carried no new image; is the stream view NEW_AND_OLD_IMAGES?");
            return Ok(None);
        };
        // The previous image is informational only.
        let previous = decode::<R>(old_image).unwrap_or_else(|e| {
            warn!(record_id = current.id(), error = %e, "Ignoring undecodable old image");
            None
        });

        let outcome = self.service.reconcile(previous.as_ref(), &current).await?;
        Ok(Some(outcome))
    }
}

/// `arn:aws:dynamodb:<region>:<account>:table/<name>/stream/<label>` -> `<name>`
pub fn table_name_from_arn(arn: &str) -> Option<&str> {
    let (_, rest) = arn.split_once(":table/")?;
    rest.split('/').next().filter(|name| !name.is_empty())
}

fn decode<T: DeserializeOwned>(image: Item) -> Result<Option<T>, ProcessorError> {
    let attributes: HashMap<String, AttributeValue> = image.into();
    if attributes.is_empty() {
        return Ok(None);
    }
    from_item(attributes)
        .map(Some)
        .map_err(|e| ProcessorError::Decode(e.to_string()))
}
