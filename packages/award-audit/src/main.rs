use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;

mod audit;

use audit::{handle_audit, ScheduledEvent};
use shared::config::{dynamodb_client, StoreConfig};
use shared::repositories::award_repository::DynamoDbAwardRepository;
use shared::repositories::booking_repository::DynamoDbBookingRepository;
use shared::repositories::game_repository::DynamoDbGameRepository;
use shared::repositories::offline_booking_repository::DynamoDbOfflineBookingRepository;
use shared::repositories::user_repository::DynamoDbUserRepository;
use shared::services::audit_service::AuditService;
use shared::services::coin_award_service::CoinAwardService;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = StoreConfig::from_env()?;
    let client = dynamodb_client().await;

    let award_service = CoinAwardService::new(
        Arc::new(DynamoDbGameRepository::new(
            client.clone(),
            &config.games_table,
        )),
        Arc::new(DynamoDbUserRepository::new(
            client.clone(),
            &config.users_table,
            &config.users_mobile_index,
        )),
        Arc::new(DynamoDbAwardRepository::new(client.clone(), &config)),
    );
    let audit_service = AuditService::new(
        Arc::new(DynamoDbBookingRepository::new(
            client.clone(),
            &config.bookings_table,
        )),
        Arc::new(DynamoDbOfflineBookingRepository::new(
            client,
            &config.offline_bookings_table,
        )),
        award_service,
    );

    run(service_fn(move |event: LambdaEvent<ScheduledEvent>| {
        let audit_service = audit_service.clone();
        async move {
            handle_audit(&audit_service, event.payload)
                .await
                .map_err(|e| Error::from(format!("Award audit failed: {}", e)))
        }
    }))
    .await
}
