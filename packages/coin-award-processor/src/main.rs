use lambda_runtime::{run, service_fn, Error};
use std::sync::Arc;
use tracing::info;

mod processor;

use processor::CoinAwardProcessor;
use shared::config::{dynamodb_client, StoreConfig};
use shared::repositories::award_repository::DynamoDbAwardRepository;
use shared::repositories::game_repository::DynamoDbGameRepository;
use shared::repositories::user_repository::DynamoDbUserRepository;
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

    let games = Arc::new(DynamoDbGameRepository::new(
        client.clone(),
        &config.games_table,
    ));
    let users = Arc::new(DynamoDbUserRepository::new(
        client.clone(),
        &config.users_table,
        &config.users_mobile_index,
    ));
    let awards = Arc::new(DynamoDbAwardRepository::new(client, &config));
    let service = CoinAwardService::new(games, users, awards);
    let processor = CoinAwardProcessor::new(service, &config);

    info!("Coin award processor starting");

    run(service_fn(
        move |event: lambda_runtime::LambdaEvent<aws_lambda_events::event::dynamodb::Event>| {
            let processor = processor.clone();
            async move { processor.process_event(event.payload).await }
        },
    ))
    .await
}
