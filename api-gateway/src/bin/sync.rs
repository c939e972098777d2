//! Sync Lambda - Handles the `POST sync` endpoint.
//!
//! Starts an ingestion job for a knowledge base data source. The job runs
//! asynchronously in Bedrock; only its id is returned.

use lambda_http::{run, service_fn, Error, Request};
use shared::{handle_sync, BedrockKnowledgeBase, Config, Gateway, Responder};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct AppState {
    gateway: Gateway<BedrockKnowledgeBase>,
    responder: Responder,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        info!(
            region = %config.gateway.region,
            knowledge_base_name = config.gateway.knowledge_base_name.as_deref().unwrap_or("-"),
            "Initializing sync function"
        );

        Ok(Self {
            responder: Responder::new(config.http),
            gateway: Gateway::connect(config.gateway).await,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { handle_sync(&state.gateway, &state.responder, &event).await }
    }))
    .await
}
