//! Ask Lambda - Handles the `POST ask` endpoint.
//!
//! Forwards a question to a Bedrock knowledge base and returns the generated
//! answer with its session id and citations.

use lambda_http::{run, service_fn, Error, Request};
use shared::{handle_ask, BedrockKnowledgeBase, Config, Gateway, Responder};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across requests.
struct AppState {
    gateway: Gateway<BedrockKnowledgeBase>,
    responder: Responder,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        info!(
            region = %config.gateway.region,
            model = %config.gateway.model_identifier,
            "Initializing ask function"
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
        async move { handle_ask(&state.gateway, &state.responder, &event).await }
    }))
    .await
}
