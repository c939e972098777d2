//! Bucket Sync Lambda - Re-indexes the knowledge base when documents change.
//!
//! Subscribed to `s3:ObjectCreated:*` and `s3:ObjectRemoved:*` on the documents
//! bucket. Also accepts a direct invocation naming the knowledge base and
//! data source to sync.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use shared::{handle_sync_event, BedrockKnowledgeBase, Config, Gateway, SyncEvent, SyncOutcome};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

async fn handler(
    gateway: Arc<Gateway<BedrockKnowledgeBase>>,
    event: LambdaEvent<SyncEvent>,
) -> Result<SyncOutcome, Error> {
    info!(request_id = %event.context.request_id, "Bucket sync invoked");

    handle_sync_event(gateway.as_ref(), event.payload).await.map_err(|e| {
        error!(status = e.status_code(), "Bucket sync failed: {}", e);
        Error::from(e)
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::from_env()?;
    if config.gateway.default_knowledge_base_id.is_none()
        || config.gateway.default_data_source_id.is_none()
    {
        info!("KNOWLEDGE_BASE_ID or DATA_SOURCE_ID not set; only direct invocations can sync");
    }

    let gateway = Arc::new(Gateway::connect(config.gateway).await);

    run(service_fn(move |event: LambdaEvent<SyncEvent>| {
        let gateway = Arc::clone(&gateway);
        async move { handler(gateway, event).await }
    }))
    .await
}
