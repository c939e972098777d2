//! Shared library for the knowledge base Lambda functions.
//!
//! This crate provides the gateway facade over Bedrock knowledge bases along
//! with the request types, configuration and HTTP helpers used by every function.

pub mod bedrock;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod http;
pub mod knowledge_base;
pub mod models;

pub use bedrock::BedrockKnowledgeBase;
pub use config::{Config, GatewayConfig, HttpConfig};
pub use error::{Error, Result, UpstreamCategory, UpstreamFailure};
pub use events::{handle_sync_event, DirectSync, SyncEvent, SyncOutcome};
pub use gateway::Gateway;
pub use handlers::{handle_ask, handle_sync};
pub use http::Responder;
pub use knowledge_base::KnowledgeBaseService;
pub use models::{AskRequest, AskResponse, Citation, SyncRequest, SyncResponse};
