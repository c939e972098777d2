//! HTTP entry points for the ask and sync functions.

use lambda_http::{Body, Request, Response};
use tracing::{info, warn};

use crate::gateway::Gateway;
use crate::http::{parse_json_body, Responder};
use crate::knowledge_base::KnowledgeBaseService;
use crate::models::{AskRequest, SyncRequest};

/// Handle `POST ask`.
pub async fn handle_ask<S: KnowledgeBaseService>(
    gateway: &Gateway<S>,
    responder: &Responder,
    event: &Request,
) -> Result<Response<Body>, lambda_http::Error> {
    info!("Prompting: {} {}", event.method(), event.uri().path());

    if let Some(resp) = reject_method(responder, event)? {
        return Ok(resp);
    }

    let request: AskRequest = match parse_json_body(event.body()) {
        Ok(req) => req,
        Err(message) => return responder.message(400, message),
    };

    match gateway.ask(&request).await {
        Ok(answer) => responder.json(200, &answer),
        Err(e) => {
            warn!(status = e.status_code(), "Ask failed: {}", e);
            responder.error(&e)
        }
    }
}

/// Handle `POST sync`.
pub async fn handle_sync<S: KnowledgeBaseService>(
    gateway: &Gateway<S>,
    responder: &Responder,
    event: &Request,
) -> Result<Response<Body>, lambda_http::Error> {
    info!("Starting syncing: {} {}", event.method(), event.uri().path());

    if let Some(resp) = reject_method(responder, event)? {
        return Ok(resp);
    }

    let request: SyncRequest = match parse_json_body(event.body()) {
        Ok(req) => req,
        Err(message) => return responder.message(400, message),
    };

    match gateway.sync(&request).await {
        Ok(job) => responder.json(200, &job),
        Err(e) => {
            warn!(status = e.status_code(), "Sync failed: {}", e);
            responder.error(&e)
        }
    }
}

/// Answer preflight and non-POST requests before touching the body.
fn reject_method(
    responder: &Responder,
    event: &Request,
) -> Result<Option<Response<Body>>, lambda_http::Error> {
    match event.method().as_str() {
        "POST" => Ok(None),
        "OPTIONS" => responder.preflight().map(Some),
        other => responder
            .message(405, format!("Method {} not allowed", other))
            .map(Some),
    }
}
