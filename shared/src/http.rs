//! HTTP helpers for Lambda functions.

use lambda_http::{Body, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::HttpConfig;
use crate::error::UpstreamCategory;
use crate::Error;

/// Body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    /// Upstream error code, e.g. `ThrottlingException`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<UpstreamCategory>,
}

impl ErrorBody {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: None,
            category: None,
        }
    }
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            error: err.to_string(),
            code: err.upstream_code().map(str::to_string),
            category: err.upstream_category(),
        }
    }
}

/// Builds responses with the shared header policy applied.
#[derive(Debug, Clone, Default)]
pub struct Responder {
    config: HttpConfig,
}

impl Responder {
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Create a JSON response with the given status code and data.
    pub fn json<T: Serialize>(&self, status: u16, data: &T) -> Result<Response<Body>, lambda_http::Error> {
        let body = serde_json::to_string(data)?;
        self.build(status, Body::from(body))
    }

    /// Create an error response with the given status code and message.
    pub fn message(&self, status: u16, message: impl Into<String>) -> Result<Response<Body>, lambda_http::Error> {
        self.json(status, &ErrorBody::message(message))
    }

    /// Create an error response for a gateway error.
    pub fn error(&self, err: &Error) -> Result<Response<Body>, lambda_http::Error> {
        self.json(err.status_code(), &ErrorBody::from(err))
    }

    /// Empty response for CORS preflight requests.
    pub fn preflight(&self) -> Result<Response<Body>, lambda_http::Error> {
        self.build(204, Body::Empty)
    }

    fn build(&self, status: u16, body: Body) -> Result<Response<Body>, lambda_http::Error> {
        let mut builder = Response::builder()
            .status(status)
            .header("content-type", "application/json");

        if let Some(origin) = &self.config.allow_origin {
            builder = builder
                .header("access-control-allow-origin", origin.as_str())
                .header("access-control-allow-headers", "*")
                .header("access-control-allow-methods", "*");
        }

        Ok(builder.body(body).map_err(Box::new)?)
    }
}

/// Parse request body as JSON.
///
/// Returns `Err` with a message suitable for a 400 response when the body is
/// empty or malformed.
pub fn parse_json_body<T: DeserializeOwned>(body: &Body) -> Result<T, String> {
    let bytes: &[u8] = body.as_ref();
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err("Request body is required".to_string());
    }

    serde_json::from_slice(bytes).map_err(|e| format!("Invalid request body: {}", e))
}
