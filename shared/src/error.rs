//! Error types for the knowledge base Lambda functions.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of a failure reported by the external service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamCategory {
    /// Credentials missing, expired or lacking permission
    Auth,
    /// Rate limit or quota exceeded
    Throttled,
    /// Knowledge base, data source or model does not exist
    NotFound,
    /// The service refused the request as malformed
    Rejected,
    /// The resource is busy, e.g. an ingestion job is already running
    Conflict,
    /// The service itself failed
    Unavailable,
    /// Network failure or timeout before a response arrived
    Transport,
    /// The SDK could not build the request
    Client,
    /// Anything not recognised above
    Unknown,
}

impl UpstreamCategory {
    /// Classify a service error code such as `ThrottlingException`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "AccessDeniedException"
            | "UnrecognizedClientException"
            | "ExpiredTokenException"
            | "InvalidSignatureException" => Self::Auth,
            "ThrottlingException" | "ServiceQuotaExceededException" | "TooManyRequestsException" => {
                Self::Throttled
            }
            "ResourceNotFoundException" => Self::NotFound,
            "ValidationException" => Self::Rejected,
            "ConflictException" => Self::Conflict,
            "InternalServerException"
            | "DependencyFailedException"
            | "BadGatewayException"
            | "ServiceUnavailableException" => Self::Unavailable,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Throttled => "throttled",
            Self::NotFound => "not_found",
            Self::Rejected => "rejected",
            Self::Conflict => "conflict",
            Self::Unavailable => "unavailable",
            Self::Transport => "transport",
            Self::Client => "client",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for UpstreamCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure as reported by the external service, before the gateway adds
/// operation context.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{code} ({category}): {message}")]
pub struct UpstreamFailure {
    /// Original error code, e.g. `ThrottlingException`
    pub code: String,
    pub category: UpstreamCategory,
    pub message: String,
}

impl UpstreamFailure {
    /// Build a failure from a service error code, deriving its category.
    pub fn from_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            category: UpstreamCategory::from_code(&code),
            code,
            message: message.into(),
        }
    }
}

/// Errors that can occur in the knowledge base Lambda functions.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed required field
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure surfaced by the external service
    #[error("{operation} failed for {context}: {failure}")]
    Upstream {
        operation: &'static str,
        /// Identifiers involved in the call, e.g. `knowledgeBaseId=kb-123`
        context: String,
        failure: UpstreamFailure,
    },

    /// Response from the external service did not have the expected shape
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidArgument(_) => 400,
            Error::Upstream { .. } | Error::Serialization(_) => 502,
            Error::Config(_) => 500,
        }
    }

    /// Original upstream error code, if this error came from the external service.
    pub fn upstream_code(&self) -> Option<&str> {
        match self {
            Error::Upstream { failure, .. } => Some(&failure.code),
            _ => None,
        }
    }

    pub fn upstream_category(&self) -> Option<UpstreamCategory> {
        match self {
            Error::Upstream { failure, .. } => Some(failure.category),
            _ => None,
        }
    }
}
