//! Configuration management for Lambda functions.

use std::env;

use crate::{Error, Result};

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_MODEL_ID: &str = "anthropic.claude-v2";

/// Settings the gateway needs to reach the external service.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// AWS region for both Bedrock clients
    pub region: String,
    /// Model ARN passed to RetrieveAndGenerate
    pub model_identifier: String,
    /// Display name of the knowledge base, logged on sync
    pub knowledge_base_name: Option<String>,
    /// Knowledge base synced by storage-triggered events
    pub default_knowledge_base_id: Option<String>,
    /// Data source synced by storage-triggered events
    pub default_data_source_id: Option<String>,
}

impl GatewayConfig {
    pub fn new(region: impl Into<String>, model_identifier: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            model_identifier: model_identifier.into(),
            knowledge_base_name: None,
            default_knowledge_base_id: None,
            default_data_source_id: None,
        }
    }

    /// Set the knowledge base and data source used when an event names neither.
    pub fn with_defaults(
        mut self,
        knowledge_base_id: impl Into<String>,
        data_source_id: impl Into<String>,
    ) -> Self {
        self.default_knowledge_base_id = Some(knowledge_base_id.into());
        self.default_data_source_id = Some(data_source_id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.knowledge_base_name = Some(name.into());
        self
    }
}

/// HTTP response policy for the API functions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpConfig {
    /// Value for `Access-Control-Allow-Origin`; CORS headers are omitted when unset
    pub allow_origin: Option<String>,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset. `MODEL_ARN` wins over `MODEL_ID`;
    /// when only the latter is given the foundation-model ARN is derived from
    /// it and the region.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let region = var("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());
        if region.contains(char::is_whitespace) {
            return Err(Error::Config(format!("Invalid AWS_REGION: {:?}", region)));
        }

        let model_identifier = match var("MODEL_ARN") {
            Some(arn) => arn,
            None => {
                let model_id = var("MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());
                foundation_model_arn(&region, &model_id)
            }
        };

        Ok(Self {
            gateway: GatewayConfig {
                region,
                model_identifier,
                knowledge_base_name: var("KB_NAME"),
                default_knowledge_base_id: var("KNOWLEDGE_BASE_ID"),
                default_data_source_id: var("DATA_SOURCE_ID"),
            },
            http: HttpConfig {
                allow_origin: var("CORS_ALLOW_ORIGIN"),
            },
        })
    }
}

/// ARN of an on-demand foundation model in the given region.
pub fn foundation_model_arn(region: &str, model_id: &str) -> String {
    format!("arn:aws:bedrock:{}::foundation-model/{}", region, model_id)
}
