//! Gateway facade over the managed knowledge base service.

use tracing::{error, info};

use crate::bedrock::BedrockKnowledgeBase;
use crate::config::GatewayConfig;
use crate::knowledge_base::{GenerateCall, IngestionCall, KnowledgeBaseService};
use crate::models::{AskRequest, AskResponse, SyncRequest, SyncResponse};
use crate::{Error, Result};

const RETRIEVE_AND_GENERATE: &str = "RetrieveAndGenerate";
const START_INGESTION_JOB: &str = "StartIngestionJob";

/// Single point of contact with the external service.
///
/// Holds one service client for its whole lifetime. Every operation makes at
/// most one upstream call and never retries.
pub struct Gateway<S> {
    service: S,
    config: GatewayConfig,
}

impl Gateway<BedrockKnowledgeBase> {
    /// Build a gateway backed by Bedrock clients for the configured region.
    pub async fn connect(config: GatewayConfig) -> Self {
        let service = BedrockKnowledgeBase::new(&config.region).await;
        Self::new(service, config)
    }
}

impl<S: KnowledgeBaseService> Gateway<S> {
    pub fn new(service: S, config: GatewayConfig) -> Self {
        Self { service, config }
    }

    /// Ask a knowledge base a question.
    pub async fn ask(&self, req: &AskRequest) -> Result<AskResponse> {
        req.validate()?;

        info!(
            knowledge_base_id = %req.knowledge_base_id,
            continued = req.session().is_some(),
            "Querying knowledge base"
        );

        let call = GenerateCall {
            question: req.question.clone(),
            knowledge_base_id: req.knowledge_base_id.clone(),
            model_identifier: self.config.model_identifier.clone(),
            session_id: req.session().map(str::to_string),
        };

        let reply = self.service.retrieve_and_generate(call).await.map_err(|failure| {
            error!(
                knowledge_base_id = %req.knowledge_base_id,
                code = %failure.code,
                category = %failure.category,
                "RetrieveAndGenerate failed: {}",
                failure.message
            );
            Error::Upstream {
                operation: RETRIEVE_AND_GENERATE,
                context: format!("knowledgeBaseId={}", req.knowledge_base_id),
                failure,
            }
        })?;

        let answer_text = reply
            .output_text
            .ok_or_else(|| missing(RETRIEVE_AND_GENERATE, "output.text"))?;
        let session_id = reply
            .session_id
            .ok_or_else(|| missing(RETRIEVE_AND_GENERATE, "sessionId"))?;

        Ok(AskResponse {
            answer_text,
            session_id,
            citations: reply.citations,
        })
    }

    /// Trigger a re-sync of a knowledge base's data source.
    ///
    /// Each call starts a new ingestion job; completion is not awaited.
    pub async fn sync(&self, req: &SyncRequest) -> Result<SyncResponse> {
        req.validate()?;

        info!(
            knowledge_base_id = %req.knowledge_base_id,
            data_source_id = %req.data_source_id,
            knowledge_base_name = self.config.knowledge_base_name.as_deref().unwrap_or("-"),
            "Starting ingestion job"
        );

        let call = IngestionCall {
            knowledge_base_id: req.knowledge_base_id.clone(),
            data_source_id: req.data_source_id.clone(),
        };

        let reply = self.service.start_ingestion_job(call).await.map_err(|failure| {
            error!(
                knowledge_base_id = %req.knowledge_base_id,
                data_source_id = %req.data_source_id,
                code = %failure.code,
                category = %failure.category,
                "StartIngestionJob failed: {}",
                failure.message
            );
            Error::Upstream {
                operation: START_INGESTION_JOB,
                context: format!(
                    "knowledgeBaseId={}, dataSourceId={}",
                    req.knowledge_base_id, req.data_source_id
                ),
                failure,
            }
        })?;

        let ingestion_job_id = reply
            .ingestion_job_id
            .ok_or_else(|| missing(START_INGESTION_JOB, "ingestionJob.ingestionJobId"))?;

        info!(ingestion_job_id = %ingestion_job_id, "Ingestion job started");

        Ok(SyncResponse { ingestion_job_id })
    }

    /// Sync the knowledge base and data source named in configuration.
    pub async fn sync_default(&self) -> Result<SyncResponse> {
        let knowledge_base_id = self
            .config
            .default_knowledge_base_id
            .clone()
            .ok_or_else(|| Error::Config("KNOWLEDGE_BASE_ID not set".to_string()))?;
        let data_source_id = self
            .config
            .default_data_source_id
            .clone()
            .ok_or_else(|| Error::Config("DATA_SOURCE_ID not set".to_string()))?;

        self.sync(&SyncRequest::new(knowledge_base_id, data_source_id)).await
    }
}

fn missing(operation: &str, field: &str) -> Error {
    Error::Serialization(format!("{} response is missing {}", operation, field))
}
