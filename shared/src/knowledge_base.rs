//! Port to the managed knowledge base service.

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::error::UpstreamFailure;
use crate::models::Citation;

/// Input for a retrieve-and-generate call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateCall {
    pub question: String,
    pub knowledge_base_id: String,
    pub model_identifier: String,
    pub session_id: Option<String>,
}

/// Reply to a retrieve-and-generate call, as loose as the upstream sends it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateReply {
    /// `output.text`
    pub output_text: Option<String>,
    pub session_id: Option<String>,
    pub citations: Vec<Citation>,
}

/// Input for starting an ingestion job.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionCall {
    pub knowledge_base_id: String,
    pub data_source_id: String,
}

/// Reply to starting an ingestion job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionReply {
    /// `ingestionJob.ingestionJobId`
    pub ingestion_job_id: Option<String>,
}

/// The external retrieval and ingestion capabilities.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KnowledgeBaseService: Send + Sync {
    /// Answer a question from a knowledge base.
    async fn retrieve_and_generate(&self, call: GenerateCall) -> Result<GenerateReply, UpstreamFailure>;

    /// Start re-indexing a data source into its knowledge base.
    async fn start_ingestion_job(&self, call: IngestionCall) -> Result<IngestionReply, UpstreamFailure>;
}
