//! Request and response shapes for the two gateway operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// A supporting source passage returned with a generated answer.
///
/// Kept as raw JSON; this crate never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Citation(pub Value);

/// Ask request payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    #[serde(rename = "input", alias = "question", default)]
    pub question: String,
    #[serde(default)]
    pub knowledge_base_id: String,
    /// Continue an existing upstream conversation
    #[serde(default)]
    pub session_id: Option<String>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>, knowledge_base_id: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            knowledge_base_id: knowledge_base_id.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        require("input", &self.question)?;
        require("knowledgeBaseId", &self.knowledge_base_id)
    }

    /// Session id to forward upstream; blank is treated as absent.
    pub fn session(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Ask response payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    #[serde(rename = "text")]
    pub answer_text: String,
    pub session_id: String,
    pub citations: Vec<Citation>,
}

/// Sync request payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default)]
    pub knowledge_base_id: String,
    #[serde(default)]
    pub data_source_id: String,
}

impl SyncRequest {
    pub fn new(knowledge_base_id: impl Into<String>, data_source_id: impl Into<String>) -> Self {
        Self {
            knowledge_base_id: knowledge_base_id.into(),
            data_source_id: data_source_id.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        require("knowledgeBaseId", &self.knowledge_base_id)?;
        require("dataSourceId", &self.data_source_id)
    }
}

/// Sync response payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub ingestion_job_id: String,
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{} is required", field)));
    }
    Ok(())
}
