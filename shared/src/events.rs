//! Storage-triggered sync events.
//!
//! The documents bucket notifies the sync function whenever an object is
//! created or removed. One ingestion job re-indexes the whole data source, so
//! a notification carrying several records still starts a single job.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::gateway::Gateway;
use crate::knowledge_base::KnowledgeBaseService;
use crate::models::SyncRequest;
use crate::Result;

/// Payload accepted by the bucket sync function.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SyncEvent {
    /// S3 object notification
    Bucket(BucketNotification),
    /// Direct invocation naming the knowledge base and data source
    Direct(DirectSync),
}

/// Direct invocation payload. Both ids are required so that payloads of any
/// other shape fail to parse instead of becoming an empty request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DirectSync {
    pub knowledge_base_id: String,
    pub data_source_id: String,
}

impl From<DirectSync> for SyncRequest {
    fn from(direct: DirectSync) -> Self {
        SyncRequest::new(direct.knowledge_base_id, direct.data_source_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct BucketNotification {
    #[serde(rename = "Records")]
    pub records: Vec<BucketRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketRecord {
    #[serde(default)]
    pub event_name: String,
    pub s3: S3Entity,
}

#[derive(Debug, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct S3Object {
    pub key: String,
}

/// Outcome of a bucket sync invocation.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// `None` when the event carried nothing to sync
    pub ingestion_job_id: Option<String>,
    pub records_seen: usize,
}

/// Start an ingestion job for a storage event or direct invocation.
pub async fn handle_sync_event<S: KnowledgeBaseService>(
    gateway: &Gateway<S>,
    event: SyncEvent,
) -> Result<SyncOutcome> {
    match event {
        SyncEvent::Direct(direct) => {
            let job = gateway.sync(&SyncRequest::from(direct)).await?;
            Ok(SyncOutcome {
                ingestion_job_id: Some(job.ingestion_job_id),
                records_seen: 0,
            })
        }
        SyncEvent::Bucket(notification) => {
            for record in &notification.records {
                info!(
                    event_name = %record.event_name,
                    bucket = %record.s3.bucket.name,
                    key = %record.s3.object.key,
                    "Bucket change"
                );
            }

            let records_seen = notification.records.len();
            if records_seen == 0 {
                info!("Notification has no records, nothing to sync");
                return Ok(SyncOutcome {
                    ingestion_job_id: None,
                    records_seen,
                });
            }

            let job = gateway.sync_default().await?;
            Ok(SyncOutcome {
                ingestion_job_id: Some(job.ingestion_job_id),
                records_seen,
            })
        }
    }
}
