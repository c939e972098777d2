//! Bedrock implementation of the knowledge base port.

use std::error::Error as StdError;
use std::fmt::Debug;

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_sdk_bedrockagent::Client as BedrockAgentClient;
use aws_sdk_bedrockagentruntime::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_bedrockagentruntime::types::{
    Citation as SdkCitation, KnowledgeBaseRetrieveAndGenerateConfiguration,
    RetrieveAndGenerateConfiguration, RetrieveAndGenerateInput, RetrieveAndGenerateType,
    RetrievedReference,
};
use aws_sdk_bedrockagentruntime::Client as BedrockAgentRuntimeClient;
use aws_smithy_types::{Document, Number};
use serde_json::{json, Value};

use crate::error::{UpstreamCategory, UpstreamFailure};
use crate::knowledge_base::{
    GenerateCall, GenerateReply, IngestionCall, IngestionReply, KnowledgeBaseService,
};
use crate::models::Citation;

/// Knowledge base service backed by Bedrock Agent and Bedrock Agent Runtime.
#[derive(Clone)]
pub struct BedrockKnowledgeBase {
    runtime: BedrockAgentRuntimeClient,
    agent: BedrockAgentClient,
}

impl Debug for BedrockKnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BedrockKnowledgeBase").finish_non_exhaustive()
    }
}

impl BedrockKnowledgeBase {
    /// Load AWS credentials and build both clients for the given region.
    pub async fn new(region: &str) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self::with_config(&sdk_config)
    }

    /// Create with an existing AWS SDK config
    ///
    /// SDK retries are switched off on both clients: each call is one attempt.
    pub fn with_config(sdk_config: &aws_config::SdkConfig) -> Self {
        let runtime_config = aws_sdk_bedrockagentruntime::Config::new(sdk_config)
            .to_builder()
            .retry_config(RetryConfig::disabled())
            .build();
        let agent_config = aws_sdk_bedrockagent::Config::new(sdk_config)
            .to_builder()
            .retry_config(RetryConfig::disabled())
            .build();

        Self {
            runtime: BedrockAgentRuntimeClient::from_conf(runtime_config),
            agent: BedrockAgentClient::from_conf(agent_config),
        }
    }
}

#[async_trait]
impl KnowledgeBaseService for BedrockKnowledgeBase {
    async fn retrieve_and_generate(&self, call: GenerateCall) -> Result<GenerateReply, UpstreamFailure> {
        let input = RetrieveAndGenerateInput::builder()
            .text(call.question)
            .build()
            .map_err(|e| client_failure(e.to_string()))?;

        let kb_config = KnowledgeBaseRetrieveAndGenerateConfiguration::builder()
            .knowledge_base_id(call.knowledge_base_id)
            .model_arn(call.model_identifier)
            .build()
            .map_err(|e| client_failure(e.to_string()))?;

        let rag_config = RetrieveAndGenerateConfiguration::builder()
            .r#type(RetrieveAndGenerateType::KnowledgeBase)
            .knowledge_base_configuration(kb_config)
            .build()
            .map_err(|e| client_failure(e.to_string()))?;

        let output = self
            .runtime
            .retrieve_and_generate()
            .input(input)
            .retrieve_and_generate_configuration(rag_config)
            .set_session_id(call.session_id)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        let citations = output.citations().iter().map(citation_to_json).collect();

        Ok(GenerateReply {
            output_text: output.output.map(|o| o.text),
            session_id: Some(output.session_id).filter(|s| !s.is_empty()),
            citations,
        })
    }

    async fn start_ingestion_job(&self, call: IngestionCall) -> Result<IngestionReply, UpstreamFailure> {
        let output = self
            .agent
            .start_ingestion_job()
            .knowledge_base_id(call.knowledge_base_id)
            .data_source_id(call.data_source_id)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        Ok(IngestionReply {
            ingestion_job_id: output
                .ingestion_job
                .map(|job| job.ingestion_job_id)
                .filter(|id| !id.is_empty()),
        })
    }
}

fn client_failure(message: String) -> UpstreamFailure {
    UpstreamFailure {
        code: "ConstructionFailure".to_string(),
        category: UpstreamCategory::Client,
        message,
    }
}

/// Translate an SDK error from either Bedrock client, keeping the service code.
pub(crate) fn classify_sdk_error<E, R>(err: &SdkError<E, R>) -> UpstreamFailure
where
    E: ProvideErrorMetadata + StdError + 'static,
    R: Debug,
{
    let (fallback_code, category) = match err {
        SdkError::TimeoutError(_) => ("TimeoutError", UpstreamCategory::Transport),
        SdkError::DispatchFailure(_) => ("DispatchFailure", UpstreamCategory::Transport),
        SdkError::ConstructionFailure(_) => ("ConstructionFailure", UpstreamCategory::Client),
        SdkError::ResponseError(_) => ("ResponseError", UpstreamCategory::Unavailable),
        _ => (
            "Unknown",
            err.code().map(UpstreamCategory::from_code).unwrap_or(UpstreamCategory::Unknown),
        ),
    };

    UpstreamFailure {
        code: err.code().unwrap_or(fallback_code).to_string(),
        category,
        message: err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| DisplayErrorContext(err).to_string()),
    }
}

/// Render a citation in the same camelCase layout the service uses on the wire.
fn citation_to_json(citation: &SdkCitation) -> Citation {
    let generated = citation
        .generated_response_part()
        .and_then(|part| part.text_response_part())
        .map(|part| {
            json!({
                "textResponsePart": {
                    "text": part.text(),
                    "span": part.span().map(|span| json!({
                        "start": span.start(),
                        "end": span.end(),
                    })),
                }
            })
        });

    let references: Vec<Value> = citation
        .retrieved_references()
        .iter()
        .map(reference_to_json)
        .collect();

    Citation(json!({
        "generatedResponsePart": generated,
        "retrievedReferences": references,
    }))
}

fn reference_to_json(reference: &RetrievedReference) -> Value {
    let content = reference.content().map(|c| json!({ "text": c.text() }));

    let location = reference.location().map(|loc| {
        json!({
            "s3Location": loc.s3_location().map(|s3| json!({ "uri": s3.uri() })),
            "webLocation": loc.web_location().map(|web| json!({ "url": web.url() })),
        })
    });

    let metadata = reference.metadata().map(|meta| {
        meta.iter()
            .map(|(k, v)| (k.clone(), doc_to_json(v)))
            .collect::<serde_json::Map<String, Value>>()
    });

    json!({
        "content": content,
        "location": location,
        "metadata": metadata,
    })
}

fn doc_to_json(doc: &Document) -> Value {
    match doc {
        Document::String(s) => Value::String(s.clone()),
        Document::Number(Number::PosInt(n)) => json!(n),
        Document::Number(Number::NegInt(n)) => json!(n),
        Document::Number(Number::Float(f)) => json!(f),
        Document::Bool(b) => Value::Bool(*b),
        Document::Null => Value::Null,
        Document::Array(items) => Value::Array(items.iter().map(doc_to_json).collect()),
        Document::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), doc_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_bedrockagent::operation::start_ingestion_job::StartIngestionJobError;
    use aws_sdk_bedrockagentruntime::config::{Credentials, SharedCredentialsProvider};
    use aws_sdk_bedrockagentruntime::operation::retrieve_and_generate::RetrieveAndGenerateError;
    use aws_sdk_bedrockagentruntime::types::{GeneratedResponsePart, Span, TextResponsePart};
    use aws_smithy_http_client::test_util::{ReplayEvent, StaticReplayClient};
    use aws_smithy_types::body::SdkBody;
    use aws_smithy_types::error::ErrorMetadata;
    use std::collections::HashMap;

    const MODEL_ARN: &str = "arn:aws:bedrock:us-east-1::foundation-model/anthropic.claude-v2";

    fn metadata(code: &str, message: &str) -> ErrorMetadata {
        ErrorMetadata::builder().code(code).message(message).build()
    }

    /// Replay client answering the next request with `status` and a JSON body.
    fn replay(status: u16, body: &str, headers: &[(&str, &str)]) -> StaticReplayClient {
        let mut response = http::Response::builder()
            .status(status)
            .header("content-type", "application/json");
        for (name, value) in headers {
            response = response.header(*name, *value);
        }

        StaticReplayClient::new(vec![ReplayEvent::new(
            http::Request::builder()
                .uri("https://bedrock.us-east-1.amazonaws.com/")
                .body(SdkBody::empty())
                .unwrap(),
            response.body(SdkBody::from(body.to_string())).unwrap(),
        )])
    }

    fn knowledge_base(http_client: &StaticReplayClient) -> BedrockKnowledgeBase {
        let sdk_config = aws_config::SdkConfig::builder()
            .behavior_version(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new("us-east-1"))
            .credentials_provider(SharedCredentialsProvider::new(Credentials::new(
                "ANOTREAL", "notrealsecret", None, None, "test",
            )))
            .http_client(http_client.clone())
            .build();

        BedrockKnowledgeBase::with_config(&sdk_config)
    }

    /// JSON body of the single request sent through the replay client.
    fn sent_body(http_client: &StaticReplayClient) -> Value {
        let requests: Vec<_> = http_client.actual_requests().collect();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        serde_json::from_slice(requests[0].body().bytes().unwrap()).unwrap()
    }

    fn generate_call(session_id: Option<&str>) -> GenerateCall {
        GenerateCall {
            question: "What is the refund policy?".into(),
            knowledge_base_id: "kb-123".into(),
            model_identifier: MODEL_ARN.into(),
            session_id: session_id.map(str::to_string),
        }
    }

    #[test]
    fn test_doc_to_json() {
        let doc = Document::Object(HashMap::from([
            ("source".to_string(), Document::String("refunds.pdf".into())),
            ("page".to_string(), Document::Number(Number::PosInt(3))),
            ("offset".to_string(), Document::Number(Number::NegInt(-2))),
            ("score".to_string(), Document::Number(Number::Float(0.5))),
            ("tags".to_string(), Document::Array(vec![Document::Bool(true), Document::Null])),
        ]));

        assert_eq!(
            doc_to_json(&doc),
            json!({
                "source": "refunds.pdf",
                "page": 3,
                "offset": -2,
                "score": 0.5,
                "tags": [true, null],
            })
        );
    }

    #[test]
    fn test_citation_layout() {
        let citation = SdkCitation::builder()
            .generated_response_part(
                GeneratedResponsePart::builder()
                    .text_response_part(
                        TextResponsePart::builder()
                            .text("30 days")
                            .span(Span::builder().start(0).end(6).build())
                            .build(),
                    )
                    .build(),
            )
            .retrieved_references(RetrievedReference::builder().build())
            .build();

        let Citation(value) = citation_to_json(&citation);
        assert_eq!(
            value,
            json!({
                "generatedResponsePart": {
                    "textResponsePart": {"text": "30 days", "span": {"start": 0, "end": 6}}
                },
                "retrievedReferences": [
                    {"content": null, "location": null, "metadata": null}
                ],
            })
        );
    }

    #[test]
    fn test_timeout_is_transport() {
        let err: SdkError<RetrieveAndGenerateError, ()> = SdkError::timeout_error("timed out");
        let failure = classify_sdk_error(&err);
        assert_eq!(failure.code, "TimeoutError");
        assert_eq!(failure.category, UpstreamCategory::Transport);
    }

    #[test]
    fn test_construction_failure_is_client() {
        let err: SdkError<RetrieveAndGenerateError, ()> =
            SdkError::construction_failure("missing region");
        let failure = classify_sdk_error(&err);
        assert_eq!(failure.code, "ConstructionFailure");
        assert_eq!(failure.category, UpstreamCategory::Client);
    }

    #[test]
    fn test_service_errors_keep_code() {
        let throttled: SdkError<RetrieveAndGenerateError, ()> = SdkError::service_error(
            RetrieveAndGenerateError::ThrottlingException(
                aws_sdk_bedrockagentruntime::types::error::ThrottlingException::builder()
                    .message("Rate exceeded")
                    .meta(metadata("ThrottlingException", "Rate exceeded"))
                    .build(),
            ),
            (),
        );
        let failure = classify_sdk_error(&throttled);
        assert_eq!(failure.code, "ThrottlingException");
        assert_eq!(failure.category, UpstreamCategory::Throttled);
        assert_eq!(failure.message, "Rate exceeded");

        let denied: SdkError<RetrieveAndGenerateError, ()> = SdkError::service_error(
            RetrieveAndGenerateError::AccessDeniedException(
                aws_sdk_bedrockagentruntime::types::error::AccessDeniedException::builder()
                    .message("not authorized")
                    .meta(metadata("AccessDeniedException", "not authorized"))
                    .build(),
            ),
            (),
        );
        let failure = classify_sdk_error(&denied);
        assert_eq!(failure.code, "AccessDeniedException");
        assert_eq!(failure.category, UpstreamCategory::Auth);

        let missing: SdkError<StartIngestionJobError, ()> = SdkError::service_error(
            StartIngestionJobError::ResourceNotFoundException(
                aws_sdk_bedrockagent::types::error::ResourceNotFoundException::builder()
                    .message("Data source ds-9 not found")
                    .meta(metadata("ResourceNotFoundException", "Data source ds-9 not found"))
                    .build(),
            ),
            (),
        );
        let failure = classify_sdk_error(&missing);
        assert_eq!(failure.code, "ResourceNotFoundException");
        assert_eq!(failure.category, UpstreamCategory::NotFound);
        assert_eq!(failure.message, "Data source ds-9 not found");
    }

    #[tokio::test]
    async fn test_retrieve_and_generate_request_and_reply() {
        let http_client = replay(
            200,
            r#"{
                "sessionId": "s1",
                "output": {"text": "30 days"},
                "citations": [{
                    "generatedResponsePart": {"textResponsePart": {"text": "30 days", "span": {"start": 0, "end": 6}}},
                    "retrievedReferences": [{
                        "content": {"text": "Refunds within 30 days"},
                        "location": {"type": "S3", "s3Location": {"uri": "s3://docs/refunds.pdf"}}
                    }]
                }]
            }"#,
            &[],
        );

        let reply = knowledge_base(&http_client)
            .retrieve_and_generate(generate_call(None))
            .await
            .unwrap();

        let body = sent_body(&http_client);
        assert_eq!(body["input"]["text"], "What is the refund policy?");
        assert_eq!(body["retrieveAndGenerateConfiguration"]["type"], "KNOWLEDGE_BASE");
        assert_eq!(
            body["retrieveAndGenerateConfiguration"]["knowledgeBaseConfiguration"]["knowledgeBaseId"],
            "kb-123"
        );
        assert_eq!(
            body["retrieveAndGenerateConfiguration"]["knowledgeBaseConfiguration"]["modelArn"],
            MODEL_ARN
        );
        assert!(body.get("sessionId").is_none());

        assert_eq!(reply.output_text.as_deref(), Some("30 days"));
        assert_eq!(reply.session_id.as_deref(), Some("s1"));
        assert_eq!(reply.citations.len(), 1);
        let Citation(citation) = &reply.citations[0];
        assert_eq!(
            citation["generatedResponsePart"]["textResponsePart"]["span"],
            json!({"start": 0, "end": 6})
        );
        assert_eq!(
            citation["retrievedReferences"][0]["location"]["s3Location"]["uri"],
            "s3://docs/refunds.pdf"
        );
        assert_eq!(
            citation["retrievedReferences"][0]["content"]["text"],
            "Refunds within 30 days"
        );
    }

    #[tokio::test]
    async fn test_retrieve_and_generate_forwards_session() {
        let http_client = replay(200, r#"{"sessionId": "s0", "output": {"text": "yes"}}"#, &[]);

        let reply = knowledge_base(&http_client)
            .retrieve_and_generate(generate_call(Some("s0")))
            .await
            .unwrap();

        assert_eq!(sent_body(&http_client)["sessionId"], "s0");
        assert_eq!(reply.session_id.as_deref(), Some("s0"));
        assert!(reply.citations.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_and_generate_missing_fields_are_none() {
        let http_client = replay(200, r#"{"sessionId": ""}"#, &[]);

        let reply = knowledge_base(&http_client)
            .retrieve_and_generate(generate_call(None))
            .await
            .unwrap();

        assert_eq!(reply.output_text, None);
        assert_eq!(reply.session_id, None);
    }

    #[tokio::test]
    async fn test_throttled_call_is_not_retried() {
        let http_client = replay(
            429,
            r#"{"message": "Rate exceeded"}"#,
            &[("x-amzn-errortype", "ThrottlingException")],
        );

        let failure = knowledge_base(&http_client)
            .retrieve_and_generate(generate_call(None))
            .await
            .unwrap_err();

        assert_eq!(failure.code, "ThrottlingException");
        assert_eq!(failure.category, UpstreamCategory::Throttled);
        assert_eq!(http_client.actual_requests().count(), 1);
    }

    #[tokio::test]
    async fn test_start_ingestion_job_request_and_reply() {
        let http_client = replay(
            202,
            r#"{"ingestionJob": {"knowledgeBaseId": "kb-123", "dataSourceId": "ds-9", "ingestionJobId": "job-1"}}"#,
            &[],
        );

        let reply = knowledge_base(&http_client)
            .start_ingestion_job(IngestionCall {
                knowledge_base_id: "kb-123".into(),
                data_source_id: "ds-9".into(),
            })
            .await
            .unwrap();

        let requests: Vec<_> = http_client.actual_requests().collect();
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .uri()
            .contains("/knowledgebases/kb-123/datasources/ds-9/ingestionjobs"));
        assert_eq!(reply.ingestion_job_id.as_deref(), Some("job-1"));
    }

    #[tokio::test]
    async fn test_start_ingestion_job_without_job_id() {
        for body in [
            r#"{}"#,
            r#"{"ingestionJob": {"knowledgeBaseId": "kb-123", "dataSourceId": "ds-9", "ingestionJobId": ""}}"#,
        ] {
            let http_client = replay(202, body, &[]);
            let reply = knowledge_base(&http_client)
                .start_ingestion_job(IngestionCall {
                    knowledge_base_id: "kb-123".into(),
                    data_source_id: "ds-9".into(),
                })
                .await
                .unwrap();
            assert_eq!(reply.ingestion_job_id, None, "body {}", body);
        }
    }

    #[tokio::test]
    async fn test_start_ingestion_job_not_found() {
        let http_client = replay(
            404,
            r#"{"message": "Data source ds-9 not found"}"#,
            &[("x-amzn-errortype", "ResourceNotFoundException")],
        );

        let failure = knowledge_base(&http_client)
            .start_ingestion_job(IngestionCall {
                knowledge_base_id: "kb-123".into(),
                data_source_id: "ds-9".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(failure.code, "ResourceNotFoundException");
        assert_eq!(failure.category, UpstreamCategory::NotFound);
    }
}
