use std::time::Duration;

use reqwest::Method;
use research_core::{
    ChatMessage, Citation, ConversationId, ConversationSummary, JobId, JobResult, JobStatus, Role,
    StatusReport, Transcript,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::settings::Endpoints;
use crate::transport::Transport;
use crate::{ClientSettings, TransportError};

/// Server contract consumed by the orchestrator.
#[async_trait::async_trait]
pub trait ResearchApi: Send + Sync {
    async fn create_job(
        &self,
        query: &str,
        conversation_id: &ConversationId,
    ) -> Result<JobId, TransportError>;

    async fn job_status(&self, job_id: &JobId) -> Result<StatusReport, TransportError>;

    async fn job_result(&self, job_id: &JobId) -> Result<JobResult, TransportError>;

    async fn conversation_history(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Transcript, TransportError>;

    async fn list_conversations(
        &self,
        filter: Option<&str>,
    ) -> Result<Vec<ConversationSummary>, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpResearchApi {
    transport: Transport,
    endpoints: Endpoints,
    submit_deadline: Option<Duration>,
    reconcile_deadline: Option<Duration>,
}

impl HttpResearchApi {
    pub fn new(settings: ClientSettings) -> Result<Self, TransportError> {
        Ok(Self {
            transport: Transport::new(&settings)?,
            endpoints: settings.endpoints,
            submit_deadline: settings.submit_deadline,
            reconcile_deadline: settings.reconcile_deadline,
        })
    }

    async fn get(
        &self,
        endpoint: &str,
        deadline: Option<Duration>,
    ) -> Result<Value, TransportError> {
        self.transport.call(endpoint, Method::GET, None, deadline).await
    }
}

#[async_trait::async_trait]
impl ResearchApi for HttpResearchApi {
    async fn create_job(
        &self,
        query: &str,
        conversation_id: &ConversationId,
    ) -> Result<JobId, TransportError> {
        let body = json!({
            "query": query,
            "conversation_id": id_value(conversation_id.as_str()),
        });
        let payload = self
            .transport
            .call(
                &self.endpoints.create_job,
                Method::POST,
                Some(&body),
                self.submit_deadline,
            )
            .await?;
        let response: CreateJobResponse = decode(payload)?;
        response
            .job_id
            .as_ref()
            .and_then(id_string)
            .map(JobId::new)
            .ok_or_else(|| TransportError::malformed("response did not include a job id"))
    }

    async fn job_status(&self, job_id: &JobId) -> Result<StatusReport, TransportError> {
        let endpoint = Endpoints::with_id(&self.endpoints.job_status, job_id.as_str());
        let response: StatusResponse = decode(self.get(&endpoint, None).await?)?;
        response.into_report()
    }

    async fn job_result(&self, job_id: &JobId) -> Result<JobResult, TransportError> {
        let endpoint = Endpoints::with_id(&self.endpoints.job_result, job_id.as_str());
        let response: ResultResponse =
            decode(self.get(&endpoint, self.reconcile_deadline).await?)?;
        Ok(response.into())
    }

    async fn conversation_history(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Transcript, TransportError> {
        let endpoint = Endpoints::with_id(&self.endpoints.history, conversation_id.as_str());
        let response: HistoryResponse =
            decode(self.get(&endpoint, self.reconcile_deadline).await?)?;
        Ok(response.into())
    }

    async fn list_conversations(
        &self,
        filter: Option<&str>,
    ) -> Result<Vec<ConversationSummary>, TransportError> {
        let mut endpoint = self.endpoints.conversations.clone();
        if let Some(filter) = filter.map(str::trim).filter(|text| !text.is_empty()) {
            let encoded: String = url::form_urlencoded::byte_serialize(filter.as_bytes()).collect();
            endpoint.push_str("?q=");
            endpoint.push_str(&encoded);
        }
        let response: ConversationsResponse =
            decode(self.get(&endpoint, self.reconcile_deadline).await?)?;
        let items = match response {
            ConversationsResponse::Wrapped { items } => items,
            ConversationsResponse::Bare(items) => items,
        };
        Ok(items
            .into_iter()
            .filter_map(ConversationWire::into_summary)
            .collect())
    }
}

fn decode<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, TransportError> {
    serde_json::from_value(payload).map_err(|err| TransportError::malformed(err.to_string()))
}

/// Server ids are integers; anything else is passed through as a string.
fn id_value(id: &str) -> Value {
    id.parse::<i64>().map_or_else(|_| json!(id), |number| json!(number))
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Maps the worker's status vocabulary, including job-queue synonyms.
pub fn parse_status(raw: &str) -> Option<JobStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pending" | "queued" | "deferred" | "scheduled" => Some(JobStatus::Pending),
        "running" | "started" | "in_progress" => Some(JobStatus::Running),
        "completed" | "finished" | "done" => Some(JobStatus::Completed),
        "failed" | "stopped" | "canceled" | "cancelled" => Some(JobStatus::Failed),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct CreateJobResponse {
    #[serde(default)]
    job_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    phase: Option<String>,
    #[serde(default, alias = "message")]
    progress_message: Option<String>,
    #[serde(default)]
    sub_queries: Option<Vec<String>>,
    #[serde(default)]
    sources_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

impl StatusResponse {
    fn into_report(self) -> Result<StatusReport, TransportError> {
        let status = parse_status(&self.status).ok_or_else(|| {
            TransportError::malformed(format!("unknown job status {:?}", self.status))
        })?;
        Ok(StatusReport {
            status,
            phase: self.phase,
            progress_message: self.progress_message,
            sub_queries: self.sub_queries.unwrap_or_default(),
            sources_count: self.sources_count,
            error: self.error,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CitationWire {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct ResultResponse {
    #[serde(default, alias = "report")]
    result_report: Option<String>,
    #[serde(default)]
    citations: Vec<CitationWire>,
    #[serde(default)]
    sub_queries: Vec<String>,
    #[serde(default)]
    sources_count: Option<u32>,
    #[serde(default)]
    model_used: Option<String>,
}

impl From<ResultResponse> for JobResult {
    fn from(response: ResultResponse) -> Self {
        JobResult {
            report: response.result_report,
            citations: response
                .citations
                .into_iter()
                .filter(|citation| !citation.url.is_empty())
                .map(|citation| Citation {
                    title: citation.title,
                    url: citation.url,
                })
                .collect(),
            sub_queries: response.sub_queries,
            sources_count: response.sources_count,
            model_used: response.model_used,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageWire {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    messages: Vec<MessageWire>,
}

impl From<HistoryResponse> for Transcript {
    fn from(response: HistoryResponse) -> Self {
        Transcript {
            summary: response.summary.filter(|text| !text.trim().is_empty()),
            messages: response
                .messages
                .into_iter()
                .map(|message| ChatMessage::new(Role::parse(&message.role), message.content))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConversationWire {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    is_pinned: bool,
}

impl ConversationWire {
    fn into_summary(self) -> Option<ConversationSummary> {
        Some(ConversationSummary {
            id: ConversationId::new(id_string(&self.id)?),
            title: self.title.unwrap_or_default(),
            summary: self.summary.filter(|text| !text.trim().is_empty()),
            is_pinned: self.is_pinned,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConversationsResponse {
    Wrapped { items: Vec<ConversationWire> },
    Bare(Vec<ConversationWire>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_synonyms_map_to_four_states() {
        assert_eq!(parse_status("queued"), Some(JobStatus::Pending));
        assert_eq!(parse_status("Started"), Some(JobStatus::Running));
        assert_eq!(parse_status("finished"), Some(JobStatus::Completed));
        assert_eq!(parse_status(" failed "), Some(JobStatus::Failed));
        assert_eq!(parse_status("exploded"), None);
    }

    #[test]
    fn ids_accept_strings_and_numbers() {
        assert_eq!(id_string(&json!(17)).as_deref(), Some("17"));
        assert_eq!(id_string(&json!("abc-1")).as_deref(), Some("abc-1"));
        assert_eq!(id_string(&json!("")), None);
        assert_eq!(id_string(&Value::Null), None);
        assert_eq!(id_value("42"), json!(42));
        assert_eq!(id_value("20251013"), json!(20251013));
        assert_eq!(id_value("c-1"), json!("c-1"));
    }
}
