use std::fmt;

/// Client-local identifier for one occupancy of the active-job slot.
///
/// Allocated at submission time, before the server has assigned a job id, so
/// that every asynchronous message can be matched to the session it belongs to.
pub type SessionId = u64;

/// Opaque server-assigned job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque conversation identifier, as used by the history endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One status payload as reported by the job worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: JobStatus,
    pub phase: Option<String>,
    pub progress_message: Option<String>,
    pub sub_queries: Vec<String>,
    pub sources_count: Option<u32>,
    pub error: Option<String>,
}

impl StatusReport {
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            phase: None,
            progress_message: None,
            sub_queries: Vec::new(),
            sources_count: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub title: String,
    pub url: String,
}

/// Final payload of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobResult {
    pub report: Option<String>,
    pub citations: Vec<Citation>,
    pub sub_queries: Vec<String>,
    pub sources_count: Option<u32>,
    pub model_used: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Role::User,
            "system" => Role::System,
            // The server stores "bot"/"model"/"assistant" for generated turns.
            _ => Role::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Durable conversation record as reloaded from the server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    pub summary: Option<String>,
    pub messages: Vec<ChatMessage>,
}

/// Sidebar entry; only refreshed after a job completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
    pub summary: Option<String>,
    pub is_pinned: bool,
}
