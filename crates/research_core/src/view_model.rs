use crate::{ChatMessage, ConversationId, ConversationSummary, ProgressView};

/// Where the job slot stands, including the last terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerPhase {
    #[default]
    Idle,
    Submitting,
    Polling,
    Completed,
    Failed,
    TimedOut,
    Aborted,
}

impl SchedulerPhase {
    pub fn is_active(self) -> bool {
        matches!(self, SchedulerPhase::Submitting | SchedulerPhase::Polling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    SubmissionRejected,
    SubmissionFailed,
    ServerFailure,
    Connectivity,
    TimedOut,
}

/// The single user-visible explanatory message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptSource {
    /// Reloaded from the server after the job completed.
    Persisted,
    /// Built from the in-memory result because the reload failed.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTranscript {
    pub conversation_id: ConversationId,
    pub source: TranscriptSource,
    pub summary: Option<String>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub scheduler: SchedulerPhase,
    pub active_conversation: Option<ConversationId>,
    pub progress: Option<ProgressView>,
    pub notice: Option<Notice>,
    pub transcript: Option<RenderedTranscript>,
    pub conversations: Vec<ConversationSummary>,
    /// A completed job's result is still being fetched and redrawn.
    pub reconciling: bool,
    pub poll_attempt: u32,
}
