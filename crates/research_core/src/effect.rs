use std::time::Duration;

use crate::{CompletionSnapshot, ConversationId, JobId, JobResult, SessionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CreateJob {
        session: SessionId,
        query: String,
        conversation_id: ConversationId,
    },
    /// Status exchange; bounded only by the master deadline.
    FetchStatus { session: SessionId, job_id: JobId },
    SchedulePoll { session: SessionId, delay: Duration },
    ArmDeadline { session: SessionId, after: Duration },
    /// Aborts the in-flight exchange, the scheduled tick and the deadline of
    /// `session` together. Emitted exactly once per session.
    CancelSession { session: SessionId },
    FetchResult { completion: CompletionSnapshot },
    /// Stops whatever is left of a completed session's reconciliation.
    /// Emitted exactly once per completed session.
    CancelReconciliation { session: SessionId },
    ReloadHistory {
        completion: CompletionSnapshot,
        after: Duration,
        fallback: Option<JobResult>,
    },
    RefreshConversations,
}
