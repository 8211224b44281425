use crate::{
    CompletionSnapshot, ConversationId, ConversationSummary, JobId, JobResult, SessionId,
    StatusReport, Transcript,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User sent a message with "deep research" mode selected.
    SubmitRequested { query: String },
    /// The server accepted the job.
    JobCreated { session: SessionId, job_id: JobId },
    /// Job creation was rejected or the exchange failed.
    JobCreationFailed { session: SessionId, message: String },
    /// The scheduled tick for a session is due.
    PollDue { session: SessionId },
    /// A status exchange settled successfully.
    StatusReceived {
        session: SessionId,
        report: StatusReport,
    },
    /// A status exchange failed at the transport level.
    StatusFailed { session: SessionId, message: String },
    /// The master deadline for a session expired.
    DeadlineExpired { session: SessionId },
    /// The UI opened another conversation.
    ConversationSwitched(ConversationId),
    /// The UI is tearing the orchestration down.
    TeardownRequested,
    /// Final result fetch for a completed job settled.
    ResultFetched {
        completion: CompletionSnapshot,
        result: Result<JobResult, String>,
    },
    /// Post-completion history reload settled.
    HistoryLoaded {
        completion: CompletionSnapshot,
        outcome: Result<Transcript, String>,
        fallback: Option<JobResult>,
    },
    /// Conversation list refresh settled.
    ConversationsRefreshed(Result<Vec<ConversationSummary>, String>),
    /// Changes nothing; wakes the loop without side effects.
    NoOp,
}
