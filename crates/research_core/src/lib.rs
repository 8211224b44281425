//! Deep research core: pure job orchestration state machine and view-model helpers.
mod effect;
mod msg;
mod projector;
mod schedule;
mod state;
mod types;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use projector::{project, Badge, ProgressView};
pub use schedule::{OrchestratorSettings, PollSchedule};
pub use state::{
    ActiveJob, AppState, CompletionSnapshot, JobHandle, JobStage, PollingSession, SubmitRejection,
};
pub use types::{
    ChatMessage, Citation, ConversationId, ConversationSummary, JobId, JobResult, JobStatus, Role,
    SessionId, StatusReport, Transcript,
};
pub use update::update;
pub use view_model::{
    AppViewModel, Notice, NoticeKind, RenderedTranscript, SchedulerPhase, TranscriptSource,
};
