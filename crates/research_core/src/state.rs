use std::time::Duration;

use crate::view_model::{AppViewModel, Notice, NoticeKind, RenderedTranscript, SchedulerPhase};
use crate::{
    ConversationId, ConversationSummary, JobId, JobStatus, OrchestratorSettings, ProgressView,
    SessionId, StatusReport,
};

/// Client-side view of one outstanding job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: JobId,
    pub conversation_id: ConversationId,
    pub status: JobStatus,
    pub phase: Option<String>,
    pub progress_message: Option<String>,
    pub sub_query_count: usize,
    pub sources_count: u32,
    pub error: Option<String>,
}

impl JobHandle {
    fn new(job_id: JobId, conversation_id: ConversationId) -> Self {
        Self {
            job_id,
            conversation_id,
            status: JobStatus::Pending,
            phase: None,
            progress_message: None,
            sub_query_count: 0,
            sources_count: 0,
            error: None,
        }
    }

    fn apply(&mut self, report: &StatusReport) {
        self.status = report.status;
        if report.phase.is_some() {
            self.phase = report.phase.clone();
        }
        if report.progress_message.is_some() {
            self.progress_message = report.progress_message.clone();
        }
        if !report.sub_queries.is_empty() {
            self.sub_query_count = report.sub_queries.len();
        }
        if let Some(count) = report.sources_count {
            self.sources_count = count;
        }
        self.error = report.error.clone();
    }
}

/// Ephemeral polling state bound 1:1 to a [`JobHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingSession {
    pub handle: JobHandle,
    /// Monotonic; advanced after every settled non-terminal exchange.
    pub attempt: u32,
    /// Reset on every successful exchange.
    pub consecutive_errors: u32,
    pub scheduled_delay: Option<Duration>,
    pub in_flight: bool,
}

impl PollingSession {
    fn new(handle: JobHandle) -> Self {
        Self {
            handle,
            attempt: 0,
            consecutive_errors: 0,
            scheduled_delay: None,
            in_flight: false,
        }
    }

    pub(crate) fn record_success(&mut self, report: &StatusReport) {
        self.in_flight = false;
        self.consecutive_errors = 0;
        self.handle.apply(report);
    }

    pub(crate) fn record_error(&mut self) -> u32 {
        self.in_flight = false;
        self.consecutive_errors += 1;
        self.consecutive_errors
    }

    /// Consumes the current attempt's backoff slot and returns the delay
    /// before the next tick.
    pub(crate) fn advance(&mut self, settings: &OrchestratorSettings) -> Duration {
        let delay = settings.schedule.interval_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        self.scheduled_delay = Some(delay);
        delay
    }

    pub(crate) fn begin_tick(&mut self) {
        self.scheduled_delay = None;
        self.in_flight = true;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStage {
    /// Creation request in flight; the slot is already occupied.
    Submitting,
    Polling(PollingSession),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveJob {
    pub session: SessionId,
    pub conversation_id: ConversationId,
    pub query: String,
    pub stage: JobStage,
}

impl ActiveJob {
    pub fn polling(&self) -> Option<&PollingSession> {
        match &self.stage {
            JobStage::Polling(polling) => Some(polling),
            JobStage::Submitting => None,
        }
    }
}

/// Identity of a completed job, captured at the terminal transition so the
/// reconciler never reads the (already cleared) slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSnapshot {
    pub session: SessionId,
    pub job_id: JobId,
    pub conversation_id: ConversationId,
    pub query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejection {
    #[error("a deep research job is already running")]
    JobAlreadyActive,
    #[error("the research query is empty")]
    EmptyQuery,
    #[error("no conversation is open")]
    NoConversation,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    settings: OrchestratorSettings,
    active_conversation: Option<ConversationId>,
    next_session: SessionId,
    active: Option<ActiveJob>,
    last_outcome: SchedulerPhase,
    /// Completed sessions whose result has not been applied to the live view yet.
    reconciling: Vec<SessionId>,
    progress: Option<ProgressView>,
    notice: Option<Notice>,
    transcript: Option<RenderedTranscript>,
    conversations: Vec<ConversationSummary>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: OrchestratorSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn view(&self) -> AppViewModel {
        let scheduler = match &self.active {
            Some(ActiveJob {
                stage: JobStage::Submitting,
                ..
            }) => SchedulerPhase::Submitting,
            Some(_) => SchedulerPhase::Polling,
            None => self.last_outcome,
        };
        AppViewModel {
            scheduler,
            active_conversation: self.active_conversation.clone(),
            progress: self.progress.clone(),
            notice: self.notice.clone(),
            transcript: self.transcript.clone(),
            conversations: self.conversations.clone(),
            reconciling: !self.reconciling.is_empty(),
            poll_attempt: self
                .active
                .as_ref()
                .and_then(ActiveJob::polling)
                .map_or(0, |polling| polling.attempt),
        }
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn active_conversation(&self) -> Option<&ConversationId> {
        self.active_conversation.as_ref()
    }

    pub fn active_job(&self) -> Option<&ActiveJob> {
        self.active.as_ref()
    }

    pub fn has_active_job(&self) -> bool {
        self.active.is_some()
    }

    /// Precondition of a submission. Never touches the active slot.
    pub fn check_submit(&self, query: &str) -> Result<(), SubmitRejection> {
        if self.active.is_some() {
            return Err(SubmitRejection::JobAlreadyActive);
        }
        if query.trim().is_empty() {
            return Err(SubmitRejection::EmptyQuery);
        }
        if self.active_conversation.is_none() {
            return Err(SubmitRejection::NoConversation);
        }
        Ok(())
    }

    pub(crate) fn is_current(&self, session: SessionId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|job| job.session == session)
    }

    /// Occupies the slot. Callers must have passed [`Self::check_submit`].
    pub(crate) fn begin_submission(&mut self, query: &str) -> Option<(SessionId, ConversationId)> {
        let conversation_id = self.active_conversation.clone()?;
        self.next_session += 1;
        let session = self.next_session;
        self.active = Some(ActiveJob {
            session,
            conversation_id: conversation_id.clone(),
            query: query.trim().to_string(),
            stage: JobStage::Submitting,
        });
        self.notice = None;
        self.progress = Some(ProgressView::submitted());
        self.mark_dirty();
        Some((session, conversation_id))
    }

    pub(crate) fn start_polling(&mut self, session: SessionId, job_id: JobId) -> bool {
        let Some(job) = self.active.as_mut().filter(|job| job.session == session) else {
            return false;
        };
        if !matches!(job.stage, JobStage::Submitting) {
            return false;
        }
        let handle = JobHandle::new(job_id, job.conversation_id.clone());
        let mut polling = PollingSession::new(handle);
        polling.begin_tick();
        job.stage = JobStage::Polling(polling);
        self.mark_dirty();
        true
    }

    pub(crate) fn polling_mut(&mut self, session: SessionId) -> Option<&mut PollingSession> {
        match self.active.as_mut() {
            Some(ActiveJob {
                session: current,
                stage: JobStage::Polling(polling),
                ..
            }) if *current == session => Some(polling),
            _ => None,
        }
    }

    /// Context Guard: does the job still belong to the open conversation?
    pub(crate) fn job_matches_open_conversation(&self) -> bool {
        match (&self.active, &self.active_conversation) {
            (Some(job), Some(open)) => job.conversation_id == *open,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    /// Empties the slot and the progress panel, recording `outcome`.
    pub(crate) fn finish(&mut self, outcome: SchedulerPhase) -> Option<ActiveJob> {
        let job = self.active.take()?;
        self.last_outcome = outcome;
        self.progress = None;
        // A rejection refers to the job that just ended.
        if self
            .notice
            .as_ref()
            .is_some_and(|notice| notice.kind == NoticeKind::SubmissionRejected)
        {
            self.notice = None;
        }
        self.mark_dirty();
        Some(job)
    }

    /// Terminal success: empties the slot and hands back what the reconciler
    /// needs.
    pub(crate) fn finish_completed(&mut self) -> Option<CompletionSnapshot> {
        let job = self.finish(SchedulerPhase::Completed)?;
        match job.stage {
            JobStage::Polling(polling) => {
                self.reconciling.push(job.session);
                Some(CompletionSnapshot {
                    session: job.session,
                    job_id: polling.handle.job_id,
                    conversation_id: job.conversation_id,
                    query: job.query,
                })
            }
            JobStage::Submitting => None,
        }
    }

    pub(crate) fn is_reconciling(&self, session: SessionId) -> bool {
        self.reconciling.contains(&session)
    }

    pub(crate) fn end_reconciliation(&mut self, session: SessionId) {
        if let Some(index) = self.reconciling.iter().position(|&s| s == session) {
            self.reconciling.remove(index);
            self.mark_dirty();
        }
    }

    /// Ends every pending reconciliation and returns the sessions involved.
    pub(crate) fn abandon_reconciliations(&mut self) -> Vec<SessionId> {
        if !self.reconciling.is_empty() {
            self.mark_dirty();
        }
        std::mem::take(&mut self.reconciling)
    }

    pub(crate) fn set_progress(&mut self, progress: ProgressView) {
        if self.progress.as_ref() != Some(&progress) {
            self.progress = Some(progress);
            self.mark_dirty();
        }
    }

    pub(crate) fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.mark_dirty();
    }

    pub(crate) fn set_open_conversation(&mut self, conversation_id: ConversationId) {
        if self
            .transcript
            .as_ref()
            .is_some_and(|transcript| transcript.conversation_id != conversation_id)
        {
            self.transcript = None;
        }
        self.active_conversation = Some(conversation_id);
        self.mark_dirty();
    }

    pub(crate) fn is_open(&self, conversation_id: &ConversationId) -> bool {
        self.active_conversation.as_ref() == Some(conversation_id)
    }

    pub(crate) fn set_transcript(&mut self, transcript: RenderedTranscript) {
        self.transcript = Some(transcript);
        self.mark_dirty();
    }

    pub(crate) fn set_conversations(&mut self, conversations: Vec<ConversationSummary>) {
        if self.conversations != conversations {
            self.conversations = conversations;
            self.mark_dirty();
        }
    }
}
