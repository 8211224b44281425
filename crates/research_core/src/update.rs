use research_logging::{research_debug, research_info, research_trace, research_warn};

use crate::view_model::{Notice, NoticeKind, RenderedTranscript, SchedulerPhase, TranscriptSource};
use crate::{
    project, AppState, ChatMessage, CompletionSnapshot, Effect, JobResult, JobStatus, Msg, Role,
    SessionId, StatusReport,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SubmitRequested { query } => submit(&mut state, &query),
        Msg::JobCreated { session, job_id } => {
            if !state.start_polling(session, job_id.clone()) {
                research_debug!("Ignoring JobCreated for stale session {}", session);
                return (state, Vec::new());
            }
            research_info!("Job {} accepted (session {})", job_id, session);
            // First tick goes out immediately, the deadline runs alongside it.
            vec![
                Effect::ArmDeadline {
                    session,
                    after: state.settings().job_deadline,
                },
                Effect::FetchStatus { session, job_id },
            ]
        }
        Msg::JobCreationFailed { session, message } => {
            if !state.is_current(session) {
                return (state, Vec::new());
            }
            research_warn!("Job creation failed: {}", message);
            state.finish(SchedulerPhase::Failed);
            state.set_notice(Notice {
                kind: NoticeKind::SubmissionFailed,
                message,
            });
            vec![Effect::CancelSession { session }]
        }
        Msg::PollDue { session } => poll_due(&mut state, session),
        Msg::StatusReceived { session, report } => status_received(&mut state, session, report),
        Msg::StatusFailed { session, message } => status_failed(&mut state, session, &message),
        Msg::DeadlineExpired { session } => {
            if !state.is_current(session) {
                return (state, Vec::new());
            }
            let minutes = state.settings().job_deadline.as_secs() / 60;
            research_warn!("Session {} hit the master deadline", session);
            state.finish(SchedulerPhase::TimedOut);
            state.set_notice(Notice {
                kind: NoticeKind::TimedOut,
                message: format!(
                    "Deep research did not finish within {minutes} minutes and was stopped."
                ),
            });
            vec![Effect::CancelSession { session }]
        }
        Msg::ConversationSwitched(conversation_id) => {
            state.set_open_conversation(conversation_id);
            abort_if_unbound(&mut state)
        }
        Msg::TeardownRequested => teardown(&mut state),
        Msg::ResultFetched { completion, result } => result_fetched(&mut state, completion, result),
        Msg::HistoryLoaded {
            completion,
            outcome,
            fallback,
        } => history_loaded(&mut state, &completion, outcome, fallback),
        Msg::ConversationsRefreshed(Ok(conversations)) => {
            state.set_conversations(conversations);
            Vec::new()
        }
        Msg::ConversationsRefreshed(Err(message)) => {
            research_warn!("Conversation list refresh failed: {}", message);
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn submit(state: &mut AppState, query: &str) -> Vec<Effect> {
    if let Err(rejection) = state.check_submit(query) {
        research_warn!("Submission rejected: {}", rejection);
        // The running job keeps its panel; only surface the rejection.
        state.set_notice(Notice {
            kind: NoticeKind::SubmissionRejected,
            message: rejection.to_string(),
        });
        return Vec::new();
    }
    let Some((session, conversation_id)) = state.begin_submission(query) else {
        return Vec::new();
    };
    research_info!(
        "Submitting deep research (session {}, conversation {})",
        session,
        conversation_id
    );
    vec![Effect::CreateJob {
        session,
        query: query.trim().to_string(),
        conversation_id,
    }]
}

fn teardown(state: &mut AppState) -> Vec<Effect> {
    let mut effects = Vec::new();
    if let Some(job) = state.finish(SchedulerPhase::Aborted) {
        research_info!("Teardown aborted session {}", job.session);
        effects.push(Effect::CancelSession {
            session: job.session,
        });
    }
    for session in state.abandon_reconciliations() {
        research_info!("Teardown abandoned reconciliation of session {}", session);
        effects.push(Effect::CancelReconciliation { session });
    }
    effects
}

fn poll_due(state: &mut AppState, session: SessionId) -> Vec<Effect> {
    if !state.is_current(session) {
        research_debug!("Dropping stale tick for session {}", session);
        return Vec::new();
    }
    if !state.job_matches_open_conversation() {
        return abort_if_unbound(state);
    }
    let Some(polling) = state.polling_mut(session) else {
        return Vec::new();
    };
    if polling.in_flight {
        return Vec::new();
    }
    polling.begin_tick();
    let job_id = polling.handle.job_id.clone();
    vec![Effect::FetchStatus { session, job_id }]
}

fn status_received(state: &mut AppState, session: SessionId, report: StatusReport) -> Vec<Effect> {
    let settings = state.settings().clone();
    let Some(polling) = state.polling_mut(session) else {
        research_debug!("Dropping stale status for session {}", session);
        return Vec::new();
    };
    polling.record_success(&report);
    research_debug!(
        "Job {} status {:?} (attempt {})",
        polling.handle.job_id,
        report.status,
        polling.attempt
    );

    match report.status {
        JobStatus::Completed => match state.finish_completed() {
            Some(completion) => {
                research_info!("Job {} completed", completion.job_id);
                vec![
                    Effect::CancelSession { session },
                    Effect::FetchResult { completion },
                ]
            }
            None => Vec::new(),
        },
        JobStatus::Failed => {
            let message = report
                .error
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| "The research job failed.".to_string());
            research_warn!("Session {} failed on the server: {}", session, message);
            state.finish(SchedulerPhase::Failed);
            state.set_notice(Notice {
                kind: NoticeKind::ServerFailure,
                message,
            });
            vec![Effect::CancelSession { session }]
        }
        JobStatus::Pending | JobStatus::Running => {
            let delay = polling.advance(&settings);
            research_trace!("Session {} next tick in {:?}", session, delay);
            state.set_progress(project(&report));
            state.mark_dirty();
            vec![Effect::SchedulePoll { session, delay }]
        }
    }
}

fn status_failed(state: &mut AppState, session: SessionId, message: &str) -> Vec<Effect> {
    let settings = state.settings().clone();
    let Some(polling) = state.polling_mut(session) else {
        return Vec::new();
    };
    let errors = polling.record_error();
    research_warn!(
        "Status exchange failed for session {} ({}/{}): {}",
        session,
        errors,
        settings.max_consecutive_errors,
        message
    );

    if errors >= settings.max_consecutive_errors {
        state.finish(SchedulerPhase::Failed);
        state.set_notice(Notice {
            kind: NoticeKind::Connectivity,
            message: format!(
                "Lost connection to the research service after {errors} failed attempts: {message}"
            ),
        });
        return vec![Effect::CancelSession { session }];
    }

    let delay = polling.advance(&settings);
    state.mark_dirty();
    vec![Effect::SchedulePoll { session, delay }]
}

/// Context Guard: silently aborts a job whose conversation is no longer open.
fn abort_if_unbound(state: &mut AppState) -> Vec<Effect> {
    if state.job_matches_open_conversation() {
        return Vec::new();
    }
    match state.finish(SchedulerPhase::Aborted) {
        Some(job) => {
            research_info!(
                "Conversation changed; aborting session {} bound to {}",
                job.session,
                job.conversation_id
            );
            vec![Effect::CancelSession {
                session: job.session,
            }]
        }
        None => Vec::new(),
    }
}

fn result_fetched(
    state: &mut AppState,
    completion: CompletionSnapshot,
    result: Result<JobResult, String>,
) -> Vec<Effect> {
    if !state.is_reconciling(completion.session) {
        research_debug!("Dropping result of abandoned session {}", completion.session);
        return Vec::new();
    }
    let fallback = match result {
        Ok(result) => {
            research_info!(
                "Job {} result: {} citations, {} sources, model {}",
                completion.job_id,
                result.citations.len(),
                result.sources_count.unwrap_or_default(),
                result.model_used.as_deref().unwrap_or("unknown")
            );
            Some(result)
        }
        Err(message) => {
            research_warn!(
                "Result fetch for job {} failed: {}",
                completion.job_id,
                message
            );
            None
        }
    };

    if !state.is_open(&completion.conversation_id) {
        state.end_reconciliation(completion.session);
        research_info!(
            "Job {} finished for conversation {}, which is no longer open",
            completion.job_id,
            completion.conversation_id
        );
        return vec![
            Effect::CancelReconciliation {
                session: completion.session,
            },
            Effect::RefreshConversations,
        ];
    }

    vec![Effect::ReloadHistory {
        completion,
        after: state.settings().settle_grace,
        fallback,
    }]
}

fn history_loaded(
    state: &mut AppState,
    completion: &CompletionSnapshot,
    outcome: Result<crate::Transcript, String>,
    fallback: Option<JobResult>,
) -> Vec<Effect> {
    if !state.is_reconciling(completion.session) {
        research_debug!("Dropping history of abandoned session {}", completion.session);
        return Vec::new();
    }
    state.end_reconciliation(completion.session);
    let effects = vec![
        Effect::CancelReconciliation {
            session: completion.session,
        },
        Effect::RefreshConversations,
    ];
    if !state.is_open(&completion.conversation_id) {
        return effects;
    }
    match outcome {
        Ok(transcript) => state.set_transcript(RenderedTranscript {
            conversation_id: completion.conversation_id.clone(),
            source: TranscriptSource::Persisted,
            summary: transcript.summary,
            messages: transcript.messages,
        }),
        Err(message) => {
            research_warn!(
                "History reload for {} failed, rendering in-memory result: {}",
                completion.conversation_id,
                message
            );
            if let Some(report) = fallback.and_then(|result| result.report) {
                state.set_transcript(RenderedTranscript {
                    conversation_id: completion.conversation_id.clone(),
                    source: TranscriptSource::Fallback,
                    summary: None,
                    messages: vec![
                        ChatMessage::new(Role::User, completion.query.clone()),
                        ChatMessage::new(Role::Assistant, report),
                    ],
                });
            }
        }
    }
    effects
}
