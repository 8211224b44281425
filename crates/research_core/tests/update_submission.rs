use research_core::{
    update, AppState, ConversationId, Effect, JobId, JobStage, JobStatus, Msg, NoticeKind,
    ProgressView, SchedulerPhase, StatusReport,
};

fn open(state: AppState, id: &str) -> AppState {
    update(state, Msg::ConversationSwitched(ConversationId::new(id))).0
}

fn submit(state: AppState, query: &str) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::SubmitRequested {
            query: query.to_string(),
        },
    )
}

#[test]
fn submission_occupies_slot_and_creates_job() {
    let state = open(AppState::new(), "c1");
    let (mut state, effects) = submit(state, "  weather today \n");

    assert_eq!(
        effects,
        vec![Effect::CreateJob {
            session: 1,
            query: "weather today".to_string(),
            conversation_id: ConversationId::new("c1"),
        }]
    );
    let job = state.active_job().expect("active job");
    assert_eq!(job.stage, JobStage::Submitting);
    assert_eq!(job.conversation_id, ConversationId::new("c1"));
    let view = state.view();
    assert_eq!(view.scheduler, SchedulerPhase::Submitting);
    assert_eq!(view.progress, Some(ProgressView::submitted()));
    assert!(state.consume_dirty());
}

#[test]
fn second_submission_is_rejected_without_touching_active_job() {
    let state = open(AppState::new(), "c1");
    let (state, _) = submit(state, "first question");
    let (state, _) = update(
        state,
        Msg::JobCreated {
            session: 1,
            job_id: JobId::new("42"),
        },
    );
    let before = state.active_job().cloned();

    let (state, effects) = submit(state, "second question");

    assert!(effects.is_empty());
    assert_eq!(state.active_job().cloned(), before);
    let notice = state.view().notice.expect("rejection notice");
    assert_eq!(notice.kind, NoticeKind::SubmissionRejected);
    assert_eq!(state.view().scheduler, SchedulerPhase::Polling);
}

#[test]
fn submission_rejected_while_creation_in_flight() {
    let state = open(AppState::new(), "c1");
    let (state, _) = submit(state, "first question");
    let (state, effects) = submit(state, "second question");

    assert!(effects.is_empty());
    assert_eq!(state.active_job().map(|job| job.session), Some(1));
    assert_eq!(state.active_job().map(|job| job.query.as_str()), Some("first question"));
}

#[test]
fn blank_query_and_missing_conversation_are_rejected() {
    let (state, effects) = submit(AppState::new(), "question");
    assert!(effects.is_empty());
    assert!(!state.has_active_job());

    let state = open(state, "c1");
    let (state, effects) = submit(state, "   \n");
    assert!(effects.is_empty());
    assert!(!state.has_active_job());
}

#[test]
fn creation_failure_frees_slot_for_next_submission() {
    let state = open(AppState::new(), "c1");
    let (state, _) = submit(state, "question");
    let (state, effects) = update(
        state,
        Msg::JobCreationFailed {
            session: 1,
            message: "CSRF validation failed".to_string(),
        },
    );

    assert_eq!(effects, vec![Effect::CancelSession { session: 1 }]);
    assert!(!state.has_active_job());
    let view = state.view();
    assert_eq!(view.progress, None);
    let notice = view.notice.expect("notice");
    assert_eq!(notice.kind, NoticeKind::SubmissionFailed);
    assert_eq!(notice.message, "CSRF validation failed");

    let (state, effects) = submit(state, "question again");
    assert!(matches!(
        effects.as_slice(),
        [Effect::CreateJob { session: 2, .. }]
    ));
    assert_eq!(state.view().notice, None);
}

#[test]
fn teardown_during_creation_ignores_late_job_id() {
    let state = open(AppState::new(), "c1");
    let (state, _) = submit(state, "question");
    let (state, effects) = update(state, Msg::TeardownRequested);
    assert_eq!(effects, vec![Effect::CancelSession { session: 1 }]);
    assert_eq!(state.view().scheduler, SchedulerPhase::Aborted);

    let (state, effects) = update(
        state,
        Msg::JobCreated {
            session: 1,
            job_id: JobId::new("late"),
        },
    );
    assert!(effects.is_empty());
    assert!(!state.has_active_job());
}

#[test]
fn teardown_without_job_is_noop() {
    let state = open(AppState::new(), "c1");
    let (state, effects) = update(state, Msg::TeardownRequested);
    assert!(effects.is_empty());
    assert_eq!(state.view().scheduler, SchedulerPhase::Idle);
}

#[test]
fn update_noop_leaves_state_untouched() {
    let state = AppState::new();
    let (next, effects) = update(state.clone(), Msg::NoOp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn rejection_notice_ends_with_the_job_it_refers_to() {
    let state = open(AppState::new(), "c1");
    let (state, _) = submit(state, "first question");
    let (state, _) = update(
        state,
        Msg::JobCreated {
            session: 1,
            job_id: JobId::new("42"),
        },
    );
    let (state, _) = submit(state, "second question");
    assert!(state.view().notice.is_some());

    let (state, _) = update(
        state,
        Msg::StatusReceived {
            session: 1,
            report: StatusReport::new(JobStatus::Completed),
        },
    );
    let view = state.view();
    assert_eq!(view.scheduler, SchedulerPhase::Completed);
    assert_eq!(view.notice, None);
}

#[test]
fn terminal_failure_replaces_rejection_notice() {
    let state = open(AppState::new(), "c1");
    let (state, _) = submit(state, "first question");
    let (state, _) = update(
        state,
        Msg::JobCreated {
            session: 1,
            job_id: JobId::new("42"),
        },
    );
    let (state, _) = submit(state, "second question");

    let mut report = StatusReport::new(JobStatus::Failed);
    report.error = Some("LLM quota exceeded".to_string());
    let (state, _) = update(state, Msg::StatusReceived { session: 1, report });

    let notice = state.view().notice.expect("failure notice");
    assert_eq!(notice.kind, NoticeKind::ServerFailure);
    assert_eq!(notice.message, "LLM quota exceeded");
}

#[test]
fn noop_leaves_view_clean() {
    let (mut state, _) = submit(open(AppState::new(), "c1"), "weather today");
    assert!(state.consume_dirty());
    let before = state.view();

    let (mut state, effects) = update(state, Msg::NoOp);

    assert!(effects.is_empty());
    assert!(!state.consume_dirty());
    assert_eq!(state.view(), before);
}
