use research_core::{
    AppViewModel, Badge, NoticeKind, ProgressView, RenderedTranscript, Role, SchedulerPhase,
    TranscriptSource,
};

/// Lines describing what changed between two consecutive views.
pub fn render(previous: &AppViewModel, view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();

    if view.scheduler != previous.scheduler {
        lines.push(format!("Status: {}", phase_label(view.scheduler)));
    }

    if view.progress != previous.progress {
        if let Some(progress) = &view.progress {
            lines.push(format_progress(progress, view.poll_attempt));
        }
    }

    if view.notice != previous.notice {
        if let Some(notice) = &view.notice {
            lines.push(format!("{}: {}", notice_label(notice.kind), notice.message));
        }
    }

    if view.transcript != previous.transcript {
        if let Some(transcript) = &view.transcript {
            lines.extend(format_transcript(transcript));
        }
    }

    if view.conversations != previous.conversations && !view.conversations.is_empty() {
        lines.push(format!("Conversations: {}", view.conversations.len()));
    }

    lines
}

fn phase_label(phase: SchedulerPhase) -> &'static str {
    match phase {
        SchedulerPhase::Idle => "Idle",
        SchedulerPhase::Submitting => "Submitting",
        SchedulerPhase::Polling => "Researching",
        SchedulerPhase::Completed => "Completed",
        SchedulerPhase::Failed => "Failed",
        SchedulerPhase::TimedOut => "Timed out",
        SchedulerPhase::Aborted => "Aborted",
    }
}

fn notice_label(kind: NoticeKind) -> &'static str {
    match kind {
        NoticeKind::SubmissionRejected => "Not submitted",
        NoticeKind::SubmissionFailed => "Submission failed",
        NoticeKind::ServerFailure => "Research failed",
        NoticeKind::Connectivity => "Connection lost",
        NoticeKind::TimedOut => "Timed out",
    }
}

fn format_progress(progress: &ProgressView, attempt: u32) -> String {
    let badge = match progress.badge {
        Badge::InProgress => "in progress",
        Badge::Completed => "completed",
        Badge::Failed => "failed",
    };
    let mut line = format!("[{badge}]");
    if let Some(phase) = &progress.phase {
        line.push_str(&format!(" {phase}"));
    }
    if let Some(message) = &progress.message {
        line.push_str(&format!(": {message}"));
    }
    if let Some(summary) = &progress.summary_line {
        line.push_str(&format!(" ({summary})"));
    }
    if attempt > 0 {
        line.push_str(&format!(" #{attempt}"));
    }
    line
}

fn format_transcript(transcript: &RenderedTranscript) -> Vec<String> {
    let mut lines = Vec::new();
    if transcript.source == TranscriptSource::Fallback {
        lines.push("History unavailable; showing the research report.".to_string());
    }
    if let Some(summary) = &transcript.summary {
        lines.push(format!("Summary: {summary}"));
    }
    for message in &transcript.messages {
        let speaker = match message.role {
            Role::User => "you",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        lines.push(format!("{speaker}> {}", message.content));
    }
    lines
}
