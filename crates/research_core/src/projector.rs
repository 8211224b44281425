use crate::{JobStatus, StatusReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    InProgress,
    Completed,
    Failed,
}

/// Display state of the progress panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub badge: Badge,
    pub phase: Option<String>,
    pub message: Option<String>,
    /// Hidden unless the worker has reported at least one sub-query.
    pub summary_line: Option<String>,
}

impl ProgressView {
    /// Panel shown between submission and the first status payload.
    pub fn submitted() -> Self {
        Self {
            badge: Badge::InProgress,
            phase: None,
            message: None,
            summary_line: None,
        }
    }
}

/// Maps a status payload onto display state. Reads only.
pub fn project(report: &StatusReport) -> ProgressView {
    let badge = match report.status {
        JobStatus::Completed => Badge::Completed,
        JobStatus::Failed => Badge::Failed,
        JobStatus::Pending | JobStatus::Running => Badge::InProgress,
    };

    let summary_line = if report.sub_queries.is_empty() {
        None
    } else {
        Some(format!(
            "{} sub-queries · {} sources",
            report.sub_queries.len(),
            report.sources_count.unwrap_or(0)
        ))
    };

    ProgressView {
        badge,
        phase: non_blank(report.phase.as_deref()),
        message: non_blank(report.progress_message.as_deref()),
        summary_line,
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}
