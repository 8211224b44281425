use std::time::Duration;

/// Tiered polling intervals, keyed by the poll attempt counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSchedule {
    pub fast: Duration,
    /// First attempt that no longer uses `fast`.
    pub fast_until: u32,
    pub medium: Duration,
    /// First attempt that no longer uses `medium`.
    pub medium_until: u32,
    pub slow: Duration,
    /// Upper bound applied after tier selection.
    pub ceiling: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            fast: Duration::from_secs(2),
            fast_until: 15,
            medium: Duration::from_secs(5),
            medium_until: 60,
            slow: Duration::from_secs(10),
            ceiling: Duration::from_secs(60),
        }
    }
}

impl PollSchedule {
    /// Delay before the tick that follows `attempt`.
    ///
    /// Pure in `attempt`: successes and transport errors consume slots alike.
    pub fn interval_for(&self, attempt: u32) -> Duration {
        let tier = if attempt < self.fast_until {
            self.fast
        } else if attempt < self.medium_until {
            self.medium
        } else {
            self.slow
        };
        tier.min(self.ceiling)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub schedule: PollSchedule,
    /// Consecutive transport errors that end a job as a connectivity failure.
    pub max_consecutive_errors: u32,
    /// Master deadline, armed once the server has accepted the job.
    pub job_deadline: Duration,
    /// Wait before reloading history, so the worker's writes are visible.
    pub settle_grace: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            schedule: PollSchedule::default(),
            max_consecutive_errors: 3,
            job_deadline: Duration::from_secs(15 * 60),
            settle_grace: Duration::from_millis(500),
        }
    }
}
