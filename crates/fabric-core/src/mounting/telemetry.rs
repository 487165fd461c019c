use std::time::{Duration, Instant};

/// Timestamps of the phases a revision goes through on its way to the
/// screen. Each phase is recorded by whoever performs it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionTelemetry {
    commit_start: Option<Instant>,
    commit_end: Option<Instant>,
    diff_start: Option<Instant>,
    diff_end: Option<Instant>,
    mount_start: Option<Instant>,
    mount_end: Option<Instant>,
}

fn span(start: Option<Instant>, end: Option<Instant>) -> Option<Duration> {
    Some(end?.saturating_duration_since(start?))
}

impl TransactionTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn will_commit(&mut self) {
        self.commit_start = Some(Instant::now());
    }

    pub fn did_commit(&mut self) {
        self.commit_end = Some(Instant::now());
    }

    pub fn will_diff(&mut self) {
        self.diff_start = Some(Instant::now());
    }

    pub fn did_diff(&mut self) {
        self.diff_end = Some(Instant::now());
    }

    pub fn will_mount(&mut self) {
        self.mount_start = Some(Instant::now());
    }

    pub fn did_mount(&mut self) {
        self.mount_end = Some(Instant::now());
    }

    pub fn commit_start_time(&self) -> Option<Instant> {
        self.commit_start
    }

    pub fn commit_end_time(&self) -> Option<Instant> {
        self.commit_end
    }

    pub fn diff_start_time(&self) -> Option<Instant> {
        self.diff_start
    }

    pub fn mount_start_time(&self) -> Option<Instant> {
        self.mount_start
    }

    pub fn mount_end_time(&self) -> Option<Instant> {
        self.mount_end
    }

    pub fn commit_duration(&self) -> Option<Duration> {
        span(self.commit_start, self.commit_end)
    }

    pub fn diff_duration(&self) -> Option<Duration> {
        span(self.diff_start, self.diff_end)
    }

    pub fn mount_duration(&self) -> Option<Duration> {
        span(self.mount_start, self.mount_end)
    }
}
