use std::time::Duration;

use crate::estimator::Estimator;
use crate::view_model::ProgressView;
use crate::EstimatePlan;

/// Identifies one run of an operation. Timer and stream messages carry it so
/// that callbacks belonging to a replaced run are ignored.
pub type RunId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperationKind {
    #[default]
    FetchNewData,
    BulkApply,
}

impl OperationKind {
    pub fn label(self) -> &'static str {
        match self {
            OperationKind::FetchNewData => "fetch",
            OperationKind::BulkApply => "bulk-apply",
        }
    }

    /// Status line shown while the percent comes from the local estimate.
    pub fn estimate_message(self, percent: u8) -> &'static str {
        match self {
            OperationKind::FetchNewData => match percent {
                0..=29 => "Fetching new listings...",
                30..=59 => "Analyzing listings...",
                60..=89 => "Sorting listings...",
                _ => "Almost there...",
            },
            OperationKind::BulkApply => match percent {
                0..=29 => "Starting applications...",
                30..=59 => "Submitting application data...",
                _ => "Applying...",
            },
        }
    }

    pub(crate) fn terminal_text(self, status: TerminalStatus, message: Option<&str>) -> String {
        match (self, status) {
            (OperationKind::FetchNewData, TerminalStatus::Success) => message
                .unwrap_or("New data fetched")
                .to_string(),
            (OperationKind::FetchNewData, TerminalStatus::Failure) => {
                format!("Error: {}", message.unwrap_or("unknown error"))
            }
            (OperationKind::BulkApply, TerminalStatus::Success) => {
                "Bulk apply completed".to_string()
            }
            (OperationKind::BulkApply, TerminalStatus::Failure) => format!(
                "Bulk apply failed: {}",
                message.unwrap_or("unknown error")
            ),
        }
    }

    pub(crate) fn failure_text(self, message: &str) -> String {
        match self {
            OperationKind::FetchNewData => format!("Failed to fetch data: {message}"),
            OperationKind::BulkApply => format!("Bulk apply failed: {message}"),
        }
    }

    fn hide_delay(self, timings: &ReporterTimings) -> Duration {
        match self {
            OperationKind::FetchNewData => timings.fetch_hide_delay,
            OperationKind::BulkApply => timings.bulk_hide_delay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Estimating,
    Live,
    Completed,
    Failed,
}

impl Phase {
    /// Percent may still move in this phase.
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Estimating | Phase::Live)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    Success,
    Failure,
}

/// Authoritative progress pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerProgress {
    pub percent: u8,
    pub message: Option<String>,
    pub completed: bool,
    /// `None` when the server sent no recognised status.
    pub status: Option<TerminalStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterTimings {
    pub tick_interval: Duration,
    pub fetch_hide_delay: Duration,
    pub bulk_hide_delay: Duration,
    pub forced_completion_after: Duration,
    /// Consecutive stream failures tolerated before giving up on pushed progress.
    pub max_stream_attempts: u32,
}

impl Default for ReporterTimings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            fetch_hide_delay: Duration::from_millis(1500),
            bulk_hide_delay: Duration::from_secs(3),
            forced_completion_after: Duration::from_secs(60),
            max_stream_attempts: 3,
        }
    }
}

/// State of one operation kind. Only [`crate::update`] mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    kind: OperationKind,
    timings: ReporterTimings,
    run: RunId,
    percent: u8,
    phase: Phase,
    message: String,
    outcome: Option<TerminalStatus>,
    pub(crate) estimator: Option<Estimator>,
    pub(crate) fallback: Option<EstimatePlan>,
    pub(crate) stream_open: bool,
    pub(crate) stream_errors: u32,
    pub(crate) forced_pending: bool,
    pub(crate) hide_pending: bool,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new(OperationKind::default())
    }
}

impl ProgressState {
    pub fn new(kind: OperationKind) -> Self {
        Self::with_timings(kind, ReporterTimings::default())
    }

    pub fn with_timings(kind: OperationKind, timings: ReporterTimings) -> Self {
        Self {
            kind,
            timings,
            run: 0,
            percent: 0,
            phase: Phase::Idle,
            message: String::new(),
            outcome: None,
            estimator: None,
            fallback: None,
            stream_open: false,
            stream_errors: 0,
            forced_pending: false,
            hide_pending: false,
        }
    }

    pub fn view(&self) -> ProgressView {
        ProgressView {
            kind: self.kind,
            run: self.run,
            percent: self.percent,
            phase: self.phase,
            message: self.message.clone(),
            outcome: self.outcome,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn run(&self) -> RunId {
        self.run
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timings(&self) -> &ReporterTimings {
        &self.timings
    }

    /// True while the local estimator is advancing.
    pub fn is_estimating(&self) -> bool {
        self.estimator.is_some()
    }

    pub(crate) fn hide_delay(&self) -> Duration {
        self.kind.hide_delay(&self.timings)
    }

    pub(crate) fn begin_run(&mut self) {
        self.run += 1;
        self.percent = 0;
        self.phase = Phase::Estimating;
        self.message = self.kind.estimate_message(0).to_string();
        self.outcome = None;
        self.estimator = None;
        self.fallback = None;
        self.stream_open = false;
        self.stream_errors = 0;
        self.forced_pending = false;
        self.hide_pending = false;
    }

    /// Returns true when the displayed percent changed.
    pub(crate) fn raise_percent(&mut self, percent: u8) -> bool {
        let percent = percent.min(100);
        if percent > self.percent {
            self.percent = percent;
            true
        } else {
            false
        }
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub(crate) fn set_outcome(&mut self, outcome: TerminalStatus) {
        self.outcome = Some(outcome);
    }

    /// Back to idle; the run id and outcome survive so waiters can read them.
    pub(crate) fn reset_to_idle(&mut self) {
        self.percent = 0;
        self.phase = Phase::Idle;
        self.message.clear();
        self.estimator = None;
        self.fallback = None;
        self.stream_open = false;
        self.stream_errors = 0;
        self.forced_pending = false;
        self.hide_pending = false;
    }
}
