use std::time::Duration;

use crate::{RunId, TerminalStatus};

/// Side effects requested by [`crate::update`]. The driver executes them in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Redraw the indicator at this percent.
    SetPercent(u8),
    /// Replace the status line under the indicator.
    SetMessage(String),
    /// Transient notification (toast).
    Notify { level: NotifyLevel, text: String },
    /// Terminal notification for the run.
    ShowTerminal { status: TerminalStatus, text: String },
    /// Remove the indicator from view.
    Hide,
    StartTicker { run: RunId, interval: Duration },
    StopTicker,
    OpenStream { run: RunId },
    Reconnect { run: RunId, attempt: u32 },
    CloseStream,
    ScheduleForcedCompletion { run: RunId, after: Duration },
    CancelForcedCompletion,
    ScheduleHide { run: RunId, after: Duration },
    CancelHide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}
