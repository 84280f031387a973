use jobdesk_core::{NotifyLevel, OperationKind, TerminalStatus};
use jobdesk_logging::{desk_error, desk_info, desk_warn};

/// Presentation layer for progress indicators and transient notifications.
pub trait ProgressSink: Send + Sync {
    fn set_percent(&self, kind: OperationKind, percent: u8);
    fn set_message(&self, kind: OperationKind, message: &str);
    fn show_terminal(&self, kind: OperationKind, status: TerminalStatus, text: &str);
    fn hide(&self, kind: OperationKind);
    fn notify(&self, level: NotifyLevel, text: &str);
}

/// Sink that only writes to the log. Used when no terminal is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn set_percent(&self, kind: OperationKind, percent: u8) {
        desk_info!("{} {}%", kind.label(), percent);
    }

    fn set_message(&self, kind: OperationKind, message: &str) {
        desk_info!("{} {}", kind.label(), message);
    }

    fn show_terminal(&self, kind: OperationKind, status: TerminalStatus, text: &str) {
        match status {
            TerminalStatus::Success => desk_info!("{} finished: {}", kind.label(), text),
            TerminalStatus::Failure => desk_error!("{} failed: {}", kind.label(), text),
        }
    }

    fn hide(&self, _kind: OperationKind) {}

    fn notify(&self, level: NotifyLevel, text: &str) {
        match level {
            NotifyLevel::Info | NotifyLevel::Success => desk_info!("{}", text),
            NotifyLevel::Warning => desk_warn!("{}", text),
            NotifyLevel::Error => desk_error!("{}", text),
        }
    }
}
