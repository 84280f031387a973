use crate::{OperationKind, Phase, RunId, TerminalStatus};

/// Snapshot of a reporter, published after every processed message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressView {
    pub kind: OperationKind,
    pub run: RunId,
    pub percent: u8,
    pub phase: Phase,
    pub message: String,
    /// Terminal status of the current run, kept after the reset to idle.
    pub outcome: Option<TerminalStatus>,
}

impl ProgressView {
    pub fn is_visible(&self) -> bool {
        self.phase != Phase::Idle
    }
}
