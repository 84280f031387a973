use crate::{EstimatePlan, NotifyLevel, RunId, ServerProgress, TerminalStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User triggered the operation; replaces any run still in flight.
    Start(EstimatePlan),
    /// Server accepted the job: subscribe to pushed progress and run a fallback estimate.
    Monitor { run: RunId, plan: EstimatePlan },
    /// Estimator timer fired.
    Tick { run: RunId },
    /// Decoded event from the progress stream.
    ServerUpdate { run: RunId, progress: ServerProgress },
    /// Stream could not be opened, failed mid-way, or ended without a terminal event.
    StreamError { run: RunId, detail: String },
    /// Stream delivered a payload that could not be decoded.
    StreamMalformed { run: RunId, detail: String },
    /// One-shot request returned a result.
    Finished {
        run: RunId,
        status: TerminalStatus,
        message: Option<String>,
    },
    /// One-shot request failed in transport or was rejected by the server.
    RequestFailed { run: RunId, message: String },
    /// The 60 second fallback fired without a terminal signal.
    ForcedCompletionElapsed { run: RunId },
    /// The post-terminal hide delay elapsed.
    HideElapsed { run: RunId },
    /// Pass-through notification, ordered with the other effects of the run.
    Announce { level: NotifyLevel, text: String },
}
