//! Jobdesk core: pure progress-reporter state machine and view-model helpers.
mod effect;
mod estimator;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, NotifyLevel};
pub use estimator::{display_step, EstimatePlan, MAX_ESTIMATE_CAP};
pub use msg::Msg;
pub use state::{
    OperationKind, Phase, ProgressState, ReporterTimings, RunId, ServerProgress, TerminalStatus,
};
pub use update::update;
pub use view_model::ProgressView;
