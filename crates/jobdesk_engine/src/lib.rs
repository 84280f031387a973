//! Jobdesk engine: backend client, progress stream and effect execution.
mod client;
mod driver;
mod operations;
mod persist;
mod sink;
mod sse;
mod timer;
mod types;

pub use client::{Backend, ClientSettings, EndpointPaths, ReqwestBackend, CSRF_HEADER};
pub use driver::{DriverSettings, ReporterHandle};
pub use operations::{Operations, DEFAULT_MAX_ITEMS};
pub use persist::{ensure_parent_dir, write_json_atomically, PersistError};
pub use sink::{LogSink, ProgressSink};
pub use sse::{ProgressStream, SseDecoder, StreamItem};
pub use timer::TimerTask;
pub use types::{
    ApiError, BulkApplyResponse, FailureKind, FetchResponse, OperationError,
    ProgressEventPayload, UpdateStatus,
};
