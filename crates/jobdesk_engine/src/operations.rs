use std::sync::Arc;

use jobdesk_core::{
    EstimatePlan, Msg, NotifyLevel, OperationKind, ProgressView, TerminalStatus,
};
use jobdesk_logging::{desk_info, desk_warn, with_operation};

use crate::{
    Backend, DriverSettings, OperationError, ProgressSink, ReporterHandle, UpdateStatus,
};

/// Number of listings requested when the caller does not say.
pub const DEFAULT_MAX_ITEMS: u32 = 20;

/// The user-triggered flows, each with its own reporter.
pub struct Operations {
    backend: Arc<dyn Backend>,
    sink: Arc<dyn ProgressSink>,
    fetch: ReporterHandle,
    bulk: ReporterHandle,
}

impl Operations {
    /// Must be called inside a tokio runtime.
    pub fn new(
        backend: Arc<dyn Backend>,
        sink: Arc<dyn ProgressSink>,
        settings: DriverSettings,
    ) -> Self {
        let fetch = ReporterHandle::spawn(
            OperationKind::FetchNewData,
            settings.clone(),
            backend.clone(),
            sink.clone(),
        );
        let bulk = ReporterHandle::spawn(
            OperationKind::BulkApply,
            settings,
            backend.clone(),
            sink.clone(),
        );
        Self {
            backend,
            sink,
            fetch,
            bulk,
        }
    }

    pub fn reporter(&self, kind: OperationKind) -> &ReporterHandle {
        match kind {
            OperationKind::FetchNewData => &self.fetch,
            OperationKind::BulkApply => &self.bulk,
        }
    }

    /// One-shot check; the result is reported as a notification only.
    pub async fn check_updates(&self) -> Result<UpdateStatus, OperationError> {
        with_operation("check-updates", self.run_check_updates()).await
    }

    /// Runs the crawler server-side and returns the fetched jobs.
    pub async fn fetch_new_data(
        &self,
        max_items: u32,
    ) -> Result<Vec<serde_json::Value>, OperationError> {
        with_operation(
            OperationKind::FetchNewData.label(),
            self.run_fetch(max_items),
        )
        .await
    }

    /// Submits applications and follows pushed progress until the run ends.
    pub async fn bulk_apply(&self, urls: Vec<String>) -> Result<ProgressView, OperationError> {
        with_operation(OperationKind::BulkApply.label(), self.run_bulk_apply(urls)).await
    }

    async fn run_check_updates(&self) -> Result<UpdateStatus, OperationError> {
        let status = match self.backend.check_updates().await {
            Ok(status) => status,
            Err(err) => {
                desk_warn!("update check failed: {}", err);
                self.sink
                    .notify(NotifyLevel::Error, &format!("Update check failed: {err}"));
                return Err(err.into());
            }
        };

        if status.update_available {
            let text = status.message.clone().unwrap_or_else(|| {
                format!(
                    "Version {} is available (current: {})",
                    status.latest_version.as_deref().unwrap_or("unknown"),
                    status.current_version.as_deref().unwrap_or("unknown"),
                )
            });
            self.sink.notify(NotifyLevel::Info, &text);
            Ok(status)
        } else if status.is_success() {
            self.sink
                .notify(NotifyLevel::Success, "You are on the latest version");
            Ok(status)
        } else {
            let reason = if status.status.is_empty() {
                status
                    .message
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string())
            } else {
                status.status.clone()
            };
            self.sink
                .notify(NotifyLevel::Error, &format!("Error: {reason}"));
            Err(OperationError::Rejected(reason))
        }
    }

    async fn run_fetch(&self, max_items: u32) -> Result<Vec<serde_json::Value>, OperationError> {
        let reporter = &self.fetch;
        reporter
            .dispatch(Msg::Announce {
                level: NotifyLevel::Info,
                text: "Fetching new data...".to_string(),
            })
            .await;
        let started = reporter
            .dispatch(Msg::Start(EstimatePlan::fetch(max_items)))
            .await;

        match self.backend.fetch_new_data(Some(max_items)).await {
            Ok(response) if response.is_success() => {
                let count = response.jobs.len();
                let message = response
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Fetched {count} jobs"));
                reporter
                    .dispatch(Msg::Finished {
                        run: started.run,
                        status: TerminalStatus::Success,
                        message: Some(message),
                    })
                    .await;
                let view = reporter.wait_finished(started.run).await;
                desk_info!("fetch run {} returned {} jobs", view.run, count);
                Ok(response.jobs)
            }
            Ok(response) => {
                let reason = response
                    .message
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string());
                reporter
                    .dispatch(Msg::Finished {
                        run: started.run,
                        status: TerminalStatus::Failure,
                        message: Some(reason.clone()),
                    })
                    .await;
                reporter.wait_finished(started.run).await;
                Err(OperationError::Rejected(reason))
            }
            Err(err) => {
                reporter
                    .dispatch(Msg::RequestFailed {
                        run: started.run,
                        message: err.to_string(),
                    })
                    .await;
                reporter.wait_finished(started.run).await;
                Err(err.into())
            }
        }
    }

    async fn run_bulk_apply(&self, urls: Vec<String>) -> Result<ProgressView, OperationError> {
        let reporter = &self.bulk;
        if urls.is_empty() {
            reporter
                .dispatch(Msg::Announce {
                    level: NotifyLevel::Warning,
                    text: "No jobs selected to apply to".to_string(),
                })
                .await;
            return Err(OperationError::NoTargets);
        }

        reporter
            .dispatch(Msg::Announce {
                level: NotifyLevel::Info,
                text: format!("Applying to {} jobs...", urls.len()),
            })
            .await;
        let started = reporter
            .dispatch(Msg::Start(EstimatePlan::bulk_initial(urls.len())))
            .await;

        match self.backend.bulk_apply(&urls).await {
            Ok(response) if response.is_success() => {
                let text = response
                    .message
                    .clone()
                    .unwrap_or_else(|| "Bulk apply started".to_string());
                reporter
                    .dispatch(Msg::Announce {
                        level: NotifyLevel::Success,
                        text,
                    })
                    .await;
                reporter
                    .dispatch(Msg::Monitor {
                        run: started.run,
                        plan: EstimatePlan::bulk_monitor(),
                    })
                    .await;
                let view = reporter.wait_finished(started.run).await;
                match view.outcome {
                    Some(TerminalStatus::Success) => Ok(view),
                    _ => Err(OperationError::Unsuccessful),
                }
            }
            Ok(response) => {
                let reason = response
                    .message
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string());
                reporter
                    .dispatch(Msg::RequestFailed {
                        run: started.run,
                        message: reason.clone(),
                    })
                    .await;
                Err(OperationError::Rejected(reason))
            }
            Err(err) => {
                reporter
                    .dispatch(Msg::RequestFailed {
                        run: started.run,
                        message: err.to_string(),
                    })
                    .await;
                Err(err.into())
            }
        }
    }

    pub async fn shutdown(self) {
        self.fetch.shutdown().await;
        self.bulk.shutdown().await;
    }
}
