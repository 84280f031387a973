use std::sync::Arc;
use std::time::Duration;

use jobdesk_core::{
    update, Effect, Msg, OperationKind, Phase, ProgressState, ProgressView, ReporterTimings,
    RunId,
};
use jobdesk_logging::{desk_debug, desk_info, desk_warn};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::sse::StreamItem;
use crate::{Backend, ProgressSink, TimerTask};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSettings {
    pub timings: ReporterTimings,
    /// Pause before reopening a failed progress stream.
    pub reconnect_delay: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            timings: ReporterTimings::default(),
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

enum DriverCommand {
    Dispatch {
        msg: Msg,
        ack: Option<oneshot::Sender<ProgressView>>,
    },
    Shutdown,
}

type CommandSender = mpsc::UnboundedSender<DriverCommand>;

/// Handle to the event loop that owns the reporter of one operation kind.
pub struct ReporterHandle {
    kind: OperationKind,
    cmd_tx: CommandSender,
    view_rx: watch::Receiver<ProgressView>,
    task: Option<JoinHandle<()>>,
}

impl ReporterHandle {
    /// Spawns the loop on the current tokio runtime.
    pub fn spawn(
        kind: OperationKind,
        settings: DriverSettings,
        backend: Arc<dyn Backend>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let state = ProgressState::with_timings(kind, settings.timings.clone());
        let (view_tx, view_rx) = watch::channel(state.view());

        let driver = Driver {
            state,
            tasks: OwnedTasks::default(),
            cmd_tx: cmd_tx.clone(),
            view_tx,
            backend,
            sink,
            reconnect_delay: settings.reconnect_delay,
        };
        let task = tokio::spawn(jobdesk_logging::with_operation(
            kind.label(),
            driver.run(cmd_rx),
        ));

        Self {
            kind,
            cmd_tx,
            view_rx,
            task: Some(task),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Queues a message without waiting for it to be applied.
    pub fn send(&self, msg: Msg) {
        let _ = self.cmd_tx.send(DriverCommand::Dispatch { msg, ack: None });
    }

    /// Applies a message and returns the view right after it.
    pub async fn dispatch(&self, msg: Msg) -> ProgressView {
        let (ack_tx, ack_rx) = oneshot::channel();
        let command = DriverCommand::Dispatch {
            msg,
            ack: Some(ack_tx),
        };
        if self.cmd_tx.send(command).is_err() {
            return self.view();
        }
        ack_rx.await.unwrap_or_else(|_| self.view())
    }

    pub fn view(&self) -> ProgressView {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressView> {
        self.view_rx.clone()
    }

    /// Waits until `run` has returned to idle or was replaced by a newer run.
    pub async fn wait_finished(&self, run: RunId) -> ProgressView {
        let mut rx = self.view_rx.clone();
        let result = rx
            .wait_for(|view| view.run != run || view.phase == Phase::Idle)
            .await
            .map(|view| view.clone());
        result.unwrap_or_else(|_| self.view())
    }

    /// Stops the loop and cancels every timer and subscription it owns.
    pub async fn shutdown(mut self) {
        let _ = self.cmd_tx.send(DriverCommand::Shutdown);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ReporterHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(DriverCommand::Shutdown);
    }
}

/// At most one task per purpose; assigning a new one drops (and cancels) the old one.
#[derive(Default)]
struct OwnedTasks {
    ticker: Option<TimerTask>,
    stream: Option<TimerTask>,
    forced_completion: Option<TimerTask>,
    hide: Option<TimerTask>,
}

impl OwnedTasks {
    fn cancel_all(&mut self) {
        self.ticker = None;
        self.stream = None;
        self.forced_completion = None;
        self.hide = None;
    }
}

struct Driver {
    state: ProgressState,
    tasks: OwnedTasks,
    cmd_tx: CommandSender,
    view_tx: watch::Sender<ProgressView>,
    backend: Arc<dyn Backend>,
    sink: Arc<dyn ProgressSink>,
    reconnect_delay: Duration,
}

impl Driver {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<DriverCommand>) {
        while let Some(command) = cmd_rx.recv().await {
            match command {
                DriverCommand::Dispatch { msg, ack } => {
                    let view = self.apply(msg);
                    if let Some(ack) = ack {
                        let _ = ack.send(view);
                    }
                }
                DriverCommand::Shutdown => break,
            }
        }
        self.tasks.cancel_all();
        desk_debug!("reporter loop stopped");
    }

    fn apply(&mut self, msg: Msg) -> ProgressView {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        for effect in effects {
            self.execute(effect);
        }
        let view = self.state.view();
        self.view_tx.send_replace(view.clone());
        view
    }

    fn execute(&mut self, effect: Effect) {
        let kind = self.state.kind();
        match effect {
            Effect::SetPercent(percent) => self.sink.set_percent(kind, percent),
            Effect::SetMessage(message) => self.sink.set_message(kind, &message),
            Effect::Notify { level, text } => self.sink.notify(level, &text),
            Effect::ShowTerminal { status, text } => {
                desk_info!("run {} ended {:?}: {}", self.state.run(), status, text);
                self.sink.show_terminal(kind, status, &text);
            }
            Effect::Hide => self.sink.hide(kind),
            Effect::StartTicker { run, interval } => {
                let tx = self.cmd_tx.clone();
                self.tasks.ticker = Some(TimerTask::every(interval, move || {
                    post(&tx, Msg::Tick { run })
                }));
            }
            Effect::StopTicker => self.tasks.ticker = None,
            Effect::OpenStream { run } => {
                desk_info!("subscribing to pushed progress for run {}", run);
                self.tasks.stream = Some(self.spawn_stream(run, Duration::ZERO));
            }
            Effect::Reconnect { run, attempt } => {
                desk_warn!("progress stream lost, reconnect attempt {}", attempt);
                self.tasks.stream = Some(self.spawn_stream(run, self.reconnect_delay));
            }
            Effect::CloseStream => self.tasks.stream = None,
            Effect::ScheduleForcedCompletion { run, after } => {
                desk_warn!("forcing completion of run {} in {:?}", run, after);
                let tx = self.cmd_tx.clone();
                self.tasks.forced_completion = Some(TimerTask::after(after, move || {
                    post(&tx, Msg::ForcedCompletionElapsed { run });
                }));
            }
            Effect::CancelForcedCompletion => self.tasks.forced_completion = None,
            Effect::ScheduleHide { run, after } => {
                let tx = self.cmd_tx.clone();
                self.tasks.hide = Some(TimerTask::after(after, move || {
                    post(&tx, Msg::HideElapsed { run });
                }));
            }
            Effect::CancelHide => self.tasks.hide = None,
        }
    }

    fn spawn_stream(&self, run: RunId, delay: Duration) -> TimerTask {
        TimerTask::spawn(jobdesk_logging::with_operation(
            self.state.kind().label(),
            pump_stream(self.backend.clone(), run, delay, self.cmd_tx.clone()),
        ))
    }
}

/// Returns false once the loop is gone.
fn post(tx: &CommandSender, msg: Msg) -> bool {
    tx.send(DriverCommand::Dispatch { msg, ack: None }).is_ok()
}

async fn pump_stream(backend: Arc<dyn Backend>, run: RunId, delay: Duration, tx: CommandSender) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let mut stream = match backend.subscribe_progress().await {
        Ok(stream) => stream,
        Err(err) => {
            post(
                &tx,
                Msg::StreamError {
                    run,
                    detail: err.to_string(),
                },
            );
            return;
        }
    };

    loop {
        let msg = match stream.next_item().await {
            Some(StreamItem::Event(progress)) => {
                let completed = progress.completed;
                if !post(&tx, Msg::ServerUpdate { run, progress }) || completed {
                    return;
                }
                continue;
            }
            Some(StreamItem::Malformed(detail)) => Msg::StreamMalformed { run, detail },
            Some(StreamItem::Failed(err)) => Msg::StreamError {
                run,
                detail: err.to_string(),
            },
            None => Msg::StreamError {
                run,
                detail: "stream ended before completion".to_string(),
            },
        };
        post(&tx, msg);
        return;
    }
}
