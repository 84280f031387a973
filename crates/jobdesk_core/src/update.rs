use crate::estimator::Estimator;
use crate::{
    EstimatePlan, Effect, Msg, NotifyLevel, OperationKind, Phase, ProgressState, ServerProgress,
    TerminalStatus,
};

const FALLBACK_MESSAGE: &str = "Connection lost; processing continues in the background...";
const FALLBACK_NOTICE: &str = "Could not read progress, but processing continues";
const FORCED_COMPLETION_TEXT: &str = "Treating the operation as completed";
const MALFORMED_MESSAGE: &str = "An error occurred while reading progress";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: ProgressState, msg: Msg) -> (ProgressState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start(plan) => {
            let mut effects = cancel_run(&mut state);
            state.begin_run();
            effects.push(Effect::SetPercent(0));
            effects.push(Effect::SetMessage(state.message().to_string()));
            effects.extend(start_estimator(&mut state, plan));
            effects
        }
        Msg::Monitor { run, plan } => {
            if run != state.run() || !state.phase().is_active() || state.stream_open {
                return (state, Vec::new());
            }
            state.stream_open = true;
            state.stream_errors = 0;
            state.fallback = Some(plan);
            let mut effects = vec![Effect::OpenStream { run: state.run() }];
            if state.phase() == Phase::Estimating {
                effects.extend(start_estimator(&mut state, plan));
            }
            effects
        }
        Msg::Tick { run } => {
            if run != state.run() || !state.phase().is_active() {
                return (state, Vec::new());
            }
            tick(&mut state)
        }
        Msg::ServerUpdate { run, progress } => {
            if run != state.run() || !state.phase().is_active() || !state.stream_open {
                return (state, Vec::new());
            }
            server_update(&mut state, progress)
        }
        Msg::StreamError { run, .. } => {
            if run != state.run() || !state.phase().is_active() || !state.stream_open {
                return (state, Vec::new());
            }
            stream_error(&mut state)
        }
        Msg::StreamMalformed { run, detail } => {
            if run != state.run() || !state.phase().is_active() || !state.stream_open {
                return (state, Vec::new());
            }
            let mut effects = stop_activity(&mut state);
            state.set_phase(Phase::Failed);
            state.set_outcome(TerminalStatus::Failure);
            state.set_message(MALFORMED_MESSAGE);
            effects.push(Effect::SetMessage(MALFORMED_MESSAGE.to_string()));
            effects.push(Effect::ShowTerminal {
                status: TerminalStatus::Failure,
                text: format!("Malformed progress event: {detail}"),
            });
            effects.push(schedule_hide(&mut state));
            effects
        }
        Msg::Finished {
            run,
            status,
            message,
        } => {
            if run != state.run() {
                return (state, Vec::new());
            }
            let text = state.kind().terminal_text(status, message.as_deref());
            complete(&mut state, status, text)
        }
        Msg::RequestFailed { run, message } => {
            if run != state.run() || !state.phase().is_active() {
                return (state, Vec::new());
            }
            request_failed(&mut state, &message)
        }
        Msg::ForcedCompletionElapsed { run } => {
            if run != state.run() || !state.forced_pending {
                return (state, Vec::new());
            }
            state.forced_pending = false;
            complete(
                &mut state,
                TerminalStatus::Success,
                FORCED_COMPLETION_TEXT.to_string(),
            )
        }
        Msg::HideElapsed { run } => {
            if run != state.run() || !state.hide_pending {
                return (state, Vec::new());
            }
            state.reset_to_idle();
            vec![Effect::Hide]
        }
        Msg::Announce { level, text } => vec![Effect::Notify { level, text }],
    };

    (state, effects)
}

/// Fetch shows the failure at 100% like any other terminal state.
/// Bulk apply drops its indicator at once.
fn request_failed(state: &mut ProgressState, message: &str) -> Vec<Effect> {
    let notice = Effect::Notify {
        level: NotifyLevel::Error,
        text: state.kind().failure_text(message),
    };
    match state.kind() {
        OperationKind::FetchNewData => {
            let text = state
                .kind()
                .terminal_text(TerminalStatus::Failure, Some(message));
            let mut effects = complete(state, TerminalStatus::Failure, text);
            effects.push(notice);
            effects
        }
        OperationKind::BulkApply => {
            let mut effects = stop_activity(state);
            effects.push(notice);
            effects.push(Effect::Hide);
            state.set_outcome(TerminalStatus::Failure);
            state.reset_to_idle();
            effects
        }
    }
}

fn start_estimator(state: &mut ProgressState, plan: EstimatePlan) -> Vec<Effect> {
    if plan.cap <= state.percent() {
        return Vec::new();
    }
    state.estimator = Some(Estimator::new(state.percent(), plan));
    vec![Effect::StartTicker {
        run: state.run(),
        interval: state.timings().tick_interval,
    }]
}

fn tick(state: &mut ProgressState) -> Vec<Effect> {
    let step = state.timings().tick_interval;
    let Some(estimator) = state.estimator.as_mut() else {
        return Vec::new();
    };
    let shown = estimator.advance(step);
    let finished = estimator.is_finished();

    let mut effects = Vec::new();
    if state.raise_percent(shown) {
        effects.push(Effect::SetPercent(shown));
        let message = state.kind().estimate_message(shown);
        if message != state.message() {
            state.set_message(message);
            effects.push(Effect::SetMessage(message.to_string()));
        }
    }
    if finished {
        state.estimator = None;
        effects.push(Effect::StopTicker);
    }
    effects
}

fn server_update(state: &mut ProgressState, progress: ServerProgress) -> Vec<Effect> {
    let mut effects = Vec::new();
    state.stream_errors = 0;
    state.set_phase(Phase::Live);
    if state.estimator.take().is_some() {
        effects.push(Effect::StopTicker);
    }
    if state.raise_percent(progress.percent) {
        effects.push(Effect::SetPercent(state.percent()));
    }
    if let Some(message) = &progress.message {
        state.set_message(message.clone());
        effects.push(Effect::SetMessage(message.clone()));
    }
    if progress.completed {
        let status = progress.status.unwrap_or(TerminalStatus::Success);
        let text = state
            .kind()
            .terminal_text(status, progress.message.as_deref());
        effects.extend(complete(state, status, text));
    }
    effects
}

fn stream_error(state: &mut ProgressState) -> Vec<Effect> {
    state.stream_errors += 1;
    let attempts = state.timings().max_stream_attempts;
    if state.stream_errors < attempts {
        let message = format!(
            "Retrying connection ({}/{})...",
            state.stream_errors, attempts
        );
        state.set_message(message.clone());
        return vec![
            Effect::SetMessage(message),
            Effect::Reconnect {
                run: state.run(),
                attempt: state.stream_errors,
            },
        ];
    }

    state.stream_open = false;
    state.set_message(FALLBACK_MESSAGE);
    let mut effects = vec![
        Effect::CloseStream,
        Effect::SetMessage(FALLBACK_MESSAGE.to_string()),
        Effect::Notify {
            level: NotifyLevel::Warning,
            text: FALLBACK_NOTICE.to_string(),
        },
    ];
    if state.estimator.is_none() {
        if let Some(plan) = state.fallback {
            effects.extend(start_estimator(state, plan));
        }
    }
    state.forced_pending = true;
    effects.push(Effect::ScheduleForcedCompletion {
        run: state.run(),
        after: state.timings().forced_completion_after,
    });
    effects
}

fn complete(state: &mut ProgressState, status: TerminalStatus, text: String) -> Vec<Effect> {
    if !state.phase().is_active() {
        return Vec::new();
    }
    let mut effects = stop_activity(state);
    if state.raise_percent(100) {
        effects.push(Effect::SetPercent(100));
    }
    state.set_phase(match status {
        TerminalStatus::Success => Phase::Completed,
        TerminalStatus::Failure => Phase::Failed,
    });
    state.set_outcome(status);
    state.set_message(text.clone());
    effects.push(Effect::ShowTerminal { status, text });
    effects.push(schedule_hide(state));
    effects
}

fn schedule_hide(state: &mut ProgressState) -> Effect {
    state.hide_pending = true;
    Effect::ScheduleHide {
        run: state.run(),
        after: state.hide_delay(),
    }
}

/// Stops the ticker, the stream and the forced-completion timer of the run.
fn stop_activity(state: &mut ProgressState) -> Vec<Effect> {
    let mut effects = Vec::new();
    if state.estimator.take().is_some() {
        effects.push(Effect::StopTicker);
    }
    if state.stream_open {
        state.stream_open = false;
        effects.push(Effect::CloseStream);
    }
    if state.forced_pending {
        state.forced_pending = false;
        effects.push(Effect::CancelForcedCompletion);
    }
    effects
}

/// Everything of the previous run, including a pending hide.
fn cancel_run(state: &mut ProgressState) -> Vec<Effect> {
    let mut effects = stop_activity(state);
    if state.hide_pending {
        state.hide_pending = false;
        effects.push(Effect::CancelHide);
    }
    effects
}
