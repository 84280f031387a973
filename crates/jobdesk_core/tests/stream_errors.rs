use std::time::Duration;

use jobdesk_core::{
    update, Effect, EstimatePlan, Msg, NotifyLevel, OperationKind, Phase, ProgressState,
    ServerProgress, TerminalStatus,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    jobdesk_logging::initialize_for_tests();
}

fn monitoring() -> ProgressState {
    let state = ProgressState::new(OperationKind::BulkApply);
    let (state, _) = update(state, Msg::Start(EstimatePlan::bulk_initial(3)));
    let (state, _) = update(
        state,
        Msg::Monitor {
            run: 1,
            plan: EstimatePlan::bulk_monitor(),
        },
    );
    state
}

fn fail(state: ProgressState) -> (ProgressState, Vec<Effect>) {
    let run = state.run();
    update(
        state,
        Msg::StreamError {
            run,
            detail: "connection refused".to_string(),
        },
    )
}

fn is_fallback_notice(effect: &Effect) -> bool {
    matches!(
        effect,
        Effect::Notify {
            level: NotifyLevel::Warning,
            ..
        }
    )
}

#[test]
fn errors_below_bound_reconnect_with_visible_count() {
    init_logging();
    let (state, effects) = fail(monitoring());
    assert_eq!(
        effects,
        vec![
            Effect::SetMessage("Retrying connection (1/3)...".to_string()),
            Effect::Reconnect { run: 1, attempt: 1 },
        ]
    );
    let (_state, effects) = fail(state);
    assert_eq!(
        effects,
        vec![
            Effect::SetMessage("Retrying connection (2/3)...".to_string()),
            Effect::Reconnect { run: 1, attempt: 2 },
        ]
    );
}

#[test]
fn third_consecutive_error_falls_back_exactly_once() {
    init_logging();
    let mut state = monitoring();
    let mut notices = 0;
    for _ in 0..6 {
        let (next, effects) = fail(state);
        state = next;
        notices += effects.iter().filter(|e| is_fallback_notice(e)).count();
    }
    assert_eq!(notices, 1);
    assert_eq!(
        state.message(),
        "Connection lost; processing continues in the background..."
    );
    assert_eq!(state.phase(), Phase::Estimating);
}

#[test]
fn give_up_schedules_forced_completion_and_keeps_estimating() {
    init_logging();
    let (state, _) = fail(monitoring());
    let (state, _) = fail(state);
    let (state, effects) = fail(state);

    assert_eq!(effects[0], Effect::CloseStream);
    assert_eq!(
        effects.last(),
        Some(&Effect::ScheduleForcedCompletion {
            run: 1,
            after: Duration::from_secs(60),
        })
    );
    // The monitor estimate was never interrupted, so no new ticker is needed.
    assert!(state.is_estimating());
    assert!(!effects
        .iter()
        .any(|e| matches!(e, Effect::StartTicker { .. })));

    let (state, effects) = update(state, Msg::ForcedCompletionElapsed { run: 1 });
    assert_eq!(state.phase(), Phase::Completed);
    assert_eq!(state.percent(), 100);
    assert!(effects.contains(&Effect::ShowTerminal {
        status: TerminalStatus::Success,
        text: "Treating the operation as completed".to_string(),
    }));
}

#[test]
fn give_up_after_live_updates_resumes_estimate() {
    init_logging();
    let state = monitoring();
    let (state, _) = update(
        state,
        Msg::ServerUpdate {
            run: 1,
            progress: ServerProgress {
                percent: 40,
                ..ServerProgress::default()
            },
        },
    );
    assert!(!state.is_estimating());

    let (state, _) = fail(state);
    let (state, _) = fail(state);
    let (state, effects) = fail(state);

    assert_eq!(state.phase(), Phase::Live);
    assert!(state.is_estimating());
    assert!(effects.contains(&Effect::StartTicker {
        run: 1,
        interval: Duration::from_millis(100),
    }));
}

#[test]
fn successful_event_resets_error_count() {
    init_logging();
    let (state, _) = fail(monitoring());
    let (state, _) = fail(state);
    let (state, _) = update(
        state,
        Msg::ServerUpdate {
            run: 1,
            progress: ServerProgress {
                percent: 15,
                ..ServerProgress::default()
            },
        },
    );
    let (_state, effects) = fail(state);
    assert_eq!(effects[1], Effect::Reconnect { run: 1, attempt: 1 });
}

#[test]
fn terminal_event_cancels_pending_forced_completion() {
    init_logging();
    let (state, _) = fail(monitoring());
    let (state, _) = fail(state);
    let (state, _) = fail(state);

    let (state, effects) = update(
        state,
        Msg::Finished {
            run: 1,
            status: TerminalStatus::Success,
            message: None,
        },
    );
    assert!(effects.contains(&Effect::CancelForcedCompletion));

    let (_state, effects) = update(state, Msg::ForcedCompletionElapsed { run: 1 });
    assert!(effects.is_empty());
}
