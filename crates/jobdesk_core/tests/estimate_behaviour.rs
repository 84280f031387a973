use std::sync::Once;
use std::time::Duration;

use jobdesk_core::{
    update, Effect, EstimatePlan, Msg, OperationKind, Phase, ProgressState, TerminalStatus,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(jobdesk_logging::initialize_for_tests);
}

fn started(plan: EstimatePlan) -> (ProgressState, Vec<Effect>) {
    update(ProgressState::new(OperationKind::FetchNewData), Msg::Start(plan))
}

fn tick_n(mut state: ProgressState, n: usize) -> (ProgressState, Vec<u8>) {
    let mut shown = Vec::new();
    for _ in 0..n {
        let run = state.run();
        let (next, effects) = update(state, Msg::Tick { run });
        state = next;
        shown.extend(effects.iter().filter_map(|effect| match effect {
            Effect::SetPercent(p) => Some(*p),
            _ => None,
        }));
    }
    (state, shown)
}

#[test]
fn start_resets_and_schedules_ticker() {
    init_logging();
    let (state, effects) = started(EstimatePlan::new(Duration::from_secs(5), 99));

    assert_eq!(state.phase(), Phase::Estimating);
    assert_eq!(state.percent(), 0);
    assert_eq!(state.run(), 1);
    assert_eq!(
        effects,
        vec![
            Effect::SetPercent(0),
            Effect::SetMessage("Fetching new listings...".to_string()),
            Effect::StartTicker {
                run: 1,
                interval: Duration::from_millis(100),
            },
        ]
    );
}

#[test]
fn ten_ticks_increase_strictly_in_steps_of_five() {
    init_logging();
    let (state, _) = started(EstimatePlan::new(Duration::from_secs(1), 99));
    let (state, shown) = tick_n(state, 10);

    assert_eq!(shown, vec![5, 15, 25, 35, 45, 55, 65, 75, 85, 95]);
    assert!(shown.windows(2).all(|w| w[0] < w[1]));
    assert!(shown.iter().all(|p| p % 5 == 0));
    assert_eq!(state.percent(), 95);
}

#[test]
fn estimate_stays_below_cap_after_duration() {
    init_logging();
    let (state, _) = started(EstimatePlan::new(Duration::from_millis(5000), 99));
    // 50 ticks is exactly 5000 ms, then keep ticking past the deadline.
    let (state, shown) = tick_n(state, 80);

    assert!((95..=99).contains(&state.percent()));
    assert!(shown.iter().all(|p| *p < 100));
    assert_eq!(state.phase(), Phase::Estimating);
    assert!(!state.is_estimating());
}

#[test]
fn ticker_stops_once_segment_is_done() {
    init_logging();
    let (state, _) = started(EstimatePlan::new(Duration::from_millis(200), 80));
    let (state, effects) = update(state, Msg::Tick { run: 1 });
    assert_eq!(
        effects,
        vec![
            Effect::SetPercent(40),
            Effect::SetMessage("Analyzing listings...".to_string()),
        ]
    );
    let (_state, effects) = update(state, Msg::Tick { run: 1 });
    assert_eq!(
        effects,
        vec![
            Effect::SetPercent(80),
            Effect::SetMessage("Sorting listings...".to_string()),
            Effect::StopTicker,
        ]
    );
}

#[test]
fn ticks_without_visible_change_emit_nothing() {
    init_logging();
    // 99% over 10 s moves 0.99% per tick, so the first four ticks stay at 0.
    let (state, _) = started(EstimatePlan::new(Duration::from_secs(10), 99));
    let (state, shown) = tick_n(state, 4);
    assert!(shown.is_empty());
    let (_state, shown) = tick_n(state, 2);
    assert_eq!(shown, vec![5]);
}

#[test]
fn stale_tick_is_ignored() {
    init_logging();
    let plan = EstimatePlan::new(Duration::from_secs(1), 99);
    let (state, _) = started(plan);
    let (state, _) = update(state, Msg::Start(plan));
    assert_eq!(state.run(), 2);

    let before = state.clone();
    let (after, effects) = update(state, Msg::Tick { run: 1 });
    assert_eq!(before, after);
    assert!(effects.is_empty());
}

#[test]
fn completion_before_cap_snaps_to_hundred() {
    init_logging();
    let (state, _) = started(EstimatePlan::new(Duration::from_secs(10), 99));
    let (state, _) = tick_n(state, 30);
    assert!(state.percent() < 99);

    let (state, effects) = update(
        state,
        Msg::Finished {
            run: 1,
            status: TerminalStatus::Success,
            message: Some("Fetched 12 jobs".to_string()),
        },
    );
    assert_eq!(state.percent(), 100);
    assert_eq!(state.phase(), Phase::Completed);
    assert_eq!(
        effects,
        vec![
            Effect::StopTicker,
            Effect::SetPercent(100),
            Effect::ShowTerminal {
                status: TerminalStatus::Success,
                text: "Fetched 12 jobs".to_string(),
            },
            Effect::ScheduleHide {
                run: 1,
                after: Duration::from_millis(1500),
            },
        ]
    );
}

#[test]
fn restart_cancels_previous_run() {
    init_logging();
    let plan = EstimatePlan::new(Duration::from_secs(1), 99);
    let (state, _) = started(plan);
    let (state, _) = update(
        state,
        Msg::Finished {
            run: 1,
            status: TerminalStatus::Failure,
            message: None,
        },
    );
    let (state, effects) = update(state, Msg::Start(plan));

    assert_eq!(effects[0], Effect::CancelHide);
    assert_eq!(state.phase(), Phase::Estimating);
    assert_eq!(state.view().outcome, None);

    // The hide timer of run 1 can no longer reset run 2.
    let (state, effects) = update(state, Msg::HideElapsed { run: 1 });
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Estimating);
}
