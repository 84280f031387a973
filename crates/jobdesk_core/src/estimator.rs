use std::time::Duration;

/// Highest ceiling an estimate may use; 100 is reserved for completion.
pub const MAX_ESTIMATE_CAP: u8 = 99;

/// Displayed estimates move in steps of this many percent.
const DISPLAY_STEP: u8 = 5;

const FETCH_TIME_PER_ITEM: Duration = Duration::from_millis(2500);
const BULK_TIME_PER_TARGET: Duration = Duration::from_millis(500);
const BULK_INITIAL_MAX: Duration = Duration::from_secs(3);
const BULK_INITIAL_CAP: u8 = 10;
const BULK_MONITOR_DURATION: Duration = Duration::from_secs(30);
const BULK_MONITOR_CAP: u8 = 80;

/// One linear estimate segment: from the current percent to `cap` over `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimatePlan {
    pub duration: Duration,
    pub cap: u8,
}

impl EstimatePlan {
    /// Caps above [`MAX_ESTIMATE_CAP`] are clamped.
    pub fn new(duration: Duration, cap: u8) -> Self {
        Self {
            duration,
            cap: cap.min(MAX_ESTIMATE_CAP),
        }
    }

    /// Fetching new listings takes roughly 2.5 s per requested item.
    pub fn fetch(max_items: u32) -> Self {
        Self::new(FETCH_TIME_PER_ITEM * max_items, MAX_ESTIMATE_CAP)
    }

    /// Shown while the bulk-apply request itself is in flight.
    pub fn bulk_initial(targets: usize) -> Self {
        let targets = u32::try_from(targets).unwrap_or(u32::MAX);
        let duration = BULK_TIME_PER_TARGET
            .checked_mul(targets)
            .map_or(BULK_INITIAL_MAX, |d| d.min(BULK_INITIAL_MAX));
        Self::new(duration, BULK_INITIAL_CAP)
    }

    /// Fallback estimate while waiting for pushed progress.
    pub fn bulk_monitor() -> Self {
        Self::new(BULK_MONITOR_DURATION, BULK_MONITOR_CAP)
    }
}

/// Rounds a raw percent down to the display step.
pub fn display_step(percent: u8) -> u8 {
    percent / DISPLAY_STEP * DISPLAY_STEP
}

/// Running estimate segment. Arithmetic is in hundredths of a percent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Estimator {
    from: u32,
    cap: u32,
    duration_ms: u64,
    elapsed_ms: u64,
}

impl Estimator {
    pub(crate) fn new(from: u8, plan: EstimatePlan) -> Self {
        Self {
            from: u32::from(from) * 100,
            cap: u32::from(plan.cap) * 100,
            duration_ms: u64::try_from(plan.duration.as_millis()).unwrap_or(u64::MAX),
            elapsed_ms: 0,
        }
    }

    pub(crate) fn cap(&self) -> u8 {
        (self.cap / 100) as u8
    }

    /// Advances by one tick and returns the percent to display.
    pub(crate) fn advance(&mut self, step: Duration) -> u8 {
        let step_ms = u64::try_from(step.as_millis()).unwrap_or(u64::MAX);
        self.elapsed_ms = self.elapsed_ms.saturating_add(step_ms);
        let raw = self.raw_hundredths();
        display_step((raw / 100) as u8).min(self.cap())
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms || self.from >= self.cap
    }

    fn raw_hundredths(&self) -> u32 {
        if self.from >= self.cap || self.elapsed_ms >= self.duration_ms {
            return self.cap.max(self.from);
        }
        let span = u64::from(self.cap - self.from);
        let gained = span * self.elapsed_ms / self.duration_ms;
        self.from + gained as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(100);

    #[test]
    fn reaches_cap_rounded_down_after_duration() {
        let mut estimator = Estimator::new(0, EstimatePlan::new(Duration::from_secs(5), 99));
        let mut shown = 0;
        for _ in 0..50 {
            shown = estimator.advance(TICK);
        }
        assert_eq!(shown, 95);
        assert!(estimator.is_finished());
    }

    #[test]
    fn zero_duration_jumps_to_cap() {
        let mut estimator = Estimator::new(0, EstimatePlan::new(Duration::ZERO, 80));
        assert_eq!(estimator.advance(TICK), 80);
        assert!(estimator.is_finished());
    }

    #[test]
    fn resumes_from_start_percent() {
        let mut estimator = Estimator::new(40, EstimatePlan::new(Duration::from_secs(1), 80));
        // 40 + 40 * 500 / 1000 = 60
        for _ in 0..5 {
            estimator.advance(TICK);
        }
        assert_eq!(estimator.advance(Duration::ZERO), 60);
    }

    #[test]
    fn plan_caps_are_clamped_below_completion() {
        assert_eq!(EstimatePlan::new(TICK, 100).cap, MAX_ESTIMATE_CAP);
    }

    #[test]
    fn bulk_initial_duration_is_bounded() {
        assert_eq!(
            EstimatePlan::bulk_initial(2).duration,
            Duration::from_millis(1000)
        );
        assert_eq!(EstimatePlan::bulk_initial(40).duration, Duration::from_secs(3));
        assert_eq!(EstimatePlan::bulk_initial(40).cap, 10);
    }

    #[test]
    fn fetch_plan_scales_with_items() {
        let plan = EstimatePlan::fetch(20);
        assert_eq!(plan.duration, Duration::from_secs(50));
        assert_eq!(plan.cap, 99);
    }
}
