//! Terminal presentation: one progress bar per operation plus notification lines.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use jobdesk_core::{NotifyLevel, OperationKind, TerminalStatus};
use jobdesk_engine::ProgressSink;

const BAR_TEMPLATE: &str = "{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos:>3}% {msg}";

/// Draws reporter output with indicatif bars.
pub struct TerminalSink {
    multi: MultiProgress,
    bars: Mutex<HashMap<OperationKind, ProgressBar>>,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    pub fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bars(&self) -> MutexGuard<'_, HashMap<OperationKind, ProgressBar>> {
        self.bars.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the visible bar for `kind`, creating it on first use.
    fn bar(&self, kind: OperationKind) -> ProgressBar {
        let mut bars = self.bars();
        bars.entry(kind)
            .or_insert_with(|| {
                let bar = self.multi.add(ProgressBar::new(100));
                bar.set_style(bar_style());
                bar.set_prefix(kind.label());
                bar
            })
            .clone()
    }

    fn println(&self, line: String) {
        if self.multi.println(&line).is_err() {
            eprintln!("{line}");
        }
    }

    #[cfg(test)]
    fn position(&self, kind: OperationKind) -> Option<u64> {
        self.bars().get(&kind).map(|bar| bar.position())
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn notify_line(level: NotifyLevel, text: &str) -> String {
    match level {
        NotifyLevel::Info => format!("{} {}", style("i").cyan().bold(), text),
        NotifyLevel::Success => format!("{} {}", style("✓").green().bold(), text),
        NotifyLevel::Warning => format!("{} {}", style("!").yellow().bold(), style(text).yellow()),
        NotifyLevel::Error => format!("{} {}", style("✗").red().bold(), style(text).red()),
    }
}

fn outcome_line(kind: OperationKind, status: TerminalStatus, text: &str) -> String {
    let tag = style(kind.label()).bold().dim();
    match status {
        TerminalStatus::Success => format!("{} {} {}", style("✓").green().bold(), tag, text),
        TerminalStatus::Failure => {
            format!("{} {} {}", style("✗").red().bold(), tag, style(text).red())
        }
    }
}

impl ProgressSink for TerminalSink {
    fn set_percent(&self, kind: OperationKind, percent: u8) {
        self.bar(kind).set_position(u64::from(percent));
    }

    fn set_message(&self, kind: OperationKind, message: &str) {
        self.bar(kind).set_message(message.to_string());
    }

    fn show_terminal(&self, kind: OperationKind, status: TerminalStatus, text: &str) {
        let bar = self.bar(kind);
        let styled = match status {
            TerminalStatus::Success => style(text).green().to_string(),
            TerminalStatus::Failure => style(text).red().to_string(),
        };
        bar.set_message(styled);
        bar.tick();
        // The bar is cleared on hide; this line stays.
        self.println(outcome_line(kind, status, text));
    }

    fn hide(&self, kind: OperationKind) {
        if let Some(bar) = self.bars().remove(&kind) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }

    fn notify(&self, level: NotifyLevel, text: &str) {
        self.println(notify_line(level, text));
    }
}
