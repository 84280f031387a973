#![deny(missing_docs)]
//! Shared logging utilities for the jobdesk workspace.
//!
//! This crate provides the `desk_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every line is tagged
//! with the operation currently being polled, so interleaved fetch and
//! bulk-apply output stays readable even on a single-threaded runtime.

use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

#[doc(hidden)]
pub use log;

/// Tag used when no operation has been registered on the thread.
pub const NO_OPERATION: &str = "-";

thread_local! {
    /// Label of the operation currently being polled on this thread.
    static OPERATION: Cell<&'static str> = const { Cell::new(NO_OPERATION) };
}

/// Future returned by [`with_operation`].
#[must_use = "futures do nothing unless polled"]
pub struct WithOperation<F> {
    label: &'static str,
    inner: Pin<Box<F>>,
}

/// Tags every poll of `future` with `label`.
///
/// The previous label is restored after each poll, so tasks sharing a
/// thread never see each other's label.
pub fn with_operation<F: Future>(label: &'static str, future: F) -> WithOperation<F> {
    WithOperation {
        label,
        inner: Box::pin(future),
    }
}

impl<F: Future> Future for WithOperation<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let previous = OPERATION.with(|v| v.replace(self.label));
        let result = self.inner.as_mut().poll(cx);
        OPERATION.with(|v| v.set(previous));
        result
    }
}

/// Retrieves the label of the operation being polled on this thread.
/// Returns [`NO_OPERATION`] outside [`with_operation`].
pub fn current_operation() -> &'static str {
    OPERATION.with(|v| v.get())
}

/// Logs a trace-level message tagged with the current operation.
#[macro_export]
macro_rules! desk_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!("[{}] {}", $crate::current_operation(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the current operation.
#[macro_export]
macro_rules! desk_info {
    ($($arg:tt)*) => {{
        $crate::log::info!("[{}] {}", $crate::current_operation(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the current operation.
#[macro_export]
macro_rules! desk_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!("[{}] {}", $crate::current_operation(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the current operation.
#[macro_export]
macro_rules! desk_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!("[{}] {}", $crate::current_operation(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the current operation.
#[macro_export]
macro_rules! desk_error {
    ($($arg:tt)*) => {{
        $crate::log::error!("[{}] {}", $crate::current_operation(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopWake;

    impl std::task::Wake for NoopWake {
        fn wake(self: std::sync::Arc<Self>) {}
    }

    /// Pending once, then ready.
    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                Poll::Ready(())
            } else {
                self.0 = true;
                Poll::Pending
            }
        }
    }

    async fn labels_around_yield() -> (&'static str, &'static str) {
        let before = current_operation();
        YieldOnce(false).await;
        (before, current_operation())
    }

    #[test]
    fn interleaved_futures_keep_their_own_label() {
        let waker = std::task::Waker::from(std::sync::Arc::new(NoopWake));
        let mut cx = Context::from_waker(&waker);

        let mut fetch = with_operation("fetch", labels_around_yield());
        let mut bulk = with_operation("bulk-apply", labels_around_yield());

        assert!(Pin::new(&mut fetch).poll(&mut cx).is_pending());
        assert!(Pin::new(&mut bulk).poll(&mut cx).is_pending());
        assert_eq!(current_operation(), NO_OPERATION);

        assert_eq!(
            Pin::new(&mut fetch).poll(&mut cx),
            Poll::Ready(("fetch", "fetch"))
        );
        assert_eq!(
            Pin::new(&mut bulk).poll(&mut cx),
            Poll::Ready(("bulk-apply", "bulk-apply"))
        );
        assert_eq!(current_operation(), NO_OPERATION);
    }
}
