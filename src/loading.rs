//! Loading-state broadcast.
//!
//! Long operations announce themselves through a [`LoadingSignal`]. The core
//! only emits; whoever renders the overlay (the CLI logs it) owns the state.
//! [`scoped`] pairs every `show` with a `hide`, including on early return.

/// Subscriber for loading announcements.
pub trait LoadingSignal: Send + Sync {
    fn show(&self, message: &str);
    fn hide(&self);
}

/// Default subscriber: writes announcements to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSignal;

impl LoadingSignal for LogSignal {
    fn show(&self, message: &str) {
        log::info!("{message}");
    }

    fn hide(&self) {
        log::debug!("done");
    }
}

/// Subscriber that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSignal;

impl LoadingSignal for NoopSignal {
    fn show(&self, _message: &str) {}
    fn hide(&self) {}
}

/// Hides the signal when dropped.
#[must_use = "the loading indicator is hidden as soon as the guard drops"]
pub struct LoadingGuard<'a> {
    signal: &'a dyn LoadingSignal,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.signal.hide();
    }
}

/// Show `message` until the returned guard goes out of scope.
pub fn scoped<'a>(signal: &'a dyn LoadingSignal, message: &str) -> LoadingGuard<'a> {
    signal.show(message);
    LoadingGuard { signal }
}
