//! Status surface: progress notifications from the fetcher and downloader.

/// Receives progress notifications.
///
/// Implementations must be cheap and non-blocking; they are called from the
/// task that drives the transfer, once per body chunk during a page fetch.
/// A `None` label means "reset to the idle/ready text".
pub trait StatusSink: Send + Sync {
    /// Shows a bounded progress indicator and sets the status text.
    fn begin_operation(&self, min: u64, max: u64, label: Option<&str>);

    /// Advances the progress indicator by `delta`.
    fn step_progress_bar(&self, delta: u64);

    /// Sets the status text without touching the progress indicator.
    fn set_status_text(&self, label: Option<&str>);

    /// Hides the progress indicator and resets the status text.
    fn end_operation(&self);
}

/// Status sink that discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStatusSink;

impl StatusSink for NullStatusSink {
    fn begin_operation(&self, _min: u64, _max: u64, _label: Option<&str>) {}

    fn step_progress_bar(&self, _delta: u64) {}

    fn set_status_text(&self, _label: Option<&str>) {}

    fn end_operation(&self) {}
}
