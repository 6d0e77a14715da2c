//! Tick observer trait for progress reporting.

use crate::TickReport;

/// Callbacks invoked by the tick core.
///
/// Called with the tick lock held, on whichever thread ran the tick (the
/// driver or a `step_once` caller), so implementations should be quick.
/// All methods default to no-ops.
///
/// # Example — progress printer
///
/// ```rust,ignore
/// struct Progress { every: u64 }
///
/// impl TickObserver for Progress {
///     fn on_tick_end(&mut self, report: &TickReport) {
///         if report.tick % self.every == 0 {
///             println!("tick {}: {} vehicles", report.tick, report.vehicles);
///         }
///     }
/// }
/// ```
pub trait TickObserver: Send + 'static {
    /// Before any stage of tick `tick` runs.
    fn on_tick_start(&mut self, _tick: u64) {}

    /// After the last stage, whether or not some stages failed.
    fn on_tick_end(&mut self, _report: &TickReport) {}

    /// After the engine was closed and per-session state was reset.
    fn on_shutdown(&mut self, _final_tick: u64) {}
}

/// A [`TickObserver`] that does nothing.
pub struct NoopObserver;

impl TickObserver for NoopObserver {}
