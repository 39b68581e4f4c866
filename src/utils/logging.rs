use log::{log_enabled, warn, Level};
use std::time::Instant;

/// Scoped timer that traces the duration of a tick phase.
pub struct ScopedTimer<'a> {
    label: &'a str,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'a str) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("⏱️ start {label}");
        }
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        if log_enabled!(Level::Trace) {
            let elapsed = self.start.elapsed();
            log::trace!("⏱️ end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

/// Warns when a frame delta had to be clamped to keep one `advance` call bounded.
pub fn warn_if_delta_clamped(requested: f64, clamp: f64) {
    if requested > clamp {
        warn!(
            "Frame delta clamped: {:.2} ms > {:.2} ms budget",
            requested * 1000.0,
            clamp * 1000.0
        );
    }
}
