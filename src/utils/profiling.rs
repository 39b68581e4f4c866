use std::time::{Duration, Instant};

/// Timing and counters gathered over the fixed ticks run by the last `advance` call.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickProfiler {
    pub sync_in_time: Duration,
    pub solver_time: Duration,
    pub sync_out_time: Duration,
    pub routing_time: Duration,
    pub emission_time: Duration,
    pub total_time: Duration,

    pub ticks: u32,
    pub raw_events: usize,
    pub skipped_events: usize,
    pub dispatched_callbacks: usize,
    pub tracked_pairs: usize,
}

impl TickProfiler {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn report(&self) {
        let total_us = self.total_time.as_micros() as f32;
        if total_us < 1.0 || !log::log_enabled!(log::Level::Debug) {
            return;
        }

        log::debug!(
            "physics: {} ticks, {} raw events ({} skipped), {} callbacks, {} tracked pairs, {:.2} ms",
            self.ticks,
            self.raw_events,
            self.skipped_events,
            self.dispatched_callbacks,
            self.tracked_pairs,
            self.total_time.as_secs_f32() * 1000.0
        );

        for (label, phase) in [
            ("sync in", self.sync_in_time),
            ("solver", self.solver_time),
            ("sync out", self.sync_out_time),
            ("routing", self.routing_time),
            ("emission", self.emission_time),
        ] {
            log::debug!(
                "  {label:<9} {:.2} ms ({:.1}%)",
                phase.as_secs_f32() * 1000.0,
                (phase.as_micros() as f32 / total_us) * 100.0
            );
        }
    }
}

/// Adds the lifetime of the guard to the referenced duration.
pub struct PhaseTimer<'a> {
    start: Instant,
    output: &'a mut Duration,
}

impl<'a> PhaseTimer<'a> {
    pub fn new(output: &'a mut Duration) -> Self {
        Self {
            start: Instant::now(),
            output,
        }
    }
}

impl<'a> Drop for PhaseTimer<'a> {
    fn drop(&mut self) {
        *self.output += self.start.elapsed();
    }
}
