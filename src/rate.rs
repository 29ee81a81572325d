//! Frame rate estimation.
//!
//! The sensor is polled synchronously, so the real frame rate depends on how long
//! each processing cycle takes. Doppler needs the actual rate for its frequency
//! axis, so we measure it over batches of frames. The estimate always describes
//! the batch which just finished.

use std::time::Instant;

use crate::fallback::LastKnownGood;


#[derive(Debug)]
pub struct SampleRateEstimator {
    batch_size: u32,
    counter: u32,
    last_reset: Instant,
    rate: LastKnownGood<f64>,
    fallback_hz: f64,
}

impl SampleRateEstimator {
    pub fn new(batch_size: u32, initial_rate_hz: f64, fallback_hz: f64) -> Self {
        Self::starting_at(batch_size, initial_rate_hz, fallback_hz, Instant::now())
    }

    pub fn starting_at(batch_size: u32, initial_rate_hz: f64, fallback_hz: f64, start: Instant) -> Self {
        assert!(batch_size > 0);
        Self {
            batch_size,
            counter: 0,
            last_reset: start,
            rate: LastKnownGood::with_value(initial_rate_hz, fallback_hz),
            fallback_hz,
        }
    }

    /// Register one accepted frame
    pub fn update(&mut self) -> f64 {
        self.update_at(Instant::now())
    }

    pub fn update_at(&mut self, now: Instant) -> f64 {
        self.counter += 1;
        if self.counter >= self.batch_size {
            let elapsed = now.saturating_duration_since(self.last_reset).as_secs_f64();
            let measured = if elapsed > 0.0 {
                Some(self.batch_size as f64 / elapsed)
            } else {
                None
            };
            self.rate.update(measured);
            self.counter = 0;
            self.last_reset = now;
        }
        self.rate.get()
    }

    /// Latest estimate, possibly still the initial value
    pub fn current_rate(&self) -> f64 {
        self.rate.get()
    }

    /// Rate safe to use as the Doppler frequency axis (never zero or negative)
    pub fn rate_for_doppler(&self) -> f64 {
        let rate = self.rate.get();
        if rate > 0.0 { rate } else { self.fallback_hz }
    }
}
