//! One processing cycle per accepted frame:
//!
//! ```text
//! frame -> range FFT -> history append -> ranging strategy
//!                                      \-> Doppler FFT (history full)
//! ```
//!
//! Everything runs on the caller's thread. A slow cycle lowers the measured frame
//! rate, which is exactly what the Doppler axis has to use.

use std::time::{Duration, Instant};

use crate::backend::source::AcquisitionFrame;
use crate::buffer::FrameBuffer;
use crate::config::Config;
use crate::doppler::{DopplerEstimator, DopplerResult};
use crate::dsp::Complex64;
use crate::fallback::LastKnownGood;
use crate::geometry::{GeometryConstants, PhysicalEstimate};
use crate::range::{RangeEstimator, RangeResult};
use crate::ranging::{self, RangingStrategy};
use crate::rate::SampleRateEstimator;


/// Output of one processed frame
#[derive(Debug, Clone)]
pub struct CycleOutput {
    pub estimate: PhysicalEstimate,
    pub range: RangeResult,
    pub sample_rate_hz: f64,
    /// Doppler spectrum, present when it was computed in this cycle
    pub doppler_spectrum: Option<Vec<f64>>,
}

pub struct Pipeline {
    config: Config,
    geometry: GeometryConstants,
    range: RangeEstimator,
    ranging: Box<dyn RangingStrategy>,
    doppler: DopplerEstimator,
    rate: SampleRateEstimator,
    complex_history: FrameBuffer<Complex64>,
    phase_history: FrameBuffer<f64>,
    slant_distance: LastKnownGood<f64>,
    velocity: LastKnownGood<(f64, f64)>,
}

impl Pipeline {
    pub fn starting_at(config: &Config, start: Instant) -> Self {
        let geometry = GeometryConstants::from_config(config);
        let p = &config.processing;
        Self {
            config: config.clone(),
            geometry,
            range: RangeEstimator::new(config.radar.samples_per_frame),
            ranging: ranging::from_config(config, &geometry),
            doppler: DopplerEstimator::new(p.history_length, geometry.wavelength_m, p.clutter_removal),
            rate: SampleRateEstimator::starting_at(
                p.rate_batch_size, p.initial_sample_rate_hz, p.fallback_sample_rate_hz, start),
            complex_history: FrameBuffer::new(p.history_length),
            phase_history: FrameBuffer::new(p.history_length),
            slant_distance: LastKnownGood::new(0.0),
            velocity: LastKnownGood::new((0.0, 0.0)),
        }
    }

    pub fn geometry(&self) -> &GeometryConstants {
        &self.geometry
    }

    pub fn history_len(&self) -> usize {
        self.complex_history.len()
    }

    pub fn complex_history(&self) -> Vec<Complex64> {
        self.complex_history.snapshot()
    }

    /// Process one frame. Frames with a failure status or wrong length are
    /// skipped without touching any state.
    pub fn process(&mut self, frame: &AcquisitionFrame, now: Instant) -> Option<CycleOutput> {
        if !frame.is_ok() {
            log::warn!("Skipping frame with status {}", frame.status);
            return None;
        }
        let range = match self.range.estimate_range(&frame.i, &frame.q) {
            Ok(range) => range,
            Err(e) => {
                log::warn!("Skipping malformed frame: {e}");
                return None;
            }
        };
        if range.is_degenerate() {
            log::debug!("No target in the range spectrum");
        }

        self.rate.update_at(now);

        self.complex_history.append(range.peak_complex_value);
        if self.ranging.uses_phase_history() {
            self.phase_history.append(range.peak_complex_value.arg());
        }
        let phases = if self.ranging.uses_phase_history() {
            self.phase_history.snapshot()
        } else {
            Vec::new()
        };
        let slant = self.slant_distance.update(self.ranging.slant_distance(&range, &phases));

        let doppler_spectrum = if self.complex_history.is_full() {
            self.update_velocity()
        } else {
            None
        };
        let (velocity, doppler_freq) = self.velocity.get();

        Some(CycleOutput {
            estimate: PhysicalEstimate::new(&self.geometry, slant, velocity, doppler_freq),
            range,
            sample_rate_hz: self.rate.current_rate(),
            doppler_spectrum,
        })
    }

    fn update_velocity(&mut self) -> Option<Vec<f64>> {
        let p = &self.config.processing;
        let history = self.complex_history.snapshot();
        let result = self.doppler.estimate_velocity(
            &history,
            self.rate.rate_for_doppler(),
            self.geometry.depression_angle_rad,
            p.min_doppler_hz,
        );
        match result {
            Ok(DopplerResult { velocity, doppler_freq, spectrum }) => {
                self.velocity.update(Some((velocity, doppler_freq)));
                Some(spectrum)
            }
            Err(e) => {
                log::error!("Doppler estimation failed: {e}");
                None
            }
        }
    }
}


/// Lets an event through at most once per interval
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Instant,
}

impl Throttle {
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self { interval, last: start }
    }

    pub fn ready(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) > self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }
}

/// ------------------------------------------------------------------------------------------------
/// Module unit tests
/// ------------------------------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use crate::config::RangingMode;

    fn reflector_frame(ns: usize, bin: f64, amplitude: f64, noise: f64, rng: &mut StdRng) -> AcquisitionFrame {
        let mut i = Vec::with_capacity(ns);
        let mut q = Vec::with_capacity(ns);
        for n in 0..ns {
            let phase = 2.0 * PI * bin * n as f64 / ns as f64;
            let ni = if noise > 0.0 { rng.gen_range(-noise..noise) } else { 0.0 };
            let nq = if noise > 0.0 { rng.gen_range(-noise..noise) } else { 0.0 };
            i.push((2048.0 + amplitude * phase.cos() + ni).round() as i32);
            q.push((2048.0 + amplitude * phase.sin() + nq).round() as i32);
        }
        AcquisitionFrame::new(0, i, q)
    }

    fn test_config(history_length: usize) -> Config {
        let mut config = Config::default();
        config.radar.samples_per_frame = 200;
        config.processing.history_length = history_length;
        config.processing.clutter_removal = true;
        config
    }

    #[test]
    fn test_noisy_reflector() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = test_config(256);
        let start = Instant::now();
        let mut pipeline = Pipeline::starting_at(&config, start);
        // 5% of the amplitude as additive noise
        let frame = reflector_frame(200, 10.0, 1000.0, 50.0, &mut rng);
        let out = pipeline.process(&frame, start).unwrap();

        assert_eq!(out.range.peak_bin_index, 10);
        assert_approx_eq!(out.range.interpolated_index, 10.0, 0.1);
        assert_approx_eq!(out.estimate.slant_distance, out.range.interpolated_index * 0.56, 1e-12);
        assert_approx_eq!(out.estimate.vertical_height,
            out.estimate.slant_distance * 35f64.to_radians().sin(), 1e-12);
    }

    #[test]
    fn test_static_target_has_no_velocity() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = test_config(256);
        let start = Instant::now();
        let mut pipeline = Pipeline::starting_at(&config, start);
        let frame = reflector_frame(200, 10.0, 1000.0, 0.0, &mut rng);

        let mut last = None;
        for k in 0..256u32 {
            last = pipeline.process(&frame, start + Duration::from_millis(10) * (k + 1));
            if k < 255 {
                assert!(last.as_ref().unwrap().doppler_spectrum.is_none());
            }
        }
        let out = last.unwrap();
        assert!(out.doppler_spectrum.is_some());
        assert_eq!(pipeline.history_len(), 256);
        assert_approx_eq!(out.estimate.radial_velocity, 0.0, 1e-9);
        assert_approx_eq!(out.sample_rate_hz, 100.0, 1e-6);
    }

    #[test]
    fn test_moving_target() {
        // Target bin rotating at a known Doppler frequency
        let config = test_config(128);
        let start = Instant::now();
        let mut pipeline = Pipeline::starting_at(&config, start);
        let rate = 50.0;
        let step = Duration::from_millis(20);
        let doppler_bin = 20.0;
        let f0 = doppler_bin * rate / 128.0;

        let mut out = None;
        for k in 0..300u32 {
            let phase = 2.0 * PI * f0 * k as f64 / rate;
            let (i, q): (Vec<i32>, Vec<i32>) = (0..200)
                .map(|n| {
                    let p = 2.0 * PI * 12.0 * n as f64 / 200.0 + phase;
                    ((2048.0 + 1000.0 * p.cos()).round() as i32, (2048.0 + 1000.0 * p.sin()).round() as i32)
                })
                .unzip();
            out = pipeline.process(&AcquisitionFrame::new(0, i, q), start + step * (k + 1));
        }
        let out = out.unwrap();
        let expected = f0 * pipeline.geometry().wavelength_m / 2.0 / 35f64.to_radians().cos();
        assert_approx_eq!(out.estimate.doppler_frequency_hz, f0, 1e-6);
        assert_approx_eq!(out.estimate.radial_velocity, expected, 1e-6);
    }

    #[test]
    fn test_bad_frames_are_skipped() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = test_config(128);
        let start = Instant::now();
        let mut pipeline = Pipeline::starting_at(&config, start);
        let good = reflector_frame(200, 10.0, 1000.0, 0.0, &mut rng);

        let failed = AcquisitionFrame::new(-1, good.i.clone(), good.q.clone());
        assert!(pipeline.process(&failed, start).is_none());
        let short = AcquisitionFrame::new(0, vec![0; 50], vec![0; 50]);
        assert!(pipeline.process(&short, start).is_none());
        assert_eq!(pipeline.history_len(), 0);

        assert!(pipeline.process(&good, start).is_some());
        assert_eq!(pipeline.history_len(), 1);
    }

    #[test]
    fn test_empty_spectrum_is_processed() {
        let config = test_config(128);
        let start = Instant::now();
        let mut pipeline = Pipeline::starting_at(&config, start);
        let silent = AcquisitionFrame::new(0, vec![2048; 200], vec![2048; 200]);
        let output = pipeline.process(&silent, start).unwrap();
        assert!(output.range.is_degenerate());
        assert_eq!(output.estimate.slant_distance, 0.0);
        assert_eq!(pipeline.history_len(), 1);
    }

    #[test]
    fn test_phase_ranging() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut config = test_config(128);
        config.processing.ranging = RangingMode::Phase;
        config.geometry.range_bin_mm = 650.0;
        let start = Instant::now();
        let mut pipeline = Pipeline::starting_at(&config, start);
        let frame = reflector_frame(200, 10.0, 1000.0, 0.0, &mut rng);

        // Distance stays at the fallback until the warmup is over
        for _ in 0..15 {
            let out = pipeline.process(&frame, start).unwrap();
            assert_eq!(out.estimate.slant_distance, 0.0);
        }
        let out = pipeline.process(&frame, start).unwrap();
        assert_approx_eq!(out.estimate.slant_distance, 6.5, 1e-9);
    }

    #[test]
    fn test_throttle() {
        let start = Instant::now();
        let mut throttle = Throttle::new(Duration::from_secs(1), start);
        assert!(!throttle.ready(start + Duration::from_millis(500)));
        assert!(!throttle.ready(start + Duration::from_millis(1000)));
        assert!(throttle.ready(start + Duration::from_millis(1001)));
        assert!(!throttle.ready(start + Duration::from_millis(1500)));
        assert!(throttle.ready(start + Duration::from_millis(2100)));
    }
}
