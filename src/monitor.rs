//! The acquisition loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use uuid::Uuid;

use crate::backend::source::{FrameSource, SensorSession};
use crate::backend::telemetry::{Diagnostics, TelemetryDispatcher, TelemetryRecord};
use crate::config::Config;
use crate::pipeline::{CycleOutput, Pipeline, Throttle};


#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames: u64,
    pub skipped: u64,
    pub emitted: u64,
}

pub struct Monitor {
    config: Config,
    session_id: Uuid,
    pipeline: Pipeline,
    throttle: Throttle,
}

impl Monitor {
    pub fn new(config: &Config) -> Self {
        let now = Instant::now();
        let session_id = Uuid::new_v4();
        log::info!("Session ID: {session_id}");
        Self {
            config: config.clone(),
            session_id,
            pipeline: Pipeline::starting_at(config, now),
            throttle: Throttle::new(Duration::from_secs_f64(config.telemetry.interval_s), now),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Run until the stop flag is raised or the source ends or fails.
    /// The session is consumed so the sensor is released before this returns.
    pub fn run<S: FrameSource>(
        &mut self,
        mut session: SensorSession<S>,
        dispatcher: &mut TelemetryDispatcher,
        stop: &Arc<AtomicBool>,
    ) -> RunStats {
        let mut stats = RunStats::default();
        while !stop.load(Ordering::Relaxed) {
            let frame = match session.acquire() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("End of frame stream");
                    break;
                }
                Err(e) => {
                    log::error!("Frame source failed: {e}");
                    break;
                }
            };
            stats.frames += 1;

            let now = Instant::now();
            let Some(output) = self.pipeline.process(&frame, now) else {
                stats.skipped += 1;
                continue;
            };
            log::debug!(
                "H: {:.3} m | V: {:.3} m/s | Freq: {:.2} Hz | Rate: {:.0} Hz",
                output.estimate.vertical_height, output.estimate.radial_velocity,
                output.estimate.doppler_frequency_hz, output.sample_rate_hz
            );

            if self.throttle.ready(now) {
                let record = self.record(&output);
                if dispatcher.dispatch(record) {
                    stats.emitted += 1;
                }
            }
        }
        drop(session);
        stats
    }

    pub fn record(&self, output: &CycleOutput) -> TelemetryRecord {
        let p = &self.config.processing;
        let estimate = &output.estimate;
        let geometry = self.pipeline.geometry();
        let diagnostics = self.config.telemetry.diagnostics.then(|| {
            let history = self.pipeline.complex_history();
            Diagnostics {
                range_fft: output.range.half_spectrum().to_vec(),
                mag_history: history.iter().map(|c| c.norm()).collect(),
                phase_history: history.iter().map(|c| c.arg()).collect(),
                doppler_spec: output.doppler_spectrum.clone().unwrap_or_default(),
            }
        });

        TelemetryRecord {
            timestamp: Utc::now(),
            session_id: self.session_id,
            vertical_height_m: estimate.vertical_height,
            slant_distance_m: estimate.slant_distance,
            exact_range_index: output.range.interpolated_index,
            velocity_m_s: estimate.radial_velocity,
            doppler_freq_hz: estimate.doppler_frequency_hz,
            sample_rate_hz: output.sample_rate_hz,
            max_velocity_m_s: geometry.max_unambiguous_velocity(output.sample_rate_hz),
            moving: estimate.radial_velocity.abs() > p.moving_threshold_m_s,
            stable: output.sample_rate_hz > p.stable_rate_hz,
            diagnostics,
        }
    }
}

/// ------------------------------------------------------------------------------------------------
/// Module unit tests
/// ------------------------------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::mpsc;
    use crate::backend::source::{AcquisitionFrame, ReplaySource};
    use crate::backend::telemetry::TelemetrySink;
    use crate::error::{Error, Result};

    struct ChannelSink {
        tx: mpsc::Sender<TelemetryRecord>,
    }

    impl TelemetrySink for ChannelSink {
        fn deliver(&mut self, record: &TelemetryRecord) -> Result<()> {
            self.tx.send(record.clone()).map_err(|e| Error::Telemetry(e.to_string()))
        }
    }

    fn replay_csv(frames: usize, ns: usize) -> String {
        let mut csv = String::new();
        for k in 0..frames {
            let status = if k % 10 == 3 { 1 } else { 0 };
            let i: Vec<String> = (0..ns)
                .map(|n| (2048.0 + 900.0 * (2.0 * std::f64::consts::PI * 7.0 * n as f64 / ns as f64).cos()).round().to_string())
                .collect();
            let q: Vec<String> = (0..ns)
                .map(|n| (2048.0 + 900.0 * (2.0 * std::f64::consts::PI * 7.0 * n as f64 / ns as f64).sin()).round().to_string())
                .collect();
            csv.push_str(&format!("{status},{},{}\n", i.join(","), q.join(",")));
        }
        csv
    }

    #[test]
    fn test_run_replay() {
        let mut config = Config::default();
        config.radar.samples_per_frame = 50;
        config.processing.history_length = 16;
        config.telemetry.interval_s = 0.0;
        config.telemetry.diagnostics = true;

        let csv = replay_csv(40, 50);
        let session = SensorSession::open(ReplaySource::new(csv.as_bytes(), 50, None)).unwrap();
        let (tx, rx) = mpsc::channel();
        let mut dispatcher = TelemetryDispatcher::spawn(Box::new(ChannelSink { tx }), 1024).unwrap();
        let stop = Arc::new(AtomicBool::new(false));

        let mut monitor = Monitor::new(&config);
        let stats = monitor.run(session, &mut dispatcher, &stop);
        dispatcher.shutdown();

        assert_eq!(stats.frames, 40);
        assert_eq!(stats.skipped, 4);
        let records: Vec<TelemetryRecord> = rx.iter().collect();
        assert_eq!(records.len() as u64, stats.emitted);
        assert!(!records.is_empty());

        let last = records.last().unwrap();
        assert_eq!(last.session_id, monitor.session_id());
        assert!((last.exact_range_index - 7.0).abs() < 0.05);
        let diagnostics = last.diagnostics.as_ref().unwrap();
        assert_eq!(diagnostics.range_fft.len(), 25);
        assert_eq!(diagnostics.mag_history.len(), 16);
        assert!(!last.moving);
    }

    /// Endless source which raises the stop flag after `stop_after` frames
    struct StoppingSource {
        acquired: u64,
        stop_after: u64,
        stop: Arc<AtomicBool>,
        released: Rc<Cell<u32>>,
    }

    impl FrameSource for StoppingSource {
        fn start(&mut self) -> Result<()> {
            Ok(())
        }

        fn acquire(&mut self) -> Result<Option<AcquisitionFrame>> {
            self.acquired += 1;
            if self.acquired >= self.stop_after {
                self.stop.store(true, Ordering::Relaxed);
            }
            Ok(Some(AcquisitionFrame::new(0, vec![0; 200], vec![0; 200])))
        }

        fn release(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    fn stopping_session(stop_after: u64, stop: &Arc<AtomicBool>, released: &Rc<Cell<u32>>) -> SensorSession<StoppingSource> {
        let source = StoppingSource {
            acquired: 0,
            stop_after,
            stop: stop.clone(),
            released: released.clone(),
        };
        SensorSession::open(source).unwrap()
    }

    #[test]
    fn test_stop_flag() {
        let config = Config::default();
        let (tx, _rx) = mpsc::channel();
        let mut dispatcher = TelemetryDispatcher::spawn(Box::new(ChannelSink { tx }), 4).unwrap();
        let stop = Arc::new(AtomicBool::new(true));
        let released = Rc::new(Cell::new(0));
        let session = stopping_session(u64::MAX, &stop, &released);

        let stats = Monitor::new(&config).run(session, &mut dispatcher, &stop);
        assert_eq!(stats, RunStats::default());
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn test_stop_mid_run_releases_sensor() {
        let config = Config::default();
        let (tx, _rx) = mpsc::channel();
        let mut dispatcher = TelemetryDispatcher::spawn(Box::new(ChannelSink { tx }), 4).unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let released = Rc::new(Cell::new(0));
        let session = stopping_session(5, &stop, &released);

        let stats = Monitor::new(&config).run(session, &mut dispatcher, &stop);
        dispatcher.shutdown();
        assert_eq!(stats.frames, 5);
        assert_eq!(stats.skipped, 0);
        assert_eq!(released.get(), 1);
    }
}
