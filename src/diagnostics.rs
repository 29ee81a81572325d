//! Can this host poll the sensor fast enough?
//!
//! The frame rate bounds the Doppler axis: anything faster than `λ / (4 dt)`
//! aliases. This measures the acquisition latency and reports the resulting limit.

use std::fmt;
use std::time::{Duration, Instant};

use crate::backend::source::{FrameSource, SensorSession};
use crate::error::Result;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Too slow for flowing water
    Red,
    /// Fine for calm water only
    Yellow,
    Green,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Verdict::Red => "RED: sampling too slow for Doppler processing",
            Verdict::Yellow => "YELLOW: good for calm water, inaccurate for fast flow",
            Verdict::Green => "GREEN: sampling fast enough for real-time Doppler",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplingReport {
    pub frames: usize,
    pub total: Duration,
    pub mean_latency: Duration,
    pub sample_rate_hz: f64,
    pub max_velocity_m_s: f64,
    pub verdict: Verdict,
}

impl SamplingReport {
    pub fn from_latencies(latencies: &[Duration], total: Duration, wavelength_m: f64) -> Option<Self> {
        if latencies.is_empty() {
            return None;
        }
        let mean_latency = latencies.iter().sum::<Duration>() / latencies.len() as u32;
        let dt = mean_latency.as_secs_f64();
        if dt <= 0.0 {
            return None;
        }
        let max_velocity_m_s = wavelength_m / (4.0 * dt);
        let verdict = if max_velocity_m_s < 0.2 {
            Verdict::Red
        } else if max_velocity_m_s < 1.0 {
            Verdict::Yellow
        } else {
            Verdict::Green
        };

        Some(Self {
            frames: latencies.len(),
            total,
            mean_latency,
            sample_rate_hz: 1.0 / dt,
            max_velocity_m_s,
            verdict,
        })
    }
}

/// Time `frames` acquisitions back to back. Stops early at the end of the stream.
pub fn measure_sampling<S: FrameSource>(session: &mut SensorSession<S>, frames: usize, wavelength_m: f64) -> Result<Option<SamplingReport>> {
    let mut latencies = Vec::with_capacity(frames);
    let start = Instant::now();
    for _ in 0..frames {
        let t0 = Instant::now();
        if session.acquire()?.is_none() {
            break;
        }
        latencies.push(t0.elapsed());
    }
    Ok(SamplingReport::from_latencies(&latencies, start.elapsed(), wavelength_m))
}

/// ------------------------------------------------------------------------------------------------
/// Module unit tests
/// ------------------------------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const WAVELENGTH: f64 = 3e8 / 24.010e9;

    #[test]
    fn test_report() {
        let latencies = vec![Duration::from_millis(5); 100];
        let report = SamplingReport::from_latencies(&latencies, Duration::from_millis(500), WAVELENGTH).unwrap();
        assert_eq!(report.frames, 100);
        assert_approx_eq!(report.sample_rate_hz, 200.0, 1e-9);
        assert_approx_eq!(report.max_velocity_m_s, WAVELENGTH / 0.02, 1e-12);
        assert_eq!(report.verdict, Verdict::Yellow);
    }

    #[test]
    fn test_verdicts() {
        let slow = SamplingReport::from_latencies(&[Duration::from_millis(50)], Duration::ZERO, WAVELENGTH).unwrap();
        assert_eq!(slow.verdict, Verdict::Red);
        let fast = SamplingReport::from_latencies(&[Duration::from_millis(2)], Duration::ZERO, WAVELENGTH).unwrap();
        assert_eq!(fast.verdict, Verdict::Green);
    }

    #[test]
    fn test_no_frames() {
        assert_eq!(SamplingReport::from_latencies(&[], Duration::ZERO, WAVELENGTH), None);
        assert_eq!(SamplingReport::from_latencies(&[Duration::ZERO], Duration::ZERO, WAVELENGTH), None);
    }
}
