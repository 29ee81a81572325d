//! Fine ranging from the phase of the target bin.
//!
//! A change of the distance by λ/2 turns the phase of the target bin by 2π, so the
//! unwrapped phase history tracks small movements of the water surface far below
//! the size of one range bin. The trajectory is lowpass filtered and read at a
//! fixed lag, which costs some latency but gives millimeter level smoothing.

use std::f64::consts::PI;

use crate::dsp::iir::ButterworthLowpass;
use crate::dsp::mean;
use crate::dsp::unwrap::unwrap_phase;


const FILTER_ORDER: usize = 4;


#[derive(Debug, Clone)]
pub struct PhaseFineRanger {
    wavelength_m: f64,
    warmup: usize,
    lag: usize,
    lowpass: ButterworthLowpass,
}

impl PhaseFineRanger {
    /// `warmup` is the number of phase samples needed before the first estimate,
    /// `lag` the distance from the end of the filtered history we read the result at.
    pub fn new(wavelength_m: f64, warmup: usize, lag: usize, cutoff: f64) -> Self {
        assert!(lag > 0 && lag <= warmup + 1, "Lag must fit into the warmup period");
        Self {
            wavelength_m,
            warmup,
            lag,
            lowpass: ButterworthLowpass::new(FILTER_ORDER, cutoff),
        }
    }

    pub fn is_ready(&self, history_len: usize) -> bool {
        history_len > self.warmup
    }

    /// Refined slant range in meters, or None while the history is too short.
    pub fn refine_range(&self, phase_history: &[f64], coarse_bin: usize, range_bin_size_mm: f64) -> Option<f64> {
        if !self.is_ready(phase_history.len()) {
            return None;
        }
        let displacement_mm = self.displacement_mm(phase_history);
        let filtered = self.lowpass.filter(&displacement_mm);
        let lagged = filtered[filtered.len() - self.lag];

        let coarse_mm = coarse_bin as f64 * range_bin_size_mm;
        Some((coarse_mm + lagged / 2.0) / 1000.0)
    }

    /// Zero mean displacement track in millimeters
    fn displacement_mm(&self, phase_history: &[f64]) -> Vec<f64> {
        let unwrapped = unwrap_phase(phase_history);
        let center = mean(&unwrapped);
        unwrapped.iter()
            .map(|p| 1000.0 * (p - center) * self.wavelength_m / (2.0 * PI))
            .collect()
    }
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
    fn test_warmup() {
        let ranger = PhaseFineRanger::new(WAVELENGTH, 15, 15, 0.01);
        let history = vec![0.3; 15];
        assert_eq!(ranger.refine_range(&history, 10, 650.0), None);
        let history = vec![0.3; 16];
        assert!(ranger.refine_range(&history, 10, 650.0).is_some());
    }

    #[test]
    fn test_static_target() {
        // Constant phase means no movement: only the coarse bin remains
        let ranger = PhaseFineRanger::new(WAVELENGTH, 15, 15, 0.01);
        let history = vec![-2.1; 128];
        let range = ranger.refine_range(&history, 12, 650.0).unwrap();
        assert_approx_eq!(range, 12.0 * 0.65, 1e-9);
    }

    #[test]
    fn test_wrapped_phase_is_continuous() {
        // A slow drift through the ±π boundary must not create jumps
        let ranger = PhaseFineRanger::new(WAVELENGTH, 15, 15, 0.01);
        let truth: Vec<f64> = (0..200).map(|i| 3.0 + 0.01 * i as f64).collect();
        let wrapped: Vec<f64> = truth.iter().map(|p| p.sin().atan2(p.cos())).collect();

        let a = ranger.refine_range(&truth, 5, 650.0).unwrap();
        let b = ranger.refine_range(&wrapped, 5, 650.0).unwrap();
        assert_approx_eq!(a, b, 1e-9);
    }

    #[test]
    fn test_correction_is_small() {
        // Half a wavelength of movement shifts the estimate by well under one bin
        let ranger = PhaseFineRanger::new(WAVELENGTH, 15, 15, 0.01);
        let history: Vec<f64> = (0..256)
            .map(|i| (2.0 * PI * i as f64 / 256.0).sin())
            .collect();
        let range = ranger.refine_range(&history, 8, 560.0).unwrap();
        assert!((range - 8.0 * 0.56).abs() < 0.01, "range {range}");
    }
}
