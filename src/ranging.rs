//! Ways to turn a range spectrum into a slant distance.
//!
//! Both strategies consume the same inputs (current [`RangeResult`] and the phase
//! history) so the pipeline doesn't care which one is deployed.

use crate::config::{Config, RangingMode};
use crate::geometry::GeometryConstants;
use crate::phase::PhaseFineRanger;
use crate::range::RangeResult;


pub trait RangingStrategy: Send {
    /// Slant distance in meters, None if the strategy has no estimate yet.
    fn slant_distance(&self, range: &RangeResult, phase_history: &[f64]) -> Option<f64>;

    /// Strategy needs the phase history to be recorded
    fn uses_phase_history(&self) -> bool {
        false
    }
}

/// Sub-bin peak position from parabolic interpolation
#[derive(Debug, Clone)]
pub struct ParabolicRanging {
    range_bin_m: f64,
}

impl ParabolicRanging {
    pub fn new(range_bin_mm: f64) -> Self {
        Self { range_bin_m: range_bin_mm / 1000.0 }
    }
}

impl RangingStrategy for ParabolicRanging {
    fn slant_distance(&self, range: &RangeResult, _phase_history: &[f64]) -> Option<f64> {
        Some(range.interpolated_index * self.range_bin_m)
    }
}

/// Coarse bin refined with the filtered phase trajectory
#[derive(Debug, Clone)]
pub struct PhaseRanging {
    ranger: PhaseFineRanger,
    range_bin_mm: f64,
}

impl PhaseRanging {
    pub fn new(ranger: PhaseFineRanger, range_bin_mm: f64) -> Self {
        Self { ranger, range_bin_mm }
    }
}

impl RangingStrategy for PhaseRanging {
    fn slant_distance(&self, range: &RangeResult, phase_history: &[f64]) -> Option<f64> {
        self.ranger.refine_range(phase_history, range.peak_bin_index, self.range_bin_mm)
    }

    fn uses_phase_history(&self) -> bool {
        true
    }
}

/// Build the strategy selected in the configuration
pub fn from_config(config: &Config, geometry: &GeometryConstants) -> Box<dyn RangingStrategy> {
    let p = &config.processing;
    match p.ranging {
        RangingMode::Parabolic => Box::new(ParabolicRanging::new(geometry.range_bin_mm)),
        RangingMode::Phase => {
            let ranger = PhaseFineRanger::new(geometry.wavelength_m, p.phase_warmup, p.phase_lag, p.phase_cutoff);
            Box::new(PhaseRanging::new(ranger, geometry.range_bin_mm))
        }
    }
}
