//! Runtime configuration, read once from `config.toml` at startup.
//!
//! Every section has defaults matching the deployed river station, so a missing
//! file (or a missing key) still gives a working setup.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};


#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub radar: Radar,
    pub geometry: Geometry,
    pub processing: Processing,
    pub telemetry: Telemetry,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Radar {
    /// Offset added to the 24.005 GHz base frequency
    pub f0_offset_mhz: f64,
    pub bandwidth_mhz: f64,
    pub samples_per_frame: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Geometry {
    pub depression_angle_deg: f64,
    /// Calibrated slant range covered by one FFT bin
    pub range_bin_mm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangingMode {
    Parabolic,
    Phase,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Processing {
    pub history_length: usize,
    pub min_doppler_hz: f64,
    pub clutter_removal: bool,
    pub ranging: RangingMode,
    pub rate_batch_size: u32,
    pub initial_sample_rate_hz: f64,
    pub fallback_sample_rate_hz: f64,
    pub phase_warmup: usize,
    pub phase_lag: usize,
    /// Lowpass cutoff as a fraction of the Nyquist frequency
    pub phase_cutoff: f64,
    pub moving_threshold_m_s: f64,
    pub stable_rate_hz: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Telemetry {
    pub interval_s: f64,
    pub queue_capacity: usize,
    pub diagnostics: bool,
}

impl Default for Radar {
    fn default() -> Self {
        Self {
            f0_offset_mhz: 5.0,
            bandwidth_mhz: 240.0,
            samples_per_frame: 200,
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            depression_angle_deg: 35.0,
            range_bin_mm: 560.0,
        }
    }
}

impl Default for Processing {
    fn default() -> Self {
        Self {
            history_length: 256,
            min_doppler_hz: 3.0,
            clutter_removal: true,
            ranging: RangingMode::Parabolic,
            rate_batch_size: 20,
            initial_sample_rate_hz: 20.0,
            fallback_sample_rate_hz: 180.0,
            phase_warmup: 15,
            phase_lag: 15,
            phase_cutoff: 0.01,
            moving_threshold_m_s: 0.05,
            stable_rate_hz: 10.0,
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            interval_s: 1.0,
            queue_capacity: 64,
            diagnostics: false,
        }
    }
}

impl Config {
    pub fn from_toml(data: &str) -> Result<Self> {
        let config: Config = toml::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file. A missing file means defaults,
    /// but a file which can't be parsed is an error.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(data) => Self::from_toml(&data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                Ok(Config::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.processing;
        if self.radar.samples_per_frame < 5 {
            return Err(Error::Config(format!(
                "samples_per_frame must be at least 5, got {}", self.radar.samples_per_frame)));
        }
        if self.radar.bandwidth_mhz <= 0.0 {
            return Err(Error::Config("bandwidth_mhz must be positive".into()));
        }
        if p.history_length < 2 {
            return Err(Error::Config("history_length must be at least 2".into()));
        }
        let angle = self.geometry.depression_angle_deg;
        if !(0.0..90.0).contains(&angle) {
            return Err(Error::Config(format!("depression angle {angle} outside [0, 90)")));
        }
        if self.geometry.range_bin_mm <= 0.0 {
            return Err(Error::Config("range_bin_mm must be positive".into()));
        }
        if p.rate_batch_size == 0 {
            return Err(Error::Config("rate_batch_size must be positive".into()));
        }
        if p.fallback_sample_rate_hz <= 0.0 {
            return Err(Error::Config("fallback_sample_rate_hz must be positive".into()));
        }
        if p.phase_cutoff <= 0.0 || p.phase_cutoff >= 1.0 {
            return Err(Error::Config(format!("phase_cutoff {} outside (0, 1)", p.phase_cutoff)));
        }
        if p.phase_lag == 0 || p.phase_lag > p.phase_warmup + 1 {
            return Err(Error::Config(format!(
                "phase_lag must be in 1..={}, got {}", p.phase_warmup + 1, p.phase_lag)));
        }
        let interval = self.telemetry.interval_s;
        if !interval.is_finite() || interval < 0.0 {
            return Err(Error::Config(format!("telemetry interval {interval} must be a non-negative number")));
        }
        if self.telemetry.queue_capacity == 0 {
            return Err(Error::Config("telemetry queue_capacity must be positive".into()));
        }
        Ok(())
    }
}
