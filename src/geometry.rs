//! Physical constants derived once from the configuration.

use crate::config::Config;


pub const SPEED_OF_LIGHT: f64 = 3e8;
/// Lower edge of the sensor's 24 GHz ISM band
pub const BASE_FREQUENCY_HZ: f64 = 24.005e9;


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryConstants {
    pub wavelength_m: f64,
    pub depression_angle_rad: f64,
    pub range_bin_mm: f64,
}

impl GeometryConstants {
    pub fn new(f0_offset_mhz: f64, depression_angle_deg: f64, range_bin_mm: f64) -> Self {
        let center_hz = BASE_FREQUENCY_HZ + f0_offset_mhz * 1e6;
        Self {
            wavelength_m: SPEED_OF_LIGHT / center_hz,
            depression_angle_rad: depression_angle_deg.to_radians(),
            range_bin_mm,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let geometry = Self::new(
            config.radar.f0_offset_mhz,
            config.geometry.depression_angle_deg,
            config.geometry.range_bin_mm,
        );
        log::info!(
            "Wavelength: {:.6} m, depression angle: {:.4} rad, range bin: {} mm",
            geometry.wavelength_m, geometry.depression_angle_rad, geometry.range_bin_mm
        );
        log::info!(
            "Theoretical range resolution: {:.3} m",
            SPEED_OF_LIGHT / (2.0 * config.radar.bandwidth_mhz * 1e6)
        );
        geometry
    }

    pub fn vertical_height(&self, slant_distance_m: f64) -> f64 {
        slant_distance_m * self.depression_angle_rad.sin()
    }

    /// Project line of sight speed onto the horizontal flow direction
    pub fn flow_velocity(&self, radial_velocity: f64) -> f64 {
        radial_velocity / self.depression_angle_rad.cos()
    }

    /// Highest flow speed which doesn't alias at the given frame rate
    pub fn max_unambiguous_velocity(&self, sample_rate_hz: f64) -> f64 {
        self.flow_velocity(self.wavelength_m * sample_rate_hz / 4.0)
    }
}


/// Per-cycle result reported to telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicalEstimate {
    pub slant_distance: f64,
    pub vertical_height: f64,
    pub radial_velocity: f64,
    pub doppler_frequency_hz: f64,
}

impl PhysicalEstimate {
    pub fn new(geometry: &GeometryConstants, slant_distance: f64, radial_velocity: f64, doppler_frequency_hz: f64) -> Self {
        Self {
            slant_distance,
            vertical_height: geometry.vertical_height(slant_distance),
            radial_velocity,
            doppler_frequency_hz,
        }
    }
}
