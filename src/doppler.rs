//! Second FFT: velocity from the history of target bin values.
//!
//! The complex value of the target bin rotates at the Doppler frequency while the
//! surface moves. An FFT over the last `HistoryLength` frames, taken at the
//! measured frame rate, shows this frequency as a peak:
//!
//! ```text
//! v_radial = f_doppler * λ / 2
//! v_flow   = v_radial / cos(depression angle)
//! ```

use crate::dsp::fft::WindowedFft;
use crate::dsp::{complex_mean, Complex64};
use crate::error::{Error, Result};


/// A peak weaker than this fraction of the history's total magnitude is numerical noise
const MIN_PEAK_RATIO: f64 = 1e-9;


#[derive(Debug, Clone, PartialEq, Default)]
pub struct DopplerResult {
    pub velocity: f64,
    pub doppler_freq: f64,
    /// Magnitudes of the non-negative frequency bins
    pub spectrum: Vec<f64>,
}

#[derive(Debug)]
pub struct DopplerEstimator {
    fft: WindowedFft,
    wavelength_m: f64,
    clutter_removal: bool,
}

impl DopplerEstimator {
    pub fn new(history_length: usize, wavelength_m: f64, clutter_removal: bool) -> Self {
        Self {
            fft: WindowedFft::new(history_length),
            wavelength_m,
            clutter_removal,
        }
    }

    /// Velocity of the dominant positive frequency component at or above `min_doppler_hz`.
    ///
    /// `history` must be exactly `history_length` values, oldest first.
    /// No qualifying component gives zero velocity and zero frequency.
    pub fn estimate_velocity(
        &mut self,
        history: &[Complex64],
        sample_rate_hz: f64,
        depression_angle_rad: f64,
        min_doppler_hz: f64,
    ) -> Result<DopplerResult> {
        let n = self.fft.size();
        if history.len() != n {
            return Err(Error::HistoryLength { expected: n, actual: history.len() });
        }

        let mut buffer = history.to_vec();
        if self.clutter_removal {
            let clutter = complex_mean(&buffer);
            for x in buffer.iter_mut() {
                *x -= clutter;
            }
        }
        self.fft.process(&mut buffer);

        let spectrum: Vec<f64> = buffer[..n / 2].iter().map(|c| c.norm()).collect();
        let bin_width = sample_rate_hz / n as f64;
        let noise_floor = MIN_PEAK_RATIO * history.iter().map(|c| c.norm()).sum::<f64>();

        let peak = spectrum.iter()
            .enumerate()
            .filter(|(k, _)| *k as f64 * bin_width >= min_doppler_hz)
            .fold(None, |best: Option<(usize, f64)>, (k, &m)| match best {
                Some((_, bm)) if bm >= m => best,
                _ => Some((k, m)),
            });

        let result = match peak {
            Some((k, magnitude)) if magnitude > noise_floor => {
                let doppler_freq = k as f64 * bin_width;
                let radial = doppler_freq * self.wavelength_m / 2.0;
                DopplerResult {
                    velocity: radial / depression_angle_rad.cos(),
                    doppler_freq,
                    spectrum,
                }
            }
            _ => DopplerResult { spectrum, ..Default::default() },
        };
        Ok(result)
    }
}
