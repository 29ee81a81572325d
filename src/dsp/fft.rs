use std::fmt;
use std::sync::Arc;

use rustfft::{Fft, FftPlanner};

use super::window::hann;
use super::Complex64;


/// Forward FFT of fixed size with a Hann window applied to the input.
///
/// Planning is done once, so the same instance should be reused for every frame.
pub struct WindowedFft {
    size: usize,
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    scratch: Vec<Complex64>,
}

impl fmt::Debug for WindowedFft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowedFft")
            .field("size", &self.size)
            .finish()
    }
}

impl WindowedFft {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            size,
            fft,
            window: hann(size),
            scratch,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Window and transform `buffer` in place
    pub fn process(&mut self, buffer: &mut [Complex64]) {
        assert_eq!(buffer.len(), self.size);
        for (x, w) in buffer.iter_mut().zip(&self.window) {
            *x *= *w;
        }
        self.fft.process_with_scratch(buffer, &mut self.scratch);
    }
}
