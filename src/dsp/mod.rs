//! Signal processing building blocks shared by the range and Doppler stages.

pub mod fft;
pub mod iir;
pub mod unwrap;
pub mod window;

pub use rustfft::num_complex::Complex64;


/// Arithmetic mean of a complex sequence. Empty input gives zero.
pub fn complex_mean(xs: &[Complex64]) -> Complex64 {
    if xs.is_empty() {
        return Complex64::new(0.0, 0.0);
    }
    xs.iter().sum::<Complex64>() / xs.len() as f64
}

/// Arithmetic mean of a real sequence. Empty input gives zero.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}
