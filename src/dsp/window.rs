use std::f64::consts::PI;


/// Symmetric Hann window (both ends are zero), same as `numpy.hanning`.
pub fn hann(length: usize) -> Vec<f64> {
    match length {
        0 => Vec::new(),
        1 => vec![1.0],
        n => {
            let denom = (n - 1) as f64;
            (0..n).map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / denom).cos()).collect()
        }
    }
}
